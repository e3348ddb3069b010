//! Metrics Aggregation
//!
//! Derives one summary record per generation from the live population's
//! ledgers and affiliations.

use std::collections::BTreeSet;

use norm_events::{ratio, GenerationMetrics, ObligationStatus};

use crate::components::Population;

pub fn aggregate_metrics(generation: u32, population: &Population, hostile_pairs: usize) -> GenerationMetrics {
    let mut issued = 0u32;
    let mut fulfilled = 0u32;
    let mut denied = 0u32;
    let mut expired = 0u32;
    let mut repaired = 0u32;
    let mut cross_affiliation = 0u32;
    let mut cross_affiliation_breaches = 0u32;
    let mut affiliations = BTreeSet::new();

    for agent in population.iter() {
        affiliations.insert(agent.affiliation_or_default());
        issued += agent.ledger().len() as u32;

        for (&target, &status) in agent.ledger() {
            match status {
                ObligationStatus::Fulfilled => fulfilled += 1,
                ObligationStatus::Denied => denied += 1,
                ObligationStatus::Expired => expired += 1,
                ObligationStatus::Repaired => repaired += 1,
                ObligationStatus::Pending => {}
            }

            // Entries pointing at dead agents have no affiliation to compare
            let Some(other) = population.get(target) else {
                continue;
            };
            if agent.affiliation_or_default() != other.affiliation_or_default() {
                cross_affiliation += 1;
                if status.is_breach() {
                    cross_affiliation_breaches += 1;
                }
            }
        }
    }

    let breaches = denied + expired;
    GenerationMetrics {
        generation,
        population: population.len(),
        total_obligations_issued: issued,
        total_fulfilled: fulfilled,
        total_denied: denied,
        total_expired: expired,
        total_repaired: repaired,
        fulfillment_rate: ratio(fulfilled as f64, issued as f64),
        relational_integrity: ratio(fulfilled as f64, (fulfilled + breaches) as f64),
        avg_debt: ratio(breaches as f64, population.len() as f64),
        avg_conflict: ratio(cross_affiliation_breaches as f64, cross_affiliation as f64),
        emergent_regimes: affiliations.len(),
        hostile_pairs,
        run: None,
        batch_scenario: None,
    }
}
