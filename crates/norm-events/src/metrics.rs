//! Generation Metrics
//!
//! One immutable summary record per generation.

use serde::{Deserialize, Serialize};

/// Aggregate counts and ratios over the live population at one generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetrics {
    pub generation: u32,
    pub population: usize,
    /// Sum of ledger sizes
    pub total_obligations_issued: u32,
    pub total_fulfilled: u32,
    pub total_denied: u32,
    pub total_expired: u32,
    pub total_repaired: u32,
    /// fulfilled / issued
    pub fulfillment_rate: f64,
    /// fulfilled / (fulfilled + denied + expired)
    pub relational_integrity: f64,
    /// (denied + expired) / population, a debt proxy
    pub avg_debt: f64,
    /// Share of cross-affiliation ledger entries that are denied or expired
    pub avg_conflict: f64,
    /// Distinct affiliation labels; a loose proxy for emergent regimes
    pub emergent_regimes: usize,
    pub hostile_pairs: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_scenario: Option<String>,
}

/// `numerator / denominator`, or 0 when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
