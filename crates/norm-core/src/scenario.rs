//! Scenario Presets
//!
//! Bulk assignment of starting acknowledgment patterns, one preset per
//! scenario group.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use norm_events::ScenarioGroup;

use crate::components::Agent;
use crate::config::{CARE_NORM, LEGAL_NORM};
use crate::norms::NormRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScenarioPreset {
    Utopian,
    Collapsed,
    Authoritarian,
    AllCare,
    Pluralist,
}

impl ScenarioPreset {
    pub fn all() -> &'static [ScenarioPreset] {
        &[
            ScenarioPreset::Utopian,
            ScenarioPreset::Collapsed,
            ScenarioPreset::Authoritarian,
            ScenarioPreset::AllCare,
            ScenarioPreset::Pluralist,
        ]
    }

    /// Scenario group an agent lands in right after this preset
    pub fn group(&self) -> ScenarioGroup {
        match self {
            ScenarioPreset::Utopian => ScenarioGroup::Utopian,
            ScenarioPreset::Collapsed => ScenarioGroup::Collapsed,
            ScenarioPreset::Authoritarian => ScenarioGroup::Authoritarian,
            ScenarioPreset::AllCare => ScenarioGroup::AllCare,
            ScenarioPreset::Pluralist => ScenarioGroup::Pluralist,
        }
    }

    pub fn label(&self) -> &'static str {
        self.group().as_str()
    }

    /// Overwrite the agent's acknowledgments over every registered norm
    pub fn apply(&self, agent: &mut Agent, registry: &NormRegistry, rng: &mut SmallRng) {
        match self {
            ScenarioPreset::Utopian => set_all(agent, registry, true),
            ScenarioPreset::Collapsed => set_all(agent, registry, false),
            ScenarioPreset::Authoritarian => only(agent, registry, LEGAL_NORM),
            ScenarioPreset::AllCare => only(agent, registry, CARE_NORM),
            ScenarioPreset::Pluralist => pluralist(agent, registry, rng),
        }
    }
}

impl fmt::Display for ScenarioPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScenarioPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.replace(['-', '_'], "");
        ScenarioPreset::all()
            .iter()
            .copied()
            .find(|preset| preset.label().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("unknown scenario preset `{}`", s))
    }
}

fn set_all(agent: &mut Agent, registry: &NormRegistry, acknowledged: bool) {
    for name in registry.names() {
        agent.set_acknowledgment(name, acknowledged);
    }
}

fn only(agent: &mut Agent, registry: &NormRegistry, norm: &str) {
    for name in registry.names() {
        agent.set_acknowledgment(name, name == norm);
    }
    if registry.contains(norm) {
        agent.norm_preference = norm.to_string();
    }
}

/// Between two and n-1 norms acknowledged, so never one and never all
fn pluralist(agent: &mut Agent, registry: &NormRegistry, rng: &mut SmallRng) {
    let mut names: Vec<&str> = registry.names().collect();
    if names.len() < 3 {
        for name in names {
            agent.set_acknowledgment(name, rng.gen_bool(0.5));
        }
        return;
    }

    names.shuffle(rng);
    let count = rng.gen_range(2..names.len());
    for (position, name) in names.iter().enumerate() {
        agent.set_acknowledgment(*name, position < count);
    }
    agent.norm_preference = names[rng.gen_range(0..count)].to_string();
}
