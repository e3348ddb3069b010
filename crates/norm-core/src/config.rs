//! Configuration System
//!
//! Loads tuning parameters from tuning.toml. Every section falls back to its
//! defaults, so a partial file only overrides what it names. Validation runs
//! here, at the boundary; the simulation assumes a well-formed config.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Default tuning file path
pub const DEFAULT_TUNING_PATH: &str = "tuning.toml";

/// Norm that marks the authoritarian scenario group
pub const LEGAL_NORM: &str = "legal";
/// Norm that marks the all-care scenario group
pub const CARE_NORM: &str = "care";

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub obligations: ObligationConfig,
    #[serde(default)]
    pub trust: TrustConfig,
    #[serde(default)]
    pub reproduction: ReproductionConfig,
    #[serde(default)]
    pub death: DeathConfig,
    #[serde(default)]
    pub repair: RepairConfig,
    #[serde(default)]
    pub drift: DriftConfig,
    #[serde(default)]
    pub affiliation: AffiliationConfig,
    #[serde(default)]
    pub norms: NormConfig,
    #[serde(default)]
    pub arena: ArenaConfig,
}

/// Run length and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub generations: u32,
    /// Enforcement steps between two generation boundaries
    pub steps_per_generation: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            generations: 100,
            steps_per_generation: 20,
        }
    }
}

/// Initial population
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub size: usize,
    /// Chance that a founding agent acknowledges any given norm
    pub initial_acknowledgment_chance: f32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: 100,
            initial_acknowledgment_chance: 0.5,
        }
    }
}

/// Obligation sampling and expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObligationConfig {
    pub proximity_threshold: f32,
    /// Sampled candidates per live agent
    pub count_multiplier: f32,
    pub max_vectors: usize,
    pub expiration_base: u32,
    /// Upper bound of the uniform jitter added to `expiration_base`
    pub expiration_jitter: u32,
    /// Prefer the most indebted eligible target over a uniform pick
    pub vulnerability_targeting: bool,
}

impl Default for ObligationConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: 60.0,
            count_multiplier: 0.5,
            max_vectors: 200,
            expiration_base: 10,
            expiration_jitter: 10,
            vulnerability_targeting: false,
        }
    }
}

/// Trust adjustments applied on resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    pub increment: f32,
    pub decrement: f32,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            increment: 1.0,
            decrement: 1.0,
        }
    }
}

/// Reproduction, inheritance and mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReproductionConfig {
    pub chance: f32,
    pub mutation_base: f32,
    /// Extra mutation rate per unit of the parent's internal conflict
    pub max_conflict_mutation: f32,
    pub preference_inheritance: f32,
    pub momentum_jitter: f32,
    /// Hard population cap as a multiple of the initial count
    pub cap_multiplier: usize,
    /// Jitter on inherited temperament and memory length
    pub trait_jitter: f32,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            chance: 0.05,
            mutation_base: 0.02,
            max_conflict_mutation: 0.05,
            preference_inheritance: 0.8,
            momentum_jitter: 0.05,
            cap_multiplier: 10,
            trait_jitter: 0.05,
        }
    }
}

/// Per-generation death rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathConfig {
    pub base_rate: f32,
    pub conflict_weight: f32,
    /// Ceiling on the conflict contribution
    pub conflict_cap: f32,
    pub old_age_boost: f32,
    pub age_threshold: u32,
}

impl Default for DeathConfig {
    fn default() -> Self {
        Self {
            base_rate: 0.01,
            conflict_weight: 0.01,
            conflict_cap: 0.2,
            old_age_boost: 0.01,
            age_threshold: 50,
        }
    }
}

/// Moral repair at the generation boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub enabled: bool,
    pub probability: f32,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            probability: 0.1,
        }
    }
}

/// Normative drift between generations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub flip_chance: f32,
    pub preference_shift_chance: f32,
    pub momentum_jitter: f32,
    /// Drift toward the most trusted neighbor's norm instead of at random
    pub directed_emergence: bool,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            flip_chance: 0.02,
            preference_shift_chance: 0.05,
            momentum_jitter: 0.02,
            directed_emergence: false,
        }
    }
}

/// Group hostility and merging thresholds on average inter-group trust
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AffiliationConfig {
    pub hostility_threshold: f32,
    pub merge_threshold: f32,
}

impl Default for AffiliationConfig {
    fn default() -> Self {
        Self {
            hostility_threshold: 0.5,
            merge_threshold: 3.0,
        }
    }
}

/// Which enforcement policy a norm resolves with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Threshold,
    Probabilistic,
}

/// Starting norm set and policy selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormConfig {
    pub names: Vec<String>,
    pub default_policy: PolicyKind,
    /// Per-norm policy overrides
    pub policies: BTreeMap<String, PolicyKind>,
    /// Probabilistic policy: success factor when the agents are apart
    pub distant_factor: f32,
    /// Probabilistic policy: success factor when either side does not acknowledge
    pub unacknowledged_factor: f32,
}

impl Default for NormConfig {
    fn default() -> Self {
        Self {
            names: vec![
                LEGAL_NORM.to_string(),
                CARE_NORM.to_string(),
                "reciprocity".to_string(),
                "sanctity".to_string(),
            ],
            default_policy: PolicyKind::Threshold,
            policies: BTreeMap::new(),
            distant_factor: 0.3,
            unacknowledged_factor: 0.2,
        }
    }
}

impl NormConfig {
    pub fn policy_for(&self, norm: &str) -> PolicyKind {
        self.policies.get(norm).copied().unwrap_or(self.default_policy)
    }
}

/// Bounds of the default proximity arena
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub width: f32,
    pub height: f32,
    /// Maximum random-walk displacement per step
    pub wander: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            wander: 5.0,
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Hard population ceiling
    pub fn population_cap(&self) -> usize {
        self.population.size.saturating_mul(self.reproduction.cap_multiplier)
    }

    /// Reject configurations the simulation cannot run on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population.size == 0 {
            return Err(ConfigError::invalid("population.size", "must be greater than 0"));
        }
        if self.reproduction.cap_multiplier < 1 {
            return Err(ConfigError::invalid("reproduction.cap_multiplier", "must be at least 1"));
        }

        for (field, value) in [
            ("population.initial_acknowledgment_chance", self.population.initial_acknowledgment_chance),
            ("reproduction.chance", self.reproduction.chance),
            ("reproduction.mutation_base", self.reproduction.mutation_base),
            ("reproduction.preference_inheritance", self.reproduction.preference_inheritance),
            ("repair.probability", self.repair.probability),
            ("drift.flip_chance", self.drift.flip_chance),
            ("drift.preference_shift_chance", self.drift.preference_shift_chance),
            ("norms.distant_factor", self.norms.distant_factor),
            ("norms.unacknowledged_factor", self.norms.unacknowledged_factor),
        ] {
            check_probability(field, value)?;
        }

        for (field, value) in [
            ("obligations.count_multiplier", self.obligations.count_multiplier),
            ("trust.increment", self.trust.increment),
            ("trust.decrement", self.trust.decrement),
            ("reproduction.max_conflict_mutation", self.reproduction.max_conflict_mutation),
            ("reproduction.momentum_jitter", self.reproduction.momentum_jitter),
            ("reproduction.trait_jitter", self.reproduction.trait_jitter),
            ("death.base_rate", self.death.base_rate),
            ("death.conflict_weight", self.death.conflict_weight),
            ("death.conflict_cap", self.death.conflict_cap),
            ("death.old_age_boost", self.death.old_age_boost),
            ("drift.momentum_jitter", self.drift.momentum_jitter),
            ("arena.wander", self.arena.wander),
        ] {
            check_non_negative(field, value)?;
        }

        for (field, value) in [
            ("obligations.proximity_threshold", self.obligations.proximity_threshold),
            ("arena.width", self.arena.width),
            ("arena.height", self.arena.height),
        ] {
            check_non_negative(field, value)?;
            if value == 0.0 {
                return Err(ConfigError::invalid(field, "must be greater than 0"));
            }
        }

        let hostility = self.affiliation.hostility_threshold;
        let merge = self.affiliation.merge_threshold;
        if !hostility.is_finite() || !merge.is_finite() {
            return Err(ConfigError::invalid("affiliation", "thresholds must be finite"));
        }
        if hostility >= merge {
            return Err(ConfigError::invalid(
                "affiliation.hostility_threshold",
                format!("must be below merge_threshold ({} >= {})", hostility, merge),
            ));
        }

        if self.norms.names.is_empty() {
            return Err(ConfigError::invalid("norms.names", "at least one norm is required"));
        }
        let mut seen = HashSet::new();
        for name in &self.norms.names {
            if name.trim().is_empty() {
                return Err(ConfigError::invalid("norms.names", "norm names must not be empty"));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::invalid("norms.names", format!("duplicate norm `{}`", name)));
            }
        }
        for name in self.norms.policies.keys() {
            if !seen.contains(name.as_str()) {
                return Err(ConfigError::invalid(
                    "norms.policies",
                    format!("policy given for unknown norm `{}`", name),
                ));
            }
        }

        Ok(())
    }
}

fn check_probability(field: &str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(field, format!("{} is not a probability in [0, 1]", value)));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::invalid(field, format!("{} must be a finite, non-negative number", value)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.population.size, 100);
        assert_eq!(config.norms.names.len(), 4);
        assert_eq!(config.affiliation.hostility_threshold, 0.5);
        assert_eq!(config.affiliation.merge_threshold, 3.0);
        assert_eq!(config.population_cap(), 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
            [population]
            size = 10

            [norms.policies]
            care = "probabilistic"
        "#;

        let config = SimConfig::from_str(toml).unwrap();

        assert_eq!(config.population.size, 10);
        assert_eq!(config.norms.policy_for("care"), PolicyKind::Probabilistic);
        assert_eq!(config.norms.policy_for("legal"), PolicyKind::Threshold);
        assert_eq!(config.obligations.max_vectors, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_numeric_value_is_rejected() {
        let toml = r#"
            [population]
            size = "many"
        "#;
        assert!(matches!(SimConfig::from_str(toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_population_is_rejected() {
        let mut config = SimConfig::default();
        config.population.size = 0;
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "population.size"),
            other => panic!("expected invalid population, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_probability_is_rejected() {
        let mut config = SimConfig::default();
        config.reproduction.chance = 1.5;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.repair.probability = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_and_unknown_norms_are_rejected() {
        let mut config = SimConfig::default();
        config.norms.names.push(LEGAL_NORM.to_string());
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.norms.policies.insert("honor".into(), PolicyKind::Threshold);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_affiliation_thresholds_are_rejected() {
        let mut config = SimConfig::default();
        config.affiliation.hostility_threshold = 4.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = SimConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[population]"));
        assert!(text.contains("[affiliation]"));

        let parsed = SimConfig::from_str(&text).unwrap();
        assert_eq!(parsed.population.size, config.population.size);
        assert_eq!(parsed.norms.names, config.norms.names);
    }

    #[test]
    fn test_load_config_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tuning.toml");
        let config = SimConfig::load(path).unwrap();
        assert!(config.validate().is_ok());

        let defaults = SimConfig::default();
        assert_eq!(config.population.size, defaults.population.size);
        assert_eq!(config.norms.names, defaults.norms.names);
        assert_eq!(config.affiliation.merge_threshold, defaults.affiliation.merge_threshold);
        assert!(!config.repair.enabled);
    }
}
