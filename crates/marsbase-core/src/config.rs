//! Engine configuration - every tunable of the task engine in one place.
//!
//! Loaded from JSON; any field left out falls back to its default.

use serde::{Deserialize, Serialize};
use std::path::Path;

use marsbase_logic::condition::ConditionRates;
use marsbase_logic::constants::{accident, airlock, eva, tasks};
use marsbase_logic::eva::EvaLimits;

/// Errors from loading configuration or scenario files.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Json(e) => write!(f, "JSON error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the engine RNG.
    pub seed: u64,
    pub base_accident_chance: f64,
    pub eva_min_resource_fraction: f64,
    pub eva_min_performance: f64,
    pub min_exit_performance: f64,
    /// Efficiency floor for effort-driven tasks.
    pub min_task_efficiency: f64,
    /// Cap applied to every task weight.
    pub max_task_probability: f64,
    pub airlock_cycle_time: f64,
    pub airlock_max_reservations: usize,
    pub airlock_wait_limit: f64,
    pub prebreathe_time: f64,
    pub don_suit_time: f64,
    pub doff_suit_time: f64,
    pub clean_up_time: f64,
    /// Chance per millisol that a healthy entity breaks down on its own.
    pub malfunction_rate: f64,
    /// Wear condition lost per millisol.
    pub wear_rate: f64,
    pub fatigue_rate: f64,
    pub hunger_rate: f64,
    pub stress_recovery_rate: f64,
    /// Reuse task weights within the same millisol.
    pub cache_probabilities: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            base_accident_chance: accident::BASE_CHANCE,
            eva_min_resource_fraction: eva::MIN_RESOURCE_FRACTION,
            eva_min_performance: eva::MIN_PERFORMANCE,
            min_exit_performance: eva::MIN_EXIT_PERFORMANCE,
            min_task_efficiency: tasks::MIN_EFFICIENCY,
            max_task_probability: tasks::MAX_TASK_PROBABILITY,
            airlock_cycle_time: airlock::CYCLE_TIME,
            airlock_max_reservations: airlock::MAX_RESERVED,
            airlock_wait_limit: airlock::WAIT_LIMIT,
            prebreathe_time: airlock::PREBREATHE_TIME,
            don_suit_time: airlock::DON_SUIT_TIME,
            doff_suit_time: airlock::DOFF_SUIT_TIME,
            clean_up_time: airlock::CLEAN_UP_TIME,
            malfunction_rate: 0.00002,
            wear_rate: 0.002,
            fatigue_rate: 1.0,
            hunger_rate: 1.0,
            stress_recovery_rate: 0.01,
            cache_probabilities: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("base_accident_chance", self.base_accident_chance),
            ("min_task_efficiency", self.min_task_efficiency),
            ("max_task_probability", self.max_task_probability),
            ("airlock_wait_limit", self.airlock_wait_limit),
            ("prebreathe_time", self.prebreathe_time),
            ("don_suit_time", self.don_suit_time),
            ("doff_suit_time", self.doff_suit_time),
            ("clean_up_time", self.clean_up_time),
            ("malfunction_rate", self.malfunction_rate),
            ("wear_rate", self.wear_rate),
            ("fatigue_rate", self.fatigue_rate),
            ("hunger_rate", self.hunger_rate),
            ("stress_recovery_rate", self.stress_recovery_rate),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        let fractions = [
            ("eva_min_resource_fraction", self.eva_min_resource_fraction),
            ("eva_min_performance", self.eva_min_performance),
            ("min_exit_performance", self.min_exit_performance),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.airlock_cycle_time.is_nan() || self.airlock_cycle_time <= 0.0 {
            return Err(ConfigError::Invalid(
                "airlock_cycle_time must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn eva_limits(&self) -> EvaLimits {
        EvaLimits {
            min_resource_fraction: self.eva_min_resource_fraction,
            min_performance: self.eva_min_performance,
        }
    }

    pub fn condition_rates(&self) -> ConditionRates {
        ConditionRates {
            fatigue: self.fatigue_rate,
            hunger: self.hunger_rate,
            stress_recovery: self.stress_recovery_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "seed": 7, "prebreathe_time": 5.0 }"#)
            .expect("partial config should parse");
        assert_eq!(config.seed, 7);
        assert_eq!(config.prebreathe_time, 5.0);
        assert_eq!(config.airlock_cycle_time, 10.0);
        assert_eq!(config.max_task_probability, 20_000.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = EngineConfig::from_json_str(r#"{ "eva_min_resource_fraction": 1.5 }"#)
            .expect_err("fraction above 1 must be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_json_str(r#"{ "airlock_cycle_time": 0.0 }"#)
            .expect_err("zero cycle time must be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_json_str("{ not json").expect_err("garbage");
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
