//! Engine configuration.
//!
//! All tunables live in an explicit [`EngineSettings`] struct passed into
//! the engine at construction; there are no process-wide globals, so
//! multiple engines (e.g. an analysis run next to a live run) never share
//! mutable configuration. Settings load from TOML via the `config` crate
//! and validate semantically after deserialization.

use std::path::Path;
use std::time::Duration;

use config::Config;
use serde::Deserialize;

use crate::commands::FailurePolicy;
use crate::error::{ConfigurationError, EngineError};
use crate::validation;

/// Top-level engine settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Maximum commands waiting in the queue before submission is refused.
    pub max_queued_commands: usize,
    /// Run-level behavior when a command without an explicit policy fails.
    pub default_failure_policy: FailurePolicy,
    pub hardware: HardwareSettings,
    pub recovery: RecoverySettings,
}

/// Per-operation hardware timeout budgets and physical limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HardwareSettings {
    #[serde(with = "humantime_serde")]
    pub move_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub aspirate_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub dispense_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub pick_up_tip_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub drop_tip_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub home_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub sensor_timeout: Duration,
    /// Ejector pressure above this is treated as overpressure, in kPa.
    pub overpressure_limit_kpa: f64,
}

/// Escalation parameters for the drop-tip recovery ladder.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecoverySettings {
    /// Retries after the first failed ejection before giving up.
    pub drop_tip_max_retries: u32,
    /// Flow-rate multiplier applied to retry attempts, in (0, 1].
    pub retry_flow_rate_scale: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_queued_commands: 1024,
            default_failure_policy: FailurePolicy::FailRun,
            hardware: HardwareSettings::default(),
            recovery: RecoverySettings::default(),
        }
    }
}

impl Default for HardwareSettings {
    fn default() -> Self {
        Self {
            move_timeout: Duration::from_secs(30),
            aspirate_timeout: Duration::from_secs(30),
            dispense_timeout: Duration::from_secs(30),
            pick_up_tip_timeout: Duration::from_secs(15),
            drop_tip_timeout: Duration::from_secs(15),
            home_timeout: Duration::from_secs(60),
            sensor_timeout: Duration::from_secs(5),
            overpressure_limit_kpa: 110.0,
        }
    }
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            drop_tip_max_retries: 2,
            retry_flow_rate_scale: 0.5,
        }
    }
}

impl EngineSettings {
    /// Load settings from `config/<name>.toml` (default: `config/default`).
    pub fn new(config_name: Option<&str>) -> Result<Self, EngineError> {
        let config_path = format!("config/{}", config_name.unwrap_or("default"));
        let source = Config::builder()
            .add_source(config::File::with_name(&config_path))
            .build()
            .map_err(|e| ConfigurationError::InvalidSettings(e.to_string()))?;

        let settings: Self = source
            .try_deserialize()
            .map_err(|e| ConfigurationError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from an explicit TOML file path.
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let source = Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(|e| ConfigurationError::InvalidSettings(e.to_string()))?;

        let settings: Self = source
            .try_deserialize()
            .map_err(|e| ConfigurationError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Semantic validation beyond what deserialization can check.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |field: &str, reason: &str| {
            EngineError::Configuration(ConfigurationError::InvalidSettings(format!(
                "{field}: {reason}"
            )))
        };

        validation::require_nonzero(self.max_queued_commands)
            .map_err(|r| invalid("max_queued_commands", r))?;
        validation::require_positive(self.hardware.overpressure_limit_kpa)
            .map_err(|r| invalid("hardware.overpressure_limit_kpa", r))?;
        validation::require_fraction(self.recovery.retry_flow_rate_scale)
            .map_err(|r| invalid("recovery.retry_flow_rate_scale", r))?;

        for (name, timeout) in [
            ("hardware.move_timeout", self.hardware.move_timeout),
            ("hardware.aspirate_timeout", self.hardware.aspirate_timeout),
            ("hardware.dispense_timeout", self.hardware.dispense_timeout),
            (
                "hardware.pick_up_tip_timeout",
                self.hardware.pick_up_tip_timeout,
            ),
            ("hardware.drop_tip_timeout", self.hardware.drop_tip_timeout),
            ("hardware.home_timeout", self.hardware.home_timeout),
            ("hardware.sensor_timeout", self.hardware.sensor_timeout),
        ] {
            validation::require_nonzero_duration(timeout).map_err(|r| invalid(name, r))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        EngineSettings::default().validate().unwrap();
    }

    #[test]
    fn loads_overrides_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
            max_queued_commands = 16
            default_failure_policy = "continueRun"

            [hardware]
            move_timeout = "5s"
            overpressure_limit_kpa = 95.0

            [recovery]
            drop_tip_max_retries = 1
            "#
        )
        .unwrap();

        let settings = EngineSettings::from_path(&path).unwrap();
        assert_eq!(settings.max_queued_commands, 16);
        assert_eq!(settings.default_failure_policy, FailurePolicy::ContinueRun);
        assert_eq!(settings.hardware.move_timeout, Duration::from_secs(5));
        assert_eq!(settings.hardware.overpressure_limit_kpa, 95.0);
        assert_eq!(settings.recovery.drop_tip_max_retries, 1);
        // Untouched values keep their defaults.
        assert_eq!(settings.hardware.home_timeout, Duration::from_secs(60));
    }

    #[test]
    fn rejects_semantically_invalid_values() {
        let mut settings = EngineSettings::default();
        settings.recovery.retry_flow_rate_scale = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = EngineSettings::default();
        settings.hardware.move_timeout = Duration::ZERO;
        assert!(settings.validate().is_err());

        let mut settings = EngineSettings::default();
        settings.max_queued_commands = 0;
        assert!(settings.validate().is_err());
    }
}
