use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::adaptation::{AdaptationConfig, SessionAdapter};
use crate::error::CoachError;
use crate::history::BaselineWindow;
use crate::logging::LogConfig;
use crate::recovery::{RecoveryCalculator, RecoveryWeights};
use crate::training_plan::{PlanGenerator, PlanGeneratorConfig};

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Recovery score settings
    pub recovery: RecoveryConfig,

    /// Session adaptation rules
    pub adaptation: AdaptationConfig,

    /// Plan generation settings
    pub plan: PlanGeneratorConfig,

    /// Logging settings
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Recovery score settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Input weights, summing to 1
    pub weights: RecoveryWeights,

    /// Rolling HRV and resting HR baseline window
    pub baseline: BaselineWindow,
}

impl Default for CoachConfig {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            metadata: ConfigMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                created_at: now,
                updated_at: now,
            },
            recovery: RecoveryConfig::default(),
            adaptation: AdaptationConfig::default(),
            plan: PlanGeneratorConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration management implementation
impl CoachConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: CoachConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.as_ref().display()))?;

        debug!(path = %path.as_ref().display(), "Configuration loaded");
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".coachrs")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %config_path.display(), error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&mut self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to_file(config_path)
    }

    /// Check every section; the first problem wins
    pub fn validate(&self) -> std::result::Result<(), CoachError> {
        self.recovery.weights.validate()?;

        if self.recovery.baseline.days == 0
            || self.recovery.baseline.min_readings > self.recovery.baseline.days
        {
            return Err(CoachError::Configuration(format!(
                "baseline window needs at least one day and no more readings than days (days = {}, min_readings = {})",
                self.recovery.baseline.days, self.recovery.baseline.min_readings
            )));
        }

        let adaptation = &self.adaptation;
        if !adaptation.acwr_spike_threshold.is_finite() || adaptation.acwr_spike_threshold <= 0.0 {
            return Err(CoachError::Configuration(format!(
                "acwr_spike_threshold must be positive, got {}",
                adaptation.acwr_spike_threshold
            )));
        }
        let factor_ok = |f: rust_decimal::Decimal| f > rust_decimal::Decimal::ZERO && f <= rust_decimal::Decimal::ONE;
        if !factor_ok(adaptation.lighten_factor) || !factor_ok(adaptation.replace_duration_factor) {
            return Err(CoachError::Configuration(
                "lighten_factor and replace_duration_factor must be within (0, 1]".to_string(),
            ));
        }
        if adaptation.replace_max_minutes == 0 {
            return Err(CoachError::Configuration(
                "replace_max_minutes must be positive".to_string(),
            ));
        }

        self.plan.validate()
    }

    /// Recovery calculator using the configured weights
    pub fn recovery_calculator(&self) -> std::result::Result<RecoveryCalculator, CoachError> {
        RecoveryCalculator::with_weights(self.recovery.weights)
    }

    /// Adaptation engine using the configured rules and weights
    pub fn session_adapter(&self) -> std::result::Result<SessionAdapter, CoachError> {
        Ok(SessionAdapter::with_config(
            self.adaptation.clone(),
            self.recovery_calculator()?,
        ))
    }

    pub fn plan_generator(&self) -> std::result::Result<PlanGenerator, CoachError> {
        PlanGenerator::with_config(self.plan.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = CoachConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let deserialized: CoachConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.recovery, deserialized.recovery);
        assert_eq!(config.adaptation, deserialized.adaptation);
        assert_eq!(config.plan, deserialized.plan);
        assert_eq!(config.logging, deserialized.logging);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = CoachConfig::default();
        config.adaptation.acwr_spike_threshold = 1.4;
        config.logging.level = LogLevel::Debug;
        config.save_to_file(&config_path).unwrap();

        assert!(config_path.exists());

        let loaded = CoachConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.adaptation.acwr_spike_threshold, 1.4);
        assert_eq!(loaded.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_load_rejects_invalid_weights() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = CoachConfig::default();
        config.recovery.weights.sleep = 0.9;
        config.save_to_file(&config_path).unwrap();

        let err = CoachConfig::load_from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = CoachConfig::load_from_file("/nonexistent/coachrs.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/coachrs.toml"));
    }

    #[test]
    fn test_validate_sections() {
        assert!(CoachConfig::default().validate().is_ok());

        let mut config = CoachConfig::default();
        config.recovery.baseline.min_readings = 40;
        assert!(matches!(config.validate(), Err(CoachError::Configuration(_))));

        let mut config = CoachConfig::default();
        config.adaptation.lighten_factor = dec!(1.2);
        assert!(config.validate().is_err());

        let mut config = CoachConfig::default();
        config.plan.step_back_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builders_use_configured_values() {
        let mut config = CoachConfig::default();
        config.adaptation.replace_max_minutes = 30;
        let adapter = config.session_adapter().unwrap();
        assert_eq!(adapter.config().replace_max_minutes, 30);
        assert_eq!(config.recovery_calculator().unwrap().weights(), &RecoveryWeights::default());
        assert!(config.plan_generator().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        let path = CoachConfig::default_config_path();
        assert!(path.ends_with(".coachrs/config.toml"));
    }
}
