//! Pipeline configuration loaded from TOML.
//!
//! Every section defaults, so an empty file (or no file) runs the stock
//! pipeline. Values are checked once, up front, by [`StressConfig::validate`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use stresslab_core::data::{FredConfig, ScenarioConfig};
use stresslab_core::engine::EngineConfig;
use stresslab_core::generator::GeneratorConfig;
use stresslab_core::model::{LabelConfig, LogisticConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub generator: GeneratorConfig,
    pub macro_data: MacroDataConfig,
    pub scenario: ScenarioConfig,
    pub training: TrainingConfig,
    pub engine: EngineConfig,
}

/// Where macro history comes from and how far back it goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroDataConfig {
    /// First observation date requested, `"YYYY-MM-DD"`.
    pub start: NaiveDate,
    #[serde(flatten)]
    pub fred: FredConfig,
}

impl Default for MacroDataConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
            fred: FredConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub split_seed: u64,
    /// Share of rows held out for the AUC, per class.
    pub test_fraction: f64,
    #[serde(flatten)]
    pub label: LabelConfig,
    #[serde(flatten)]
    pub logistic: LogisticConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            split_seed: 0,
            test_fraction: 0.25,
            label: LabelConfig::default(),
            logistic: LogisticConfig::default(),
        }
    }
}

impl StressConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.generator
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.scenario
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.engine
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.engine.horizon != self.scenario.horizon {
            return Err(ConfigError::Invalid(format!(
                "engine horizon {} differs from scenario horizon {}",
                self.engine.horizon, self.scenario.horizon
            )));
        }

        let t = &self.training;
        if !(t.test_fraction > 0.0 && t.test_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "training.test_fraction must be in (0, 1), got {}",
                t.test_fraction
            )));
        }
        if !(t.logistic.c > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "training.c must be positive, got {}",
                t.logistic.c
            )));
        }
        if t.logistic.max_iter == 0 {
            return Err(ConfigError::Invalid("training.max_iter must be at least 1".into()));
        }
        if self.macro_data.fred.timeout_secs == 0 {
            return Err(ConfigError::Invalid("macro_data.timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = StressConfig::from_toml("").unwrap();
        assert_eq!(cfg, StressConfig::default());
        assert_eq!(cfg.engine.horizon, 9);
        assert_eq!(cfg.training.label.seed, 42);
        assert_eq!(cfg.training.logistic.max_iter, 1000);
        assert_eq!(cfg.macro_data.fred.api_key_env, "FRED_API_KEY");
    }

    #[test]
    fn flat_training_keys() {
        let cfg = StressConfig::from_toml(
            r#"
            [training]
            label_seed = 7
            split_seed = 3
            test_fraction = 0.2
            c = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.training.label.seed, 7);
        assert_eq!(cfg.training.split_seed, 3);
        assert_eq!(cfg.training.logistic.c, 0.5);
        assert_eq!(cfg.training.logistic.max_iter, 1000);
    }

    #[test]
    fn macro_section_overrides() {
        let cfg = StressConfig::from_toml(
            r#"
            [macro_data]
            start = "2000-01-01"
            api_key = "abc"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.macro_data.start, NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        assert_eq!(cfg.macro_data.fred.api_key.as_deref(), Some("abc"));
        assert_eq!(cfg.macro_data.fred.timeout_secs, 5);
    }

    #[test]
    fn horizon_mismatch_rejected() {
        let err = StressConfig::from_toml(
            r#"
            [engine]
            horizon = 8
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn path_length_must_match_horizon() {
        let err = StressConfig::from_toml(
            r#"
            [scenario]
            unemployment_path = [5.0, 6.0]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_fraction_bounds() {
        let err = StressConfig::from_toml("[training]\ntest_fraction = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = StressConfig::from_toml("[engine\nhorizon = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = StressConfig::default();
        let text = cfg.to_toml().unwrap();
        assert_eq!(StressConfig::from_toml(&text).unwrap(), cfg);
    }
}
