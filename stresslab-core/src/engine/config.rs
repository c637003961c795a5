use super::EngineError;
use serde::{Deserialize, Serialize};

/// Regulatory constants of the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Retail risk weight applied to EAD.
    pub rwa_weight: f64,
    /// CET1 ratio the book starts the horizon with.
    pub start_cet1_ratio: f64,
    /// Card credit conversion factor on the drawn balance.
    pub card_ccf: f64,
    /// Divisor converting currency units to reported amounts (millions).
    pub scale: f64,
    /// Projected quarters.
    pub horizon: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rwa_weight: 0.75,
            start_cet1_ratio: 0.12,
            card_ccf: 1.1,
            scale: 1e6,
            horizon: 9,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.horizon == 0 {
            return Err(EngineError::InvalidConfig("horizon must be at least 1".into()));
        }
        for (name, value) in [
            ("rwa_weight", self.rwa_weight),
            ("card_ccf", self.card_ccf),
            ("scale", self.scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.start_cet1_ratio) {
            return Err(EngineError::InvalidConfig(format!(
                "start_cet1_ratio must be in [0, 1], got {}",
                self.start_cet1_ratio
            )));
        }
        Ok(())
    }
}
