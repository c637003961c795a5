//! Synthetic default label.
//!
//! p = (0.01 + 0.25·[fico < 620] + 0.15·[dti > 0.4]) × (1 + (u − 4) / 6)
//! where u is the unemployment rate of the row's macro quarter.

use crate::domain::{Borrower, MacroRow};
use crate::features::FeaturePanel;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Seed of the Bernoulli draws.
    #[serde(rename = "label_seed")]
    pub seed: u64,
    pub base_pd: f64,
    pub subprime_fico: i64,
    pub subprime_add: f64,
    pub high_dti: f64,
    pub high_dti_add: f64,
    pub unemployment_anchor: f64,
    pub unemployment_scale: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            base_pd: 0.01,
            subprime_fico: 620,
            subprime_add: 0.25,
            high_dti: 0.4,
            high_dti_add: 0.15,
            unemployment_anchor: 4.0,
            unemployment_scale: 6.0,
        }
    }
}

/// Default probability of one borrower under one macro quarter, clamped to [0, 1].
pub fn default_probability(cfg: &LabelConfig, borrower: &Borrower, quarter: &MacroRow) -> f64 {
    let mut base = cfg.base_pd;
    if borrower.fico < cfg.subprime_fico {
        base += cfg.subprime_add;
    }
    if borrower.dti > cfg.high_dti {
        base += cfg.high_dti_add;
    }
    let macro_factor = (quarter.unemployment_rate - cfg.unemployment_anchor) / cfg.unemployment_scale;
    (base * (1.0 + macro_factor)).clamp(0.0, 1.0)
}

/// One Bernoulli draw per panel row, in panel order.
pub fn synthesize_defaults<R: Rng + ?Sized>(
    cfg: &LabelConfig,
    panel: &FeaturePanel,
    borrowers: &[Borrower],
    macro_slice: &[MacroRow],
    rng: &mut R,
) -> Vec<bool> {
    panel
        .keys()
        .iter()
        .map(|k| {
            let p = default_probability(cfg, &borrowers[k.borrower], &macro_slice[k.quarter]);
            rng.gen::<f64>() < p
        })
        .collect()
}
