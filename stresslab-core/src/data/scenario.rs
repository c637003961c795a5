//! Baseline and severely-adverse scenario projection.
//!
//! Both scenarios share the full quarterly history and append `horizon`
//! projected quarters. The baseline carries the last observed quarter
//! forward unchanged. The severely-adverse path overwrites unemployment with
//! absolute levels, and GDP and the equity index with percent changes
//! compounded quarter over quarter from the last historical level.

use super::provider::{DataError, MacroProvider};
use super::resample::{next_quarter_end, quarterly_history, QuarterlyHistory};
use crate::domain::{MacroPanel, MacroRow, Scenario};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Stylised stress paths (Fed 2025 severely adverse).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub horizon: usize,
    /// Unemployment rate levels, one per projected quarter.
    pub unemployment_path: Vec<f64>,
    /// Real GDP percent change per quarter.
    pub gdp_pct_path: Vec<f64>,
    /// Equity index percent change per quarter.
    pub equity_pct_path: Vec<f64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            horizon: 9,
            unemployment_path: vec![4.5, 5.3, 6.5, 7.6, 8.4, 9.1, 9.7, 10.0, 10.0],
            gdp_pct_path: vec![-1.5, -3.4, -2.8, -1.2, -0.5, 0.3, 1.0, 1.7, 2.2],
            equity_pct_path: vec![0.0, -10.0, -18.0, -27.0, -33.0, -36.0, -30.0, -25.0, -20.0],
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<(), DataError> {
        if self.horizon == 0 {
            return Err(DataError::ValidationError("scenario horizon must be positive".into()));
        }
        let paths = [
            ("unemployment_path", self.unemployment_path.len()),
            ("gdp_pct_path", self.gdp_pct_path.len()),
            ("equity_pct_path", self.equity_pct_path.len()),
        ];
        for (name, len) in paths {
            if len != self.horizon {
                return Err(DataError::ValidationError(format!(
                    "{name} has {len} quarters, horizon is {}",
                    self.horizon
                )));
            }
        }
        Ok(())
    }
}

/// Compound a percent-change path from a starting level.
pub fn pct_to_level(last_level: f64, pct_path: &[f64]) -> Vec<f64> {
    let mut level = last_level;
    pct_path
        .iter()
        .map(|pct| {
            level *= 1.0 + pct / 100.0;
            level
        })
        .collect()
}

/// Build both scenarios from the quarterly history.
pub fn build_scenarios(
    history: &QuarterlyHistory,
    cfg: &ScenarioConfig,
) -> Result<MacroPanel, DataError> {
    cfg.validate()?;
    let last = history
        .last()
        .ok_or_else(|| DataError::ValidationError("macro history is empty".into()))?;

    let mut proj_dates: Vec<NaiveDate> = Vec::with_capacity(cfg.horizon);
    let mut q = last.date;
    for _ in 0..cfg.horizon {
        q = next_quarter_end(q);
        proj_dates.push(q);
    }

    let flat: Vec<MacroRow> = proj_dates
        .iter()
        .map(|&date| MacroRow { date, ..last.clone() })
        .collect();

    let gdp = pct_to_level(last.gdp_real, &cfg.gdp_pct_path);
    let equity = pct_to_level(last.nasdaq, &cfg.equity_pct_path);
    let severe: Vec<MacroRow> = flat
        .iter()
        .enumerate()
        .map(|(i, row)| MacroRow {
            unemployment_rate: cfg.unemployment_path[i],
            gdp_real: gdp[i],
            nasdaq: equity[i],
            ..row.clone()
        })
        .collect();

    let mut baseline = history.rows.clone();
    baseline.extend(flat);
    let mut adverse = history.rows.clone();
    adverse.extend(severe);

    let mut panel = MacroPanel::new();
    panel.insert(Scenario::Baseline, baseline);
    panel.insert(Scenario::SeverelyAdverse, adverse);
    Ok(panel)
}

/// Fetch history and project both scenarios.
pub fn load_macro_panel(
    provider: &dyn MacroProvider,
    start: NaiveDate,
    cfg: &ScenarioConfig,
) -> Result<MacroPanel, DataError> {
    let history = quarterly_history(provider, start)?;
    let panel = build_scenarios(&history, cfg)?;
    info!(
        history_quarters = history.rows.len(),
        horizon = cfg.horizon,
        "built macro scenarios"
    );
    Ok(panel)
}
