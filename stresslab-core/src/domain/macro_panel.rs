//! Macro panel: quarterly macro series indexed by (scenario, date).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The fixed set of macro series the model consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MacroSeries {
    UnemploymentRate,
    GdpReal,
    Cpi,
    Nasdaq,
}

impl MacroSeries {
    /// Column order of the macro panel.
    pub const ALL: [MacroSeries; 4] = [
        MacroSeries::UnemploymentRate,
        MacroSeries::GdpReal,
        MacroSeries::Cpi,
        MacroSeries::Nasdaq,
    ];

    /// Column name used in tables and feature panels.
    pub fn column(&self) -> &'static str {
        match self {
            MacroSeries::UnemploymentRate => "unemployment_rate",
            MacroSeries::GdpReal => "gdp_real",
            MacroSeries::Cpi => "cpi",
            MacroSeries::Nasdaq => "nasdaq",
        }
    }

    /// FRED series identifier.
    pub fn fred_code(&self) -> &'static str {
        match self {
            MacroSeries::UnemploymentRate => "UNRATE",
            MacroSeries::GdpReal => "GDPC1",
            MacroSeries::Cpi => "CPIAUCSL",
            MacroSeries::Nasdaq => "NASDAQCOM",
        }
    }
}

/// One quarter of macro observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroRow {
    pub date: NaiveDate,
    pub unemployment_rate: f64,
    pub gdp_real: f64,
    pub cpi: f64,
    pub nasdaq: f64,
}

impl MacroRow {
    pub fn get(&self, series: MacroSeries) -> f64 {
        match series {
            MacroSeries::UnemploymentRate => self.unemployment_rate,
            MacroSeries::GdpReal => self.gdp_real,
            MacroSeries::Cpi => self.cpi,
            MacroSeries::Nasdaq => self.nasdaq,
        }
    }

    pub fn set(&mut self, series: MacroSeries, value: f64) {
        match series {
            MacroSeries::UnemploymentRate => self.unemployment_rate = value,
            MacroSeries::GdpReal => self.gdp_real = value,
            MacroSeries::Cpi => self.cpi = value,
            MacroSeries::Nasdaq => self.nasdaq = value,
        }
    }
}

/// Macro scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Baseline,
    SeverelyAdverse,
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Scenario::Baseline, Scenario::SeverelyAdverse];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Baseline => "baseline",
            Scenario::SeverelyAdverse => "severely_adverse",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("scenario '{0}' not present in macro panel")]
pub struct UnknownScenario(pub String);

impl FromStr for Scenario {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline" => Ok(Scenario::Baseline),
            "severely_adverse" => Ok(Scenario::SeverelyAdverse),
            other => Err(UnknownScenario(other.to_string())),
        }
    }
}

/// Tidy macro panel: history plus projection, per scenario.
///
/// Rows within each scenario are sorted by date and contiguous by quarter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroPanel {
    pub scenarios: BTreeMap<Scenario, Vec<MacroRow>>,
}

impl MacroPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scenario: Scenario, rows: Vec<MacroRow>) {
        self.scenarios.insert(scenario, rows);
    }

    /// Rows for a scenario looked up by name.
    pub fn scenario(&self, name: &str) -> Result<&[MacroRow], UnknownScenario> {
        let scenario: Scenario = name.parse()?;
        self.rows(scenario)
            .ok_or_else(|| UnknownScenario(name.to_string()))
    }

    pub fn rows(&self, scenario: Scenario) -> Option<&[MacroRow]> {
        self.scenarios.get(&scenario).map(|v| v.as_slice())
    }

    /// The last baseline observation, the single snapshot used for training.
    pub fn latest_baseline(&self) -> Option<&MacroRow> {
        self.rows(Scenario::Baseline).and_then(|rows| rows.last())
    }

    /// Total number of rows across scenarios.
    pub fn len(&self) -> usize {
        self.scenarios.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
