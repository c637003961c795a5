//! Macro data provider trait and structured error types.
//!
//! The MacroProvider trait abstracts over macro sources (FRED, fixtures) so
//! the loader can be exercised without network access.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::MacroSeries;

/// A single raw observation as published by the source (any frequency).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("HTTP {status} fetching {series}")]
    HttpStatus { status: u16, series: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("no observations for series {series}")]
    EmptySeries { series: String },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Trait for macro data providers.
///
/// Implementations return observations sorted by date, missing values
/// already dropped.
pub trait MacroProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch all observations of `series` on or after `start`.
    fn fetch(&self, series: MacroSeries, start: NaiveDate) -> Result<Vec<Observation>, DataError>;
}

/// In-memory provider backed by fixed observation lists.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    series: HashMap<MacroSeries, Vec<Observation>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series: MacroSeries, observations: Vec<Observation>) -> Self {
        self.series.insert(series, observations);
        self
    }
}

impl MacroProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self, series: MacroSeries, start: NaiveDate) -> Result<Vec<Observation>, DataError> {
        let obs: Vec<Observation> = self
            .series
            .get(&series)
            .map(|v| v.iter().copied().filter(|o| o.date >= start).collect())
            .unwrap_or_default();
        if obs.is_empty() {
            return Err(DataError::EmptySeries {
                series: series.fred_code().to_string(),
            });
        }
        Ok(obs)
    }
}
