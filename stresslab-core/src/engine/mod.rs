//! Stress engine: project a loan book through a macro scenario.
//!
//! One run walks a fixed horizon of quarters:
//!
//! 1. Slice the scenario's last `horizon` quarters
//! 2. Cross-join the book with the slice and engineer features
//! 3. Reconcile the panel against the scorer's expected schema and score PDs
//! 4. Loan-level EAD and expected loss, aggregated per quarter
//! 5. Capital roll-forward and CET1 ratio

pub mod capital;
pub mod config;
pub mod projector;

pub use capital::{roll_forward, CapitalPath};
pub use config::EngineConfig;
pub use projector::StressEngine;

use crate::domain::UnknownScenario;
use crate::features::SchemaError;
use crate::model::ModelError;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    UnknownScenario(#[from] UnknownScenario),

    #[error("scenario '{scenario}' has {available} quarters, horizon needs {horizon}")]
    InsufficientHorizon {
        scenario: String,
        available: usize,
        horizon: usize,
    },

    #[error("loan book is empty")]
    EmptyBook,

    #[error("risk-weighted assets are zero at {date}; CET1 ratio undefined")]
    ZeroRwa { date: NaiveDate },

    #[error("scorer returned {found} PDs for {expected} panel rows")]
    ScoreCount { expected: usize, found: usize },

    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}
