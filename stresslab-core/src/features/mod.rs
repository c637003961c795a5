//! Shared feature engineering and the declared model input schema
//!
//! Training and scoring both go through [`build_panel`] and then reconcile the
//! panel against a [`FeatureSchema`]; neither side engineers features on its own.

pub mod panel;
pub mod schema;

pub use panel::{build_panel, equity_log_returns, FeaturePanel, PanelKey};
pub use schema::{DesignMatrix, FeatureColumn, FeatureKind, FeatureSchema, FeatureSpec, SchemaError};
