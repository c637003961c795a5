//! PD model: label synthesis, stratified split, logistic fit, AUC, artifact

pub mod artifact;
pub mod label;
pub mod logistic;
pub mod metrics;
pub mod split;

pub use artifact::{ModelArtifact, TrainingMetrics, ARTIFACT_FORMAT_VERSION};
pub use label::{default_probability, synthesize_defaults, LabelConfig};
pub use logistic::{fit_logistic, FitReport, LogisticConfig, LogisticModel};
pub use metrics::roc_auc;
pub use split::{balanced_class_weights, stratified_split, Split};

use crate::features::{DesignMatrix, FeatureSchema, SchemaError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact has no expected feature list")]
    MissingFeatureList,

    #[error("model has {features} features but {coefficients} coefficients")]
    FeatureCountMismatch { features: usize, coefficients: usize },

    #[error("design matrix columns {found:?} do not match model features {expected:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("unsupported model artifact version {found} (expected {expected})")]
    UnsupportedVersion { found: u64, expected: u64 },

    #[error("logistic fit failed: {0}")]
    FitFailed(String),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("model artifact JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that turns a design matrix into per-row default probabilities.
///
/// The stress engine only sees this trait, so scenario runs can be driven by
/// a fitted model or by a fixed PD.
pub trait PdScorer {
    /// Columns, in order, that `predict_pd` expects.
    fn expected_schema(&self) -> &FeatureSchema;

    /// Positive-class probability per design-matrix row.
    fn predict_pd(&self, x: &DesignMatrix) -> Result<Vec<f64>, ModelError>;
}

/// Scorer returning the same PD for every row.
#[derive(Debug, Clone)]
pub struct ConstantPd {
    pub pd: f64,
    pub schema: FeatureSchema,
}

impl PdScorer for ConstantPd {
    fn expected_schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict_pd(&self, x: &DesignMatrix) -> Result<Vec<f64>, ModelError> {
        check_columns(&self.schema, x)?;
        Ok(vec![self.pd; x.n_rows()])
    }
}

/// The design matrix must carry exactly the schema's columns, in order.
pub fn check_columns(schema: &FeatureSchema, x: &DesignMatrix) -> Result<(), ModelError> {
    let expected = schema.names();
    if expected.len() != x.columns.len() || expected.iter().zip(&x.columns).any(|(e, f)| *e != f.as_str()) {
        return Err(ModelError::ColumnMismatch {
            expected: expected.into_iter().map(String::from).collect(),
            found: x.columns.clone(),
        });
    }
    Ok(())
}
