//! Versioned JSON model artifact.
//!
//! The artifact carries everything scoring needs: the ordered feature schema,
//! the fitted coefficients with their standardization, and enough provenance
//! (dataset hash, training metrics, timestamp) to tell two fits apart.

use super::logistic::LogisticModel;
use super::ModelError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current artifact layout. Artifacts with any other version are refused.
pub const ARTIFACT_FORMAT_VERSION: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Held-out ROC AUC; absent when the test split holds a single class.
    pub auc_test: Option<f64>,
    pub n_train: usize,
    pub n_test: usize,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u64,
    #[serde(flatten)]
    pub model: LogisticModel,
    pub metrics: TrainingMetrics,
    pub dataset_hash: String,
    pub trained_at: NaiveDateTime,
}

impl ModelArtifact {
    pub fn new(
        model: LogisticModel,
        metrics: TrainingMetrics,
        dataset_hash: String,
        trained_at: NaiveDateTime,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            model,
            metrics,
            dataset_hash,
            trained_at,
        }
    }

    /// Write pretty JSON atomically, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(io_err(&tmp_path))?;
        fs::rename(&tmp_path, path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            io_err(path)(source)
        })
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = fs::read_to_string(path).map_err(io_err(path))?;
        Self::from_json(&text)
    }

    /// Parse and validate an artifact.
    ///
    /// The version is checked before the body so an incompatible layout is
    /// reported as such rather than as a missing field.
    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        let found = value
            .get("format_version")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        if found != ARTIFACT_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        if value.get("feature_schema").map_or(true, serde_json::Value::is_null) {
            return Err(ModelError::MissingFeatureList);
        }

        let artifact: Self = serde_json::from_value(value)?;
        artifact.model.schema.validate()?;
        artifact.model.validate()?;
        Ok(artifact)
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ModelError {
    let path = path.to_path_buf();
    move |source| ModelError::Io { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureKind, FeatureSchema, FeatureSpec};
    use chrono::NaiveDate;
    use std::env;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("stresslab_artifact_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample() -> ModelArtifact {
        let schema = FeatureSchema::new(vec![
            FeatureSpec {
                name: "fico".into(),
                kind: FeatureKind::Continuous,
            },
            FeatureSpec {
                name: "product_card".into(),
                kind: FeatureKind::Indicator,
            },
        ])
        .unwrap();
        let model = LogisticModel::new(schema, -2.0, vec![-0.01, 0.4]).unwrap();
        ModelArtifact::new(
            model,
            TrainingMetrics {
                auc_test: Some(0.71),
                n_train: 75,
                n_test: 25,
                iterations: 7,
                converged: true,
            },
            "abc123".into(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn save_then_load_preserves_model() {
        let dir = temp_dir();
        let path = dir.join("models").join("pd_logreg.json");
        let artifact = sample();

        artifact.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded, artifact);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_is_written_under_feature_schema() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("feature_schema").is_some());
        assert_eq!(json["format_version"], 1);
    }

    #[test]
    fn rejects_unknown_version() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["format_version"] = 99.into();
        let err = ModelArtifact::from_json(&json.to_string()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnsupportedVersion { found: 99, expected: 1 }
        ));
    }

    #[test]
    fn missing_feature_list_is_reported() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json.as_object_mut().unwrap().remove("feature_schema");
        let err = ModelArtifact::from_json(&json.to_string()).unwrap_err();
        assert!(matches!(err, ModelError::MissingFeatureList));
    }

    #[test]
    fn coefficient_mismatch_is_reported() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["coefficients"] = serde_json::json!([1.0]);
        let err = ModelArtifact::from_json(&json.to_string()).unwrap_err();
        assert!(matches!(err, ModelError::FeatureCountMismatch { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ModelArtifact::load(Path::new("/nonexistent/stresslab/model.json")).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }
}
