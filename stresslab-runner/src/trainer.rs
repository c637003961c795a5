//! PD model training stage.
//!
//! The training panel crosses every borrower with ONE macro row, the latest
//! baseline quarter, while scoring replays a whole scenario horizon. Labels
//! therefore carry no time variation in the macro drivers. The macro columns
//! are constant in the training design, the fit gives them a coefficient of
//! exactly 0, and every scenario scores the same PD per loan: a stress run on
//! a model from this stage reports identical severe and baseline losses.

use crate::config::TrainingConfig;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use stresslab_core::domain::{Borrower, MacroPanel};
use stresslab_core::features::{build_panel, FeatureSchema, SchemaError};
use stresslab_core::fingerprint::dataset_hash;
use stresslab_core::model::{
    balanced_class_weights, fit_logistic, roc_auc, stratified_split, synthesize_defaults,
    ModelArtifact, ModelError, PdScorer, TrainingMetrics,
};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("training panel is empty (no borrowers)")]
    EmptyPanel,

    #[error("macro panel has no baseline observations")]
    MissingBaseline,

    #[error("synthetic labels hold a single class ({positives} defaults in {rows} rows)")]
    SingleClass { positives: usize, rows: usize },

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

/// Label, split, fit and evaluate a logistic PD model.
pub fn train_pd_model(
    borrowers: &[Borrower],
    macro_panel: &MacroPanel,
    cfg: &TrainingConfig,
) -> Result<ModelArtifact, TrainError> {
    if borrowers.is_empty() {
        return Err(TrainError::EmptyPanel);
    }
    let snapshot = [macro_panel
        .latest_baseline()
        .ok_or(TrainError::MissingBaseline)?
        .clone()];

    let panel = build_panel(borrowers, &snapshot);
    let mut label_rng = StdRng::seed_from_u64(cfg.label.seed);
    let labels = synthesize_defaults(&cfg.label, &panel, borrowers, &snapshot, &mut label_rng);
    let positives = labels.iter().filter(|&&y| y).count();
    if positives == 0 || positives == labels.len() {
        return Err(TrainError::SingleClass {
            positives,
            rows: labels.len(),
        });
    }

    let schema = FeatureSchema::from_panel(&panel)?;
    let x = schema.reconcile(&panel)?;
    info!(
        rows = x.n_rows(),
        features = x.n_cols(),
        default_rate = positives as f64 / labels.len() as f64,
        snapshot = %snapshot[0].date,
        "built training panel"
    );

    let mut split_rng = StdRng::seed_from_u64(cfg.split_seed);
    let split = stratified_split(&labels, cfg.test_fraction, &mut split_rng);
    let pick = |rows: &[usize]| rows.iter().map(|&i| labels[i]).collect::<Vec<bool>>();
    let y_train = pick(&split.train);
    let y_test = pick(&split.test);
    let x_train = x.select_rows(&split.train);
    let x_test = x.select_rows(&split.test);

    let weights = balanced_class_weights(&y_train);
    let (model, report) = fit_logistic(schema, &x_train, &y_train, &weights, &cfg.logistic)?;
    if !report.converged {
        warn!(
            iterations = report.iterations,
            objective = report.objective,
            "logistic fit hit max_iter before converging"
        );
    }

    let auc_test = if x_test.n_rows() == 0 {
        None
    } else {
        roc_auc(&model.predict_pd(&x_test)?, &y_test)
    };
    info!(
        auc_test = auc_test.unwrap_or(f64::NAN),
        iterations = report.iterations,
        "fitted PD model"
    );

    let metrics = TrainingMetrics {
        auc_test,
        n_train: split.train.len(),
        n_test: split.test.len(),
        iterations: report.iterations,
        converged: report.converged,
    };
    Ok(ModelArtifact::new(
        model,
        metrics,
        dataset_hash(borrowers, &snapshot),
        Utc::now().naive_utc(),
    ))
}
