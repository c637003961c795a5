//! StressLab Runner: stage orchestration, configuration, training, export.
//!
//! This crate builds on `stresslab-core` to provide:
//! - TOML pipeline configuration with validated defaults
//! - The PD training stage (labels, split, fit, held-out AUC)
//! - Stage entry points reading and writing the pipeline's files
//! - CSV, JSON and Parquet export of stress projections

pub mod config;
pub mod export;
pub mod runner;
pub mod trainer;

pub use config::{ConfigError, MacroDataConfig, StressConfig, TrainingConfig};
pub use export::{
    export_json, export_loan_losses_csv, export_stress_csv, render_table, save_projection,
    StressOutputs,
};
pub use runner::{
    project, run_generate, run_load_macro, run_stress, run_train, RunError, ScenarioSelection,
    StressInputs,
};
pub use trainer::{train_pd_model, TrainError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<StressConfig>();
        assert_sync::<StressConfig>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
