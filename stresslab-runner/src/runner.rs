//! Stage entry points: generate, load-macro, train, stress.
//!
//! Each stage reads its inputs from disk, runs one core computation and
//! writes its output atomically. Stages share nothing but files and the
//! explicit [`StressConfig`].

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use stresslab_core::data::{
    load_macro_panel, read_borrowers, read_macro_panel, write_borrowers, write_macro_panel,
    DataError, MacroProvider,
};
use stresslab_core::domain::{Borrower, MacroPanel, Scenario, StressProjection};
use stresslab_core::engine::{EngineError, StressEngine};
use stresslab_core::generator::{generate_borrowers, GeneratorError};
use stresslab_core::model::{ModelArtifact, ModelError};
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, StressConfig};
use crate::trainer::{train_pd_model, TrainError};

/// Errors from the stage runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("generator error: {0}")]
    Generator(#[from] GeneratorError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("training error: {0}")]
    Train(#[from] TrainError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Which scenarios a stress run projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioSelection {
    /// Severely adverse, then baseline.
    All,
    One(String),
}

impl ScenarioSelection {
    pub fn parse(name: &str) -> Self {
        if name.eq_ignore_ascii_case("all") {
            ScenarioSelection::All
        } else {
            ScenarioSelection::One(name.to_string())
        }
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            ScenarioSelection::All => [Scenario::SeverelyAdverse, Scenario::Baseline]
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            ScenarioSelection::One(name) => vec![name.clone()],
        }
    }
}

/// Input artifacts of the stress stage.
#[derive(Debug, Clone)]
pub struct StressInputs {
    pub borrowers: PathBuf,
    pub macro_panel: PathBuf,
    pub model: PathBuf,
}

impl Default for StressInputs {
    fn default() -> Self {
        Self {
            borrowers: PathBuf::from("data/borrowers.parquet"),
            macro_panel: PathBuf::from("data/macro.parquet"),
            model: PathBuf::from("models/pd_logreg.json"),
        }
    }
}

/// Draw a book and write it to `out`. A `seed` overrides the configured one.
pub fn run_generate(
    n_loans: usize,
    seed: Option<u64>,
    config: &StressConfig,
    out: &Path,
) -> Result<Vec<Borrower>, RunError> {
    let seed = seed.or(config.generator.seed);
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let book = generate_borrowers(n_loans, &config.generator, &mut rng)?;
    write_borrowers(out, &book)?;
    info!(n_loans, ?seed, path = %out.display(), "wrote borrower book");
    Ok(book)
}

/// Fetch macro history through `provider`, project both scenarios, write `out`.
pub fn run_load_macro(
    provider: &dyn MacroProvider,
    config: &StressConfig,
    out: &Path,
) -> Result<MacroPanel, RunError> {
    let panel = load_macro_panel(provider, config.macro_data.start, &config.scenario)?;
    write_macro_panel(out, &panel)?;
    info!(rows = panel.len(), path = %out.display(), "wrote macro panel");
    Ok(panel)
}

/// Train on the stored book and macro panel, save the artifact to `model_out`.
pub fn run_train(
    borrowers: &Path,
    macro_panel: &Path,
    model_out: &Path,
    config: &StressConfig,
) -> Result<ModelArtifact, RunError> {
    let book = read_borrowers(borrowers)?;
    let panel = read_macro_panel(macro_panel)?;
    let artifact = train_pd_model(&book, &panel, &config.training)?;
    artifact.save(model_out)?;
    info!(path = %model_out.display(), "saved model artifact");
    Ok(artifact)
}

/// Project the stored book through the selected scenarios, in selection order.
pub fn run_stress(
    inputs: &StressInputs,
    selection: &ScenarioSelection,
    config: &StressConfig,
) -> Result<Vec<StressProjection>, RunError> {
    let book = read_borrowers(&inputs.borrowers)?;
    let panel = read_macro_panel(&inputs.macro_panel)?;
    let artifact = ModelArtifact::load(&inputs.model)?;
    project(&book, &panel, &artifact, selection, config)
}

/// In-memory half of [`run_stress`].
pub fn project(
    book: &[Borrower],
    panel: &MacroPanel,
    artifact: &ModelArtifact,
    selection: &ScenarioSelection,
    config: &StressConfig,
) -> Result<Vec<StressProjection>, RunError> {
    let engine = StressEngine::new(book, panel, &artifact.model, config.engine.clone())?;
    selection
        .names()
        .iter()
        .map(|name| engine.run(name).map_err(RunError::from))
        .collect()
}
