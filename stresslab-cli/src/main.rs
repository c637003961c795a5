//! StressLab CLI: one command per pipeline stage.
//!
//! Commands:
//! - `generate`: draw a synthetic loan book and write it as Parquet
//! - `load-macro`: fetch FRED history, project both scenarios, write Parquet
//! - `train`: fit the logistic PD model and save the JSON artifact
//! - `stress`: project the book through the scenarios and export results

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use stresslab_core::data::FredProvider;
use stresslab_core::domain::StressProjection;
use stresslab_runner::{
    render_table, run_generate, run_load_macro, run_stress, run_train, save_projection,
    ScenarioSelection, StressConfig, StressInputs,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "stresslab",
    about = "StressLab CLI: retail credit stress testing"
)]
struct Cli {
    /// Pipeline configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw a synthetic borrower book.
    Generate {
        /// Number of loans.
        #[arg(long, alias = "n_loans", default_value_t = 100_000)]
        n_loans: usize,

        /// Output Parquet file.
        #[arg(long, default_value = "data/borrowers.parquet")]
        out: PathBuf,

        /// RNG seed. Overrides `generator.seed` from the config.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Fetch macro history from FRED and build the scenario panel.
    LoadMacro {
        /// Output Parquet file.
        #[arg(long, default_value = "data/macro.parquet")]
        out: PathBuf,
    },
    /// Fit the PD model on the latest baseline quarter.
    Train {
        #[arg(long, default_value = "data/borrowers.parquet")]
        borrowers: PathBuf,

        #[arg(long = "macro", default_value = "data/macro.parquet")]
        macro_panel: PathBuf,

        /// Model artifact output (JSON).
        #[arg(long, default_value = "models/pd_logreg.json")]
        model_out: PathBuf,
    },
    /// Project the book through the macro scenarios.
    Stress {
        #[arg(long, default_value = "data/borrowers.parquet")]
        borrowers: PathBuf,

        #[arg(long = "macro", default_value = "data/macro.parquet")]
        macro_panel: PathBuf,

        #[arg(long, default_value = "models/pd_logreg.json")]
        model: PathBuf,

        /// Scenario name, or `all` for severely adverse then baseline.
        #[arg(long, default_value = "all")]
        scenario: String,

        /// Directory for CSV and Parquet results.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate { n_loans, out, seed } => cmd_generate(&config, n_loans, seed, &out),
        Commands::LoadMacro { out } => cmd_load_macro(&config, &out),
        Commands::Train {
            borrowers,
            macro_panel,
            model_out,
        } => cmd_train(&config, &borrowers, &macro_panel, &model_out),
        Commands::Stress {
            borrowers,
            macro_panel,
            model,
            scenario,
            output_dir,
        } => {
            let inputs = StressInputs {
                borrowers,
                macro_panel,
                model,
            };
            cmd_stress(&config, &inputs, &scenario, &output_dir)
        }
    }
}

/// Logs go to stderr so stdout carries only the stage summaries.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<StressConfig> {
    match path {
        Some(p) => {
            tracing::debug!(path = %p.display(), "loading config");
            StressConfig::from_file(p)
                .with_context(|| format!("failed to load config {}", p.display()))
        }
        None => Ok(StressConfig::default()),
    }
}

fn cmd_generate(config: &StressConfig, n_loans: usize, seed: Option<u64>, out: &Path) -> Result<()> {
    let book = run_generate(n_loans, seed, config, out)?;
    println!("✓ saved {} loans → {}", book.len(), out.display());
    Ok(())
}

fn cmd_load_macro(config: &StressConfig, out: &Path) -> Result<()> {
    let provider = FredProvider::new(&config.macro_data.fred).context("failed to set up FRED client")?;
    let panel = run_load_macro(&provider, config, out)?;
    println!(
        "✓ saved macro history + projections ({} rows) → {}",
        panel.len(),
        out.display()
    );
    Ok(())
}

fn cmd_train(config: &StressConfig, borrowers: &Path, macro_panel: &Path, model_out: &Path) -> Result<()> {
    let artifact = run_train(borrowers, macro_panel, model_out, config)?;
    match artifact.metrics.auc_test {
        Some(auc) => println!("AUC test: {auc:.3}"),
        None => println!("AUC test: undefined (single-class test split)"),
    }
    println!("✓ model saved → {}", model_out.display());
    Ok(())
}

fn cmd_stress(config: &StressConfig, inputs: &StressInputs, scenario: &str, output_dir: &Path) -> Result<()> {
    let selection = ScenarioSelection::parse(scenario);
    let projections = run_stress(inputs, &selection, config)?;
    for projection in &projections {
        let outputs = save_projection(projection, output_dir)?;
        print_projection(projection);
        println!("Results saved to: {}", outputs.csv.display());
        println!();
    }
    Ok(())
}

fn print_projection(projection: &StressProjection) {
    println!("{}:", scenario_title(projection));
    print!("{}", render_table(projection));
    println!(
        "Cumulative EL: {:.4} mn   Min CET1: {:.2}%",
        projection.cumulative_loss_mn(),
        projection.min_cet1_ratio().unwrap_or(f64::NAN) * 100.0
    );
}

fn scenario_title(projection: &StressProjection) -> String {
    let mut title = String::new();
    for (i, word) in projection.scenario.as_str().split('_').enumerate() {
        if i > 0 {
            title.push('-');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            title.extend(first.to_uppercase());
            title.push_str(chars.as_str());
        }
    }
    title
}
