//! End-to-end projections through the public engine API.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use stresslab_core::data::{build_scenarios, QuarterlyHistory, ScenarioConfig};
use stresslab_core::domain::{Borrower, MacroPanel, MacroRow, Product, Scenario};
use stresslab_core::engine::{EngineConfig, StressEngine};
use stresslab_core::features::{build_panel, FeatureSchema};
use stresslab_core::generator::{generate_borrowers, GeneratorConfig};
use stresslab_core::model::{
    balanced_class_weights, fit_logistic, synthesize_defaults, ConstantPd, LabelConfig,
    LogisticConfig, LogisticModel,
};

fn history() -> QuarterlyHistory {
    let mut date = NaiveDate::from_ymd_opt(2021, 3, 31).unwrap();
    let mut rows = Vec::new();
    for q in 0..12 {
        rows.push(MacroRow {
            date,
            unemployment_rate: 4.0 + 0.1 * q as f64,
            gdp_real: 21_000.0 + 50.0 * q as f64,
            cpi: 280.0 + q as f64,
            nasdaq: 13_000.0 + 200.0 * q as f64,
        });
        date = stresslab_core::data::resample::next_quarter_end(date);
    }
    QuarterlyHistory { rows }
}

fn macro_panel() -> MacroPanel {
    build_scenarios(&history(), &ScenarioConfig::default()).unwrap()
}

fn card_book() -> Vec<Borrower> {
    vec![Borrower {
        loan_id: 0,
        product: Product::Card,
        age: 33,
        annual_income: 45_000.0,
        fico: 600,
        dti: 0.5,
        balance: 1_000.0,
        limit: Some(2_000.0),
        lgd_prior: 0.9,
    }]
}

/// Schema of a model trained on a book that held every product.
fn mixed_book_schema() -> FeatureSchema {
    let mut rng = StdRng::seed_from_u64(3);
    let book = generate_borrowers(300, &GeneratorConfig::default(), &mut rng).unwrap();
    let snapshot = [history().rows[11].clone()];
    FeatureSchema::from_panel(&build_panel(&book, &snapshot)).unwrap()
}

#[test]
fn one_card_loan_under_logistic_scorer() {
    // all-zero coefficients: PD is the intercept's sigmoid everywhere
    let schema = mixed_book_schema();
    let p = schema.len();
    let model = LogisticModel::new(schema, (0.1f64 / 0.9).ln(), vec![0.0; p]).unwrap();

    let book = card_book();
    let panel = macro_panel();
    let engine = StressEngine::new(&book, &panel, &model, EngineConfig::default()).unwrap();

    for scenario in ["severely_adverse", "baseline"] {
        let out = engine.run(scenario).unwrap();
        assert_eq!(out.rows.len(), 9);
        for loss in &out.loan_losses {
            assert_relative_eq!(loss.pd, 0.1, epsilon = 1e-12);
            assert_relative_eq!(loss.expected_loss, 99.0, epsilon = 1e-9);
        }
        let rwa = 1_100.0 * 0.75 / 1e6;
        assert_relative_eq!(out.rows[0].capital_mn, 0.12 * rwa, epsilon = 1e-15);
        for q in 1..9 {
            assert_relative_eq!(
                out.rows[q].capital_mn,
                out.rows[q - 1].capital_mn - out.rows[q].expected_loss_mn,
                epsilon = 1e-15
            );
            assert_relative_eq!(
                out.rows[q].cet1_ratio,
                out.rows[q].capital_mn / out.rows[q].rwa_mn,
                epsilon = 1e-12
            );
        }
    }
}

#[test]
fn projection_covers_the_scenario_tail() {
    let book = card_book();
    let panel = macro_panel();
    let scorer = ConstantPd {
        pd: 0.1,
        schema: mixed_book_schema(),
    };
    let engine = StressEngine::new(&book, &panel, &scorer, EngineConfig::default()).unwrap();
    let out = engine.run("severely_adverse").unwrap();

    let projected = &panel.rows(Scenario::SeverelyAdverse).unwrap()[12..];
    let dates: Vec<NaiveDate> = out.rows.iter().map(|r| r.date).collect();
    let expected: Vec<NaiveDate> = projected.iter().map(|r| r.date).collect();
    assert_eq!(dates, expected);
}

#[test]
fn trained_model_scores_severe_above_baseline() {
    let mut rng = StdRng::seed_from_u64(11);
    let book = generate_borrowers(2_000, &GeneratorConfig::default(), &mut rng).unwrap();

    // label across a spread of unemployment rates so the macro effect is learnable
    let snapshots: Vec<MacroRow> = [3.5, 6.0, 9.0]
        .iter()
        .map(|&u| MacroRow {
            unemployment_rate: u,
            ..history().rows[11].clone()
        })
        .collect();
    let panel = build_panel(&book, &snapshots);
    let labels = synthesize_defaults(
        &LabelConfig::default(),
        &panel,
        &book,
        &snapshots,
        &mut StdRng::seed_from_u64(42),
    );
    let schema = FeatureSchema::from_panel(&panel).unwrap();
    let x = schema.reconcile(&panel).unwrap();
    let weights = balanced_class_weights(&labels);
    let (model, report) =
        fit_logistic(schema, &x, &labels, &weights, &LogisticConfig::default()).unwrap();
    assert!(report.converged);

    let macro_panel = macro_panel();
    let engine = StressEngine::new(&book[..200], &macro_panel, &model, EngineConfig::default()).unwrap();
    let severe = engine.run("severely_adverse").unwrap();
    let baseline = engine.run("baseline").unwrap();
    assert!(severe.cumulative_loss_mn() > baseline.cumulative_loss_mn());
    assert!(severe.min_cet1_ratio().unwrap() < baseline.min_cet1_ratio().unwrap());
}
