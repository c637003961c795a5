//! Synthetic retail-loan book.
//!
//! Every attribute is drawn from a fixed parametric prior held in
//! [`GeneratorConfig`]. The generator is a pure function of the RNG it is
//! handed; callers that want reproducible books pass a seeded `StdRng`.

use crate::domain::{Borrower, LoanId, Product};
use rand::Rng;
use rand_distr::{Beta, Distribution, LogNormal, Triangular, Uniform, WeightedIndex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("loan count must be positive, got {0}")]
    InvalidCount(usize),

    #[error("invalid prior: {0}")]
    InvalidPrior(String),
}

/// `(min, max)` bounds of a uniform draw.
pub type Range = (f64, f64);

/// Per-product values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ByProduct<T> {
    pub mortgage: T,
    pub auto: T,
    pub card: T,
}

impl<T: Copy> ByProduct<T> {
    pub fn get(&self, product: Product) -> T {
        match product {
            Product::Mortgage => self.mortgage,
            Product::Auto => self.auto,
            Product::Card => self.card,
        }
    }
}

/// Sampling priors for the borrower generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Seed for reproducible books. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    pub product_weights: ByProduct<f64>,
    /// Triangular `(min, max, mode)`.
    pub age: (f64, f64, f64),
    /// `(mu, sigma)` of log-income.
    pub income_log_normal: (f64, f64),
    pub income_cap: f64,
    /// FICO = `fico_floor + fico_span * Beta(alpha, beta)`.
    pub fico_beta: (f64, f64),
    pub fico_floor: f64,
    pub fico_span: f64,
    /// PERT `(min, max, mode)`.
    pub dti_pert: (f64, f64, f64),
    pub pert_lambda: f64,
    pub balance: ByProduct<Range>,
    /// Card limit = balance × U(min, max).
    pub card_limit_factor: Range,
    pub card_limit_cap: f64,
    pub lgd_prior: ByProduct<f64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            product_weights: ByProduct {
                mortgage: 0.55,
                auto: 0.25,
                card: 0.20,
            },
            age: (21.0, 75.0, 40.0),
            income_log_normal: (10.5, 0.6),
            income_cap: 350_000.0,
            fico_beta: (2.5, 7.0),
            fico_floor: 500.0,
            fico_span: 350.0,
            dti_pert: (0.05, 0.45, 0.18),
            pert_lambda: 4.0,
            balance: ByProduct {
                mortgage: (80_000.0, 550_000.0),
                auto: (6_000.0, 50_000.0),
                card: (500.0, 15_000.0),
            },
            card_limit_factor: (1.2, 2.5),
            card_limit_cap: 25_000.0,
            lgd_prior: ByProduct {
                mortgage: 0.35,
                auto: 0.65,
                card: 0.90,
            },
        }
    }
}

impl GeneratorConfig {
    /// Reject priors the distributions cannot be built from.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        let ranges = [
            ("mortgage balance", self.balance.mortgage),
            ("auto balance", self.balance.auto),
            ("card balance", self.balance.card),
            ("card limit factor", self.card_limit_factor),
        ];
        for (name, (lo, hi)) in ranges {
            if !(lo < hi) || lo < 0.0 {
                return Err(GeneratorError::InvalidPrior(format!(
                    "{name} range [{lo}, {hi}) must be non-negative and non-empty"
                )));
            }
        }
        let (lo, hi, mode) = self.dti_pert;
        if !(lo < hi && lo <= mode && mode <= hi) {
            return Err(GeneratorError::InvalidPrior(format!(
                "dti PERT requires min <= mode <= max, got ({lo}, {hi}, {mode})"
            )));
        }
        for p in Product::ALL {
            let lgd = self.lgd_prior.get(p);
            if !(0.0..=1.0).contains(&lgd) {
                return Err(GeneratorError::InvalidPrior(format!(
                    "lgd prior for {p} must be in [0, 1], got {lgd}"
                )));
            }
        }
        Ok(())
    }
}

/// The compiled set of distributions for one generation pass.
struct Priors {
    product: WeightedIndex<f64>,
    age: Triangular<f64>,
    income: LogNormal<f64>,
    fico: Beta<f64>,
    dti: Beta<f64>,
    balance: ByProduct<Uniform<f64>>,
    limit_factor: Uniform<f64>,
}

impl Priors {
    fn compile(cfg: &GeneratorConfig) -> Result<Self, GeneratorError> {
        cfg.validate()?;
        let invalid = |what: &str, e: &dyn std::fmt::Display| {
            GeneratorError::InvalidPrior(format!("{what}: {e}"))
        };

        let weights = [
            cfg.product_weights.get(PRODUCT_ORDER[0]),
            cfg.product_weights.get(PRODUCT_ORDER[1]),
            cfg.product_weights.get(PRODUCT_ORDER[2]),
        ];
        let product = WeightedIndex::new(weights).map_err(|e| invalid("product weights", &e))?;

        let (a_min, a_max, a_mode) = cfg.age;
        let age = Triangular::new(a_min, a_max, a_mode).map_err(|e| invalid("age", &e))?;

        let (mu, sigma) = cfg.income_log_normal;
        let income = LogNormal::new(mu, sigma).map_err(|e| invalid("income", &e))?;

        let (fa, fb) = cfg.fico_beta;
        let fico = Beta::new(fa, fb).map_err(|e| invalid("fico", &e))?;

        let (da, db) = pert_shape(cfg.dti_pert, cfg.pert_lambda);
        let dti = Beta::new(da, db).map_err(|e| invalid("dti", &e))?;

        let uniform = |(lo, hi): Range| Uniform::new(lo, hi);

        Ok(Self {
            product,
            age,
            income,
            fico,
            dti,
            balance: ByProduct {
                mortgage: uniform(cfg.balance.mortgage),
                auto: uniform(cfg.balance.auto),
                card: uniform(cfg.balance.card),
            },
            limit_factor: uniform(cfg.card_limit_factor),
        })
    }
}

/// Categorical order of `product_weights`.
const PRODUCT_ORDER: [Product; 3] = [Product::Mortgage, Product::Auto, Product::Card];

/// Beta shape parameters of a PERT distribution.
pub fn pert_shape((lo, hi, mode): (f64, f64, f64), lambda: f64) -> (f64, f64) {
    let span = hi - lo;
    (
        1.0 + lambda * (mode - lo) / span,
        1.0 + lambda * (hi - mode) / span,
    )
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Draw `n_loans` borrowers from the configured priors.
pub fn generate_borrowers<R: Rng + ?Sized>(
    n_loans: usize,
    cfg: &GeneratorConfig,
    rng: &mut R,
) -> Result<Vec<Borrower>, GeneratorError> {
    if n_loans == 0 {
        return Err(GeneratorError::InvalidCount(n_loans));
    }
    let priors = Priors::compile(cfg)?;
    let (dti_lo, dti_hi, _) = cfg.dti_pert;

    let mut book = Vec::with_capacity(n_loans);
    for loan_id in 0..n_loans as LoanId {
        let product = PRODUCT_ORDER[priors.product.sample(rng)];
        let age = priors.age.sample(rng).round() as i64;
        let annual_income = round_to(priors.income.sample(rng).min(cfg.income_cap), 2);
        let fico = (cfg.fico_floor + cfg.fico_span * priors.fico.sample(rng)).round() as i64;
        let dti = round_to(dti_lo + (dti_hi - dti_lo) * priors.dti.sample(rng), 3);
        let balance = round_to(priors.balance.get(product).sample(rng), 2);
        let limit = if product.is_revolving() {
            let raw = balance * priors.limit_factor.sample(rng);
            Some(round_to(raw.min(cfg.card_limit_cap), 2))
        } else {
            None
        };

        book.push(Borrower {
            loan_id,
            product,
            age,
            annual_income,
            fico,
            dti,
            balance,
            limit,
            lgd_prior: cfg.lgd_prior.get(product),
        });
    }

    debug!(n_loans, "generated borrower book");
    Ok(book)
}
