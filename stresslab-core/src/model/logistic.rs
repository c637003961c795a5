//! L2-regularised binary logistic regression.
//!
//! Fitted by damped Newton iterations on standardized features. The objective
//! is `½‖w‖² + C · Σ sᵢ · logloss(yᵢ, ηᵢ)` with the intercept unpenalised and
//! `sᵢ` the per-row sample weight. Coefficients are stored in standardized
//! space together with the per-column mean and scale used to get there.
//!
//! A column whose spread is negligible next to its magnitude is treated as
//! constant: it is centred on its first value with scale 1 and enters the
//! fit as exact zeros, so its coefficient is exactly 0.

use super::{check_columns, ModelError, PdScorer};
use crate::features::{DesignMatrix, FeatureSchema};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ridge on the intercept's Hessian diagonal so the Newton system stays
/// positive definite when one class dominates.
const INTERCEPT_RIDGE: f64 = 1e-10;
/// A column is constant when `max - min` is at most this fraction of its magnitude.
const CONSTANT_SPREAD: f64 = 1e-9;
const MAX_LINE_SEARCH_STEPS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    /// Inverse regularisation strength.
    pub c: f64,
    pub max_iter: usize,
    /// Stop once the largest Newton step component falls below this.
    pub tolerance: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tolerance: 1e-8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    #[serde(rename = "feature_schema")]
    pub schema: FeatureSchema,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub feature_means: Vec<f64>,
    pub feature_scales: Vec<f64>,
}

impl LogisticModel {
    /// A model over raw (unstandardized) features.
    pub fn new(schema: FeatureSchema, intercept: f64, coefficients: Vec<f64>) -> Result<Self, ModelError> {
        let p = schema.len();
        let model = Self {
            schema,
            intercept,
            coefficients,
            feature_means: vec![0.0; p],
            feature_scales: vec![1.0; p],
        };
        model.validate()?;
        Ok(model)
    }

    /// Every per-feature vector must line up with the schema.
    pub fn validate(&self) -> Result<(), ModelError> {
        let features = self.schema.len();
        for len in [
            self.coefficients.len(),
            self.feature_means.len(),
            self.feature_scales.len(),
        ] {
            if len != features {
                return Err(ModelError::FeatureCountMismatch {
                    features,
                    coefficients: len,
                });
            }
        }
        Ok(())
    }

    fn linear_predictor(&self, x: &DesignMatrix) -> Vec<f64> {
        (0..x.n_rows())
            .map(|i| {
                let mut eta = self.intercept;
                for j in 0..self.coefficients.len() {
                    let z = (x.matrix[(i, j)] - self.feature_means[j]) / self.feature_scales[j];
                    eta += self.coefficients[j] * z;
                }
                eta
            })
            .collect()
    }
}

impl PdScorer for LogisticModel {
    fn expected_schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict_pd(&self, x: &DesignMatrix) -> Result<Vec<f64>, ModelError> {
        self.validate()?;
        check_columns(&self.schema, x)?;
        Ok(self.linear_predictor(x).into_iter().map(sigmoid).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub iterations: usize,
    pub converged: bool,
    /// Penalised objective at the returned coefficients.
    pub objective: f64,
}

/// Fit a logistic model to `x` (columns in `schema` order) and labels `y`.
pub fn fit_logistic(
    schema: FeatureSchema,
    x: &DesignMatrix,
    y: &[bool],
    weights: &[f64],
    cfg: &LogisticConfig,
) -> Result<(LogisticModel, FitReport), ModelError> {
    schema.validate()?;
    check_columns(&schema, x)?;

    let n = x.n_rows();
    let p = x.n_cols();
    if n == 0 {
        return Err(ModelError::FitFailed("no training rows".into()));
    }
    if y.len() != n || weights.len() != n {
        return Err(ModelError::FitFailed(format!(
            "{n} rows but {} labels and {} weights",
            y.len(),
            weights.len()
        )));
    }
    if !(cfg.c > 0.0) {
        return Err(ModelError::FitFailed(format!("C must be positive, got {}", cfg.c)));
    }

    let scaling = standardization(&x.matrix);
    let a = DMatrix::from_fn(n, p + 1, |i, j| {
        if j == 0 {
            1.0
        } else if scaling.constant[j - 1] {
            0.0
        } else {
            (x.matrix[(i, j - 1)] - scaling.means[j - 1]) / scaling.scales[j - 1]
        }
    });
    let target = DVector::from_iterator(n, y.iter().map(|&v| if v { 1.0 } else { 0.0 }));
    let s = DVector::from_column_slice(weights);

    let mut beta = DVector::<f64>::zeros(p + 1);
    let mut obj = objective(&a, &beta, &target, &s, cfg.c);
    let mut converged = false;
    let mut iterations = 0;

    while iterations < cfg.max_iter {
        iterations += 1;

        let eta = &a * &beta;
        let mu = eta.map(sigmoid);

        let residual = (&mu - &target).component_mul(&s) * cfg.c;
        let mut grad = a.tr_mul(&residual);
        for j in 1..=p {
            grad[j] += beta[j];
        }

        let mut aw = a.clone();
        for (i, mut row) in aw.row_iter_mut().enumerate() {
            let w = cfg.c * s[i] * mu[i] * (1.0 - mu[i]);
            row *= w.sqrt();
        }
        let mut hess = aw.tr_mul(&aw);
        hess[(0, 0)] += INTERCEPT_RIDGE;
        for j in 1..=p {
            hess[(j, j)] += 1.0;
        }

        let step = hess
            .cholesky()
            .ok_or_else(|| ModelError::FitFailed("Hessian is not positive definite".into()))?
            .solve(&grad);

        let mut t = 1.0;
        let mut next = &beta - &step * t;
        let mut next_obj = objective(&a, &next, &target, &s, cfg.c);
        let mut halvings = 0;
        while next_obj > obj && halvings < MAX_LINE_SEARCH_STEPS {
            t *= 0.5;
            next = &beta - &step * t;
            next_obj = objective(&a, &next, &target, &s, cfg.c);
            halvings += 1;
        }
        if !next_obj.is_finite() {
            return Err(ModelError::FitFailed(format!(
                "objective diverged at iteration {iterations}"
            )));
        }

        let max_step = (&step * t).amax();
        beta = next;
        obj = next_obj;
        debug!(iteration = iterations, objective = obj, max_step, "newton step");

        if max_step < cfg.tolerance {
            converged = true;
            break;
        }
    }

    let model = LogisticModel {
        schema,
        intercept: beta[0],
        coefficients: beta.iter().skip(1).copied().collect(),
        feature_means: scaling.means,
        feature_scales: scaling.scales,
    };
    model.validate()?;

    Ok((
        model,
        FitReport {
            iterations,
            converged,
            objective: obj,
        },
    ))
}

struct Standardization {
    means: Vec<f64>,
    scales: Vec<f64>,
    constant: Vec<bool>,
}

/// Column means and population standard deviations.
fn standardization(x: &DMatrix<f64>) -> Standardization {
    let n = x.nrows() as f64;
    let mut out = Standardization {
        means: Vec::with_capacity(x.ncols()),
        scales: Vec::with_capacity(x.ncols()),
        constant: Vec::with_capacity(x.ncols()),
    };
    for col in x.column_iter() {
        let (lo, hi) = col
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let magnitude = lo.abs().max(hi.abs()).max(1.0);
        if hi - lo <= CONSTANT_SPREAD * magnitude {
            out.means.push(col[0]);
            out.scales.push(1.0);
            out.constant.push(true);
            continue;
        }
        let mean = col.sum() / n;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        out.means.push(mean);
        out.scales.push(var.sqrt());
        out.constant.push(false);
    }
    out
}

fn objective(a: &DMatrix<f64>, beta: &DVector<f64>, y: &DVector<f64>, s: &DVector<f64>, c: f64) -> f64 {
    let eta = a * beta;
    let loss: f64 = eta
        .iter()
        .zip(y.iter())
        .zip(s.iter())
        .map(|((&e, &yi), &si)| si * (softplus(e) - yi * e))
        .sum();
    let penalty: f64 = beta.iter().skip(1).map(|b| b * b).sum::<f64>() * 0.5;
    penalty + c * loss
}

fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureKind, FeatureSpec};
    use crate::model::metrics::roc_auc;
    use approx::assert_relative_eq;

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(
            names
                .iter()
                .map(|n| FeatureSpec {
                    name: (*n).into(),
                    kind: FeatureKind::Continuous,
                })
                .collect(),
        )
        .unwrap()
    }

    fn design(names: &[&str], rows: &[Vec<f64>]) -> DesignMatrix {
        DesignMatrix {
            columns: names.iter().map(|n| n.to_string()).collect(),
            matrix: DMatrix::from_fn(rows.len(), names.len(), |i, j| rows[i][j]),
        }
    }

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(-800.0).is_finite());
    }

    #[test]
    fn separates_a_noisy_threshold() {
        // y = 1 when x > 5, with two flipped labels
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64 * 0.25, 1.0]).collect();
        let mut y: Vec<bool> = rows.iter().map(|r| r[0] > 5.0).collect();
        y[3] = true;
        y[35] = false;
        let x = design(&["x", "const"], &rows);
        let w = vec![1.0; 40];

        let (model, report) =
            fit_logistic(schema(&["x", "const"]), &x, &y, &w, &LogisticConfig::default()).unwrap();

        assert!(report.converged);
        assert!(model.coefficients[0] > 0.0);
        // constant column stays unscaled and contributes nothing after centering
        assert_relative_eq!(model.feature_scales[1], 1.0);

        let pd = model.predict_pd(&x).unwrap();
        assert!(pd[0] < 0.5);
        assert!(pd[39] > 0.5);
        assert!(roc_auc(&pd, &y).unwrap() > 0.9);
    }

    #[test]
    fn large_constant_column_gets_no_weight() {
        // a single index level repeated; its computed sd is rounding noise
        let rows: Vec<Vec<f64>> = (0..2_000)
            .map(|i| vec![(i % 50) as f64 * 0.2, 16_338.55])
            .collect();
        let y: Vec<bool> = rows.iter().map(|r| r[0] > 5.0).collect();
        let x = design(&["x", "nasdaq"], &rows);
        let w = crate::model::balanced_class_weights(&y);

        let (model, _) =
            fit_logistic(schema(&["x", "nasdaq"]), &x, &y, &w, &LogisticConfig::default()).unwrap();
        assert_eq!(model.feature_scales[1], 1.0);
        assert_eq!(model.feature_means[1], 16_338.55);
        assert_eq!(model.coefficients[1], 0.0);

        let shocked: Vec<Vec<f64>> = rows.iter().map(|r| vec![r[0], 10_000.0]).collect();
        let shocked = design(&["x", "nasdaq"], &shocked);
        assert_eq!(model.predict_pd(&x).unwrap(), model.predict_pd(&shocked).unwrap());
    }

    #[test]
    fn intercept_only_matches_weighted_base_rate() {
        let rows: Vec<Vec<f64>> = (0..10).map(|_| vec![0.0]).collect();
        let y = vec![true, false, false, false, false, false, false, false, false, true];
        let x = design(&["z"], &rows);
        let w = vec![1.0; 10];

        let (model, _) = fit_logistic(schema(&["z"]), &x, &y, &w, &LogisticConfig::default()).unwrap();
        let pd = model.predict_pd(&x).unwrap();
        assert_relative_eq!(pd[0], 0.2, epsilon = 1e-6);
    }

    #[test]
    fn balanced_weights_center_the_intercept() {
        let rows: Vec<Vec<f64>> = (0..10).map(|_| vec![0.0]).collect();
        let y: Vec<bool> = (0..10).map(|i| i < 2).collect();
        let x = design(&["z"], &rows);
        let w = crate::model::balanced_class_weights(&y);

        let (model, _) = fit_logistic(schema(&["z"]), &x, &y, &w, &LogisticConfig::default()).unwrap();
        assert_relative_eq!(model.intercept, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn rejects_misaligned_inputs() {
        let x = design(&["a"], &[vec![1.0], vec![2.0]]);
        let err = fit_logistic(schema(&["a"]), &x, &[true], &[1.0, 1.0], &LogisticConfig::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::FitFailed(_)));

        let err = fit_logistic(schema(&["b"]), &x, &[true, false], &[1.0, 1.0], &LogisticConfig::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::ColumnMismatch { .. }));
    }

    #[test]
    fn predict_rejects_wrong_columns() {
        let model = LogisticModel::new(schema(&["a", "b"]), 0.0, vec![1.0, 1.0]).unwrap();
        let x = design(&["b", "a"], &[vec![0.0, 0.0]]);
        assert!(matches!(
            model.predict_pd(&x),
            Err(ModelError::ColumnMismatch { .. })
        ));
    }

    #[test]
    fn coefficient_count_must_match_schema() {
        let err = LogisticModel::new(schema(&["a", "b"]), 0.0, vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::FeatureCountMismatch {
                features: 2,
                coefficients: 1
            }
        ));
    }
}
