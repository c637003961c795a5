//! Borrower × macro feature panel.

use super::schema::{FeatureColumn, FeatureKind, SchemaError};
use crate::domain::{Borrower, MacroRow, MacroSeries, Product};
use std::collections::{BTreeSet, HashSet};

/// Product whose one-hot column is dropped.
pub const PRODUCT_REFERENCE: Product = Product::Auto;
/// Width of a FICO bucket.
pub const FICO_BIN_WIDTH: i64 = 40;
/// Bucket whose one-hot column is dropped (500 / 40, the lowest attainable score).
pub const FICO_BIN_REFERENCE: i64 = 12;

/// Position of a panel row in the cross join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelKey {
    /// Index into the borrower slice.
    pub borrower: usize,
    /// Index into the macro slice.
    pub quarter: usize,
}

/// Engineered columns for every (borrower, quarter) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePanel {
    columns: Vec<FeatureColumn>,
    keys: Vec<PanelKey>,
    n_rows: usize,
}

impl FeaturePanel {
    /// Assemble a panel from prebuilt columns (no row keys).
    pub fn from_columns(columns: Vec<FeatureColumn>) -> Result<Self, SchemaError> {
        let n_rows = columns.first().map_or(0, |c| c.values.len());
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.clone()) {
                return Err(SchemaError::DuplicateColumn(col.name.clone()));
            }
            if col.values.len() != n_rows {
                return Err(SchemaError::RaggedColumn {
                    column: col.name.clone(),
                    expected: n_rows,
                    found: col.values.len(),
                });
            }
        }
        Ok(Self {
            columns,
            keys: Vec::new(),
            n_rows,
        })
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn keys(&self) -> &[PanelKey] {
        &self.keys
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }
}

/// Quarter-over-quarter log change of the equity index; the first quarter is 0.
pub fn equity_log_returns(macro_slice: &[MacroRow]) -> Vec<f64> {
    let mut out = Vec::with_capacity(macro_slice.len());
    for (t, row) in macro_slice.iter().enumerate() {
        if t == 0 {
            out.push(0.0);
        } else {
            let lr = row.nasdaq.ln() - macro_slice[t - 1].nasdaq.ln();
            out.push(if lr.is_finite() { lr } else { 0.0 });
        }
    }
    out
}

fn fico_bin(fico: i64) -> i64 {
    fico.div_euclid(FICO_BIN_WIDTH)
}

fn continuous(name: &str, values: Vec<f64>) -> FeatureColumn {
    FeatureColumn {
        name: name.to_string(),
        kind: FeatureKind::Continuous,
        values,
    }
}

fn indicator(name: String, values: Vec<f64>) -> FeatureColumn {
    FeatureColumn {
        name,
        kind: FeatureKind::Indicator,
        values,
    }
}

/// Cross-join `borrowers` with `macro_slice` and engineer the model features.
///
/// Rows are borrower-major: every quarter of borrower 0, then borrower 1, ...
/// One-hot columns are emitted only for categories present in `borrowers`,
/// sorted, with the fixed reference categories dropped; a scoring schema
/// zero-fills the rest.
///
/// Column order: borrower attributes, macro series, `ln_income`,
/// `nasdaq_lr`, product indicators, FICO bucket indicators.
pub fn build_panel(borrowers: &[Borrower], macro_slice: &[MacroRow]) -> FeaturePanel {
    let n_rows = borrowers.len() * macro_slice.len();
    let lr = equity_log_returns(macro_slice);

    let mut keys = Vec::with_capacity(n_rows);
    for b in 0..borrowers.len() {
        for q in 0..macro_slice.len() {
            keys.push(PanelKey {
                borrower: b,
                quarter: q,
            });
        }
    }

    let per_borrower = |f: &dyn Fn(&Borrower) -> f64| -> Vec<f64> {
        keys.iter().map(|k| f(&borrowers[k.borrower])).collect()
    };
    let per_quarter = |f: &dyn Fn(usize, &MacroRow) -> f64| -> Vec<f64> {
        keys.iter().map(|k| f(k.quarter, &macro_slice[k.quarter])).collect()
    };

    let mut columns = vec![
        continuous("age", per_borrower(&|b| b.age as f64)),
        continuous("annual_income", per_borrower(&|b| b.annual_income)),
        continuous("fico", per_borrower(&|b| b.fico as f64)),
        continuous("dti", per_borrower(&|b| b.dti)),
        continuous("balance", per_borrower(&|b| b.balance)),
        continuous("limit", per_borrower(&|b| b.limit_or_zero())),
        continuous("lgd_prior", per_borrower(&|b| b.lgd_prior)),
    ];
    for series in MacroSeries::ALL {
        columns.push(continuous(series.column(), per_quarter(&|_, m| m.get(series))));
    }
    columns.push(continuous("ln_income", per_borrower(&|b| b.annual_income.ln())));
    columns.push(continuous("nasdaq_lr", per_quarter(&|q, _| lr[q])));

    let products: BTreeSet<Product> = borrowers
        .iter()
        .map(|b| b.product)
        .filter(|p| *p != PRODUCT_REFERENCE)
        .collect();
    for product in products {
        columns.push(indicator(
            format!("product_{}", product.as_str()),
            per_borrower(&|b| if b.product == product { 1.0 } else { 0.0 }),
        ));
    }

    let bins: BTreeSet<i64> = borrowers
        .iter()
        .map(|b| fico_bin(b.fico))
        .filter(|k| *k != FICO_BIN_REFERENCE)
        .collect();
    for bin in bins {
        columns.push(indicator(
            format!("fico_bin_{bin}"),
            per_borrower(&|b| if fico_bin(b.fico) == bin { 1.0 } else { 0.0 }),
        ));
    }

    FeaturePanel {
        columns,
        keys,
        n_rows,
    }
}
