//! Expected model input schema and panel reconciliation.
//!
//! A `FeatureSchema` is the declared, ordered column list a model was trained
//! on. `reconcile` turns any feature panel into a design matrix whose columns
//! are exactly the schema's, in the schema's order: absent columns are
//! zero-filled, extra columns are dropped, and kind mismatches are rejected.

use super::panel::FeaturePanel;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("feature schema is empty")]
    Empty,

    #[error("duplicate feature column '{0}'")]
    DuplicateColumn(String),

    #[error("column '{column}' is {found} in the panel but {expected} in the schema")]
    KindMismatch {
        column: String,
        expected: FeatureKind,
        found: FeatureKind,
    },

    #[error("column '{column}' has {found} rows, panel has {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// Column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Real-valued attribute.
    Continuous,
    /// One-hot category flag, 0.0 or 1.0.
    Indicator,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Continuous => f.write_str("continuous"),
            FeatureKind::Indicator => f.write_str("indicator"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
}

/// A named, typed panel column.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub kind: FeatureKind,
    pub values: Vec<f64>,
}

/// Ordered list of the columns a model consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<FeatureSpec>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<FeatureSpec>) -> Result<Self, SchemaError> {
        let schema = Self { columns };
        schema.validate()?;
        Ok(schema)
    }

    /// The panel's own column list, in panel order.
    pub fn from_panel(panel: &FeaturePanel) -> Result<Self, SchemaError> {
        Self::new(
            panel
                .columns()
                .iter()
                .map(|c| FeatureSpec {
                    name: c.name.clone(),
                    kind: c.kind,
                })
                .collect(),
        )
    }

    /// Non-empty with unique names. Deserialized schemas must be re-checked.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.columns.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut seen = HashSet::with_capacity(self.columns.len());
        for spec in &self.columns {
            if !seen.insert(spec.name.as_str()) {
                return Err(SchemaError::DuplicateColumn(spec.name.clone()));
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> &[FeatureSpec] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Build the design matrix for this schema from `panel`.
    pub fn reconcile(&self, panel: &FeaturePanel) -> Result<DesignMatrix, SchemaError> {
        self.validate()?;
        let n = panel.n_rows();

        let mut sources: Vec<Option<&[f64]>> = Vec::with_capacity(self.columns.len());
        let mut zero_filled = Vec::new();
        for spec in &self.columns {
            match panel.column(&spec.name) {
                Some(col) => {
                    if col.kind != spec.kind {
                        return Err(SchemaError::KindMismatch {
                            column: spec.name.clone(),
                            expected: spec.kind,
                            found: col.kind,
                        });
                    }
                    if col.values.len() != n {
                        return Err(SchemaError::RaggedColumn {
                            column: spec.name.clone(),
                            expected: n,
                            found: col.values.len(),
                        });
                    }
                    sources.push(Some(col.values.as_slice()));
                }
                None => {
                    zero_filled.push(spec.name.as_str());
                    sources.push(None);
                }
            }
        }

        if !zero_filled.is_empty() {
            debug!(columns = ?zero_filled, "zero-filling columns absent from panel");
        }

        let matrix = DMatrix::from_fn(n, self.columns.len(), |i, j| match sources[j] {
            Some(values) => values[i],
            None => 0.0,
        });

        Ok(DesignMatrix {
            columns: self.columns.iter().map(|c| c.name.clone()).collect(),
            matrix,
        })
    }
}

/// Scoring input: columns in schema order, one row per panel row.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    pub columns: Vec<String>,
    pub matrix: DMatrix<f64>,
}

impl DesignMatrix {
    pub fn n_rows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.matrix.ncols()
    }

    /// Values of a named column.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let j = self.columns.iter().position(|c| c == name)?;
        Some(self.matrix.column(j).iter().copied().collect())
    }

    /// Keep only the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            matrix: self.matrix.select_rows(rows.iter()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, kind: FeatureKind) -> FeatureSpec {
        FeatureSpec {
            name: name.into(),
            kind,
        }
    }

    fn panel() -> FeaturePanel {
        FeaturePanel::from_columns(vec![
            FeatureColumn {
                name: "fico".into(),
                kind: FeatureKind::Continuous,
                values: vec![600.0, 720.0],
            },
            FeatureColumn {
                name: "product_card".into(),
                kind: FeatureKind::Indicator,
                values: vec![1.0, 0.0],
            },
            FeatureColumn {
                name: "unused".into(),
                kind: FeatureKind::Continuous,
                values: vec![9.0, 9.0],
            },
        ])
        .unwrap()
    }

    #[test]
    fn reconcile_orders_fills_and_drops() {
        let schema = FeatureSchema::new(vec![
            spec("product_card", FeatureKind::Indicator),
            spec("product_mortgage", FeatureKind::Indicator),
            spec("fico", FeatureKind::Continuous),
        ])
        .unwrap();

        let x = schema.reconcile(&panel()).unwrap();
        assert_eq!(x.columns, vec!["product_card", "product_mortgage", "fico"]);
        assert_eq!(x.n_rows(), 2);
        assert_eq!(x.column("product_mortgage").unwrap(), vec![0.0, 0.0]);
        assert_eq!(x.column("fico").unwrap(), vec![600.0, 720.0]);
        assert!(x.column("unused").is_none());
    }

    #[test]
    fn kind_mismatch_is_error() {
        let schema = FeatureSchema::new(vec![spec("fico", FeatureKind::Indicator)]).unwrap();
        assert!(matches!(
            schema.reconcile(&panel()),
            Err(SchemaError::KindMismatch { .. })
        ));
    }

    #[test]
    fn empty_or_duplicate_schema_rejected() {
        assert_eq!(FeatureSchema::new(vec![]), Err(SchemaError::Empty));
        assert!(matches!(
            FeatureSchema::new(vec![
                spec("fico", FeatureKind::Continuous),
                spec("fico", FeatureKind::Continuous),
            ]),
            Err(SchemaError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn select_rows_keeps_columns() {
        let schema = FeatureSchema::from_panel(&panel()).unwrap();
        let x = schema.reconcile(&panel()).unwrap().select_rows(&[1]);
        assert_eq!(x.n_rows(), 1);
        assert_eq!(x.column("fico").unwrap(), vec![720.0]);
    }
}
