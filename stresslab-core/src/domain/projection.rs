//! Stress projection output rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::borrower::Product;
use super::macro_panel::Scenario;
use super::LoanId;

/// Loan-level loss for one projected quarter (currency units, not millions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanQuarterLoss {
    pub loan_id: LoanId,
    pub product: Product,
    pub date: NaiveDate,
    pub pd: f64,
    pub ead: f64,
    pub lgd: f64,
    pub expected_loss: f64,
}

/// Portfolio aggregate for one projected quarter. Amounts in millions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressRow {
    pub date: NaiveDate,
    pub expected_loss_mn: f64,
    pub rwa_mn: f64,
    pub capital_mn: f64,
    pub cet1_ratio: f64,
}

/// Complete output of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressProjection {
    pub scenario: Scenario,
    pub rows: Vec<StressRow>,
    pub loan_losses: Vec<LoanQuarterLoss>,
}

impl StressProjection {
    /// Sum of quarterly expected losses over the horizon (millions).
    pub fn cumulative_loss_mn(&self) -> f64 {
        self.rows.iter().map(|r| r.expected_loss_mn).sum()
    }

    /// Lowest CET1 ratio reached over the horizon.
    pub fn min_cet1_ratio(&self) -> Option<f64> {
        self.rows
            .iter()
            .map(|r| r.cet1_ratio)
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v))))
    }
}
