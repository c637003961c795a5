//! Borrower: one loan in the retail book.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::LoanId;

/// Retail product line.
///
/// Ordering is alphabetical so that sorted category lists (one-hot columns)
/// come out deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    Auto,
    Card,
    Mortgage,
}

impl Product {
    pub const ALL: [Product; 3] = [Product::Auto, Product::Card, Product::Mortgage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Auto => "auto",
            Product::Card => "card",
            Product::Mortgage => "mortgage",
        }
    }

    /// Revolving products carry a credit limit.
    pub fn is_revolving(&self) -> bool {
        matches!(self, Product::Card)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown product '{0}' (expected mortgage, auto or card)")]
pub struct UnknownProduct(pub String);

impl FromStr for Product {
    type Err = UnknownProduct;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Product::Auto),
            "card" => Ok(Product::Card),
            "mortgage" => Ok(Product::Mortgage),
            other => Err(UnknownProduct(other.to_string())),
        }
    }
}

/// A single loan record.
///
/// `limit` is `Some` iff the product is revolving (card).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrower {
    pub loan_id: LoanId,
    pub product: Product,
    pub age: i64,
    pub annual_income: f64,
    pub fico: i64,
    pub dti: f64,
    pub balance: f64,
    pub limit: Option<f64>,
    pub lgd_prior: f64,
}

impl Borrower {
    /// Limit with the card-only field zero-filled.
    pub fn limit_or_zero(&self) -> f64 {
        self.limit.unwrap_or(0.0)
    }

    /// Exposure at default: cards draw down to `ccf × balance`, capped at the
    /// limit; term loans are exposed for their outstanding balance.
    pub fn exposure_at_default(&self, card_ccf: f64) -> f64 {
        match self.product {
            Product::Card => self.limit_or_zero().min(self.balance * card_ccf),
            Product::Auto | Product::Mortgage => self.balance,
        }
    }

    /// Record-level invariant: the limit is present iff the product is a card.
    pub fn is_consistent(&self) -> bool {
        self.limit.is_some() == self.product.is_revolving()
    }
}
