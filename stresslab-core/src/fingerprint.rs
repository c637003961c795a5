//! Dataset fingerprinting for model provenance.
//!
//! The hash covers every field the trainer reads, fed to BLAKE3 in a fixed
//! little-endian layout, so it is stable across runs and platforms.

use crate::domain::{Borrower, MacroRow};
use chrono::Datelike;

/// Hex BLAKE3 digest of a training book and its macro snapshot.
pub fn dataset_hash(borrowers: &[Borrower], macro_rows: &[MacroRow]) -> String {
    let mut hasher = blake3::Hasher::new();

    hasher.update(&(borrowers.len() as u64).to_le_bytes());
    for b in borrowers {
        hasher.update(&b.loan_id.to_le_bytes());
        hasher.update(b.product.as_str().as_bytes());
        hasher.update(&b.age.to_le_bytes());
        hasher.update(&b.annual_income.to_le_bytes());
        hasher.update(&b.fico.to_le_bytes());
        hasher.update(&b.dti.to_le_bytes());
        hasher.update(&b.balance.to_le_bytes());
        match b.limit {
            Some(limit) => {
                hasher.update(&[1]);
                hasher.update(&limit.to_le_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hasher.update(&b.lgd_prior.to_le_bytes());
    }

    hasher.update(&(macro_rows.len() as u64).to_le_bytes());
    for row in macro_rows {
        hasher.update(&row.date.num_days_from_ce().to_le_bytes());
        hasher.update(&row.unemployment_rate.to_le_bytes());
        hasher.update(&row.gdp_real.to_le_bytes());
        hasher.update(&row.cpi.to_le_bytes());
        hasher.update(&row.nasdaq.to_le_bytes());
    }

    hasher.finalize().to_hex().to_string()
}
