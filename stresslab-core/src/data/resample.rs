//! Quarterly resampling of raw macro observations.
//!
//! Each series keeps the last observation of every calendar quarter, keyed
//! by the quarter-end date. All series are then laid on one contiguous
//! quarter index, forward-filled, and back-filled across any leading gap.

use super::provider::{DataError, MacroProvider, Observation};
use crate::domain::{MacroRow, MacroSeries};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::info;

/// Historical quarterly macro rows, sorted by date and contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterlyHistory {
    pub rows: Vec<MacroRow>,
}

impl QuarterlyHistory {
    pub fn last(&self) -> Option<&MacroRow> {
        self.rows.last()
    }
}

/// Quarter-end date of the quarter containing `date`.
pub fn quarter_end(date: NaiveDate) -> NaiveDate {
    let q_end_month = ((date.month() - 1) / 3 + 1) * 3;
    last_day_of_month(date.year(), q_end_month)
}

/// Quarter-end date of the quarter after the one ending on (or containing) `date`.
pub fn next_quarter_end(date: NaiveDate) -> NaiveDate {
    let q_end = quarter_end(date);
    let (y, m) = if q_end.month() == 12 {
        (q_end.year() + 1, 3)
    } else {
        (q_end.year(), q_end.month() + 3)
    };
    last_day_of_month(y, m)
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Last observation per quarter.
fn bucket_by_quarter(observations: &[Observation]) -> BTreeMap<NaiveDate, f64> {
    let mut sorted: Vec<Observation> = observations
        .iter()
        .copied()
        .filter(|o| o.value.is_finite())
        .collect();
    sorted.sort_by_key(|o| o.date);

    let mut buckets = BTreeMap::new();
    for obs in sorted {
        buckets.insert(quarter_end(obs.date), obs.value);
    }
    buckets
}

/// Resample every series to quarters and join them on a common index.
pub fn resample_quarterly(
    series: &BTreeMap<MacroSeries, Vec<Observation>>,
) -> Result<Vec<MacroRow>, DataError> {
    let mut buckets: BTreeMap<MacroSeries, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for s in MacroSeries::ALL {
        let obs = series.get(&s).map(|v| v.as_slice()).unwrap_or(&[]);
        let b = bucket_by_quarter(obs);
        if b.is_empty() {
            return Err(DataError::EmptySeries {
                series: s.fred_code().to_string(),
            });
        }
        buckets.insert(s, b);
    }

    let first = buckets
        .values()
        .filter_map(|b| b.keys().next().copied())
        .min()
        .ok_or_else(|| DataError::ValidationError("no quarterly observations".into()))?;
    let last = buckets
        .values()
        .filter_map(|b| b.keys().next_back().copied())
        .max()
        .ok_or_else(|| DataError::ValidationError("no quarterly observations".into()))?;

    let mut index = vec![first];
    while let Some(&q) = index.last() {
        if q >= last {
            break;
        }
        index.push(next_quarter_end(q));
    }

    let mut rows: Vec<MacroRow> = index
        .iter()
        .map(|&date| MacroRow {
            date,
            unemployment_rate: f64::NAN,
            gdp_real: f64::NAN,
            cpi: f64::NAN,
            nasdaq: f64::NAN,
        })
        .collect();

    for (s, b) in &buckets {
        let Some(&first_value) = b.values().next() else {
            continue;
        };
        let mut carried = first_value;
        for row in rows.iter_mut() {
            // Leading gap is back-filled with the first value; afterwards the
            // last seen value is carried forward.
            if let Some(&v) = b.get(&row.date) {
                carried = v;
            }
            row.set(*s, carried);
        }
    }

    Ok(rows)
}

/// Fetch every macro series from `start` and resample to quarters.
pub fn quarterly_history(
    provider: &dyn MacroProvider,
    start: NaiveDate,
) -> Result<QuarterlyHistory, DataError> {
    let mut raw = BTreeMap::new();
    for s in MacroSeries::ALL {
        raw.insert(s, provider.fetch(s, start)?);
    }
    let rows = resample_quarterly(&raw)?;
    info!(
        provider = provider.name(),
        quarters = rows.len(),
        "resampled macro history"
    );
    Ok(QuarterlyHistory { rows })
}
