//! Parquet storage for borrower books, macro panels and stress output.
//!
//! Writes are atomic (write to `.tmp`, rename into place) and create parent
//! directories. Reads validate the schema and the record invariants before
//! handing rows back.

use super::provider::DataError;
use crate::domain::{Borrower, MacroPanel, MacroRow, Product, Scenario, StressRow};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

const BORROWER_COLUMNS: [&str; 9] = [
    "loan_id",
    "product",
    "age",
    "annual_income",
    "fico",
    "dti",
    "balance",
    "limit",
    "lgd_prior",
];

const MACRO_COLUMNS: [&str; 6] = [
    "scenario",
    "date",
    "unemployment_rate",
    "gdp_real",
    "cpi",
    "nasdaq",
];

const STRESS_COLUMNS: [&str; 6] = [
    "scenario",
    "date",
    "expected_loss_mn",
    "rwa_mn",
    "capital_mn",
    "cet1_ratio",
];

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

fn pq_err(context: &'static str) -> impl Fn(PolarsError) -> DataError {
    move |e| DataError::ParquetError(format!("{context}: {e}"))
}

fn date_column(name: &str, dates: &[NaiveDate]) -> Result<Column, DataError> {
    let days: Vec<i32> = dates.iter().map(|d| days_since_epoch(*d)).collect();
    Column::new(name.into(), days)
        .cast(&DataType::Date)
        .map_err(pq_err("date cast"))
}

// ── Writers ─────────────────────────────────────────────────────────

/// Write a DataFrame to `path` atomically.
fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| DataError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let tmp_path = path.with_extension("parquet.tmp");
    let file = fs::File::create(&tmp_path).map_err(|source| DataError::Io {
        path: tmp_path.display().to_string(),
        source,
    })?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(pq_err("write parquet"))?;

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        DataError::Io {
            path: path.display().to_string(),
            source,
        }
    })
}

pub fn borrowers_to_dataframe(borrowers: &[Borrower]) -> Result<DataFrame, DataError> {
    DataFrame::new(vec![
        Column::new("loan_id".into(), borrowers.iter().map(|b| b.loan_id).collect::<Vec<u64>>()),
        Column::new(
            "product".into(),
            borrowers.iter().map(|b| b.product.as_str()).collect::<Vec<&str>>(),
        ),
        Column::new("age".into(), borrowers.iter().map(|b| b.age).collect::<Vec<i64>>()),
        Column::new(
            "annual_income".into(),
            borrowers.iter().map(|b| b.annual_income).collect::<Vec<f64>>(),
        ),
        Column::new("fico".into(), borrowers.iter().map(|b| b.fico).collect::<Vec<i64>>()),
        Column::new("dti".into(), borrowers.iter().map(|b| b.dti).collect::<Vec<f64>>()),
        Column::new("balance".into(), borrowers.iter().map(|b| b.balance).collect::<Vec<f64>>()),
        Column::new(
            "limit".into(),
            borrowers.iter().map(|b| b.limit).collect::<Vec<Option<f64>>>(),
        ),
        Column::new(
            "lgd_prior".into(),
            borrowers.iter().map(|b| b.lgd_prior).collect::<Vec<f64>>(),
        ),
    ])
    .map_err(pq_err("borrower dataframe"))
}

pub fn macro_panel_to_dataframe(panel: &MacroPanel) -> Result<DataFrame, DataError> {
    let mut scenarios: Vec<&str> = Vec::with_capacity(panel.len());
    let mut rows: Vec<&MacroRow> = Vec::with_capacity(panel.len());
    for (scenario, scenario_rows) in &panel.scenarios {
        for row in scenario_rows {
            scenarios.push(scenario.as_str());
            rows.push(row);
        }
    }
    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();

    DataFrame::new(vec![
        Column::new("scenario".into(), scenarios),
        date_column("date", &dates)?,
        Column::new(
            "unemployment_rate".into(),
            rows.iter().map(|r| r.unemployment_rate).collect::<Vec<f64>>(),
        ),
        Column::new("gdp_real".into(), rows.iter().map(|r| r.gdp_real).collect::<Vec<f64>>()),
        Column::new("cpi".into(), rows.iter().map(|r| r.cpi).collect::<Vec<f64>>()),
        Column::new("nasdaq".into(), rows.iter().map(|r| r.nasdaq).collect::<Vec<f64>>()),
    ])
    .map_err(pq_err("macro dataframe"))
}

pub fn stress_rows_to_dataframe(
    scenario: Scenario,
    rows: &[StressRow],
) -> Result<DataFrame, DataError> {
    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    DataFrame::new(vec![
        Column::new("scenario".into(), vec![scenario.as_str(); rows.len()]),
        date_column("date", &dates)?,
        Column::new(
            "expected_loss_mn".into(),
            rows.iter().map(|r| r.expected_loss_mn).collect::<Vec<f64>>(),
        ),
        Column::new("rwa_mn".into(), rows.iter().map(|r| r.rwa_mn).collect::<Vec<f64>>()),
        Column::new(
            "capital_mn".into(),
            rows.iter().map(|r| r.capital_mn).collect::<Vec<f64>>(),
        ),
        Column::new(
            "cet1_ratio".into(),
            rows.iter().map(|r| r.cet1_ratio).collect::<Vec<f64>>(),
        ),
    ])
    .map_err(pq_err("stress dataframe"))
}

pub fn write_borrowers(path: &Path, borrowers: &[Borrower]) -> Result<(), DataError> {
    write_parquet(&mut borrowers_to_dataframe(borrowers)?, path)
}

pub fn write_macro_panel(path: &Path, panel: &MacroPanel) -> Result<(), DataError> {
    write_parquet(&mut macro_panel_to_dataframe(panel)?, path)
}

pub fn write_stress_rows(
    path: &Path,
    scenario: Scenario,
    rows: &[StressRow],
) -> Result<(), DataError> {
    write_parquet(&mut stress_rows_to_dataframe(scenario, rows)?, path)
}

// ── Readers ─────────────────────────────────────────────────────────

/// Load a Parquet file and check it has rows and the expected columns.
fn read_parquet(path: &Path, expected: &[&str]) -> Result<DataFrame, DataError> {
    let file = fs::File::open(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(pq_err("read parquet"))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError(format!(
            "empty parquet file {}",
            path.display()
        )));
    }
    for name in expected {
        if df.column(name).is_err() {
            return Err(DataError::ValidationError(format!(
                "{}: missing column '{name}'",
                path.display()
            )));
        }
    }
    Ok(df)
}

fn null_at(column: &str, row: usize) -> DataError {
    DataError::ValidationError(format!("null {column} at row {row}"))
}

pub fn dataframe_to_borrowers(df: &DataFrame) -> Result<Vec<Borrower>, DataError> {
    let col = |name: &str| df.column(name).map_err(pq_err("column read"));

    let loan_id = col("loan_id")?.u64().map_err(pq_err("loan_id column type"))?;
    let product = col("product")?.str().map_err(pq_err("product column type"))?;
    let age = col("age")?.i64().map_err(pq_err("age column type"))?;
    let income = col("annual_income")?.f64().map_err(pq_err("annual_income column type"))?;
    let fico = col("fico")?.i64().map_err(pq_err("fico column type"))?;
    let dti = col("dti")?.f64().map_err(pq_err("dti column type"))?;
    let balance = col("balance")?.f64().map_err(pq_err("balance column type"))?;
    let limit = col("limit")?.f64().map_err(pq_err("limit column type"))?;
    let lgd = col("lgd_prior")?.f64().map_err(pq_err("lgd_prior column type"))?;

    let mut seen = HashSet::with_capacity(df.height());
    let mut borrowers = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let product_name = product.get(i).ok_or_else(|| null_at("product", i))?;
        let product: Product = product_name
            .parse()
            .map_err(|e: crate::domain::UnknownProduct| DataError::ValidationError(e.to_string()))?;

        let b = Borrower {
            loan_id: loan_id.get(i).ok_or_else(|| null_at("loan_id", i))?,
            product,
            age: age.get(i).ok_or_else(|| null_at("age", i))?,
            annual_income: income.get(i).ok_or_else(|| null_at("annual_income", i))?,
            fico: fico.get(i).ok_or_else(|| null_at("fico", i))?,
            dti: dti.get(i).ok_or_else(|| null_at("dti", i))?,
            balance: balance.get(i).ok_or_else(|| null_at("balance", i))?,
            limit: limit.get(i).filter(|v| !v.is_nan()),
            lgd_prior: lgd.get(i).ok_or_else(|| null_at("lgd_prior", i))?,
        };

        if !b.is_consistent() {
            return Err(DataError::ValidationError(format!(
                "loan {}: limit must be present iff product is card",
                b.loan_id
            )));
        }
        if !seen.insert(b.loan_id) {
            return Err(DataError::ValidationError(format!(
                "duplicate loan_id {}",
                b.loan_id
            )));
        }
        borrowers.push(b);
    }
    Ok(borrowers)
}

pub fn dataframe_to_macro_panel(df: &DataFrame) -> Result<MacroPanel, DataError> {
    let col = |name: &str| df.column(name).map_err(pq_err("column read"));

    let scenario = col("scenario")?.str().map_err(pq_err("scenario column type"))?;
    let date = col("date")?.date().map_err(pq_err("date column type"))?;
    let unemp = col("unemployment_rate")?
        .f64()
        .map_err(pq_err("unemployment_rate column type"))?;
    let gdp = col("gdp_real")?.f64().map_err(pq_err("gdp_real column type"))?;
    let cpi = col("cpi")?.f64().map_err(pq_err("cpi column type"))?;
    let nasdaq = col("nasdaq")?.f64().map_err(pq_err("nasdaq column type"))?;

    let mut scenarios: BTreeMap<Scenario, Vec<MacroRow>> = BTreeMap::new();
    for i in 0..df.height() {
        let name = scenario.get(i).ok_or_else(|| null_at("scenario", i))?;
        let sc: Scenario = name
            .parse()
            .map_err(|e: crate::domain::UnknownScenario| DataError::ValidationError(e.to_string()))?;
        let days = date.get(i).ok_or_else(|| null_at("date", i))?;

        scenarios.entry(sc).or_default().push(MacroRow {
            date: epoch() + chrono::Duration::days(days as i64),
            unemployment_rate: unemp.get(i).ok_or_else(|| null_at("unemployment_rate", i))?,
            gdp_real: gdp.get(i).ok_or_else(|| null_at("gdp_real", i))?,
            cpi: cpi.get(i).ok_or_else(|| null_at("cpi", i))?,
            nasdaq: nasdaq.get(i).ok_or_else(|| null_at("nasdaq", i))?,
        });
    }

    for rows in scenarios.values_mut() {
        rows.sort_by_key(|r| r.date);
    }
    Ok(MacroPanel { scenarios })
}

pub fn dataframe_to_stress_rows(df: &DataFrame) -> Result<Vec<(Scenario, StressRow)>, DataError> {
    let col = |name: &str| df.column(name).map_err(pq_err("column read"));

    let scenario = col("scenario")?.str().map_err(pq_err("scenario column type"))?;
    let date = col("date")?.date().map_err(pq_err("date column type"))?;
    let el = col("expected_loss_mn")?.f64().map_err(pq_err("expected_loss_mn column type"))?;
    let rwa = col("rwa_mn")?.f64().map_err(pq_err("rwa_mn column type"))?;
    let capital = col("capital_mn")?.f64().map_err(pq_err("capital_mn column type"))?;
    let cet1 = col("cet1_ratio")?.f64().map_err(pq_err("cet1_ratio column type"))?;

    let mut out = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let name = scenario.get(i).ok_or_else(|| null_at("scenario", i))?;
        let sc: Scenario = name
            .parse()
            .map_err(|e: crate::domain::UnknownScenario| DataError::ValidationError(e.to_string()))?;
        let days = date.get(i).ok_or_else(|| null_at("date", i))?;
        out.push((
            sc,
            StressRow {
                date: epoch() + chrono::Duration::days(days as i64),
                expected_loss_mn: el.get(i).ok_or_else(|| null_at("expected_loss_mn", i))?,
                rwa_mn: rwa.get(i).ok_or_else(|| null_at("rwa_mn", i))?,
                capital_mn: capital.get(i).ok_or_else(|| null_at("capital_mn", i))?,
                cet1_ratio: cet1.get(i).ok_or_else(|| null_at("cet1_ratio", i))?,
            },
        ));
    }
    Ok(out)
}

pub fn read_borrowers(path: &Path) -> Result<Vec<Borrower>, DataError> {
    dataframe_to_borrowers(&read_parquet(path, &BORROWER_COLUMNS)?)
}

pub fn read_macro_panel(path: &Path) -> Result<MacroPanel, DataError> {
    dataframe_to_macro_panel(&read_parquet(path, &MACRO_COLUMNS)?)
}

pub fn read_stress_rows(path: &Path) -> Result<Vec<(Scenario, StressRow)>, DataError> {
    dataframe_to_stress_rows(&read_parquet(path, &STRESS_COLUMNS)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("stresslab_store_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_book() -> Vec<Borrower> {
        vec![
            Borrower {
                loan_id: 0,
                product: Product::Mortgage,
                age: 41,
                annual_income: 85_000.0,
                fico: 712,
                dti: 0.21,
                balance: 240_000.0,
                limit: None,
                lgd_prior: 0.35,
            },
            Borrower {
                loan_id: 1,
                product: Product::Card,
                age: 29,
                annual_income: 41_000.0,
                fico: 603,
                dti: 0.39,
                balance: 3_200.0,
                limit: Some(6_000.0),
                lgd_prior: 0.9,
            },
        ]
    }

    #[test]
    fn borrowers_write_and_load() {
        let dir = temp_dir();
        let path = dir.join("nested/borrowers.parquet");

        write_borrowers(&path, &sample_book()).unwrap();
        let loaded = read_borrowers(&path).unwrap();

        assert_eq!(loaded, sample_book());
        assert!(!path.with_extension("parquet.tmp").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn macro_panel_write_and_load() {
        let dir = temp_dir();
        let path = dir.join("macro.parquet");
        let row = |m: u32, d: u32, u: f64| MacroRow {
            date: NaiveDate::from_ymd_opt(2024, m, d).unwrap(),
            unemployment_rate: u,
            gdp_real: 23_000.0,
            cpi: 312.0,
            nasdaq: 18_000.0,
        };
        let mut panel = MacroPanel::new();
        panel.insert(Scenario::Baseline, vec![row(3, 31, 3.8), row(6, 30, 4.0)]);
        panel.insert(Scenario::SeverelyAdverse, vec![row(3, 31, 3.8), row(6, 30, 4.5)]);

        write_macro_panel(&path, &panel).unwrap();
        assert_eq!(read_macro_panel(&path).unwrap(), panel);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_loan_ids_rejected() {
        let mut book = sample_book();
        book[1].loan_id = 0;
        let df = borrowers_to_dataframe(&book).unwrap();
        assert!(matches!(
            dataframe_to_borrowers(&df),
            Err(DataError::ValidationError(_))
        ));
    }

    #[test]
    fn card_without_limit_rejected() {
        let mut book = sample_book();
        book[1].limit = None;
        let df = borrowers_to_dataframe(&book).unwrap();
        assert!(dataframe_to_borrowers(&df).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_borrowers(Path::new("/nonexistent/stresslab/borrowers.parquet")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
