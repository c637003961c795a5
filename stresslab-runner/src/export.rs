//! Stress result export: CSV, JSON, Parquet and a console table.
//!
//! Every format is a pure function of the projection, so identical runs
//! produce byte-identical files. Floats are written in their shortest
//! round-trip form.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stresslab_core::data::write_stress_rows;
use stresslab_core::domain::StressProjection;

// ─── CSV export ─────────────────────────────────────────────────────

/// Quarterly aggregates.
///
/// Columns: scenario, date, expected_loss_mn, rwa_mn, capital_mn, cet1_ratio
pub fn export_stress_csv(projection: &StressProjection) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "scenario",
        "date",
        "expected_loss_mn",
        "rwa_mn",
        "capital_mn",
        "cet1_ratio",
    ])?;
    let scenario = projection.scenario.as_str();
    for row in &projection.rows {
        wtr.write_record([
            scenario.to_string(),
            row.date.to_string(),
            row.expected_loss_mn.to_string(),
            row.rwa_mn.to_string(),
            row.capital_mn.to_string(),
            row.cet1_ratio.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Loan-level losses, one row per (loan, quarter).
///
/// Columns: loan_id, product, date, pd, ead, lgd, expected_loss
pub fn export_loan_losses_csv(projection: &StressProjection) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["loan_id", "product", "date", "pd", "ead", "lgd", "expected_loss"])?;
    for loss in &projection.loan_losses {
        wtr.write_record([
            loss.loan_id.to_string(),
            loss.product.as_str().to_string(),
            loss.date.to_string(),
            loss.pd.to_string(),
            loss.ead.to_string(),
            loss.lgd.to_string(),
            loss.expected_loss.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(projection: &StressProjection) -> Result<String> {
    serde_json::to_string_pretty(projection).context("failed to serialize stress projection")
}

// ─── Console table ──────────────────────────────────────────────────

/// Fixed-width table of the quarterly aggregates.
pub fn render_table(projection: &StressProjection) -> String {
    let mut out = format!(
        "{:<12} {:>16} {:>12} {:>12} {:>10}\n",
        "date", "expected_loss_mn", "rwa_mn", "capital_mn", "cet1_ratio"
    );
    for row in &projection.rows {
        out.push_str(&format!(
            "{:<12} {:>16.6} {:>12.4} {:>12.4} {:>10.4}\n",
            row.date.to_string(),
            row.expected_loss_mn,
            row.rwa_mn,
            row.capital_mn,
            row.cet1_ratio
        ));
    }
    out
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Files written for one scenario.
#[derive(Debug, Clone)]
pub struct StressOutputs {
    pub csv: PathBuf,
    pub parquet: PathBuf,
    pub loan_losses: PathBuf,
}

/// Write `stress_<scenario>.csv`, `stress_<scenario>.parquet` and
/// `loan_losses_<scenario>.csv` under `output_dir`.
pub fn save_projection(projection: &StressProjection, output_dir: &Path) -> Result<StressOutputs> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    let name = projection.scenario.as_str();

    let csv = output_dir.join(format!("stress_{name}.csv"));
    write_atomic(&csv, export_stress_csv(projection)?.as_bytes())?;

    let loan_losses = output_dir.join(format!("loan_losses_{name}.csv"));
    write_atomic(&loan_losses, export_loan_losses_csv(projection)?.as_bytes())?;

    let parquet = output_dir.join(format!("stress_{name}.parquet"));
    write_stress_rows(&parquet, projection.scenario, &projection.rows)
        .with_context(|| format!("failed to write {}", parquet.display()))?;

    Ok(StressOutputs {
        csv,
        parquet,
        loan_losses,
    })
}

/// Write to `<path>.tmp`, then rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| {
        let _ = fs::remove_file(&tmp);
        format!("failed to move {} into place", path.display())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stresslab_core::data::read_stress_rows;
    use stresslab_core::domain::{LoanQuarterLoss, Product, Scenario, StressRow};

    fn projection() -> StressProjection {
        let date = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        StressProjection {
            scenario: Scenario::SeverelyAdverse,
            rows: vec![StressRow {
                date,
                expected_loss_mn: 0.5,
                rwa_mn: 100.0,
                capital_mn: 12.0,
                cet1_ratio: 0.12,
            }],
            loan_losses: vec![LoanQuarterLoss {
                loan_id: 3,
                product: Product::Card,
                date,
                pd: 0.1,
                ead: 1_100.0,
                lgd: 0.9,
                expected_loss: 99.0,
            }],
        }
    }

    #[test]
    fn stress_csv_layout() {
        let csv = export_stress_csv(&projection()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "scenario,date,expected_loss_mn,rwa_mn,capital_mn,cet1_ratio"
        );
        assert_eq!(lines.next().unwrap(), "severely_adverse,2025-03-31,0.5,100,12,0.12");
        assert!(lines.next().is_none());
    }

    #[test]
    fn loan_csv_layout() {
        let csv = export_loan_losses_csv(&projection()).unwrap();
        assert!(csv.ends_with("3,card,2025-03-31,0.1,1100,0.9,99\n"));
    }

    #[test]
    fn table_has_header_and_rows() {
        let table = render_table(&projection());
        assert_eq!(table.lines().count(), 2);
        assert!(table.lines().next().unwrap().contains("cet1_ratio"));
    }

    #[test]
    fn json_roundtrip() {
        let json = export_json(&projection()).unwrap();
        let restored: StressProjection = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, projection());
    }

    #[test]
    fn save_projection_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = save_projection(&projection(), dir.path()).unwrap();

        assert!(out.csv.ends_with("stress_severely_adverse.csv"));
        assert_eq!(fs::read_to_string(&out.csv).unwrap(), export_stress_csv(&projection()).unwrap());
        assert!(out.loan_losses.exists());
        let rows = read_stress_rows(&out.parquet).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, Scenario::SeverelyAdverse);
        assert!(!dir.path().join("stress_severely_adverse.csv.tmp").exists());
    }
}
