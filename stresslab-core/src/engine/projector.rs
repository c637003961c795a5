use super::capital::roll_forward;
use super::{EngineConfig, EngineError};
use crate::domain::{
    Borrower, LoanQuarterLoss, MacroPanel, MacroRow, Scenario, StressProjection, StressRow,
    UnknownScenario,
};
use crate::features::build_panel;
use crate::model::PdScorer;
use tracing::{debug, info};

/// Projects one loan book through the scenarios of one macro panel.
///
/// Runs are pure: the same book, panel, scorer and config always produce the
/// same projection, bit for bit.
pub struct StressEngine<'a, S: PdScorer> {
    borrowers: &'a [Borrower],
    macro_panel: &'a MacroPanel,
    scorer: &'a S,
    config: EngineConfig,
}

impl<'a, S: PdScorer> StressEngine<'a, S> {
    pub fn new(
        borrowers: &'a [Borrower],
        macro_panel: &'a MacroPanel,
        scorer: &'a S,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            borrowers,
            macro_panel,
            scorer,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The projection window: the scenario's last `horizon` quarters.
    pub fn horizon_slice(&self, scenario: &str) -> Result<(Scenario, &'a [MacroRow]), EngineError> {
        let which: Scenario = scenario.parse()?;
        let rows = self
            .macro_panel
            .rows(which)
            .ok_or_else(|| UnknownScenario(scenario.to_string()))?;
        let horizon = self.config.horizon;
        if rows.len() < horizon {
            return Err(EngineError::InsufficientHorizon {
                scenario: scenario.to_string(),
                available: rows.len(),
                horizon,
            });
        }
        Ok((which, &rows[rows.len() - horizon..]))
    }

    /// Project the book through `scenario`.
    pub fn run(&self, scenario: &str) -> Result<StressProjection, EngineError> {
        if self.borrowers.is_empty() {
            return Err(EngineError::EmptyBook);
        }
        let (which, slice) = self.horizon_slice(scenario)?;

        let panel = build_panel(self.borrowers, slice);
        let design = self.scorer.expected_schema().reconcile(&panel)?;
        debug!(
            rows = design.n_rows(),
            cols = design.n_cols(),
            scenario = which.as_str(),
            "scoring design matrix"
        );
        let pd = self.scorer.predict_pd(&design)?;
        if pd.len() != panel.n_rows() {
            return Err(EngineError::ScoreCount {
                expected: panel.n_rows(),
                found: pd.len(),
            });
        }

        let horizon = slice.len();
        let mut el_total = vec![0.0; horizon];
        let mut ead_total = vec![0.0; horizon];
        let mut loan_losses = Vec::with_capacity(panel.n_rows());

        // Panel rows are borrower-major, so each quarter sums in book order.
        for (key, &p) in panel.keys().iter().zip(&pd) {
            let borrower = &self.borrowers[key.borrower];
            let ead = borrower.exposure_at_default(self.config.card_ccf);
            let expected_loss = p * ead * borrower.lgd_prior;

            el_total[key.quarter] += expected_loss;
            ead_total[key.quarter] += ead;
            loan_losses.push(LoanQuarterLoss {
                loan_id: borrower.loan_id,
                product: borrower.product,
                date: slice[key.quarter].date,
                pd: p,
                ead,
                lgd: borrower.lgd_prior,
                expected_loss,
            });
        }

        let scale = self.config.scale;
        let el_mn: Vec<f64> = el_total.iter().map(|el| el / scale).collect();
        let rwa_mn: Vec<f64> = ead_total
            .iter()
            .map(|ead| ead * self.config.rwa_weight / scale)
            .collect();
        if let Some(q) = rwa_mn.iter().position(|&r| r == 0.0) {
            return Err(EngineError::ZeroRwa {
                date: slice[q].date,
            });
        }

        let capital = roll_forward(&el_mn, &rwa_mn, self.config.start_cet1_ratio);
        let rows: Vec<StressRow> = (0..horizon)
            .map(|q| StressRow {
                date: slice[q].date,
                expected_loss_mn: el_mn[q],
                rwa_mn: rwa_mn[q],
                capital_mn: capital.capital[q],
                cet1_ratio: capital.cet1_ratio[q],
            })
            .collect();

        let projection = StressProjection {
            scenario: which,
            rows,
            loan_losses,
        };
        info!(
            scenario = which.as_str(),
            loans = self.borrowers.len(),
            quarters = horizon,
            cumulative_loss_mn = projection.cumulative_loss_mn(),
            min_cet1 = projection.min_cet1_ratio().unwrap_or(f64::NAN),
            "scenario projected"
        );
        Ok(projection)
    }
}
