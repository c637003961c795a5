//! Domain types for StressLab

pub mod borrower;
pub mod macro_panel;
pub mod projection;

pub use borrower::{Borrower, Product, UnknownProduct};
pub use macro_panel::{MacroPanel, MacroRow, MacroSeries, Scenario, UnknownScenario};
pub use projection::{LoanQuarterLoss, StressProjection, StressRow};

/// Loan identifier type alias
pub type LoanId = u64;
