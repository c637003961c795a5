//! Macro data ingestion, scenario construction and Parquet storage

pub mod fred;
pub mod provider;
pub mod resample;
pub mod scenario;
pub mod store;

pub use fred::{FredConfig, FredProvider};
pub use provider::{DataError, MacroProvider, Observation, StaticProvider};
pub use resample::{quarter_end, quarterly_history, QuarterlyHistory};
pub use scenario::{build_scenarios, load_macro_panel, ScenarioConfig};
pub use store::{
    read_borrowers, read_macro_panel, read_stress_rows, write_borrowers, write_macro_panel,
    write_stress_rows,
};
