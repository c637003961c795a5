//! StressLab Core: loan book, macro scenarios, features, PD model, stress engine.
//!
//! This crate holds the pipeline's computation:
//! - Domain types (borrowers, macro rows and panels, stress projections)
//! - Synthetic borrower generation from seeded priors
//! - Macro ingestion from FRED, quarterly resampling, scenario construction
//! - Shared feature panel and the declared model input schema
//! - Logistic PD model: labels, split, fit, AUC, versioned artifact
//! - Stress engine with capital roll-forward

pub mod data;
pub mod domain;
pub mod engine;
pub mod features;
pub mod fingerprint;
pub mod generator;
pub mod model;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: pipeline values can move between threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Borrower>();
        require_sync::<domain::Borrower>();
        require_send::<domain::MacroPanel>();
        require_sync::<domain::MacroPanel>();
        require_send::<domain::StressProjection>();
        require_sync::<domain::StressProjection>();

        require_send::<features::FeaturePanel>();
        require_sync::<features::FeaturePanel>();
        require_send::<features::FeatureSchema>();
        require_sync::<features::FeatureSchema>();

        require_send::<model::LogisticModel>();
        require_sync::<model::LogisticModel>();
        require_send::<model::ModelArtifact>();
        require_sync::<model::ModelArtifact>();

        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<generator::GeneratorConfig>();
        require_sync::<generator::GeneratorConfig>();
        require_send::<data::FredProvider>();
        require_sync::<data::FredProvider>();
    }

    /// The engine only sees scorers through `PdScorer`, so any fitted model
    /// can be swapped for a constant one.
    #[test]
    fn scorer_trait_is_object_safe() {
        fn _check(scorer: &dyn model::PdScorer, x: &features::DesignMatrix) {
            let _ = scorer.predict_pd(x);
        }
    }
}
