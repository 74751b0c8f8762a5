pub mod analyzer;
pub mod error;
pub mod metrics;
pub mod providers;

pub use analyzer::{aggregate_entities, HealthAnalyzer};
pub use error::AnalysisError;
