//! HTTP handlers for the healthcare service.

pub mod analyze;
pub mod health;

pub use analyze::analyze_health;
pub use health::{health_check, index, metrics_endpoint, readiness_check};
