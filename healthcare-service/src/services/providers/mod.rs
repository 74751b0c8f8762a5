//! Healthcare entity recognition provider abstractions and implementations.
//!
//! The provider owns all entity extraction. The gateway only sees an ordered
//! list of per-document outcomes, which keeps handlers testable against the
//! mock.

pub mod azure;
pub mod mock;

use crate::models::{ExtractedEntity, TextDocument};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use azure::{AzureHealthConfig, AzureHealthProvider};
pub use mock::MockHealthcareProvider;

/// Error type for provider operations.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// The provider answered with a non-success HTTP status.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Analysis timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Analysis job failed: {0}")]
    JobFailed(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::Http { .. } => "http",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Network(_) => "network",
            ProviderError::JobFailed(_) => "job_failed",
            ProviderError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Outcome of analysing a single document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentResult {
    Entities {
        id: String,
        entities: Vec<ExtractedEntity>,
    },
    Error {
        id: String,
        code: String,
        message: String,
    },
}

impl DocumentResult {
    pub fn id(&self) -> &str {
        match self {
            DocumentResult::Entities { id, .. } | DocumentResult::Error { id, .. } => id,
        }
    }
}

/// Trait for healthcare entity recognition providers (e.g., Azure AI Language).
#[async_trait]
pub trait HealthcareProvider: Send + Sync {
    /// Analyse `documents`, waiting at most `deadline` for completion.
    ///
    /// Returns exactly one result per input document, in input order.
    async fn analyze(
        &self,
        documents: &[TextDocument],
        deadline: Duration,
    ) -> Result<Vec<DocumentResult>, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;

    /// Provider name used in logs and metrics.
    fn name(&self) -> &'static str;
}
