use super::providers::ProviderError;
use axum::http::StatusCode;
use service_core::error::AppError;
use thiserror::Error;

/// Failure of a single `/analyze-health` request.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid input")]
    InvalidInput { reason: String },

    #[error("No input documents")]
    EmptyInput,

    /// The provider rejected one document; the whole batch fails with it.
    #[error("{message}")]
    Document {
        id: String,
        code: String,
        message: String,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl AnalysisError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        AnalysisError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InvalidInput { .. } => "invalid_input",
            AnalysisError::EmptyInput => "empty_input",
            AnalysisError::Document { .. } => "document_error",
            AnalysisError::Provider(ProviderError::Timeout(_)) => "timeout",
            AnalysisError::Provider(_) => "provider_error",
            AnalysisError::Unexpected(_) => "unexpected_error",
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidInput { .. } => AppError::BadRequest(anyhow::anyhow!("Invalid input")),
            AnalysisError::EmptyInput => AppError::BadRequest(anyhow::anyhow!("No input documents")),
            AnalysisError::Document { id, code, message } => AppError::Upstream {
                status: StatusCode::BAD_REQUEST,
                message,
                details: Some(format!("document '{}' failed with code {}", id, code)),
            },
            AnalysisError::Provider(provider_err) => match provider_err {
                ProviderError::Http { status, message } => AppError::Upstream {
                    status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                    message,
                    details: None,
                },
                ProviderError::Timeout(_) => AppError::GatewayTimeout(provider_err.to_string()),
                // No provider status to pass through.
                ProviderError::Network(_)
                | ProviderError::JobFailed(_)
                | ProviderError::InvalidResponse(_)
                | ProviderError::NotConfigured(_) => {
                    AppError::InternalError(anyhow::Error::new(provider_err))
                }
            },
            AnalysisError::Unexpected(e) => AppError::InternalError(e),
        }
    }
}
