use crate::models::{AnalyzeHealthRequest, AnalyzeHealthResponse, ExtractedEntity};
use crate::services::{metrics, AnalysisError};
use crate::startup::AppState;
use axum::{body::Bytes, extract::State, Json};
use service_core::error::AppError;

/// `POST /analyze-health`: extract healthcare entities from a batch of documents.
///
/// The body is taken as raw bytes so malformed JSON is reported as invalid
/// input rather than by the extractor's own rejection.
#[tracing::instrument(skip(state, body), fields(body_len = body.len()))]
pub async fn analyze_health(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalyzeHealthResponse>, AppError> {
    tracing::debug!("Received request for healthcare entity analysis");
    tracing::trace!(payload = %String::from_utf8_lossy(&body), "Request data");

    let outcome = run_analysis(&state, &body).await;
    metrics::record_analysis(match &outcome {
        Ok(_) => "success",
        Err(e) => e.kind(),
    });

    let entities = outcome?;
    Ok(Json(AnalyzeHealthResponse { entities }))
}

async fn run_analysis(
    state: &AppState,
    body: &[u8],
) -> Result<Vec<ExtractedEntity>, AnalysisError> {
    let request = AnalyzeHealthRequest::parse(body).map_err(|e| {
        match &e {
            AnalysisError::InvalidInput { reason } => {
                tracing::warn!(reason = %reason, "Invalid analysis request")
            }
            _ => tracing::warn!("No documents provided"),
        }
        e
    })?;

    let documents = request.text_documents();
    tracing::debug!(doc_count = documents.len(), "Submitting documents for analysis");

    state.analyzer.analyze(&documents).await
}
