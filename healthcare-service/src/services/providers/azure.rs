//! Azure AI Language provider implementation.
//!
//! Runs "Text Analytics for health" as a long-running job: the documents are
//! submitted to `analyze-text/jobs`, then the `operation-location` returned by
//! the service is polled until the job reaches a terminal state.

use super::{DocumentResult, HealthcareProvider, ProviderError};
use crate::models::{ExtractedEntity, TextDocument};
use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::collections::HashMap;
use std::time::Duration;

/// Subscription key header expected by Cognitive Services.
const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Header carrying the job status URL on a 202 response.
const OPERATION_LOCATION_HEADER: &str = "operation-location";

/// Task kind for healthcare entity recognition.
const HEALTHCARE_TASK_KIND: &str = "Healthcare";

/// Kind of the task result entry carrying healthcare results.
const HEALTHCARE_RESULT_KIND: &str = "HealthcareLROResults";

const JOB_DISPLAY_NAME: &str = "healthcare-service";

/// Azure provider configuration.
#[derive(Debug, Clone)]
pub struct AzureHealthConfig {
    pub endpoint: String,
    pub api_key: Secret<String>,
    pub api_version: String,
    pub model_version: String,
    pub default_language: String,
    pub poll_interval: Duration,
}

/// Azure AI Language healthcare provider.
pub struct AzureHealthProvider {
    config: AzureHealthConfig,
    client: Client,
}

impl AzureHealthProvider {
    pub fn new(config: AzureHealthConfig) -> Result<Self, ProviderError> {
        // Overall duration is bounded by the analysis deadline, not here.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    fn jobs_url(&self) -> String {
        format!(
            "{}/language/analyze-text/jobs?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.api_version
        )
    }

    fn build_request<'a>(&'a self, documents: &'a [TextDocument]) -> AnalyzeJobRequest<'a> {
        AnalyzeJobRequest {
            display_name: JOB_DISPLAY_NAME,
            analysis_input: AnalysisInput {
                documents: documents
                    .iter()
                    .map(|doc| MultiLanguageInput {
                        id: &doc.id,
                        text: &doc.text,
                        language: doc
                            .language
                            .as_deref()
                            .unwrap_or(&self.config.default_language),
                    })
                    .collect(),
            },
            tasks: vec![HealthcareTask {
                kind: HEALTHCARE_TASK_KIND,
                task_name: "healthcare",
                parameters: HealthcareTaskParameters {
                    model_version: &self.config.model_version,
                    string_index_type: "UnicodeCodePoint",
                },
            }],
        }
    }

    /// Submit the job and return the URL to poll.
    async fn submit_job(&self, documents: &[TextDocument]) -> Result<String, ProviderError> {
        let request = self.build_request(documents);

        tracing::debug!(
            doc_count = documents.len(),
            model_version = %self.config.model_version,
            "Submitting healthcare analysis job to Azure Language API"
        );

        let response = self
            .client
            .traced_post(&self.jobs_url())
            .header(API_KEY_HEADER, self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ProviderError::InvalidResponse(format!(
                    "job accepted without an {} header",
                    OPERATION_LOCATION_HEADER
                ))
            })
    }

    /// Fetch the job state once, returning the server's requested retry delay.
    async fn fetch_job(
        &self,
        operation_url: &str,
    ) -> Result<(JobState, Option<Duration>), ProviderError> {
        let response = self
            .client
            .traced_get(operation_url)
            .header(API_KEY_HEADER, self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let state: JobState = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse job: {}", e)))?;

        Ok((state, retry_after))
    }

    /// Poll until the job is terminal. Callers bound this with a timeout.
    async fn wait_for_job(&self, operation_url: &str) -> Result<JobState, ProviderError> {
        loop {
            let (state, retry_after) = self.fetch_job(operation_url).await?;
            if state.status.is_terminal() {
                return Ok(state);
            }

            tracing::trace!(status = ?state.status, "Healthcare job still in progress");
            tokio::time::sleep(retry_after.unwrap_or(self.config.poll_interval)).await;
        }
    }
}

#[async_trait]
impl HealthcareProvider for AzureHealthProvider {
    async fn analyze(
        &self,
        documents: &[TextDocument],
        deadline: Duration,
    ) -> Result<Vec<DocumentResult>, ProviderError> {
        let run = async {
            let operation_url = self.submit_job(documents).await?;
            let state = self.wait_for_job(&operation_url).await?;
            collect_results(documents, state)
        };

        match tokio::time::timeout(deadline, run).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(deadline)),
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.endpoint.is_empty() {
            return Err(ProviderError::NotConfigured(
                "Azure Language endpoint not configured".to_string(),
            ));
        }
        if self.config.api_key.expose_secret().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Azure Language API key not configured".to_string(),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "azure-language"
    }
}

/// Map a non-success response to `ProviderError::Http`, keeping the
/// provider's status and message.
async fn http_error(response: Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => format!("({}) {}", envelope.error.code, envelope.error.message),
        Err(_) if body.trim().is_empty() => {
            format!("Azure Language API returned status {}", status)
        }
        Err(_) => body,
    };

    ProviderError::Http { status, message }
}

/// Turn a terminal job into one result per input document, in input order.
fn collect_results(
    documents: &[TextDocument],
    state: JobState,
) -> Result<Vec<DocumentResult>, ProviderError> {
    if matches!(state.status, JobStatus::Failed | JobStatus::Cancelled) {
        return Err(ProviderError::JobFailed(job_failure_message(
            state.status,
            &state.errors,
        )));
    }

    let task = state
        .tasks
        .and_then(|tasks| {
            let mut items = tasks.items.into_iter();
            let first = items.next()?;
            if first.kind == HEALTHCARE_RESULT_KIND {
                Some(first)
            } else {
                items
                    .find(|item| item.kind == HEALTHCARE_RESULT_KIND)
                    .or(Some(first))
            }
        })
        .ok_or_else(|| ProviderError::InvalidResponse("job has no healthcare task".to_string()))?;

    if task.status == JobStatus::Failed {
        return Err(ProviderError::JobFailed(job_failure_message(
            task.status,
            &state.errors,
        )));
    }

    let results = task.results.ok_or_else(|| {
        ProviderError::InvalidResponse("healthcare task has no results".to_string())
    })?;

    let mut by_id: HashMap<String, DocumentResult> = HashMap::new();
    for doc in results.documents {
        let entities = doc
            .entities
            .into_iter()
            .map(|e| ExtractedEntity {
                text: e.text,
                category: e.category,
                confidence: e.confidence_score,
            })
            .collect();
        by_id.insert(
            doc.id.clone(),
            DocumentResult::Entities {
                id: doc.id,
                entities,
            },
        );
    }
    for item in results.errors {
        let detail = item.error.innermost();
        by_id.insert(
            item.id.clone(),
            DocumentResult::Error {
                id: item.id,
                code: detail.code.clone(),
                message: detail.message.clone(),
            },
        );
    }

    documents
        .iter()
        .map(|doc| {
            by_id.remove(&doc.id).ok_or_else(|| {
                ProviderError::InvalidResponse(format!("no result for document '{}'", doc.id))
            })
        })
        .collect()
}

fn job_failure_message(status: JobStatus, errors: &[ApiError]) -> String {
    if errors.is_empty() {
        return format!("job finished with status {:?}", status);
    }
    errors
        .iter()
        .map(|e| {
            let inner = e.innermost();
            format!("({}) {}", inner.code, inner.message)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Azure Language API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeJobRequest<'a> {
    display_name: &'a str,
    analysis_input: AnalysisInput<'a>,
    tasks: Vec<HealthcareTask<'a>>,
}

#[derive(Debug, Serialize)]
struct AnalysisInput<'a> {
    documents: Vec<MultiLanguageInput<'a>>,
}

#[derive(Debug, Serialize)]
struct MultiLanguageInput<'a> {
    id: &'a str,
    text: &'a str,
    language: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthcareTask<'a> {
    kind: &'a str,
    task_name: &'a str,
    parameters: HealthcareTaskParameters<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthcareTaskParameters<'a> {
    model_version: &'a str,
    string_index_type: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
enum JobStatus {
    NotStarted,
    Running,
    Succeeded,
    PartiallyCompleted,
    Failed,
    Cancelling,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded
                | JobStatus::PartiallyCompleted
                | JobStatus::Failed
                | JobStatus::Cancelled
        )
    }
}

#[derive(Debug, Deserialize)]
struct JobState {
    status: JobStatus,
    #[serde(default)]
    errors: Vec<ApiError>,
    #[serde(default)]
    tasks: Option<TaskState>,
}

#[derive(Debug, Deserialize)]
struct TaskState {
    #[serde(default)]
    items: Vec<HealthcareTaskItem>,
}

#[derive(Debug, Deserialize)]
struct HealthcareTaskItem {
    #[serde(default)]
    kind: String,
    status: JobStatus,
    #[serde(default)]
    results: Option<HealthcareResults>,
}

#[derive(Debug, Deserialize)]
struct HealthcareResults {
    #[serde(default)]
    documents: Vec<DocumentEntities>,
    #[serde(default)]
    errors: Vec<DocumentErrorItem>,
}

#[derive(Debug, Deserialize)]
struct DocumentEntities {
    id: String,
    #[serde(default)]
    entities: Vec<ApiEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEntity {
    text: String,
    category: String,
    confidence_score: f64,
}

#[derive(Debug, Deserialize)]
struct DocumentErrorItem {
    id: String,
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    message: String,
    #[serde(default)]
    innererror: Option<Box<ApiError>>,
}

impl ApiError {
    fn innermost(&self) -> &ApiError {
        let mut current = self;
        while let Some(inner) = current.innererror.as_deref() {
            current = inner;
        }
        current
    }
}
