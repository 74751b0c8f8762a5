//! Delegation of a validated batch to the healthcare provider.

use super::error::AnalysisError;
use super::metrics;
use super::providers::{DocumentResult, HealthcareProvider, ProviderError};
use crate::models::{ExtractedEntity, TextDocument};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Immutable handle to the provider plus the per-request time bound.
#[derive(Clone)]
pub struct HealthAnalyzer {
    provider: Arc<dyn HealthcareProvider>,
    timeout: Duration,
}

impl HealthAnalyzer {
    pub fn new(provider: Arc<dyn HealthcareProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one analysis and flatten the entities of all documents.
    ///
    /// The provider call is bounded by the configured timeout whatever the
    /// provider does internally.
    #[tracing::instrument(skip(self, documents), fields(provider = self.provider.name(), doc_count = documents.len()))]
    pub async fn analyze(
        &self,
        documents: &[TextDocument],
    ) -> Result<Vec<ExtractedEntity>, AnalysisError> {
        let provider_name = self.provider.name();
        metrics::record_documents(provider_name, documents.len());

        let start = Instant::now();
        let outcome = tokio::time::timeout(
            self.timeout,
            self.provider.analyze(documents, self.timeout),
        )
        .await
        .unwrap_or(Err(ProviderError::Timeout(self.timeout)));
        let elapsed = start.elapsed();
        metrics::record_provider_latency(provider_name, elapsed.as_secs_f64());

        let results = outcome.map_err(|e| {
            metrics::record_provider_error(provider_name, e.kind());
            tracing::error!(
                error = %e,
                elapsed_ms = elapsed.as_millis() as u64,
                "Healthcare provider call failed"
            );
            e
        })?;

        if results.len() != documents.len() {
            return Err(AnalysisError::Unexpected(anyhow::anyhow!(
                "provider returned {} results for {} documents",
                results.len(),
                documents.len()
            )));
        }

        let entities = aggregate_entities(results)?;
        metrics::record_entities(entities.len());

        tracing::debug!(
            entity_count = entities.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Extracted healthcare entities"
        );

        Ok(entities)
    }

    pub async fn health_check(&self) -> Result<(), ProviderError> {
        self.provider.health_check().await
    }
}

/// Flatten per-document entities in document order, then entity order.
///
/// The first document error fails the whole batch and no entities from
/// other documents are returned.
pub fn aggregate_entities(
    results: Vec<DocumentResult>,
) -> Result<Vec<ExtractedEntity>, AnalysisError> {
    let mut entities = Vec::new();
    for result in results {
        match result {
            DocumentResult::Entities {
                entities: found, ..
            } => entities.extend(found),
            DocumentResult::Error { id, code, message } => {
                tracing::warn!(
                    document_id = %id,
                    code = %code,
                    "Document failed analysis, discarding batch"
                );
                return Err(AnalysisError::Document { id, code, message });
            }
        }
    }
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::MockHealthcareProvider;

    fn entity(text: &str, category: &str, confidence: f64) -> ExtractedEntity {
        ExtractedEntity {
            text: text.to_string(),
            category: category.to_string(),
            confidence,
        }
    }

    fn docs(texts: &[&str]) -> Vec<TextDocument> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| TextDocument {
                id: i.to_string(),
                text: t.to_string(),
                language: None,
            })
            .collect()
    }

    #[test]
    fn test_aggregate_preserves_document_then_entity_order() {
        let results = vec![
            DocumentResult::Entities {
                id: "0".into(),
                entities: vec![entity("10mg", "Dosage", 0.99), entity("aspirin", "MedicationName", 0.95)],
            },
            DocumentResult::Entities {
                id: "1".into(),
                entities: vec![],
            },
            DocumentResult::Entities {
                id: "2".into(),
                entities: vec![entity("fever", "SymptomOrSign", 0.9)],
            },
        ];

        let entities = aggregate_entities(results).unwrap();
        let texts: Vec<_> = entities.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["10mg", "aspirin", "fever"]);
    }

    #[test]
    fn test_aggregate_fails_whole_batch_on_document_error() {
        let results = vec![
            DocumentResult::Entities {
                id: "0".into(),
                entities: vec![entity("aspirin", "MedicationName", 0.95)],
            },
            DocumentResult::Error {
                id: "1".into(),
                code: "InvalidDocument".into(),
                message: "Document text is empty.".into(),
            },
            DocumentResult::Entities {
                id: "2".into(),
                entities: vec![entity("fever", "SymptomOrSign", 0.9)],
            },
        ];

        match aggregate_entities(results) {
            Err(AnalysisError::Document { id, message, .. }) => {
                assert_eq!(id, "1");
                assert_eq!(message, "Document text is empty.");
            }
            other => panic!("expected document error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_analyze_flattens_provider_results() {
        let provider = Arc::new(MockHealthcareProvider::with_terms(vec![
            ("aspirin", "MedicationName", 0.95),
            ("fever", "SymptomOrSign", 0.9),
        ]));
        let analyzer = HealthAnalyzer::new(provider.clone(), Duration::from_secs(5));

        let entities = analyzer
            .analyze(&docs(&["fever since monday", "takes aspirin for fever"]))
            .await
            .unwrap();

        assert_eq!(
            entities,
            vec![
                entity("fever", "SymptomOrSign", 0.9),
                entity("aspirin", "MedicationName", 0.95),
                entity("fever", "SymptomOrSign", 0.9),
            ]
        );
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_analyze_times_out_slow_provider() {
        let provider = Arc::new(
            MockHealthcareProvider::empty().with_delay(Duration::from_millis(500)),
        );
        let analyzer = HealthAnalyzer::new(provider, Duration::from_millis(50));

        let err = analyzer.analyze(&docs(&["text"])).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Provider(ProviderError::Timeout(d)) if d == Duration::from_millis(50)
        ));
    }

    #[tokio::test]
    async fn test_analyze_passes_provider_error_through() {
        let provider = Arc::new(MockHealthcareProvider::failing(ProviderError::Http {
            status: 401,
            message: "(401) Access denied".to_string(),
        }));
        let analyzer = HealthAnalyzer::new(provider, Duration::from_secs(5));

        let err = analyzer.analyze(&docs(&["text"])).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Provider(ProviderError::Http { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_analyze_rejects_result_count_mismatch() {
        let provider = Arc::new(MockHealthcareProvider::new(|_| Ok(Vec::new())));
        let analyzer = HealthAnalyzer::new(provider, Duration::from_secs(5));

        let err = analyzer.analyze(&docs(&["a", "b"])).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Unexpected(_)));
    }
}
