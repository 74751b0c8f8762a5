//! Mock provider implementation for testing.

use super::{DocumentResult, HealthcareProvider, ProviderError};
use crate::models::{ExtractedEntity, TextDocument};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

type Handler =
    dyn Fn(&[TextDocument]) -> Result<Vec<DocumentResult>, ProviderError> + Send + Sync;

/// Mock healthcare provider driven by a closure.
pub struct MockHealthcareProvider {
    enabled: bool,
    delay: Option<Duration>,
    handler: Box<Handler>,
    call_count: AtomicU64,
}

impl MockHealthcareProvider {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&[TextDocument]) -> Result<Vec<DocumentResult>, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            enabled: true,
            delay: None,
            handler: Box::new(handler),
            call_count: AtomicU64::new(0),
        }
    }

    /// Provider that finds no entities in any document.
    pub fn empty() -> Self {
        Self::new(|documents| {
            Ok(documents
                .iter()
                .map(|doc| DocumentResult::Entities {
                    id: doc.id.clone(),
                    entities: Vec::new(),
                })
                .collect())
        })
    }

    /// Provider that recognises a fixed `(term, category, confidence)` list
    /// by substring match, reporting entities in term order.
    pub fn with_terms(terms: Vec<(&'static str, &'static str, f64)>) -> Self {
        Self::new(move |documents| {
            Ok(documents
                .iter()
                .map(|doc| DocumentResult::Entities {
                    id: doc.id.clone(),
                    entities: terms
                        .iter()
                        .filter(|(term, _, _)| doc.text.contains(term))
                        .map(|(term, category, confidence)| ExtractedEntity {
                            text: term.to_string(),
                            category: category.to_string(),
                            confidence: *confidence,
                        })
                        .collect(),
                })
                .collect())
        })
    }

    /// Provider whose every call fails with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Delay each call, e.g. to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthcareProvider for MockHealthcareProvider {
    async fn analyze(
        &self,
        documents: &[TextDocument],
        _deadline: Duration,
    ) -> Result<Vec<DocumentResult>, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock healthcare provider not enabled".to_string(),
            ));
        }

        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        tracing::info!(doc_count = documents.len(), "[MOCK] Healthcare analysis");

        (self.handler)(documents)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock healthcare provider not enabled".to_string(),
            ))
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
