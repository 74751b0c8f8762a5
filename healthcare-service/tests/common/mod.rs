#![allow(dead_code)]

use healthcare_service::config::{
    AnalysisConfig, AzureLanguageConfig, CorsConfig, HealthcareConfig,
};
use healthcare_service::services::providers::{HealthcareProvider, MockHealthcareProvider};
use healthcare_service::services::HealthAnalyzer;
use healthcare_service::startup::{build_router, AppState, Application};
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use std::time::Duration;

/// Configuration that never needs the environment.
pub fn test_config() -> HealthcareConfig {
    HealthcareConfig {
        common: CoreConfig { port: 0 }, // Random port for testing
        azure: AzureLanguageConfig {
            endpoint: "https://test.cognitiveservices.azure.com".to_string(),
            api_key: Secret::new("test-key".to_string()),
            api_version: "2023-04-01".to_string(),
            model_version: "latest".to_string(),
            default_language: "en".to_string(),
        },
        analysis: AnalysisConfig::default(),
        cors: CorsConfig::default(),
    }
}

/// Router wired to `provider`, for `oneshot` tests.
pub fn test_router(provider: Arc<dyn HealthcareProvider>) -> axum::Router {
    test_router_with_timeout(provider, Duration::from_secs(5))
}

pub fn test_router_with_timeout(
    provider: Arc<dyn HealthcareProvider>,
    timeout: Duration,
) -> axum::Router {
    build_router(AppState {
        config: Arc::new(test_config()),
        analyzer: HealthAnalyzer::new(provider, timeout),
    })
}

/// Mock that knows a handful of clinical terms.
pub fn clinical_provider() -> Arc<MockHealthcareProvider> {
    Arc::new(MockHealthcareProvider::with_terms(vec![
        ("10mg", "Dosage", 0.99),
        ("aspirin", "MedicationName", 0.95),
        ("daily", "Frequency", 0.9),
        ("fever", "SymptomOrSign", 0.88),
    ]))
}

pub struct TestApp {
    pub http_address: String,
    pub http_port: u16,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_provider(clinical_provider()).await
    }

    pub async fn spawn_with_provider(provider: Arc<dyn HealthcareProvider>) -> Self {
        let app = Application::build_with_provider(test_config(), provider)
            .await
            .expect("Failed to build test application");

        let http_port = app.http_port();
        let http_address = format!("http://127.0.0.1:{}", http_port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", http_address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            http_address,
            http_port,
        }
    }
}
