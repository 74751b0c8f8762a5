//! Application startup and lifecycle management.

use crate::config::{CorsConfig, HealthcareConfig};
use crate::handlers::{analyze_health, health_check, index, metrics_endpoint, readiness_check};
use crate::services::providers::{AzureHealthConfig, AzureHealthProvider, HealthcareProvider};
use crate::services::HealthAnalyzer;
use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    security_headers::security_headers_middleware,
    tracing::{http_trace_layer, request_id_middleware, REQUEST_ID_HEADER},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<HealthcareConfig>,
    pub analyzer: HealthAnalyzer,
}

impl AppState {
    pub fn new(config: HealthcareConfig, provider: Arc<dyn HealthcareProvider>) -> Self {
        let analyzer = HealthAnalyzer::new(provider, config.analysis.timeout());
        Self {
            config: Arc::new(config),
            analyzer,
        }
    }
}

/// Build the HTTP router with all middleware applied.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/", get(index))
        .route("/analyze-health", post(analyze_health))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(http_trace_layer::<Body>())
        // Outside the trace layer so the span sees the id.
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    if cors.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application backed by Azure AI Language.
    pub async fn build(config: HealthcareConfig) -> Result<Self, AppError> {
        let provider = AzureHealthProvider::new(AzureHealthConfig {
            endpoint: config.azure.endpoint.clone(),
            api_key: config.azure.api_key.clone(),
            api_version: config.azure.api_version.clone(),
            model_version: config.azure.model_version.clone(),
            default_language: config.azure.default_language.clone(),
            poll_interval: config.analysis.poll_interval(),
        })
        .map_err(|e| {
            tracing::error!("Failed to initialize Azure Language provider: {}", e);
            AppError::ConfigError(anyhow::Error::new(e))
        })?;

        tracing::info!(
            endpoint = %config.azure.endpoint,
            api_version = %config.azure.api_version,
            model_version = %config.azure.model_version,
            "Initialized Azure Language healthcare provider"
        );

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application with an explicit provider (tests use the mock).
    pub async fn build_with_provider(
        config: HealthcareConfig,
        provider: Arc<dyn HealthcareProvider>,
    ) -> Result<Self, AppError> {
        // Bind HTTP listener (port 0 = random port for testing)
        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", http_addr, e);
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(
            provider = provider.name(),
            timeout_secs = config.analysis.timeout_seconds,
            "Healthcare service: HTTP on port {}",
            http_port
        );

        Ok(Self {
            http_port,
            http_listener,
            state: AppState::new(config, provider),
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Run the application until a shutdown signal is received.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.http_listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
