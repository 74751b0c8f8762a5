mod common;

use common::TestApp;
use healthcare_service::services::providers::MockHealthcareProvider;
use reqwest::Client;
use service_core::observability::init_metrics;
use std::sync::Arc;

#[tokio::test]
async fn index_returns_liveness_text() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .get(&app.http_address)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.expect("Failed to read body");
    assert_eq!(body, "Healthcare API is running!");
}

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .get(&format!("{}/health", app.http_address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "healthcare-service");
}

#[tokio::test]
async fn readiness_check_works() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .get(&format!("{}/ready", app.http_address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn readiness_fails_when_provider_unavailable() {
    let provider = Arc::new(MockHealthcareProvider::empty().disabled());
    let app = TestApp::spawn_with_provider(provider).await;
    let client = Client::new();

    let response = client
        .get(&format!("{}/ready", app.http_address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 503);
}

#[tokio::test]
async fn analyze_over_http_returns_entities() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(&format!("{}/analyze-health", app.http_address))
        .json(&serde_json::json!({"documents": ["Patient takes 10mg aspirin daily"]}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    assert!(response.headers().contains_key("x-request-id"));

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["entities"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["entities"][1]["text"], "aspirin");
    assert_eq!(body["entities"][1]["category"], "MedicationName");
}

#[tokio::test]
async fn metrics_endpoint_returns_prometheus_format() {
    init_metrics().expect("Failed to initialize metrics");
    let app = TestApp::spawn().await;
    let client = Client::new();

    client
        .post(&format!("{}/analyze-health", app.http_address))
        .json(&serde_json::json!({"documents": ["fever"]}))
        .send()
        .await
        .expect("Failed to execute request");

    let response = client
        .get(&format!("{}/metrics", app.http_address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let content_type = response
        .headers()
        .get("content-type")
        .expect("Missing content-type header")
        .to_str()
        .expect("Invalid content-type");
    assert!(content_type.starts_with("text/plain"));

    let body = response.text().await.expect("Failed to get response body");
    assert!(
        body.contains("healthcare_analysis_requests_total"),
        "Unexpected metrics output: {}",
        body
    );
}
