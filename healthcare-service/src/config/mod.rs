use reqwest::Url;
use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{self as core_config, get_env, get_env_any};
use service_core::error::AppError;
use std::time::Duration;

/// Default bound on a single analysis, begin to completion.
const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Default delay between polls of the analysis job.
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthcareConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub azure: AzureLanguageConfig,
    pub analysis: AnalysisConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureLanguageConfig {
    /// Language resource endpoint, e.g. https://<resource>.cognitiveservices.azure.com
    pub endpoint: String,
    pub api_key: Secret<String>,
    pub api_version: String,
    /// Healthcare model version, "latest" unless pinned.
    pub model_version: String,
    /// Language applied to documents that do not name one.
    pub default_language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub timeout_seconds: u64,
    pub poll_interval_ms: u64,
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Empty means any origin is allowed.
    pub allowed_origins: Vec<String>,
}

impl HealthcareConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = core_config::is_production();

        // Endpoint and key have no defaults: a missing value is fatal at startup.
        let endpoint = get_env_any(&["AZURE_LANGUAGE_ENDPOINT", "ENDPOINT"], None, false)?;
        validate_endpoint(&endpoint)?;
        let api_key = get_env_any(&["AZURE_LANGUAGE_API_KEY", "API_KEY"], None, false)?;
        if api_key.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "AZURE_LANGUAGE_API_KEY is set but empty"
            )));
        }

        Ok(HealthcareConfig {
            common: common_config,
            azure: AzureLanguageConfig {
                endpoint,
                api_key: Secret::new(api_key),
                api_version: get_env("AZURE_LANGUAGE_API_VERSION", Some("2023-04-01"), is_prod)?,
                model_version: get_env("HEALTHCARE_MODEL_VERSION", Some("latest"), is_prod)?,
                default_language: get_env("HEALTHCARE_DEFAULT_LANGUAGE", Some("en"), is_prod)?,
            },
            analysis: AnalysisConfig {
                timeout_seconds: parse_number(
                    "HEALTHCARE_TIMEOUT_SECONDS",
                    &get_env(
                        "HEALTHCARE_TIMEOUT_SECONDS",
                        Some(&DEFAULT_TIMEOUT_SECONDS.to_string()),
                        is_prod,
                    )?,
                )?,
                poll_interval_ms: parse_number(
                    "HEALTHCARE_POLL_INTERVAL_MS",
                    &get_env(
                        "HEALTHCARE_POLL_INTERVAL_MS",
                        Some(&DEFAULT_POLL_INTERVAL_MS.to_string()),
                        is_prod,
                    )?,
                )?,
            },
            cors: CorsConfig {
                allowed_origins: parse_origins(&get_env(
                    "CORS_ALLOWED_ORIGINS",
                    Some(""),
                    false,
                )?),
            },
        })
    }
}

/// The provider endpoint must be an absolute https URL.
pub fn validate_endpoint(endpoint: &str) -> Result<(), AppError> {
    let url = Url::parse(endpoint).map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!(
            "AZURE_LANGUAGE_ENDPOINT is not a valid URL: {}",
            e
        ))
    })?;

    if url.scheme() != "https" {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "AZURE_LANGUAGE_ENDPOINT must use https, got '{}'",
            url.scheme()
        )));
    }

    Ok(())
}

fn parse_number(key: &str, raw: &str) -> Result<u64, AppError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} must be a positive integer, got '{}'",
            key,
            raw
        ))),
        Ok(n) => Ok(n),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
