use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::FormatError;

#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: ModelConfig,
    pub max_concurrent: usize,
    pub request_timeout_secs: u64,
}

/// Credential and address of the completion endpoint, checked to be usable.
#[derive(Clone, Debug)]
pub struct EndpointConfig {
    pub api_key: String,
    pub base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("FORMATTER_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            api_key: env::var("OPENAI_API_KEY").ok(),
            base_url: env::var("OPENAI_BASE_URL").ok(),
            model: ModelConfig {
                model: env::var("FORMATTER_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string()),
                temperature: env::var("FORMATTER_TEMPERATURE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.3),
                max_tokens: env::var("FORMATTER_MAX_TOKENS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(4_000),
            },
            max_concurrent: positive_value(env::var("FORMATTER_MAX_CONCURRENT").ok().as_deref(), 4),
            request_timeout_secs: positive_value(
                env::var("FORMATTER_REQUEST_TIMEOUT_SECS").ok().as_deref(),
                60,
            ),
        }
    }

    /// Builds a config pointing at `base_url` with library defaults, without
    /// reading the environment.
    pub fn for_endpoint(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            api_key: Some(api_key.into()),
            base_url: Some(base_url.into()),
            model: ModelConfig {
                model: "deepseek-chat".to_string(),
                temperature: 0.3,
                max_tokens: 4_000,
            },
            max_concurrent: 4,
            request_timeout_secs: 60,
        }
    }

    /// Both values must be set and the base URL must not be blank.
    pub fn endpoint(&self) -> Result<EndpointConfig, FormatError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(FormatError::Misconfigured("OPENAI_API_KEY is not set"))?;
        let base_url = self
            .base_url
            .as_deref()
            .ok_or(FormatError::Misconfigured("OPENAI_BASE_URL is not set"))?
            .trim();
        if base_url.is_empty() {
            return Err(FormatError::Misconfigured("OPENAI_BASE_URL is blank"));
        }

        Ok(EndpointConfig {
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Zero, negative and unparseable values fall back to `default`.
fn positive_value<T>(raw: Option<&str>, default: T) -> T
where
    T: FromStr + PartialOrd + Default,
{
    raw.and_then(|v| v.trim().parse().ok())
        .filter(|n: &T| *n > T::default())
        .unwrap_or(default)
}
