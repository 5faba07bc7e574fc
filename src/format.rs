use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::completion::{CompletionClient, CompletionRequest};
use crate::config::AppConfig;
use crate::error::{FormatError, ProviderError};
use crate::models::NormalizedResult;
use crate::normalize::normalize;
use crate::prompt::{build_user_prompt, SYSTEM_PROMPT};

#[derive(Clone)]
pub struct FormatService {
    config: AppConfig,
    client: CompletionClient,
    generation_limit: Arc<Semaphore>,
}

impl FormatService {
    pub fn new(config: AppConfig, generation_limit: Arc<Semaphore>) -> Result<Self, ProviderError> {
        let client = CompletionClient::new(config.request_timeout())?;
        Ok(Self {
            config,
            client,
            generation_limit,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Validates the untyped `text` field of a request before formatting it.
    pub async fn format(&self, text: &Value) -> Result<NormalizedResult, FormatError> {
        let text = text
            .as_str()
            .ok_or(FormatError::InvalidInput("text must be a string"))?;
        self.format_text(text).await
    }

    pub async fn format_text(&self, text: &str) -> Result<NormalizedResult, FormatError> {
        if text.trim().is_empty() {
            return Err(FormatError::InvalidInput("text is empty"));
        }

        let endpoint = self.config.endpoint().inspect_err(|err| {
            tracing::error!("refusing to call completion endpoint: {}", err);
        })?;

        let request_id = Uuid::new_v4();
        let started = Instant::now();
        let lines = text.lines().filter(|line| !line.trim().is_empty()).count();

        let user_prompt = build_user_prompt(text);
        let request = CompletionRequest {
            model: &self.config.model,
            system: SYSTEM_PROMPT,
            user: &user_prompt,
        };

        let reply = {
            let _permit = self.generation_limit.acquire().await?;
            self.client.complete(&endpoint, &request).await
        };

        let reply = match reply {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(
                    %request_id,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "completion call failed: {}",
                    err
                );
                return Err(err.into());
            }
        };

        let result = normalize(&reply);
        tracing::info!(
            %request_id,
            lines,
            status = result.status.as_str(),
            changes = result.changes.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "formatted references"
        );

        Ok(result)
    }
}
