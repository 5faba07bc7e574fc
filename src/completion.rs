use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::{EndpointConfig, ModelConfig};
use crate::error::ProviderError;

#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a ModelConfig,
    pub system: &'a str,
    pub user: &'a str,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint. Built once
/// and shared; the endpoint itself is supplied per call.
#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
}

impl CompletionClient {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub async fn complete(
        &self,
        endpoint: &EndpointConfig,
        request: &CompletionRequest<'_>,
    ) -> Result<String, ProviderError> {
        #[derive(Serialize)]
        struct ChatReq<'a> {
            model: &'a str,
            messages: [ChatMessage<'a>; 2],
            temperature: f32,
            max_tokens: usize,
        }

        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct ChatResp {
            #[serde(default)]
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: Option<ChoiceMessage>,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: Option<String>,
        }

        let response = self
            .client
            .post(completions_url(&endpoint.base_url))
            .bearer_auth(&endpoint.api_key)
            .json(&ChatReq {
                model: &request.model.model,
                messages: [
                    ChatMessage {
                        role: "system",
                        content: request.system,
                    },
                    ChatMessage {
                        role: "user",
                        content: request.user,
                    },
                ],
                temperature: request.model.temperature,
                max_tokens: request.model.max_tokens,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, normalize_err_body(&body)));
        }

        let response = response
            .json::<ChatResp>()
            .await
            .map_err(|err| ProviderError::Decode(err.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();

        let content = content.trim();
        if content.is_empty() {
            return Err(ProviderError::EmptyCompletion);
        }

        Ok(content.to_string())
    }
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn classify_status(status: StatusCode, body: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED => ProviderError::InvalidCredential(body),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(body),
        s if s.is_server_error() => ProviderError::ProviderFault {
            status: s.as_u16(),
            body,
        },
        s => ProviderError::UnexpectedStatus {
            status: s.as_u16(),
            body,
        },
    }
}

fn normalize_err_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let error = json.get("error");
        if let Some(message) = error
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .or_else(|| error.and_then(|v| v.as_str()))
        {
            return message.to_string();
        }
    }

    trimmed.to_string()
}
