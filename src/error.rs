use axum::http::StatusCode;
use thiserror::Error;

/// Failures talking to the completion endpoint. The payloads are for logs
/// only; callers see [`FormatError::user_message`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider rejected the API key: {0}")]
    InvalidCredential(String),
    #[error("provider rate limited the request: {0}")]
    RateLimited(String),
    #[error("provider fault ({status}): {body}")]
    ProviderFault { status: u16, body: String },
    #[error("provider returned {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("failed to reach completion endpoint: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode completion response: {0}")]
    Decode(String),
    #[error("completion endpoint returned an empty result")]
    EmptyCompletion,
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("missing endpoint configuration: {0}")]
    Misconfigured(&'static str),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("generation limiter closed")]
    LimiterClosed(#[from] tokio::sync::AcquireError),
}

impl FormatError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FormatError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            FormatError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FormatError::Provider(ProviderError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            FormatError::Provider(
                ProviderError::InvalidCredential(_) | ProviderError::ProviderFault { .. },
            ) => StatusCode::BAD_GATEWAY,
            FormatError::Provider(_) | FormatError::LimiterClosed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Fixed, user-facing wording. Never includes provider payloads.
    pub fn user_message(&self) -> &'static str {
        match self {
            FormatError::InvalidInput(_) => "please provide valid reference text",
            FormatError::Misconfigured(_) => "server configuration error, please try again later",
            FormatError::Provider(ProviderError::InvalidCredential(_)) => "invalid API key",
            FormatError::Provider(ProviderError::RateLimited(_)) => {
                "too many requests, please try again later"
            }
            FormatError::Provider(ProviderError::ProviderFault { .. }) => {
                "model provider error, please try again later"
            }
            FormatError::Provider(_) | FormatError::LimiterClosed(_) => {
                "server error, please try again later"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_details_stay_out_of_user_message() {
        let err = FormatError::from(ProviderError::ProviderFault {
            status: 503,
            body: "upstream node-7 exploded".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!err.user_message().contains("node-7"));
        assert!(err.to_string().contains("node-7"));
    }

    #[test]
    fn categories_map_to_distinct_messages() {
        let credential = FormatError::from(ProviderError::InvalidCredential(String::new()));
        let limited = FormatError::from(ProviderError::RateLimited(String::new()));
        let empty = FormatError::from(ProviderError::EmptyCompletion);

        assert_eq!(credential.user_message(), "invalid API key");
        assert_eq!(limited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(empty.user_message(), "server error, please try again later");
        assert_eq!(
            FormatError::InvalidInput("blank").status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
