//! Anthropic API client implementation

use crate::{
    error::ClaudeError,
    messages::{MessagesRequest, MessagesResponse},
};
use reqwest::{Client, StatusCode};

/// Production endpoint of the Messages API.
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1";

/// API version sent with every request.
pub const API_VERSION: &str = "2023-06-01";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Anthropic API client
///
/// Cheap to clone: clones share one connection pool.
#[derive(Clone)]
pub struct AnthropicClient {
    http: Client,
    api_key: String,
    api_url: String,
}

impl AnthropicClient {
    /// Create a client with the key from `ANTHROPIC_API_KEY`
    ///
    /// # Errors
    ///
    /// Returns `ClaudeError::MissingApiKey` if the variable is unset or empty
    pub fn from_env() -> Result<Self, ClaudeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create a client with the key found by `lookup`
    ///
    /// # Errors
    ///
    /// Returns `ClaudeError::MissingApiKey` if the key is absent or blank
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClaudeError> {
        lookup(API_KEY_VAR)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(Self::new)
            .ok_or(ClaudeError::MissingApiKey)
    }

    /// Create a client with an explicit API key
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Point the client at another base URL (a proxy or a test server)
    #[must_use]
    pub fn with_base_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send one non-streaming Messages request
    ///
    /// # Errors
    ///
    /// `RequestFailed` when the server cannot be reached, `RateLimited` and
    /// `Unauthorized` for 429 and 401, `ApiError` for any other non-success
    /// status, and `ResponseParseFailed` when a 200 body is not a response.
    pub async fn messages(&self, request: MessagesRequest) -> Result<MessagesResponse, ClaudeError> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Sending messages request"
        );

        let response = self
            .http
            .post(format!("{}/messages", self.api_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClaudeError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Messages request refused");
            return Err(status_error(status, body));
        }

        let parsed = response
            .json::<MessagesResponse>()
            .await
            .map_err(|e| ClaudeError::ResponseParseFailed(e.to_string()))?;
        tracing::debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            stop_reason = ?parsed.stop_reason,
            "Messages response received"
        );
        Ok(parsed)
    }
}

fn status_error(status: StatusCode, body: String) -> ClaudeError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ClaudeError::RateLimited,
        StatusCode::UNAUTHORIZED => ClaudeError::Unauthorized,
        other => ClaudeError::ApiError {
            status: other.as_u16(),
            message: body,
        },
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_client_targets_production() {
        let client = AnthropicClient::new("test-key".to_string());
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let client = AnthropicClient::new("k".to_string()).with_base_url("http://localhost:9/v1/");
        assert_eq!(client.api_url, "http://localhost:9/v1");
    }

    #[test]
    fn blank_key_is_missing() {
        let result = AnthropicClient::from_lookup(|_| Some("   ".to_string()));
        assert!(matches!(result, Err(ClaudeError::MissingApiKey)));

        let result = AnthropicClient::from_lookup(|_| None);
        assert!(matches!(result, Err(ClaudeError::MissingApiKey)));
    }

    #[test]
    fn key_is_trimmed() {
        let client = AnthropicClient::from_lookup(|key| {
            (key == API_KEY_VAR).then(|| " sk-test\n".to_string())
        });
        assert!(matches!(client, Ok(c) if c.api_key == "sk-test"));
    }

    #[test]
    fn statuses_map_to_errors() {
        assert_eq!(
            status_error(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ClaudeError::RateLimited
        );
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            ClaudeError::Unauthorized
        );
        assert_eq!(
            status_error(StatusCode::BAD_REQUEST, "bad tool".into()),
            ClaudeError::ApiError {
                status: 400,
                message: "bad tool".into()
            }
        );
    }
}
