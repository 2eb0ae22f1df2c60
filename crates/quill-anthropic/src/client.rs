// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Anthropic Messages API.
//!
//! Provides [`AnthropicClient`], which handles request construction,
//! authentication, and classification of every failure into a
//! [`CompletionError`]. It never retries; a failed call is reported as is.

use std::time::Duration;

use quill_core::CompletionError;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{ApiErrorResponse, MessageRequest, MessageResponse};

/// Default endpoint of the Anthropic Messages API.
pub const API_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

/// HTTP client for Anthropic API communication.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
}

impl AnthropicClient {
    /// Creates a client with authentication headers and a per-request timeout.
    pub fn new(
        api_key: &str,
        api_version: &str,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).map_err(|e| {
            CompletionError::Configuration(format!("invalid API key header value: {e}"))
        })?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(api_version).map_err(|e| {
                CompletionError::Configuration(format!("invalid API version header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                CompletionError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Overrides the endpoint (proxies, wiremock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a non-streaming request and returns the full response.
    pub async fn send_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, CompletionError> {
        let response = self
            .client
            .post(&self.base_url)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!(status = %status, "completion response received");

        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(CompletionError::Service {
                status: status.as_u16(),
                body: describe_error_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| CompletionError::Service {
            status: status.as_u16(),
            body: format!("unparseable response ({e}): {body}"),
        })
    }
}

fn transport_error(e: reqwest::Error) -> CompletionError {
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        format!("HTTP request failed: {e}")
    };
    CompletionError::Transport {
        message,
        source: Some(Box::new(e)),
    }
}

/// Prefer the structured `type: message` form when the body has one.
fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => format!("{}: {}", api_err.error.type_, api_err.error.message),
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiMessage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str, timeout: Duration) -> AnthropicClient {
        AnthropicClient::new("test-api-key", "2023-06-01", timeout)
            .unwrap()
            .with_base_url(base_url)
    }

    fn test_request() -> MessageRequest {
        MessageRequest {
            model: "claude-sonnet-4-20250514".into(),
            messages: vec![ApiMessage::user("Write a poem")],
            system: Some("Improve the prompt.".into()),
            max_tokens: 1024,
            temperature: Some(0.7),
        }
    }

    fn success_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "msg_test",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        })
    }

    #[tokio::test]
    async fn send_message_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(serde_json::json!({
                "system": "Improve the prompt.",
                "messages": [{"role": "user", "content": "Write a poem"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Better")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), Duration::from_secs(5));
        let response = client.send_message(&test_request()).await.unwrap();
        assert_eq!(response.id, "msg_test");
        assert_eq!(response.text(), "Better");
    }

    #[tokio::test]
    async fn client_sends_correct_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("ok")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), Duration::from_secs(5));
        let result = client.send_message(&test_request()).await;
        assert!(result.is_ok(), "headers should match: {result:?}");
    }

    #[tokio::test]
    async fn non_success_is_a_service_error_without_retry() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Service overloaded"}
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(&error_body))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), Duration::from_secs(5));
        let err = client.send_message(&test_request()).await.unwrap_err();
        match err {
            CompletionError::Service { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded_error: Service overloaded");
            }
            other => panic!("expected Service error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unstructured_error_body_is_kept_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), Duration::from_secs(5));
        let err = client.send_message(&test_request()).await.unwrap_err();
        assert_eq!(err.to_string(), "completion service returned 502: bad gateway");
    }

    #[tokio::test]
    async fn slow_response_is_a_transport_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(success_body("late"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), Duration::from_millis(50));
        let err = client.send_message(&test_request()).await.unwrap_err();
        assert_eq!(err.kind(), "transport", "got: {err}");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let client = test_client("http://127.0.0.1:9/v1/messages", Duration::from_secs(2));
        let err = client.send_message(&test_request()).await.unwrap_err();
        assert_eq!(err.kind(), "transport", "got: {err}");
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), Duration::from_secs(5));
        let err = client.send_message(&test_request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Service { status: 200, .. }));
    }

    #[test]
    fn invalid_api_key_header_is_a_configuration_error() {
        let err = AnthropicClient::new("bad\nkey", "2023-06-01", Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }
}
