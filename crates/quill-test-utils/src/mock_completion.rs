// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion client for deterministic testing.
//!
//! `MockCompletionClient` implements `CompletionClient` with pre-configured
//! replies, enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use quill_core::{
    AdapterType, Completion, CompletionClient, CompletionError, HealthStatus, PluginAdapter,
    QuillError,
};

/// Text returned once the reply queue is empty.
pub const DEFAULT_REPLY: &str = "mock enhanced prompt";

/// One observed `complete` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub system_instructions: String,
    pub user_content: String,
}

/// A completion client that pops replies from a FIFO queue.
pub struct MockCompletionClient {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
    latency_ms: u64,
    configured: bool,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
            latency_ms: 400,
            configured: true,
        }
    }

    /// Pre-load successful replies.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        let queue = responses.into_iter().map(|s| Ok(s.into())).collect();
        Self {
            replies: Mutex::new(queue),
            ..client
        }
    }

    /// A client with no credentials: every call is a configuration error.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Latency reported on successful completions.
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub async fn push_response(&self, text: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(text.into()));
    }

    pub async fn push_error(&self, error: CompletionError) {
        self.replies.lock().await.push_back(Err(error));
    }

    /// Every call made so far, oldest first.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockCompletionClient {
    fn name(&self) -> &str {
        "mock-completion"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Completion
    }

    async fn health_check(&self) -> Result<HealthStatus, QuillError> {
        Ok(if self.configured {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy("not configured".into())
        })
    }

    async fn shutdown(&self) -> Result<(), QuillError> {
        Ok(())
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(
        &self,
        system_instructions: &str,
        user_content: &str,
    ) -> Result<Completion, CompletionError> {
        self.calls.lock().await.push(RecordedCall {
            system_instructions: system_instructions.to_string(),
            user_content: user_content.to_string(),
        });

        if !self.configured {
            return Err(CompletionError::Configuration("no API key".into()));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(DEFAULT_REPLY.to_string()));
        reply.map(|text| Completion {
            text,
            latency_ms: self.latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_are_returned_in_order_then_default() {
        let client = MockCompletionClient::with_responses(["first", "second"]);
        assert_eq!(client.complete("s", "a").await.unwrap().text, "first");
        assert_eq!(client.complete("s", "b").await.unwrap().text, "second");
        assert_eq!(client.complete("s", "c").await.unwrap().text, DEFAULT_REPLY);
        assert_eq!(client.call_count().await, 3);
    }

    #[tokio::test]
    async fn queued_errors_are_returned() {
        let client = MockCompletionClient::new();
        client
            .push_error(CompletionError::Service {
                status: 503,
                body: "overloaded".into(),
            })
            .await;
        let err = client.complete("s", "c").await.unwrap_err();
        assert_eq!(err.kind(), "service");
    }

    #[tokio::test]
    async fn unconfigured_client_still_records_calls() {
        let client = MockCompletionClient::unconfigured();
        let err = client.complete("sys", "content").await.unwrap_err();
        assert_eq!(err.kind(), "configuration");
        let calls = client.calls().await;
        assert_eq!(calls[0].user_content, "content");
    }
}
