// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic completion adapter for Quill.
//!
//! This crate implements [`CompletionClient`] over the Anthropic Messages
//! API. API key resolution order: config -> `ANTHROPIC_API_KEY` env var.
//! A missing key does not fail construction; the adapter comes up
//! unconfigured and every call returns [`CompletionError::Configuration`],
//! so quota status keeps working without credentials.

pub mod client;
pub mod types;

use std::time::Instant;

use async_trait::async_trait;
use quill_config::model::CompletionConfig;
use quill_core::{
    AdapterType, Completion, CompletionClient, CompletionError, HealthStatus, PluginAdapter,
    QuillError,
};
use tracing::{debug, info, warn};

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest};

enum Backend {
    Ready(AnthropicClient),
    Unconfigured(String),
}

/// Anthropic-backed completion client.
pub struct AnthropicCompletion {
    backend: Backend,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicCompletion {
    /// Build from configuration, falling back to `ANTHROPIC_API_KEY`.
    pub fn from_config(config: &CompletionConfig) -> Self {
        Self::with_api_key(config, resolve_api_key(config.api_key.as_deref()))
    }

    /// Build with an explicitly resolved key. `None` yields an unconfigured client.
    pub fn with_api_key(config: &CompletionConfig, api_key: Option<String>) -> Self {
        let backend = match api_key {
            None => {
                warn!("no Anthropic API key configured, enhancement is unavailable");
                Backend::Unconfigured(
                    "set completion.api_key or the ANTHROPIC_API_KEY environment variable".into(),
                )
            }
            Some(key) => {
                match AnthropicClient::new(&key, &config.api_version, config.timeout()) {
                    Ok(client) => {
                        let client = match &config.base_url {
                            Some(url) => client.with_base_url(url.clone()),
                            None => client,
                        };
                        info!(model = %config.model, "Anthropic completion client initialized");
                        Backend::Ready(client)
                    }
                    Err(e) => {
                        warn!(error = %e, "Anthropic completion client unavailable");
                        Backend::Unconfigured(e.to_string())
                    }
                }
            }
        };

        Self {
            backend,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Whether calls can reach the service at all.
    pub fn is_configured(&self) -> bool {
        matches!(self.backend, Backend::Ready(_))
    }

    fn to_message_request(&self, system_instructions: &str, user_content: &str) -> MessageRequest {
        MessageRequest {
            model: self.model.clone(),
            messages: vec![ApiMessage::user(user_content)],
            system: Some(system_instructions.to_string()),
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
        }
    }
}

#[async_trait]
impl PluginAdapter for AnthropicCompletion {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Completion
    }

    async fn health_check(&self) -> Result<HealthStatus, QuillError> {
        // No request is made; health checks must not spend tokens.
        Ok(match &self.backend {
            Backend::Ready(_) => HealthStatus::Healthy,
            Backend::Unconfigured(reason) => HealthStatus::Unhealthy(reason.clone()),
        })
    }

    async fn shutdown(&self) -> Result<(), QuillError> {
        debug!("Anthropic completion client shutting down");
        Ok(())
    }
}

#[async_trait]
impl CompletionClient for AnthropicCompletion {
    async fn complete(
        &self,
        system_instructions: &str,
        user_content: &str,
    ) -> Result<Completion, CompletionError> {
        let client = match &self.backend {
            Backend::Ready(client) => client,
            Backend::Unconfigured(reason) => {
                return Err(CompletionError::Configuration(reason.clone()));
            }
        };

        let request = self.to_message_request(system_instructions, user_content);
        let started = Instant::now();
        let response = client.send_message(&request).await?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let text = response.text();
        if text.trim().is_empty() {
            return Err(CompletionError::Service {
                status: 200,
                body: format!(
                    "response contained no text (stop_reason: {})",
                    response.stop_reason.as_deref().unwrap_or("none")
                ),
            });
        }

        debug!(
            model = %response.model,
            latency_ms,
            output_tokens = response.usage.output_tokens,
            "completion finished"
        );
        Ok(Completion {
            text: text.trim().to_string(),
            latency_ms,
        })
    }
}

/// Config key first, then `ANTHROPIC_API_KEY`. Blank values count as unset.
fn resolve_api_key(config_key: Option<&str>) -> Option<String> {
    if let Some(key) = config_key
        && !key.trim().is_empty()
    {
        return Some(key.to_string());
    }
    std::env::var("ANTHROPIC_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
}
