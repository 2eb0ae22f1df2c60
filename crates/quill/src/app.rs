// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process wiring: logging, storage, quota, completion client, orchestrator.

use std::sync::Arc;

use quill_anthropic::AnthropicCompletion;
use quill_config::QuillConfig;
use quill_core::{PluginAdapter, QuillError, StorageAdapter, SystemClock};
use quill_enhance::Enhancer;
use quill_quota::QuotaTracker;
use quill_storage::SqliteStorage;
use tracing::{debug, warn};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so stdout
/// stays machine-readable.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("quill={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

/// A fully assembled enhancement service.
pub struct App {
    pub enhancer: Enhancer,
    storage: Arc<SqliteStorage>,
    client: Arc<AnthropicCompletion>,
}

impl App {
    /// Open the database (running migrations) and build the orchestrator.
    ///
    /// A missing API key is not an error here: quota status and history
    /// still work, enhancement reports itself unavailable.
    pub async fn open(config: &QuillConfig) -> Result<Self, QuillError> {
        let storage = Arc::new(SqliteStorage::open(config.storage.clone()).await?);
        let client = Arc::new(AnthropicCompletion::from_config(&config.completion));
        if !client.is_configured() {
            warn!("no completion API key configured, enhancement is unavailable");
        }

        let quota = QuotaTracker::new(
            storage.clone(),
            Arc::new(SystemClock),
            config.quota.window(),
        );
        let enhancer = Enhancer::new(quota, storage.clone(), client.clone(), config);
        debug!(
            database = %config.storage.database_path,
            model = %config.completion.model,
            "enhancement service ready"
        );

        Ok(Self {
            enhancer,
            storage,
            client,
        })
    }

    /// Flush storage and release adapters.
    pub async fn close(&self) -> Result<(), QuillError> {
        self.client.shutdown().await?;
        self.storage.close().await
    }
}

/// The effective configuration as TOML, with the API key masked.
pub fn render_config(config: &QuillConfig) -> Result<String, QuillError> {
    let mut redacted = config.clone();
    if redacted.completion.api_key.is_some() {
        redacted.completion.api_key = Some("[redacted]".to_string());
    }
    toml::to_string_pretty(&redacted).map_err(|e| QuillError::Internal(e.to_string()))
}
