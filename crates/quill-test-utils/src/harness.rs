// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the real enhancement stack (quota tracker, SQLite
//! stores on a temp database, orchestrator) around a [`MockCompletionClient`]
//! and a manually driven clock.

use std::sync::Arc;
use std::time::Duration;

use quill_config::model::{QuotaConfig, StorageConfig};
use quill_config::QuillConfig;
use quill_core::{ManualClock, QuillError, StorageAdapter};
use quill_enhance::Enhancer;
use quill_quota::QuotaTracker;
use quill_storage::SqliteStorage;

use crate::mock_completion::MockCompletionClient;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    client: MockCompletionClient,
    quota: QuotaConfig,
    max_content_chars: Option<usize>,
    timeout: Option<Duration>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            client: MockCompletionClient::new(),
            quota: QuotaConfig::default(),
            max_content_chars: None,
            timeout: None,
        }
    }

    /// Queue successful completion replies.
    pub fn with_mock_responses<I, S>(mut self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.client = MockCompletionClient::with_responses(responses);
        self
    }

    /// Use a fully customized mock client.
    pub fn with_client(mut self, client: MockCompletionClient) -> Self {
        self.client = client;
        self
    }

    /// Set the free and premium tier ceilings.
    pub fn with_limits(mut self, free: u32, premium: u32) -> Self {
        self.quota.free_limit = free;
        self.quota.premium_limit = premium;
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.quota.window_secs = window.as_secs();
        self
    }

    pub fn with_max_content_chars(mut self, max: usize) -> Self {
        self.max_content_chars = Some(max);
        self
    }

    /// Completion timeout, below the one-second granularity of config.
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, QuillError> {
        let temp_dir = tempfile::TempDir::new().map_err(QuillError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = QuillConfig {
            storage: StorageConfig {
                database_path: db_path.to_string_lossy().into_owned(),
                wal_mode: true,
            },
            quota: self.quota,
            ..QuillConfig::default()
        };
        if let Some(max) = self.max_content_chars {
            config.enhance.max_content_chars = max;
        }

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage = Arc::new(storage);

        let clock = Arc::new(ManualClock::default());
        let tracker = QuotaTracker::new(storage.clone(), clock.clone(), config.quota.window());
        let client = Arc::new(self.client);

        let mut enhancer = Enhancer::new(tracker, storage.clone(), client.clone(), &config);
        if let Some(timeout) = self.timeout {
            enhancer = enhancer.with_timeout(timeout);
        }

        Ok(TestHarness {
            enhancer,
            client,
            storage,
            clock,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock completion client and temp storage.
pub struct TestHarness {
    /// The orchestrator under test.
    pub enhancer: Enhancer,
    /// The mock completion client wired into `enhancer`.
    pub client: Arc<MockCompletionClient>,
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// Clock driving quota windows.
    pub clock: Arc<ManualClock>,
    pub config: QuillConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Move the quota clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::{SessionStore, Tier};
    use quill_enhance::EnhanceRequest;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        let sessions = harness
            .storage
            .list_sessions_for_user("nobody", None)
            .await
            .unwrap();
        assert!(sessions.is_empty());

        let status = harness.enhancer.check_status("nobody", Tier::Free).await.unwrap();
        assert_eq!(status.remaining, 10);
    }

    #[tokio::test]
    async fn with_mock_responses_drives_enhance() {
        let harness = TestHarness::builder()
            .with_mock_responses(["custom response"])
            .with_limits(3, 6)
            .build()
            .await
            .unwrap();

        let result = harness
            .enhancer
            .enhance(&EnhanceRequest::new("u1", "hello"))
            .await
            .unwrap();
        assert_eq!(result.enhanced, "custom response");
        assert_eq!(result.quota.remaining, 2);
    }
}
