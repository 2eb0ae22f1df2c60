// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the session and rate limit stores.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use quill_config::model::StorageConfig;
use quill_core::{
    AdapterType, EnhancementSession, HealthStatus, PluginAdapter, QuillError, RateLimitStore,
    RateLimitWindow, ReserveOutcome, SessionOutcome, SessionStore, StorageAdapter,
};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Implements both [`SessionStore`] and [`RateLimitStore`] over one
/// [`Database`]. The database is opened on [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage. Nothing is opened until `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create and initialize in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, QuillError> {
        let storage = Self::new(config);
        storage.initialize().await?;
        Ok(storage)
    }

    /// Wrap an already opened database, e.g. an in-memory one.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    fn db(&self) -> Result<&Database, QuillError> {
        self.db
            .get()
            .ok_or_else(|| QuillError::storage("storage not initialized, call initialize() first"))
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, QuillError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), QuillError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), QuillError> {
        let path = &self.config.database_path;
        let db = Database::open_with_options(path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| QuillError::storage("storage already initialized"))?;
        debug!(path = %path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), QuillError> {
        self.db()?.close().await?;
        debug!("SQLite storage closed");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteStorage {
    async fn create_session(&self, session: &EnhancementSession) -> Result<(), QuillError> {
        queries::sessions::create_session(self.db()?, session).await
    }

    async fn update_session(&self, id: &str, outcome: &SessionOutcome) -> Result<(), QuillError> {
        queries::sessions::update_session(self.db()?, id, outcome).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<EnhancementSession>, QuillError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn list_sessions_for_user(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<EnhancementSession>, QuillError> {
        queries::sessions::list_sessions_for_user(self.db()?, user_id, limit).await
    }
}

#[async_trait]
impl RateLimitStore for SqliteStorage {
    async fn get_or_init_window(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<RateLimitWindow, QuillError> {
        queries::rate_limits::get_or_init_window(self.db()?, user_id, now, window).await
    }

    async fn atomic_reserve(
        &self,
        user_id: &str,
        limit: u32,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<ReserveOutcome, QuillError> {
        queries::rate_limits::atomic_reserve(self.db()?, user_id, limit, now, window).await
    }

    async fn atomic_release(
        &self,
        user_id: &str,
        window_start: DateTime<Utc>,
    ) -> Result<RateLimitWindow, QuillError> {
        queries::rate_limits::atomic_release(self.db()?, user_id, window_start).await
    }
}
