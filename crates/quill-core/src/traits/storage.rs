// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits for enhancement sessions and rate limit windows.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::QuillError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EnhancementSession, RateLimitWindow, ReserveOutcome, SessionOutcome};

/// Lifecycle of a persistence backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connections, etc.).
    async fn initialize(&self) -> Result<(), QuillError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), QuillError>;
}

/// Durable record of enhancement attempts.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a freshly created (pending) session.
    async fn create_session(&self, session: &EnhancementSession) -> Result<(), QuillError>;

    /// Move a pending session into its terminal state.
    ///
    /// Returns [`QuillError::SessionSettled`] if the session already left
    /// `pending`; terminal sessions are never rewritten.
    async fn update_session(&self, id: &str, outcome: &SessionOutcome) -> Result<(), QuillError>;

    async fn get_session(&self, id: &str) -> Result<Option<EnhancementSession>, QuillError>;

    /// Sessions owned by `user_id`, newest first.
    async fn list_sessions_for_user(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<EnhancementSession>, QuillError>;
}

/// Per-user fixed window counters.
///
/// Every mutating method must be a single atomic unit with respect to other
/// callers for the same user.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Fetch the user's window, creating it or rolling it forward when
    /// `now - window_start >= window`. Never consumes quota.
    async fn get_or_init_window(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<RateLimitWindow, QuillError>;

    /// Roll the window forward if expired, then increment the count only if
    /// it is below `limit`.
    async fn atomic_reserve(
        &self,
        user_id: &str,
        limit: u32,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<ReserveOutcome, QuillError>;

    /// Decrement the count by one (floor 0) if the current window still
    /// started at `window_start`.
    async fn atomic_release(
        &self,
        user_id: &str,
        window_start: DateTime<Utc>,
    ) -> Result<RateLimitWindow, QuillError>;
}
