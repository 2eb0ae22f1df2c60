// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the quota tracker, stores, and orchestrator.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`crate::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Completion,
    Storage,
}

// --- Enhancement options ---

/// Requested tone of the enhanced prompt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Casual,
    Academic,
    Creative,
}

/// Aspect of the prompt the enhancement should concentrate on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    Clarity,
    Engagement,
    Specificity,
    Structure,
}

/// Caller preferences for an enhancement. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementOptions {
    /// Free-text name of the system the prompt targets (e.g. "Midjourney").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<Focus>,
}

impl EnhancementOptions {
    /// The target platform, trimmed. Blank strings count as absent.
    pub fn platform(&self) -> Option<&str> {
        self.platform
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

// --- Sessions ---

/// Lifecycle state of an enhancement session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Success,
    Failed,
}

impl SessionStatus {
    /// `success` and `failed` are final; nothing transitions out of them.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Durable record of one enhancement attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementSession {
    /// Unique session identifier (UUID v4).
    pub id: String,
    /// Owner of the session.
    pub user_id: String,
    /// Prompt being enhanced, if it already exists.
    pub prompt_id: Option<String>,
    /// Text submitted for enhancement.
    pub original_content: String,
    /// Result text. Set only when `status` is `success`.
    pub enhanced_content: Option<String>,
    /// Options snapshot used for this attempt.
    pub options: EnhancementOptions,
    pub status: SessionStatus,
    /// Internal failure detail. Set only when `status` is `failed`.
    pub error_message: Option<String>,
    /// Milliseconds spent in the external call, set on the terminal transition.
    pub api_response_time: Option<u64>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 timestamp of the terminal transition.
    pub completed_at: Option<String>,
}

impl EnhancementSession {
    /// Create a new session in the `pending` state, stamped `created_at`.
    pub fn pending(
        user_id: impl Into<String>,
        prompt_id: Option<String>,
        original_content: impl Into<String>,
        options: EnhancementOptions,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            prompt_id,
            original_content: original_content.into(),
            enhanced_content: None,
            options,
            status: SessionStatus::Pending,
            error_message: None,
            api_response_time: None,
            created_at: format_timestamp(created_at),
            completed_at: None,
        }
    }
}

/// Terminal outcome written to a pending session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Success {
        enhanced_content: String,
        api_response_time: u64,
        completed_at: DateTime<Utc>,
    },
    Failed {
        error_message: String,
        api_response_time: u64,
        completed_at: DateTime<Utc>,
    },
}

impl SessionOutcome {
    /// The status this outcome moves the session into.
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Success { .. } => SessionStatus::Success,
            Self::Failed { .. } => SessionStatus::Failed,
        }
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        match self {
            Self::Success { completed_at, .. } | Self::Failed { completed_at, .. } => *completed_at,
        }
    }
}

// --- Rate limiting ---

/// Subscription class that decides a user's quota ceiling.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
}

/// Per-user fixed counting window as persisted by the rate limit store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub user_id: String,
    /// Quota units consumed in the current window.
    pub count: u32,
    /// When the current window began.
    pub window_start: DateTime<Utc>,
}

/// Result of an atomic conditional reserve against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveOutcome {
    pub granted: bool,
    /// Window state after the operation (unchanged when not granted).
    pub window: RateLimitWindow,
}

/// Caller-facing view of a user's quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    /// Whether another call would currently be allowed.
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
    /// When the current window ends and the count resets.
    pub resets_at: DateTime<Utc>,
}

impl RateLimitInfo {
    /// Derive the caller-facing view from a window snapshot.
    pub fn from_window(window: &RateLimitWindow, limit: u32, duration: Duration) -> Self {
        let remaining = limit.saturating_sub(window.count);
        Self {
            allowed: remaining > 0,
            remaining,
            limit,
            resets_at: window_end(window.window_start, duration),
        }
    }
}

/// End of a window that started at `start` and lasts `duration`.
pub fn window_end(start: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    let delta = TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX);
    start.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// --- Completion ---

/// Text returned by a successful completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    /// Wall-clock latency of the external call in milliseconds.
    pub latency_ms: u64,
}

/// Format a timestamp the way every persisted record stores it.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
