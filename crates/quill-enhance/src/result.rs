// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-facing request and result types.
//!
//! Nothing in here carries internal error detail. Upstream bodies and store
//! errors stay in logs and on the session record.

use chrono::{DateTime, Utc};
use quill_core::{EnhancementOptions, EnhancementSession, RateLimitInfo, SessionStatus, Tier};
use serde::{Deserialize, Serialize};

/// One enhancement request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhanceRequest {
    pub user_id: String,
    #[serde(default)]
    pub tier: Tier,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<String>,
    #[serde(default)]
    pub options: EnhancementOptions,
}

impl EnhanceRequest {
    pub fn new(user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            tier: Tier::default(),
            content: content.into(),
            prompt_id: None,
            options: EnhancementOptions::default(),
        }
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_prompt_id(mut self, prompt_id: impl Into<String>) -> Self {
        self.prompt_id = Some(prompt_id.into());
        self
    }

    pub fn with_options(mut self, options: EnhancementOptions) -> Self {
        self.options = options;
        self
    }
}

/// A successful enhancement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enhancement {
    pub enhanced: String,
    /// `None` for the session-less flow.
    pub session_id: Option<String>,
    /// Quota left after this call was charged.
    pub quota: RateLimitInfo,
    pub latency_ms: u64,
}

/// Why an enhancement did not produce text.
///
/// `Display` is the caller-safe message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnhanceFailure {
    /// Input was rejected before any quota was touched.
    #[error("{0}")]
    Validation(String),

    /// The user's quota for the current window is used up.
    #[error("rate limit exceeded")]
    RateLimited(RateLimitInfo),

    /// The completion service is not configured or a store is unreachable.
    #[error("enhancement service is currently unavailable")]
    Unavailable,

    /// The completion call failed. The attempt was not charged.
    #[error("enhancement failed, please try again shortly")]
    Failed { session_id: Option<String> },
}

impl EnhanceFailure {
    /// Short machine-readable label.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::RateLimited(_) => "rate_limited",
            Self::Unavailable => "unavailable",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Uniform wire shape for `enhance` and `complete_without_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhanceResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<DateTime<Utc>>,
}

impl From<Result<Enhancement, EnhanceFailure>> for EnhanceResponse {
    fn from(result: Result<Enhancement, EnhanceFailure>) -> Self {
        match result {
            Ok(enhancement) => Self {
                success: true,
                enhanced: Some(enhancement.enhanced),
                error: None,
                session_id: enhancement.session_id,
                remaining: Some(enhancement.quota.remaining),
                limit: Some(enhancement.quota.limit),
                resets_at: Some(enhancement.quota.resets_at),
            },
            Err(failure) => {
                let mut response = Self {
                    success: false,
                    enhanced: None,
                    error: Some(failure.to_string()),
                    session_id: None,
                    remaining: None,
                    limit: None,
                    resets_at: None,
                };
                match failure {
                    EnhanceFailure::RateLimited(info) => {
                        response.remaining = Some(info.remaining);
                        response.limit = Some(info.limit);
                        response.resets_at = Some(info.resets_at);
                    }
                    EnhanceFailure::Failed { session_id } => response.session_id = session_id,
                    EnhanceFailure::Validation(_) | EnhanceFailure::Unavailable => {}
                }
                response
            }
        }
    }
}

/// A session as shown to its owner.
///
/// The stored failure detail is replaced by the same generic message
/// [`EnhanceFailure::Failed`] displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<String>,
    pub original_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_content: Option<String>,
    pub options: EnhancementOptions,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_response_time: Option<u64>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl From<EnhancementSession> for SessionSummary {
    fn from(session: EnhancementSession) -> Self {
        let error = (session.status == SessionStatus::Failed)
            .then(|| EnhanceFailure::Failed { session_id: None }.to_string());
        Self {
            id: session.id,
            user_id: session.user_id,
            prompt_id: session.prompt_id,
            original_content: session.original_content,
            enhanced_content: session.enhanced_content,
            options: session.options,
            status: session.status,
            error,
            api_response_time: session.api_response_time,
            created_at: session.created_at,
            completed_at: session.completed_at,
        }
    }
}
