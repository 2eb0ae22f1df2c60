// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The enhancement orchestrator.
//!
//! Sequence per request: validate, reserve quota, create a pending session,
//! call the completion client under a timeout, settle the session, and refund
//! the reservation if the call failed. No lock is held across the call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use quill_config::QuillConfig;
use quill_core::{
    Clock, CompletionClient, CompletionError, EnhancementSession, QuillError, RateLimitInfo,
    SessionOutcome, SessionStore, Tier,
};
use quill_quota::{QuotaTracker, Reservation, TierLimits};
use tracing::{debug, error, info, warn};

use crate::instructions::compose_instructions;
use crate::result::{EnhanceFailure, EnhanceRequest, Enhancement, SessionSummary};

/// Coordinates quota, completion, and session persistence.
pub struct Enhancer {
    quota: QuotaTracker,
    clock: Arc<dyn Clock>,
    limits: TierLimits,
    sessions: Arc<dyn SessionStore>,
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
    max_content_chars: usize,
}

impl Enhancer {
    /// Assemble an orchestrator. Limits and timeouts are read from `config`
    /// once, here.
    pub fn new(
        quota: QuotaTracker,
        sessions: Arc<dyn SessionStore>,
        client: Arc<dyn CompletionClient>,
        config: &QuillConfig,
    ) -> Self {
        Self {
            clock: quota.clock(),
            quota,
            limits: TierLimits::from_config(&config.quota),
            sessions,
            client,
            timeout: config.completion.timeout(),
            max_content_chars: config.enhance.max_content_chars,
        }
    }

    /// Override the completion timeout taken from config.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enhance `request.content` and record the attempt as a session.
    pub async fn enhance(&self, request: &EnhanceRequest) -> Result<Enhancement, EnhanceFailure> {
        self.run(request, true).await
    }

    /// Same as [`Enhancer::enhance`] but nothing is persisted. Quota is still
    /// charged on success and refunded on failure.
    pub async fn complete_without_session(
        &self,
        request: &EnhanceRequest,
    ) -> Result<Enhancement, EnhanceFailure> {
        self.run(request, false).await
    }

    /// Current quota for a user. Works without completion credentials.
    pub async fn check_status(
        &self,
        user_id: &str,
        tier: Tier,
    ) -> Result<RateLimitInfo, EnhanceFailure> {
        self.quota
            .status(user_id, self.limits.limit_for(tier))
            .await
            .map_err(|e| {
                error!(user_id, error = %e, "quota status unavailable");
                EnhanceFailure::Unavailable
            })
    }

    /// A user's most recent sessions, newest first, without internal
    /// failure detail.
    pub async fn history(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SessionSummary>, QuillError> {
        let limit = limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX));
        let sessions = self.sessions.list_sessions_for_user(user_id, limit).await?;
        Ok(sessions.into_iter().map(SessionSummary::from).collect())
    }

    async fn run(
        &self,
        request: &EnhanceRequest,
        persist: bool,
    ) -> Result<Enhancement, EnhanceFailure> {
        self.validate(&request.content)?;

        let user_id = request.user_id.as_str();
        let reservation = self
            .quota
            .reserve(user_id, self.limits.limit_for(request.tier))
            .await;
        if !reservation.granted {
            info!(user_id, limit = reservation.info.limit, "enhancement refused: quota exhausted");
            return Err(EnhanceFailure::RateLimited(reservation.info));
        }

        let session = if persist {
            let session = EnhancementSession::pending(
                user_id,
                request.prompt_id.clone(),
                request.content.clone(),
                request.options.clone(),
                self.clock.now(),
            );
            if let Err(e) = self.sessions.create_session(&session).await {
                error!(user_id, error = %e, "failed to create enhancement session");
                self.refund(&reservation).await;
                return Err(EnhanceFailure::Unavailable);
            }
            Some(session.id)
        } else {
            None
        };
        let session_id = session.as_deref();

        let instructions = compose_instructions(&request.options);
        let started = Instant::now();
        let result = match tokio::time::timeout(
            self.timeout,
            self.client.complete(&instructions, &request.content),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CompletionError::transport(format!(
                "completion timed out after {}s",
                self.timeout.as_secs_f64()
            ))),
        };

        match result {
            Ok(completion) => {
                info!(
                    user_id,
                    session_id,
                    latency_ms = completion.latency_ms,
                    remaining = reservation.info.remaining,
                    "enhancement succeeded"
                );
                if let Some(id) = session_id {
                    let outcome = SessionOutcome::Success {
                        enhanced_content: completion.text.clone(),
                        api_response_time: completion.latency_ms,
                        completed_at: self.clock.now(),
                    };
                    // The user was charged, so the text is returned either way.
                    if let Err(e) = self.sessions.update_session(id, &outcome).await {
                        error!(session_id = id, error = %e, "failed to settle successful session");
                    }
                }
                Ok(Enhancement {
                    enhanced: completion.text,
                    session_id: session,
                    quota: reservation.info,
                    latency_ms: completion.latency_ms,
                })
            }
            Err(e) => {
                let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                warn!(
                    user_id,
                    session_id,
                    kind = e.kind(),
                    error = %e,
                    elapsed_ms,
                    "enhancement failed"
                );
                if let Some(id) = session_id {
                    let outcome = SessionOutcome::Failed {
                        error_message: e.to_string(),
                        api_response_time: elapsed_ms,
                        completed_at: self.clock.now(),
                    };
                    if let Err(store_err) = self.sessions.update_session(id, &outcome).await {
                        error!(session_id = id, error = %store_err, "failed to settle failed session");
                    }
                }
                self.refund(&reservation).await;

                Err(match e {
                    CompletionError::Configuration(_) => EnhanceFailure::Unavailable,
                    CompletionError::Transport { .. } | CompletionError::Service { .. } => {
                        EnhanceFailure::Failed {
                            session_id: session,
                        }
                    }
                })
            }
        }
    }

    fn validate(&self, content: &str) -> Result<(), EnhanceFailure> {
        if content.trim().is_empty() {
            return Err(EnhanceFailure::Validation("content must not be empty".into()));
        }
        let chars = content.chars().count();
        if chars > self.max_content_chars {
            debug!(chars, max = self.max_content_chars, "content rejected as too long");
            return Err(EnhanceFailure::Validation(format!(
                "content must be at most {} characters",
                self.max_content_chars
            )));
        }
        Ok(())
    }

    async fn refund(&self, reservation: &Reservation) {
        if let Err(e) = self.quota.release(reservation).await {
            // The unit stays consumed until the window rolls over.
            error!(user_id = %reservation.user_id, error = %e, "failed to refund quota");
        }
    }
}
