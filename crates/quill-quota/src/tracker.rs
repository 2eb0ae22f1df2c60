// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user quota tracking over a fixed window.
//!
//! The tracker never reads and then writes the counter itself: every
//! consumption and refund is a single conditional operation on the
//! [`RateLimitStore`]. It emits a `tracing::warn` once a user has used 80% of
//! their ceiling and refuses reservations when the store cannot be reached.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quill_core::types::window_end;
use quill_core::{Clock, QuillError, RateLimitInfo, RateLimitStore};
use tracing::{debug, error, warn};

/// A claimed (or refused) unit of quota.
///
/// Hand it back to [`QuotaTracker::release`] if the attempt it paid for fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub user_id: String,
    pub granted: bool,
    pub info: RateLimitInfo,
    /// Window the unit was taken from. A refund only applies to this window.
    pub window_start: DateTime<Utc>,
}

/// Enforces "at most `limit` calls per user per window".
pub struct QuotaTracker {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn RateLimitStore>, clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            store,
            clock,
            window,
        }
    }

    /// Length of the counting window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// The clock windows are measured against.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Current quota for `user_id` under `limit`. Never consumes quota.
    pub async fn status(&self, user_id: &str, limit: u32) -> Result<RateLimitInfo, QuillError> {
        let now = self.clock.now();
        let window = self
            .store
            .get_or_init_window(user_id, now, self.window)
            .await?;
        Ok(RateLimitInfo::from_window(&window, limit, self.window))
    }

    /// Atomically claim one unit if the user is below `limit`.
    ///
    /// Store failures are logged and reported as a refusal.
    pub async fn reserve(&self, user_id: &str, limit: u32) -> Reservation {
        let now = self.clock.now();
        let outcome = match self
            .store
            .atomic_reserve(user_id, limit, now, self.window)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(user_id, error = %e, "quota store unavailable, refusing reservation");
                return Reservation {
                    user_id: user_id.to_string(),
                    granted: false,
                    info: RateLimitInfo {
                        allowed: false,
                        remaining: 0,
                        limit,
                        resets_at: window_end(now, self.window),
                    },
                    window_start: now,
                };
            }
        };

        let info = RateLimitInfo::from_window(&outcome.window, limit, self.window);
        if outcome.granted {
            let used = u64::from(outcome.window.count);
            if used * 5 >= u64::from(limit) * 4 {
                warn!(
                    user_id,
                    used,
                    limit,
                    "approaching enhancement quota (80%+)"
                );
            }
            debug!(user_id, remaining = info.remaining, "quota reserved");
        } else {
            debug!(user_id, limit, resets_at = %info.resets_at, "quota exhausted");
        }

        Reservation {
            user_id: user_id.to_string(),
            granted: outcome.granted,
            info,
            window_start: outcome.window.window_start,
        }
    }

    /// Refund a granted reservation.
    ///
    /// A refused reservation is ignored. A refund aimed at a window that has
    /// since rolled over leaves the new window untouched.
    pub async fn release(&self, reservation: &Reservation) -> Result<RateLimitInfo, QuillError> {
        if !reservation.granted {
            return Ok(reservation.info.clone());
        }
        let window = self
            .store
            .atomic_release(&reservation.user_id, reservation.window_start)
            .await?;
        let info = RateLimitInfo::from_window(&window, reservation.info.limit, self.window);
        debug!(
            user_id = %reservation.user_id,
            remaining = info.remaining,
            "quota released"
        );
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeDelta;
    use quill_core::{ManualClock, RateLimitWindow, ReserveOutcome};
    use quill_storage::{Database, SqliteStorage};
    use tracing_test::traced_test;

    const HOUR: Duration = Duration::from_secs(3600);

    async fn tracker_with_clock() -> (QuotaTracker, Arc<ManualClock>) {
        let db = Database::open_in_memory().await.unwrap();
        let store = SqliteStorage::from_database(Default::default(), db);
        let clock = Arc::new(ManualClock::default());
        let tracker = QuotaTracker::new(Arc::new(store), clock.clone(), HOUR);
        (tracker, clock)
    }

    struct UnreachableStore;

    #[async_trait]
    impl RateLimitStore for UnreachableStore {
        async fn get_or_init_window(
            &self,
            _user_id: &str,
            _now: DateTime<Utc>,
            _window: Duration,
        ) -> Result<RateLimitWindow, QuillError> {
            Err(QuillError::storage("connection refused"))
        }

        async fn atomic_reserve(
            &self,
            _user_id: &str,
            _limit: u32,
            _now: DateTime<Utc>,
            _window: Duration,
        ) -> Result<ReserveOutcome, QuillError> {
            Err(QuillError::storage("connection refused"))
        }

        async fn atomic_release(
            &self,
            _user_id: &str,
            _window_start: DateTime<Utc>,
        ) -> Result<RateLimitWindow, QuillError> {
            Err(QuillError::storage("connection refused"))
        }
    }

    #[tokio::test]
    async fn status_does_not_consume() {
        let (tracker, clock) = tracker_with_clock().await;
        for _ in 0..5 {
            let info = tracker.status("u1", 10).await.unwrap();
            assert!(info.allowed);
            assert_eq!(info.remaining, 10);
            assert_eq!(info.limit, 10);
            assert_eq!(info.resets_at, clock.now() + TimeDelta::hours(1));
        }
    }

    #[tokio::test]
    async fn reserve_consumes_one_unit() {
        let (tracker, _clock) = tracker_with_clock().await;
        let reservation = tracker.reserve("u1", 10).await;
        assert!(reservation.granted);
        assert_eq!(reservation.info.remaining, 9);
        assert_eq!(tracker.status("u1", 10).await.unwrap().remaining, 9);
    }

    #[tokio::test]
    async fn exhausted_quota_is_refused_without_mutation() {
        let (tracker, _clock) = tracker_with_clock().await;
        for _ in 0..3 {
            assert!(tracker.reserve("u1", 3).await.granted);
        }
        let refused = tracker.reserve("u1", 3).await;
        assert!(!refused.granted);
        assert!(!refused.info.allowed);
        assert_eq!(refused.info.remaining, 0);

        let status = tracker.status("u1", 3).await.unwrap();
        assert_eq!(status.remaining, 0);
    }

    #[tokio::test]
    async fn release_nets_reserve_to_zero() {
        let (tracker, _clock) = tracker_with_clock().await;
        tracker.reserve("u1", 10).await;
        let before = tracker.status("u1", 10).await.unwrap();

        let reservation = tracker.reserve("u1", 10).await;
        let after = tracker.release(&reservation).await.unwrap();
        assert_eq!(after.remaining, before.remaining);
    }

    #[tokio::test]
    async fn releasing_a_refusal_is_a_noop() {
        let (tracker, _clock) = tracker_with_clock().await;
        assert!(tracker.reserve("u1", 1).await.granted);
        let refused = tracker.reserve("u1", 1).await;
        tracker.release(&refused).await.unwrap();
        assert_eq!(tracker.status("u1", 1).await.unwrap().remaining, 0);
    }

    #[tokio::test]
    async fn window_rollover_restores_full_quota() {
        let (tracker, clock) = tracker_with_clock().await;
        for _ in 0..2 {
            tracker.reserve("u1", 2).await;
        }
        assert!(!tracker.status("u1", 2).await.unwrap().allowed);

        clock.advance(HOUR);
        let info = tracker.status("u1", 2).await.unwrap();
        assert!(info.allowed);
        assert_eq!(info.remaining, 2);
        assert_eq!(info.resets_at, clock.now() + TimeDelta::hours(1));
    }

    #[tokio::test]
    async fn refund_after_rollover_does_not_inflate_new_window() {
        let (tracker, clock) = tracker_with_clock().await;
        let stale = tracker.reserve("u1", 5).await;

        clock.advance(HOUR * 2);
        tracker.reserve("u1", 5).await;
        tracker.release(&stale).await.unwrap();

        assert_eq!(tracker.status("u1", 5).await.unwrap().remaining, 4);
    }

    #[tokio::test]
    async fn tier_change_applies_on_next_call() {
        let (tracker, _clock) = tracker_with_clock().await;
        tracker.reserve("u1", 2).await;
        tracker.reserve("u1", 2).await;
        assert!(!tracker.reserve("u1", 2).await.granted);

        // Upgraded mid-window.
        let upgraded = tracker.reserve("u1", 5).await;
        assert!(upgraded.granted);
        assert_eq!(upgraded.info.remaining, 2);
    }

    #[tokio::test]
    async fn unreachable_store_fails_closed() {
        let clock = Arc::new(ManualClock::default());
        let tracker = QuotaTracker::new(Arc::new(UnreachableStore), clock, HOUR);

        let reservation = tracker.reserve("u1", 10).await;
        assert!(!reservation.granted);
        assert_eq!(reservation.info.remaining, 0);
        assert_eq!(reservation.info.limit, 10);
        assert!(tracker.status("u1", 10).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_reserves_grant_at_most_limit() {
        let (tracker, _clock) = tracker_with_clock().await;
        let tracker = Arc::new(tracker);

        let attempts = (0..30).map(|_| {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.reserve("shared", 10).await })
        });
        let grants = futures::future::join_all(attempts)
            .await
            .into_iter()
            .filter(|r| r.as_ref().unwrap().granted)
            .count();

        assert_eq!(grants, 10);
        assert_eq!(tracker.status("shared", 10).await.unwrap().remaining, 0);
    }

    #[traced_test]
    #[tokio::test]
    async fn warns_when_crossing_eighty_percent() {
        let (tracker, _clock) = tracker_with_clock().await;
        for _ in 0..7 {
            tracker.reserve("u1", 10).await;
        }
        assert!(!logs_contain("approaching enhancement quota"));

        tracker.reserve("u1", 10).await;
        assert!(logs_contain("approaching enhancement quota"));
    }
}
