// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed window rate limit counters.
//!
//! Each mutation runs inside one IMMEDIATE transaction on the single writer
//! connection, so the check and the increment can never interleave with
//! another caller. `window_start` is stored as Unix milliseconds.

use std::time::Duration;

use chrono::{DateTime, Utc};
use quill_core::{QuillError, RateLimitWindow, ReserveOutcome};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::database::{map_tr_err, Database};

/// Create the user's row, or reset it if its window has fully elapsed.
fn roll_forward(conn: &Connection, user_id: &str, now_ms: i64, window_ms: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO rate_limit_windows (user_id, count, window_start) VALUES (?1, 0, ?2)
         ON CONFLICT(user_id) DO UPDATE SET count = 0, window_start = excluded.window_start
         WHERE ?2 - rate_limit_windows.window_start >= ?3",
        params![user_id, now_ms, window_ms],
    )?;
    Ok(())
}

fn read_window(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<(i64, i64)>> {
    conn.query_row(
        "SELECT count, window_start FROM rate_limit_windows WHERE user_id = ?1",
        params![user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

fn to_window(user_id: &str, count: i64, start_ms: i64) -> RateLimitWindow {
    RateLimitWindow {
        user_id: user_id.to_string(),
        count: u32::try_from(count.max(0)).unwrap_or(u32::MAX),
        window_start: DateTime::from_timestamp_millis(start_ms).unwrap_or_default(),
    }
}

fn window_millis(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX)
}

fn missing_row(user_id: &str) -> QuillError {
    QuillError::storage(format!("rate limit window for {user_id} vanished mid-transaction"))
}

/// Fetch the user's current window without consuming quota.
pub async fn get_or_init_window(
    db: &Database,
    user_id: &str,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<RateLimitWindow, QuillError> {
    let user = user_id.to_string();
    let now_ms = now.timestamp_millis();
    let window_ms = window_millis(window);

    let row = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            roll_forward(&tx, &user, now_ms, window_ms)?;
            let row = read_window(&tx, &user)?;
            tx.commit()?;
            Ok(row)
        })
        .await
        .map_err(map_tr_err)?;

    let (count, start) = row.ok_or_else(|| missing_row(user_id))?;
    Ok(to_window(user_id, count, start))
}

/// Roll the window if needed, then take one unit only if below `limit`.
pub async fn atomic_reserve(
    db: &Database,
    user_id: &str,
    limit: u32,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<ReserveOutcome, QuillError> {
    let user = user_id.to_string();
    let now_ms = now.timestamp_millis();
    let window_ms = window_millis(window);

    let (granted, row) = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            roll_forward(&tx, &user, now_ms, window_ms)?;
            let changed = tx.execute(
                "UPDATE rate_limit_windows SET count = count + 1
                 WHERE user_id = ?1 AND count < ?2",
                params![user, limit],
            )?;
            let row = read_window(&tx, &user)?;
            tx.commit()?;
            Ok((changed == 1, row))
        })
        .await
        .map_err(map_tr_err)?;

    let (count, start) = row.ok_or_else(|| missing_row(user_id))?;
    Ok(ReserveOutcome {
        granted,
        window: to_window(user_id, count, start),
    })
}

/// Give back one unit if the window that granted it is still current.
///
/// A release aimed at a window that has since rolled over is a no-op.
pub async fn atomic_release(
    db: &Database,
    user_id: &str,
    window_start: DateTime<Utc>,
) -> Result<RateLimitWindow, QuillError> {
    let user = user_id.to_string();
    let start_ms = window_start.timestamp_millis();

    let row = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "UPDATE rate_limit_windows SET count = MAX(count - 1, 0)
                 WHERE user_id = ?1 AND window_start = ?2",
                params![user, start_ms],
            )?;
            let row = read_window(&tx, &user)?;
            tx.commit()?;
            Ok(row)
        })
        .await
        .map_err(map_tr_err)?;

    Ok(match row {
        Some((count, start)) => to_window(user_id, count, start),
        None => to_window(user_id, 0, start_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const HOUR: Duration = Duration::from_secs(3600);

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_767_225_600_000).unwrap()
    }

    #[tokio::test]
    async fn init_creates_empty_window() {
        let db = Database::open_in_memory().await.unwrap();
        let window = get_or_init_window(&db, "u1", t0(), HOUR).await.unwrap();
        assert_eq!(window.count, 0);
        assert_eq!(window.window_start, t0());
    }

    #[tokio::test]
    async fn init_does_not_consume_quota() {
        let db = Database::open_in_memory().await.unwrap();
        atomic_reserve(&db, "u1", 10, t0(), HOUR).await.unwrap();
        for _ in 0..3 {
            let window = get_or_init_window(&db, "u1", t0(), HOUR).await.unwrap();
            assert_eq!(window.count, 1);
        }
    }

    #[tokio::test]
    async fn reserve_stops_at_limit() {
        let db = Database::open_in_memory().await.unwrap();
        for expected in 1..=3 {
            let outcome = atomic_reserve(&db, "u1", 3, t0(), HOUR).await.unwrap();
            assert!(outcome.granted);
            assert_eq!(outcome.window.count, expected);
        }
        let denied = atomic_reserve(&db, "u1", 3, t0(), HOUR).await.unwrap();
        assert!(!denied.granted);
        assert_eq!(denied.window.count, 3);
    }

    #[tokio::test]
    async fn window_rolls_over_exactly_at_boundary() {
        let db = Database::open_in_memory().await.unwrap();
        atomic_reserve(&db, "u1", 1, t0(), HOUR).await.unwrap();

        let almost = t0() + chrono::TimeDelta::milliseconds(3_599_999);
        let still_denied = atomic_reserve(&db, "u1", 1, almost, HOUR).await.unwrap();
        assert!(!still_denied.granted);
        assert_eq!(still_denied.window.window_start, t0());

        let boundary = t0() + chrono::TimeDelta::seconds(3600);
        let fresh = atomic_reserve(&db, "u1", 1, boundary, HOUR).await.unwrap();
        assert!(fresh.granted);
        assert_eq!(fresh.window.count, 1);
        assert_eq!(fresh.window.window_start, boundary);
    }

    #[tokio::test]
    async fn users_are_counted_independently() {
        let db = Database::open_in_memory().await.unwrap();
        atomic_reserve(&db, "alice", 1, t0(), HOUR).await.unwrap();
        let bob = atomic_reserve(&db, "bob", 1, t0(), HOUR).await.unwrap();
        assert!(bob.granted);
    }

    #[tokio::test]
    async fn release_decrements_and_floors_at_zero() {
        let db = Database::open_in_memory().await.unwrap();
        let outcome = atomic_reserve(&db, "u1", 5, t0(), HOUR).await.unwrap();
        let start = outcome.window.window_start;

        let after = atomic_release(&db, "u1", start).await.unwrap();
        assert_eq!(after.count, 0);
        let again = atomic_release(&db, "u1", start).await.unwrap();
        assert_eq!(again.count, 0);
    }

    #[tokio::test]
    async fn release_after_rollover_is_ignored() {
        let db = Database::open_in_memory().await.unwrap();
        let old = atomic_reserve(&db, "u1", 5, t0(), HOUR).await.unwrap();

        let later = t0() + chrono::TimeDelta::hours(2);
        atomic_reserve(&db, "u1", 5, later, HOUR).await.unwrap();

        let after = atomic_release(&db, "u1", old.window.window_start).await.unwrap();
        assert_eq!(after.count, 1, "new window must keep its reservation");
        assert_eq!(after.window_start, later);
    }

    #[tokio::test]
    async fn release_for_unknown_user_is_noop() {
        let db = Database::open_in_memory().await.unwrap();
        let window = atomic_release(&db, "ghost", t0()).await.unwrap();
        assert_eq!(window.count, 0);
    }

    #[tokio::test]
    async fn concurrent_reserves_never_exceed_limit() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let limit = 7;

        let attempts = (0..25).map(|_| {
            let db = Arc::clone(&db);
            tokio::spawn(async move { atomic_reserve(&db, "busy", limit, t0(), HOUR).await })
        });
        let results = futures::future::join_all(attempts).await;

        let granted = results
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .filter(|o| o.granted)
            .count();
        assert_eq!(granted, limit as usize);

        let window = get_or_init_window(&db, "busy", t0(), HOUR).await.unwrap();
        assert_eq!(window.count, limit);
    }
}
