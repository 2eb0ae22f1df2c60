// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enhancement session operations.
//!
//! Terminal transitions are guarded by `status = 'pending'` in the UPDATE
//! itself, so a settled session can never be rewritten.

use std::str::FromStr;

use quill_core::types::format_timestamp;
use quill_core::{EnhancementOptions, EnhancementSession, QuillError, SessionOutcome, SessionStatus};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{map_tr_err, Database};

const SESSION_COLUMNS: &str = "id, user_id, prompt_id, original_content, enhanced_content, \
     options, status, error_message, api_response_time, created_at, completed_at";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<EnhancementSession> {
    let options: String = row.get(5)?;
    let options: EnhancementOptions = serde_json::from_str(&options)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    let status: String = row.get(6)?;
    let status = SessionStatus::from_str(&status)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    let api_response_time: Option<i64> = row.get(8)?;

    Ok(EnhancementSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        prompt_id: row.get(2)?,
        original_content: row.get(3)?,
        enhanced_content: row.get(4)?,
        options,
        status,
        error_message: row.get(7)?,
        api_response_time: api_response_time.map(|ms| ms.max(0) as u64),
        created_at: row.get(9)?,
        completed_at: row.get(10)?,
    })
}

/// Insert a new session.
pub async fn create_session(db: &Database, session: &EnhancementSession) -> Result<(), QuillError> {
    let options = serde_json::to_string(&session.options).map_err(QuillError::storage)?;
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO enhancement_sessions (id, user_id, prompt_id, original_content, \
                 enhanced_content, options, status, error_message, api_response_time, \
                 created_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    session.id,
                    session.user_id,
                    session.prompt_id,
                    session.original_content,
                    session.enhanced_content,
                    options,
                    session.status.to_string(),
                    session.error_message,
                    session.api_response_time.map(clamp_ms),
                    session.created_at,
                    session.completed_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// What the guarded terminal UPDATE found.
enum Settle {
    Applied,
    Missing,
    AlreadySettled(String),
}

/// Move a pending session into its terminal state.
pub async fn update_session(
    db: &Database,
    id: &str,
    outcome: &SessionOutcome,
) -> Result<(), QuillError> {
    let (enhanced_content, error_message, response_ms) = match outcome {
        SessionOutcome::Success {
            enhanced_content,
            api_response_time,
            ..
        } => (Some(enhanced_content.clone()), None, *api_response_time),
        SessionOutcome::Failed {
            error_message,
            api_response_time,
            ..
        } => (None, Some(error_message.clone()), *api_response_time),
    };
    let status = outcome.status().to_string();
    let completed_at = format_timestamp(outcome.completed_at());
    let id_owned = id.to_string();

    let settle = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE enhancement_sessions
                 SET status = ?1, enhanced_content = ?2, error_message = ?3,
                     api_response_time = ?4, completed_at = ?5
                 WHERE id = ?6 AND status = 'pending'",
                params![
                    status,
                    enhanced_content,
                    error_message,
                    clamp_ms(response_ms),
                    completed_at,
                    id_owned,
                ],
            )?;
            if changed == 1 {
                return Ok(Settle::Applied);
            }
            let current: Option<String> = conn
                .query_row(
                    "SELECT status FROM enhancement_sessions WHERE id = ?1",
                    params![id_owned],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(match current {
                Some(status) => Settle::AlreadySettled(status),
                None => Settle::Missing,
            })
        })
        .await
        .map_err(map_tr_err)?;

    match settle {
        Settle::Applied => Ok(()),
        Settle::Missing => Err(QuillError::storage(format!("session {id} not found"))),
        Settle::AlreadySettled(status) => Err(QuillError::SessionSettled {
            id: id.to_string(),
            status: SessionStatus::from_str(&status).unwrap_or(SessionStatus::Failed),
        }),
    }
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<EnhancementSession>, QuillError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM enhancement_sessions WHERE id = ?1"),
                params![id],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List a user's sessions, newest first.
pub async fn list_sessions_for_user(
    db: &Database,
    user_id: &str,
    limit: Option<i64>,
) -> Result<Vec<EnhancementSession>, QuillError> {
    let user_id = user_id.to_string();
    // SQLite treats a negative LIMIT as "no limit".
    let limit = limit.unwrap_or(-1);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM enhancement_sessions
                 WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![user_id, limit], session_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

fn clamp_ms(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::{Focus, Tone};

    fn t0() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(1_767_225_600, 0).unwrap()
    }

    fn make_session(user: &str, content: &str) -> EnhancementSession {
        EnhancementSession::pending(
            user,
            Some("prompt-1".into()),
            content,
            EnhancementOptions {
                platform: Some("ChatGPT".into()),
                tone: Some(Tone::Academic),
                focus: Some(Focus::Structure),
            },
            t0(),
        )
    }

    #[tokio::test]
    async fn create_and_get_session_roundtrips() {
        let db = Database::open_in_memory().await.unwrap();
        let session = make_session("user-1", "Write a poem");

        create_session(&db, &session).await.unwrap();
        let retrieved = get_session(&db, &session.id).await.unwrap().unwrap();
        assert_eq!(retrieved, session);
    }

    #[tokio::test]
    async fn get_nonexistent_session_returns_none() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get_session(&db, "no-such-session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn success_sets_only_success_fields() {
        let db = Database::open_in_memory().await.unwrap();
        let session = make_session("user-1", "draft");
        create_session(&db, &session).await.unwrap();

        let outcome = SessionOutcome::Success {
            enhanced_content: "better draft".into(),
            api_response_time: 400,
            completed_at: t0(),
        };
        update_session(&db, &session.id, &outcome).await.unwrap();

        let stored = get_session(&db, &session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Success);
        assert_eq!(stored.enhanced_content.as_deref(), Some("better draft"));
        assert_eq!(stored.api_response_time, Some(400));
        assert!(stored.error_message.is_none());
        assert_eq!(stored.created_at, "2026-01-01T00:00:00.000Z");
        assert_eq!(stored.completed_at.as_deref(), Some("2026-01-01T00:00:00.000Z"));
        assert_eq!(stored.original_content, "draft");
    }

    #[tokio::test]
    async fn failure_sets_only_failure_fields() {
        let db = Database::open_in_memory().await.unwrap();
        let session = make_session("user-1", "draft");
        create_session(&db, &session).await.unwrap();

        let outcome = SessionOutcome::Failed {
            error_message: "completion service returned 503: overloaded".into(),
            api_response_time: 12,
            completed_at: t0(),
        };
        update_session(&db, &session.id, &outcome).await.unwrap();

        let stored = get_session(&db, &session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Failed);
        assert!(stored.enhanced_content.is_none());
        assert!(stored.error_message.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn settled_session_cannot_transition_again() {
        let db = Database::open_in_memory().await.unwrap();
        let session = make_session("user-1", "draft");
        create_session(&db, &session).await.unwrap();

        let success = SessionOutcome::Success {
            enhanced_content: "done".into(),
            api_response_time: 5,
            completed_at: t0(),
        };
        update_session(&db, &session.id, &success).await.unwrap();

        let failed = SessionOutcome::Failed {
            error_message: "late failure".into(),
            api_response_time: 5,
            completed_at: t0(),
        };
        let err = update_session(&db, &session.id, &failed).await.unwrap_err();
        assert!(matches!(
            err,
            QuillError::SessionSettled {
                status: SessionStatus::Success,
                ..
            }
        ));

        // The first terminal write is untouched.
        let stored = get_session(&db, &session.id).await.unwrap().unwrap();
        assert_eq!(stored.enhanced_content.as_deref(), Some("done"));
        assert!(stored.error_message.is_none());
    }

    #[tokio::test]
    async fn updating_missing_session_is_an_error() {
        let db = Database::open_in_memory().await.unwrap();
        let outcome = SessionOutcome::Failed {
            error_message: "x".into(),
            api_response_time: 0,
            completed_at: t0(),
        };
        let err = update_session(&db, "ghost", &outcome).await.unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {err}");
    }

    #[tokio::test]
    async fn list_sessions_filters_by_user_and_limits() {
        let db = Database::open_in_memory().await.unwrap();
        for i in 0..3 {
            create_session(&db, &make_session("alice", &format!("a{i}")))
                .await
                .unwrap();
        }
        create_session(&db, &make_session("bob", "b0")).await.unwrap();

        let alice = list_sessions_for_user(&db, "alice", None).await.unwrap();
        assert_eq!(alice.len(), 3);
        assert!(alice.iter().all(|s| s.user_id == "alice"));
        // Newest first; rows created in the same millisecond fall back to insertion order.
        assert_eq!(alice[0].original_content, "a2");

        let limited = list_sessions_for_user(&db, "alice", Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);

        let nobody = list_sessions_for_user(&db, "carol", None).await.unwrap();
        assert!(nobody.is_empty());
    }
}
