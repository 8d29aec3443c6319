// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation session and message queries.

use chrono::Utc;
use herald_core::{ChatMessage, ConversationSession, HeraldError};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::{Database, conversion_error, format_timestamp, map_tr_err, parse_timestamp};

/// Insert a session row for `requester_id` unless one exists.
fn ensure_session(
    conn: &Connection,
    requester_id: &str,
    fresh_session_id: &str,
    now: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO conversation_sessions
             (requester_id, session_id, status, last_activity, created_at)
         VALUES (?1, ?2, 'active', ?3, ?3)",
        params![requester_id, fresh_session_id, now],
    )?;
    Ok(())
}

fn read_message(row: &rusqlite::Row<'_>) -> Result<ChatMessage, rusqlite::Error> {
    let role: String = row.get(0)?;
    let function_call: Option<String> = row.get(2)?;
    let created_at: String = row.get(3)?;
    Ok(ChatMessage {
        role: role.parse().map_err(|e| conversion_error(0, e))?,
        content: row.get(1)?,
        function_call: function_call
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| conversion_error(2, e))?,
        created_at: parse_timestamp(3, &created_at)?,
    })
}

/// Messages of `session_id`, oldest first. `limit` keeps only the newest.
fn load_messages(
    conn: &Connection,
    session_id: &str,
    limit: Option<usize>,
) -> Result<Vec<ChatMessage>, rusqlite::Error> {
    let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let mut stmt = conn.prepare(
        "SELECT role, content, function_call, created_at FROM conversation_messages
         WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![session_id, limit], read_message)?;
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    messages.reverse();
    Ok(messages)
}

/// Load the requester's session with its full active history, creating it if needed.
pub async fn get_or_create_session(
    db: &Database,
    requester_id: &str,
) -> Result<ConversationSession, HeraldError> {
    load_session(db, requester_id, true).await
}

/// Load the requester's session row only, creating it if needed.
///
/// `messages` is empty; use [`recent_messages`] for a windowed read.
pub async fn open_session(
    db: &Database,
    requester_id: &str,
) -> Result<ConversationSession, HeraldError> {
    load_session(db, requester_id, false).await
}

async fn load_session(
    db: &Database,
    requester_id: &str,
    with_messages: bool,
) -> Result<ConversationSession, HeraldError> {
    let fresh = ConversationSession::new(requester_id);
    db.connection()
        .call(move |conn| -> Result<ConversationSession, rusqlite::Error> {
            ensure_session(
                conn,
                &fresh.requester_id,
                &fresh.session_id,
                &format_timestamp(&fresh.last_activity),
            )?;
            let (session_id, current_intent, status, last_activity): (
                String,
                Option<String>,
                String,
                String,
            ) = conn.query_row(
                "SELECT session_id, current_intent, status, last_activity
                 FROM conversation_sessions WHERE requester_id = ?1",
                params![fresh.requester_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
            let messages = if with_messages {
                load_messages(conn, &session_id, None)?
            } else {
                Vec::new()
            };
            Ok(ConversationSession {
                requester_id: fresh.requester_id,
                session_id,
                messages,
                current_intent,
                last_activity: parse_timestamp(3, &last_activity)?,
                status: status.parse().map_err(|e| conversion_error(2, e))?,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Append a message to the requester's active conversation.
pub async fn append_message(
    db: &Database,
    requester_id: &str,
    message: &ChatMessage,
) -> Result<(), HeraldError> {
    let fresh = ConversationSession::new(requester_id);
    let role = message.role.to_string();
    let content = message.content.clone();
    let function_call = message
        .function_call
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| HeraldError::Internal(format!("serialize function call: {e}")))?;
    let created_at = format_timestamp(&message.created_at);

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            ensure_session(&tx, &fresh.requester_id, &fresh.session_id, &created_at)?;
            tx.execute(
                "INSERT INTO conversation_messages
                     (requester_id, session_id, role, content, function_call, created_at)
                 SELECT ?1, session_id, ?2, ?3, ?4, ?5
                 FROM conversation_sessions WHERE requester_id = ?1",
                params![fresh.requester_id, role, content, function_call, created_at],
            )?;
            tx.execute(
                "UPDATE conversation_sessions SET last_activity = ?2 WHERE requester_id = ?1",
                params![fresh.requester_id, created_at],
            )?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// The newest `limit` messages of the active conversation, oldest first.
pub async fn recent_messages(
    db: &Database,
    requester_id: &str,
    limit: usize,
) -> Result<Vec<ChatMessage>, HeraldError> {
    let requester_id = requester_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<ChatMessage>, rusqlite::Error> {
            let session_id: Option<String> = conn
                .query_row(
                    "SELECT session_id FROM conversation_sessions WHERE requester_id = ?1",
                    params![requester_id],
                    |row| row.get(0),
                )
                .optional()?;
            match session_id {
                Some(session_id) => load_messages(conn, &session_id, Some(limit)),
                None => Ok(Vec::new()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Record the intent currently being worked on.
pub async fn set_intent(
    db: &Database,
    requester_id: &str,
    intent: Option<String>,
) -> Result<(), HeraldError> {
    let fresh = ConversationSession::new(requester_id);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let now = format_timestamp(&Utc::now());
            ensure_session(conn, &fresh.requester_id, &fresh.session_id, &now)?;
            conn.execute(
                "UPDATE conversation_sessions SET current_intent = ?2 WHERE requester_id = ?1",
                params![fresh.requester_id, intent],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Start a new conversation id. Earlier messages stay in the table.
pub async fn reset_session(
    db: &Database,
    requester_id: &str,
) -> Result<ConversationSession, HeraldError> {
    let fresh = ConversationSession::new(requester_id);
    let session = fresh.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let now = format_timestamp(&fresh.last_activity);
            conn.execute(
                "INSERT INTO conversation_sessions
                     (requester_id, session_id, status, last_activity, created_at)
                 VALUES (?1, ?2, 'active', ?3, ?3)
                 ON CONFLICT (requester_id) DO UPDATE SET
                     session_id = excluded.session_id,
                     current_intent = NULL,
                     status = 'active',
                     last_activity = excluded.last_activity",
                params![fresh.requester_id, fresh.session_id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(session)
}

/// Messages stored for `requester_id` across every conversation id.
pub async fn count_all_messages(db: &Database, requester_id: &str) -> Result<usize, HeraldError> {
    let requester_id = requester_id.to_string();
    let count: i64 = db
        .connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM conversation_messages WHERE requester_id = ?1",
                params![requester_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(usize::try_from(count).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use herald_core::{Role, SessionStatus};
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn first_contact_creates_empty_session() {
        let (db, _dir) = setup_db().await;
        let session = get_or_create_session(&db, "r1").await.unwrap();
        assert_eq!(session.requester_id, "r1");
        assert!(session.messages.is_empty());
        assert_eq!(session.status, SessionStatus::Active);

        let again = get_or_create_session(&db, "r1").await.unwrap();
        assert_eq!(again.session_id, session.session_id);
    }

    #[tokio::test]
    async fn append_then_window() {
        let (db, _dir) = setup_db().await;
        for i in 0..5 {
            append_message(&db, "r1", &ChatMessage::user(format!("m{i}")))
                .await
                .unwrap();
        }
        let recent = recent_messages(&db, "r1", 3).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);

        let session = get_or_create_session(&db, "r1").await.unwrap();
        assert_eq!(session.messages.len(), 5);
    }

    #[tokio::test]
    async fn open_reads_the_session_row_without_history() {
        let (db, _dir) = setup_db().await;
        for i in 0..3 {
            append_message(&db, "r1", &ChatMessage::user(format!("m{i}")))
                .await
                .unwrap();
        }
        set_intent(&db, "r1", Some("delete_cell".into())).await.unwrap();

        let full = get_or_create_session(&db, "r1").await.unwrap();
        let opened = open_session(&db, "r1").await.unwrap();
        assert_eq!(opened.session_id, full.session_id);
        assert_eq!(opened.current_intent.as_deref(), Some("delete_cell"));
        assert!(opened.messages.is_empty());
        assert_eq!(full.messages.len(), 3);

        let created = open_session(&db, "r2").await.unwrap();
        assert_eq!(
            open_session(&db, "r2").await.unwrap().session_id,
            created.session_id
        );
    }

    #[tokio::test]
    async fn function_call_payload_round_trips() {
        let (db, _dir) = setup_db().await;
        let call = ChatMessage::function_call("delete_cell", json!({"cell_id": 7}));
        append_message(&db, "r1", &call).await.unwrap();
        append_message(&db, "r1", &ChatMessage::function_result("{\"ok\":true}"))
            .await
            .unwrap();

        let recent = recent_messages(&db, "r1", 10).await.unwrap();
        assert_eq!(recent[0].role, Role::Assistant);
        let fc = recent[0].function_call.as_ref().expect("function call");
        assert_eq!(fc.operation, "delete_cell");
        assert_eq!(fc.arguments, json!({"cell_id": 7}));
        assert_eq!(recent[1].role, Role::FunctionResult);
    }

    #[tokio::test]
    async fn reset_hides_history_but_keeps_rows() {
        let (db, _dir) = setup_db().await;
        append_message(&db, "r1", &ChatMessage::user("hello")).await.unwrap();
        set_intent(&db, "r1", Some("list_events".into())).await.unwrap();
        let before = get_or_create_session(&db, "r1").await.unwrap();
        assert_eq!(before.current_intent.as_deref(), Some("list_events"));

        let after = reset_session(&db, "r1").await.unwrap();
        assert_ne!(after.session_id, before.session_id);

        let reloaded = get_or_create_session(&db, "r1").await.unwrap();
        assert_eq!(reloaded.session_id, after.session_id);
        assert!(reloaded.messages.is_empty());
        assert!(reloaded.current_intent.is_none());
        assert_eq!(count_all_messages(&db, "r1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_requester_has_no_messages() {
        let (db, _dir) = setup_db().await;
        assert!(recent_messages(&db, "nobody", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_requester() {
        let (db, _dir) = setup_db().await;
        append_message(&db, "r1", &ChatMessage::user("one")).await.unwrap();
        append_message(&db, "r2", &ChatMessage::user("two")).await.unwrap();
        let r2 = recent_messages(&db, "r2", 10).await.unwrap();
        assert_eq!(r2.len(), 1);
        assert_eq!(r2[0].content, "two");
    }
}
