// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit log queries and hash chaining.

use herald_core::{AuditRecord, HeraldError};
use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::database::{Database, conversion_error, format_timestamp, map_tr_err, parse_timestamp};

/// `prev_hash` of the first record.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// A record as stored: every column as its TEXT form.
#[derive(Debug, Clone)]
struct StoredRecord {
    id: String,
    requester_id: String,
    tenant_id: String,
    conversation_id: String,
    kind: String,
    action: String,
    description: String,
    input: String,
    output: String,
    status: String,
    error: Option<String>,
    created_at: String,
}

impl StoredRecord {
    fn from_record(record: &AuditRecord) -> Self {
        Self {
            id: record.id.clone(),
            requester_id: record.requester_id.clone(),
            tenant_id: record.tenant_id.clone(),
            conversation_id: record.conversation_id.clone(),
            kind: record.kind.to_string(),
            action: record.action.clone(),
            description: record.description.clone(),
            input: record.input.to_string(),
            output: record.output.to_string(),
            status: record.status.to_string(),
            error: record.error.clone(),
            created_at: format_timestamp(&record.created_at),
        }
    }

    /// SHA-256 over `prev_hash` and each column, separated by 0x1f.
    fn chain_hash(&self, prev_hash: &str) -> String {
        let fields: [&str; 13] = [
            prev_hash,
            &self.id,
            &self.requester_id,
            &self.tenant_id,
            &self.conversation_id,
            &self.kind,
            &self.action,
            &self.description,
            &self.input,
            &self.output,
            &self.status,
            self.error.as_deref().unwrap_or(""),
            &self.created_at,
        ];
        let mut hasher = Sha256::new();
        for field in fields {
            hasher.update(field.as_bytes());
            hasher.update([0x1f]);
        }
        hex::encode(hasher.finalize())
    }

    fn into_record(self) -> Result<AuditRecord, rusqlite::Error> {
        Ok(AuditRecord {
            kind: self.kind.parse().map_err(|e| conversion_error(5, e))?,
            status: self.status.parse().map_err(|e| conversion_error(10, e))?,
            input: serde_json::from_str(&self.input).map_err(|e| conversion_error(8, e))?,
            output: serde_json::from_str(&self.output).map_err(|e| conversion_error(9, e))?,
            created_at: parse_timestamp(12, &self.created_at)?,
            id: self.id,
            requester_id: self.requester_id,
            tenant_id: self.tenant_id,
            conversation_id: self.conversation_id,
            action: self.action,
            description: self.description,
            error: self.error,
        })
    }
}

const COLUMNS: &str = "id, requester_id, tenant_id, conversation_id, kind, action, description, \
                       input, output, status, error, created_at, prev_hash, hash";

fn read_row(row: &rusqlite::Row<'_>) -> Result<(StoredRecord, String, String), rusqlite::Error> {
    Ok((
        StoredRecord {
            id: row.get(0)?,
            requester_id: row.get(1)?,
            tenant_id: row.get(2)?,
            conversation_id: row.get(3)?,
            kind: row.get(4)?,
            action: row.get(5)?,
            description: row.get(6)?,
            input: row.get(7)?,
            output: row.get(8)?,
            status: row.get(9)?,
            error: row.get(10)?,
            created_at: row.get(11)?,
        },
        row.get(12)?,
        row.get(13)?,
    ))
}

/// Append `record` to the chain. Returns the new record's hash.
pub async fn append_record(db: &Database, record: &AuditRecord) -> Result<String, HeraldError> {
    let stored = StoredRecord::from_record(record);
    db.connection()
        .call(move |conn| -> Result<String, rusqlite::Error> {
            let tx = conn.transaction()?;
            let prev_hash: String = tx
                .query_row(
                    "SELECT hash FROM audit_log ORDER BY seq DESC LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or_else(|| GENESIS_HASH.to_string());
            let hash = stored.chain_hash(&prev_hash);
            tx.execute(
                &format!(
                    "INSERT INTO audit_log ({COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                params![
                    stored.id,
                    stored.requester_id,
                    stored.tenant_id,
                    stored.conversation_id,
                    stored.kind,
                    stored.action,
                    stored.description,
                    stored.input,
                    stored.output,
                    stored.status,
                    stored.error,
                    stored.created_at,
                    prev_hash,
                    hash,
                ],
            )?;
            tx.commit()?;
            Ok(hash)
        })
        .await
        .map_err(map_tr_err)
}

/// Newest first, optionally for one requester.
pub async fn recent_records(
    db: &Database,
    requester_id: Option<&str>,
    limit: usize,
) -> Result<Vec<AuditRecord>, HeraldError> {
    let requester_id = requester_id.map(str::to_string);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<AuditRecord>, rusqlite::Error> {
            let mut records = Vec::new();
            match &requester_id {
                Some(requester_id) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {COLUMNS} FROM audit_log WHERE requester_id = ?1 \
                         ORDER BY seq DESC LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![requester_id, limit], read_row)?;
                    for row in rows {
                        records.push(row?.0.into_record()?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {COLUMNS} FROM audit_log ORDER BY seq DESC LIMIT ?1"
                    ))?;
                    let rows = stmt.query_map(params![limit], read_row)?;
                    for row in rows {
                        records.push(row?.0.into_record()?);
                    }
                }
            }
            Ok(records)
        })
        .await
        .map_err(map_tr_err)
}

/// Outcome of [`verify_chain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainVerification {
    /// Records checked.
    pub records: usize,
    /// Id of the first record whose link or hash does not match.
    pub first_broken: Option<String>,
}

impl ChainVerification {
    pub fn is_intact(&self) -> bool {
        self.first_broken.is_none()
    }
}

/// Walk the chain from the genesis record, recomputing every hash.
pub async fn verify_chain(db: &Database) -> Result<ChainVerification, HeraldError> {
    db.connection()
        .call(|conn| -> Result<ChainVerification, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM audit_log ORDER BY seq"))?;
            let rows = stmt.query_map([], read_row)?;

            let mut expected_prev = GENESIS_HASH.to_string();
            let mut records = 0;
            for row in rows {
                let (stored, prev_hash, hash) = row?;
                records += 1;
                if prev_hash != expected_prev || stored.chain_hash(&prev_hash) != hash {
                    return Ok(ChainVerification {
                        records,
                        first_broken: Some(stored.id),
                    });
                }
                expected_prev = hash;
            }
            Ok(ChainVerification {
                records,
                first_broken: None,
            })
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use herald_core::{AuditKind, AuditStatus, CallContext};
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn record(requester: &str, action: &str) -> AuditRecord {
        let ctx = CallContext {
            requester_id: requester.to_string(),
            tenant_id: "tenant-1".into(),
            session_id: "conv-1".into(),
            channel_handle: "c".into(),
            reply_address: "a".into(),
            confirmed: false,
        };
        AuditRecord::new(&ctx, AuditKind::Operation, action, AuditStatus::Success)
            .with_description("list my events")
            .with_input(json!({"week": 2}))
            .with_output(json!({"count": 3}))
    }

    #[tokio::test]
    async fn append_and_read_back() {
        let (db, _dir) = setup_db().await;
        let original = record("r1", "list_events");
        append_record(&db, &original).await.unwrap();

        let records = recent_records(&db, None, 10).await.unwrap();
        assert_eq!(records.len(), 1);
        let read = &records[0];
        assert_eq!(read.id, original.id);
        assert_eq!(read.kind, AuditKind::Operation);
        assert_eq!(read.status, AuditStatus::Success);
        assert_eq!(read.input, json!({"week": 2}));
        assert_eq!(read.description, "list my events");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_filtered() {
        let (db, _dir) = setup_db().await;
        for (requester, action) in [("r1", "a"), ("r2", "b"), ("r1", "c")] {
            append_record(&db, &record(requester, action)).await.unwrap();
        }

        let r1: Vec<String> = recent_records(&db, Some("r1"), 10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.action)
            .collect();
        assert_eq!(r1, vec!["c", "a"]);

        let limited = recent_records(&db, None, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].action, "c");
    }

    #[tokio::test]
    async fn chain_links_each_record_to_its_predecessor() {
        let (db, _dir) = setup_db().await;
        let first = append_record(&db, &record("r1", "a")).await.unwrap();
        append_record(&db, &record("r1", "b")).await.unwrap();

        let prev: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row(
                    "SELECT prev_hash FROM audit_log WHERE action = 'b'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(prev, first);
        assert_eq!(first.len(), 64);
    }

    #[tokio::test]
    async fn intact_chain_verifies() {
        let (db, _dir) = setup_db().await;
        for i in 0..5 {
            append_record(&db, &record("r1", &format!("op{i}"))).await.unwrap();
        }
        let verification = verify_chain(&db).await.unwrap();
        assert_eq!(verification.records, 5);
        assert!(verification.is_intact());
    }

    #[tokio::test]
    async fn empty_chain_verifies() {
        let (db, _dir) = setup_db().await;
        let verification = verify_chain(&db).await.unwrap();
        assert_eq!(verification.records, 0);
        assert!(verification.is_intact());
    }

    #[tokio::test]
    async fn edited_row_breaks_the_chain() {
        let (db, _dir) = setup_db().await;
        let originals: Vec<AuditRecord> = (0..3).map(|i| record("r1", &format!("op{i}"))).collect();
        for r in &originals {
            append_record(&db, r).await.unwrap();
        }

        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE audit_log SET output = '{\"count\":0}' WHERE action = 'op1'",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let verification = verify_chain(&db).await.unwrap();
        assert_eq!(verification.first_broken.as_deref(), Some(originals[1].id.as_str()));
    }

    #[tokio::test]
    async fn deleted_row_breaks_the_chain() {
        let (db, _dir) = setup_db().await;
        let originals: Vec<AuditRecord> = (0..3).map(|i| record("r1", &format!("op{i}"))).collect();
        for r in &originals {
            append_record(&db, r).await.unwrap();
        }

        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM audit_log WHERE action = 'op1'", [])?;
                Ok(())
            })
            .await
            .unwrap();

        let verification = verify_chain(&db).await.unwrap();
        assert_eq!(verification.first_broken.as_deref(), Some(originals[2].id.as_str()));
    }
}
