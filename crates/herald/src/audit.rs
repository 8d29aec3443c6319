// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `herald audit` and `herald verify-audit` command implementations.

use herald_config::HeraldConfig;
use herald_core::{AuditRecord, AuditSink, HeraldError};
use herald_storage::{Database, SqliteAuditLog};

/// One line per record: time, requester, kind, action, status.
pub fn format_record(record: &AuditRecord) -> String {
    let mut line = format!(
        "{}  {:<16} {:<24} {:<24} {}",
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
        record.requester_id,
        record.kind,
        record.action,
        record.status
    );
    if let Some(error) = &record.error {
        line.push_str("  error: ");
        line.push_str(error);
    }
    line
}

/// Run the `herald audit` command. Newest records first.
pub async fn run_audit(
    config: &HeraldConfig,
    requester: Option<&str>,
    limit: usize,
    json: bool,
) -> Result<(), HeraldError> {
    let db = Database::from_config(&config.storage).await?;
    let records = SqliteAuditLog::new(db.clone()).recent(requester, limit).await?;

    if records.is_empty() {
        println!("No audit records.");
    }
    for record in &records {
        if json {
            let line = serde_json::to_string(record)
                .map_err(|e| HeraldError::Internal(format!("serialize audit record: {e}")))?;
            println!("{line}");
        } else {
            println!("{}", format_record(record));
        }
    }
    db.close().await
}

/// Run the `herald verify-audit` command.
///
/// A broken chain is an error naming the first record that does not match.
pub async fn run_verify(config: &HeraldConfig) -> Result<(), HeraldError> {
    let db = Database::from_config(&config.storage).await?;
    let verification = SqliteAuditLog::new(db.clone()).verify_chain().await?;
    db.close().await?;

    match verification.first_broken {
        None => {
            println!(
                "Audit chain intact ({} records verified).",
                verification.records
            );
            Ok(())
        }
        Some(id) => Err(HeraldError::Internal(format!(
            "audit chain broken at record {id} ({} records checked)",
            verification.records
        ))),
    }
}
