// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hash-chained SQLite implementation of [`AuditSink`].

use async_trait::async_trait;
use herald_core::{AuditRecord, AuditSink, HeraldError};
use tracing::debug;

use crate::database::Database;
use crate::queries::audit::{self, ChainVerification};

/// Append-only audit log stored in the `audit_log` table.
#[derive(Clone)]
pub struct SqliteAuditLog {
    db: Database,
}

impl SqliteAuditLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Recompute the hash chain from the first record.
    pub async fn verify_chain(&self) -> Result<ChainVerification, HeraldError> {
        audit::verify_chain(&self.db).await
    }
}

#[async_trait]
impl AuditSink for SqliteAuditLog {
    async fn record(&self, record: &AuditRecord) -> Result<(), HeraldError> {
        let hash = audit::append_record(&self.db, record).await?;
        debug!(
            id = %record.id,
            kind = %record.kind,
            action = %record.action,
            hash = %hash,
            "audit record appended"
        );
        Ok(())
    }

    async fn recent(
        &self,
        requester_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, HeraldError> {
        audit::recent_records(&self.db, requester_id, limit).await
    }
}
