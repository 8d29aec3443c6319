// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only in-memory audit log.

use std::sync::Mutex;

use async_trait::async_trait;
use herald_core::{AuditRecord, AuditSink, HeraldError};

#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record in insertion order.
    pub fn records(&self) -> Result<Vec<AuditRecord>, HeraldError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<AuditRecord>>, HeraldError> {
        self.records
            .lock()
            .map_err(|_| HeraldError::Internal("audit log lock poisoned".into()))
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record(&self, record: &AuditRecord) -> Result<(), HeraldError> {
        self.lock()?.push(record.clone());
        Ok(())
    }

    async fn recent(
        &self,
        requester_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, HeraldError> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .rev()
            .filter(|r| requester_id.is_none_or(|id| r.requester_id == id))
            .take(limit)
            .cloned()
            .collect())
    }
}
