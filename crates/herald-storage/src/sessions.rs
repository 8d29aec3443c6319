// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`SessionStore`].

use async_trait::async_trait;
use herald_core::{
    AdapterType, ChatMessage, ConversationSession, HealthStatus, HeraldError, PluginAdapter,
    SessionStore,
};

use crate::database::{Database, map_tr_err};
use crate::queries::sessions;

/// Persists full history; reads return the active conversation only.
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: Database,
}

impl SqliteSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PluginAdapter for SqliteSessionStore {
    fn name(&self) -> &str {
        "sqlite-sessions"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HeraldError> {
        self.db.close().await
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get_or_create(&self, requester_id: &str) -> Result<ConversationSession, HeraldError> {
        sessions::get_or_create_session(&self.db, requester_id).await
    }

    async fn open(&self, requester_id: &str) -> Result<ConversationSession, HeraldError> {
        sessions::open_session(&self.db, requester_id).await
    }

    async fn append(&self, requester_id: &str, message: ChatMessage) -> Result<(), HeraldError> {
        sessions::append_message(&self.db, requester_id, &message).await
    }

    async fn recent(
        &self,
        requester_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, HeraldError> {
        sessions::recent_messages(&self.db, requester_id, limit).await
    }

    async fn set_intent(
        &self,
        requester_id: &str,
        intent: Option<String>,
    ) -> Result<(), HeraldError> {
        sessions::set_intent(&self.db, requester_id, intent).await
    }

    async fn reset(&self, requester_id: &str) -> Result<ConversationSession, HeraldError> {
        sessions::reset_session(&self.db, requester_id).await
    }
}
