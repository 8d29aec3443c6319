// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage seams for conversation sessions and the audit log.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::types::{AuditRecord, ChatMessage, ConversationSession};

/// Per-requester conversation history.
///
/// One session exists per requester. Messages are append-only; `reset` is the
/// only operation that removes them from the active conversation.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the requester's session, creating an empty one on first contact.
    async fn get_or_create(&self, requester_id: &str) -> Result<ConversationSession, HeraldError>;

    /// Like [`get_or_create`](Self::get_or_create) without the history:
    /// `messages` is left empty. Read history through [`recent`](Self::recent).
    async fn open(&self, requester_id: &str) -> Result<ConversationSession, HeraldError> {
        let mut session = self.get_or_create(requester_id).await?;
        session.messages.clear();
        Ok(session)
    }

    /// Appends a message and bumps the last-activity timestamp.
    async fn append(&self, requester_id: &str, message: ChatMessage) -> Result<(), HeraldError>;

    /// The most recent `limit` messages of the active conversation, oldest first.
    async fn recent(&self, requester_id: &str, limit: usize)
    -> Result<Vec<ChatMessage>, HeraldError>;

    /// Records the intent currently being worked on, if any.
    async fn set_intent(&self, requester_id: &str, intent: Option<String>)
    -> Result<(), HeraldError>;

    /// Empties the conversation and starts a new conversation id.
    async fn reset(&self, requester_id: &str) -> Result<ConversationSession, HeraldError>;
}

/// Append-only audit sink.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends one record. Records are never updated afterwards.
    async fn record(&self, record: &AuditRecord) -> Result<(), HeraldError>;

    /// Most recent records first, optionally restricted to one requester.
    async fn recent(
        &self,
        requester_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, HeraldError>;
}
