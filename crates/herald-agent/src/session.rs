// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory conversation sessions keyed by requester.

use async_trait::async_trait;
use dashmap::DashMap;
use herald_core::{ChatMessage, ConversationSession, HeraldError, SessionStore};

/// Process-local [`SessionStore`]. Sessions are lost on restart.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, ConversationSession>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, requester_id: &str) -> Result<ConversationSession, HeraldError> {
        let session = self
            .sessions
            .entry(requester_id.to_string())
            .or_insert_with(|| ConversationSession::new(requester_id));
        Ok(session.clone())
    }

    async fn open(&self, requester_id: &str) -> Result<ConversationSession, HeraldError> {
        let session = self
            .sessions
            .entry(requester_id.to_string())
            .or_insert_with(|| ConversationSession::new(requester_id));
        Ok(ConversationSession {
            requester_id: session.requester_id.clone(),
            session_id: session.session_id.clone(),
            messages: Vec::new(),
            current_intent: session.current_intent.clone(),
            last_activity: session.last_activity,
            status: session.status,
        })
    }

    async fn append(&self, requester_id: &str, message: ChatMessage) -> Result<(), HeraldError> {
        self.sessions
            .entry(requester_id.to_string())
            .or_insert_with(|| ConversationSession::new(requester_id))
            .append(message);
        Ok(())
    }

    async fn recent(
        &self,
        requester_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, HeraldError> {
        Ok(self
            .sessions
            .get(requester_id)
            .map(|s| s.window(limit).to_vec())
            .unwrap_or_default())
    }

    async fn set_intent(
        &self,
        requester_id: &str,
        intent: Option<String>,
    ) -> Result<(), HeraldError> {
        self.sessions
            .entry(requester_id.to_string())
            .or_insert_with(|| ConversationSession::new(requester_id))
            .current_intent = intent;
        Ok(())
    }

    async fn reset(&self, requester_id: &str) -> Result<ConversationSession, HeraldError> {
        let mut session = self
            .sessions
            .entry(requester_id.to_string())
            .or_insert_with(|| ConversationSession::new(requester_id));
        session.reset();
        Ok(session.clone())
    }
}
