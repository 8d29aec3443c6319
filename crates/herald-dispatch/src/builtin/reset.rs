// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `reset_conversation`: start over with an empty history.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{CallContext, HandlerOutcome, HeraldError, OperationHandler, SessionStore};
use serde_json::{Value, json};
use tracing::info;

use crate::table::OperationSpec;

pub const NAME: &str = "reset_conversation";

pub struct ResetConversationHandler {
    sessions: Arc<dyn SessionStore>,
}

impl ResetConversationHandler {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    pub fn spec() -> OperationSpec {
        OperationSpec::new(
            NAME,
            "Forget the current conversation and start a new one. Use only when the \
             requester explicitly asks to start over.",
        )
        .onboarding()
    }
}

#[async_trait]
impl OperationHandler for ResetConversationHandler {
    async fn invoke(
        &self,
        _arguments: Value,
        ctx: &CallContext,
    ) -> Result<HandlerOutcome, HeraldError> {
        let session = self.sessions.reset(&ctx.requester_id).await?;
        info!(
            requester_id = %ctx.requester_id,
            session_id = %session.session_id,
            "conversation reset"
        );
        Ok(HandlerOutcome::ok("Conversation reset. What would you like to do next?")
            .with_data(json!({ "session_id": session.session_id })))
    }
}
