// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the orchestrator, dispatch table, stores and adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of external collaborator behind an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    LanguageModel,
    Storage,
}

// --- Conversation types ---

/// Author of a conversation message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    FunctionResult,
}

/// A structured operation invocation selected by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub operation: String,
    pub arguments: serde_json::Value,
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Set on assistant turns that invoked an operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// An assistant turn recording the operation the classifier chose.
    pub fn function_call(operation: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            function_call: Some(FunctionCall {
                operation: operation.into(),
                arguments,
            }),
            created_at: Utc::now(),
        }
    }

    /// The serialized result of an operation, fed back to the classifier.
    pub fn function_result(content: impl Into<String>) -> Self {
        Self::with_role(Role::FunctionResult, content)
    }

    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            function_call: None,
            created_at: Utc::now(),
        }
    }
}

/// Lifecycle status of a conversation session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Closed,
}

/// Per-requester conversation state.
///
/// The message list is append-only; only a reset empties it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub requester_id: String,
    /// Conversation id used in audit records. Renewed on reset.
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    pub current_intent: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub status: SessionStatus,
}

impl ConversationSession {
    pub fn new(requester_id: impl Into<String>) -> Self {
        Self {
            requester_id: requester_id.into(),
            session_id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
            current_intent: None,
            last_activity: Utc::now(),
            status: SessionStatus::Active,
        }
    }

    pub fn append(&mut self, message: ChatMessage) {
        self.last_activity = message.created_at;
        self.messages.push(message);
    }

    /// The most recent `limit` messages, oldest first.
    pub fn window(&self, limit: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(limit);
        &self.messages[start..]
    }

    /// Empty the history and start a new conversation id.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.current_intent = None;
        self.session_id = uuid::Uuid::new_v4().to_string();
        self.last_activity = Utc::now();
        self.status = SessionStatus::Active;
    }
}

// --- Requester and call context ---

/// Access level of a requester inside their tenant.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PermissionLevel {
    #[default]
    Member,
    Leader,
    Admin,
}

impl PermissionLevel {
    /// Privileged requesters may see restricted operations.
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// A message received from the upstream ingestion layer.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub requester_id: String,
    pub tenant_id: String,
    /// Opaque handle of the transport session the message arrived on.
    pub channel_handle: String,
    /// Address replies are sent to.
    pub reply_address: String,
    pub text: String,
    pub permission: PermissionLevel,
    pub onboarding_complete: bool,
}

/// Context passed to every operation handler.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub requester_id: String,
    pub tenant_id: String,
    pub session_id: String,
    pub channel_handle: String,
    pub reply_address: String,
    /// True when the requester explicitly confirmed this invocation.
    pub confirmed: bool,
}

/// The result of an operation handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerOutcome {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The handler refuses to act until the requester confirms.
    #[serde(default)]
    pub requires_confirmation: bool,
}

impl HandlerOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            error: None,
            requires_confirmation: false,
        }
    }

    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: Some(error.into()),
            requires_confirmation: false,
        }
    }

    /// Ask the orchestrator to obtain confirmation before re-invoking.
    pub fn needs_confirmation(prompt: impl Into<String>) -> Self {
        Self {
            success: false,
            message: prompt.into(),
            data: None,
            error: None,
            requires_confirmation: true,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

// --- Language understanding ---

/// An operation as presented to the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema of the operation's arguments.
    pub parameters: serde_json::Value,
}

/// Input to a classification call.
#[derive(Debug, Clone)]
pub struct ClassifyRequest {
    pub system_context: String,
    pub history: Vec<ChatMessage>,
    pub operations: Vec<OperationDescriptor>,
}

/// What the classifier decided to do with the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Plain conversational text for the requester.
    Reply { text: String },
    /// A structured operation call.
    Invoke {
        operation: String,
        arguments: serde_json::Value,
    },
}

// --- Bulk delivery ---

/// A resolved recipient of a bulk send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub address: String,
    pub display_name: String,
}

// --- Audit ---

/// What kind of orchestration step an audit record describes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditKind {
    Chat,
    Operation,
    ConfirmationRequested,
    ConfirmationAccepted,
    ConfirmationRejected,
    Clarification,
    Failure,
}

/// Final status of an audited step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Error,
    Pending,
}

/// A write-once record of one completed orchestration step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub requester_id: String,
    pub tenant_id: String,
    pub conversation_id: String,
    pub kind: AuditKind,
    /// Operation name, or `chat` for plain replies.
    pub action: String,
    pub description: String,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
    pub status: AuditStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        ctx: &CallContext,
        kind: AuditKind,
        action: impl Into<String>,
        status: AuditStatus,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            requester_id: ctx.requester_id.clone(),
            tenant_id: ctx.tenant_id.clone(),
            conversation_id: ctx.session_id.clone(),
            kind,
            action: action.into(),
            description: String::new(),
            input: serde_json::Value::Null,
            output: serde_json::Value::Null,
            status,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = output;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

// --- Confirmations ---

/// Lifecycle status of a pending confirmation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConfirmationStatus {
    Pending,
    Confirmed,
    Rejected,
    Expired,
}

/// A critical action awaiting an explicit yes/no from its requester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub id: String,
    pub requester_id: String,
    pub tenant_id: String,
    pub session_id: String,
    pub action: String,
    pub payload: serde_json::Value,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ConfirmationStatus,
}

impl PendingConfirmation {
    pub fn new(
        ctx: &CallContext,
        action: impl Into<String>,
        payload: serde_json::Value,
        prompt: impl Into<String>,
        ttl: chrono::Duration,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            requester_id: ctx.requester_id.clone(),
            tenant_id: ctx.tenant_id.clone(),
            session_id: ctx.session_id.clone(),
            action: action.into(),
            payload,
            prompt: prompt.into(),
            created_at,
            expires_at: created_at
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            status: ConfirmationStatus::Pending,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Pending and not yet past its expiry.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == ConfirmationStatus::Pending && !self.is_expired(now)
    }
}
