// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Herald.
//!
//! This crate provides the error taxonomy, the domain types shared by the
//! orchestrator and the delivery engine, and the adapter traits through which
//! Herald reaches its external collaborators (message transport, intent
//! classifier, target resolution, storage).

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::HeraldError;
pub use types::{
    AdapterType, AuditKind, AuditRecord, AuditStatus, CallContext, ChatMessage, Classification,
    ClassifyRequest, ConfirmationStatus, ConversationSession, FunctionCall, HandlerOutcome,
    HealthStatus, InboundMessage, OperationDescriptor, PendingConfirmation, PermissionLevel,
    Recipient, Role, SessionStatus,
};

pub use traits::{
    AuditSink, LanguageModel, OperationHandler, PluginAdapter, SessionStore, TargetResolver,
    Transport,
};
