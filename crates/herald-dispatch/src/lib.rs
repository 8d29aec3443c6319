// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Function dispatch for the Herald orchestrator.
//!
//! The [`DispatchTable`] maps operation names to schemas and handlers. The
//! classifier only sees the operations an [`AccessContext`] allows, and every
//! argument map is validated against its [`ParamSpec`] list before a handler
//! runs.
//!
//! Built-in operations:
//! - [`builtin::BulkSendHandler`] -- paced bulk message send
//! - [`builtin::BulkStatusHandler`] -- progress of the latest bulk send
//! - [`builtin::CancelBulkHandler`] -- stop a running bulk send
//! - [`builtin::ResetConversationHandler`] -- start a fresh conversation

pub mod builtin;
pub mod schema;
pub mod table;

pub use builtin::{BuiltinDeps, DeliveryTracker, TrackedJob, register_builtins};
pub use schema::{ParamKind, ParamSpec, json_schema, validate_arguments};
pub use table::{AccessContext, DispatchEntry, DispatchTable, DispatchTableBuilder, OperationSpec};
