// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational orchestrator for Herald.
//!
//! Turns each inbound message into one cycle of the state machine in
//! [`orchestrator`]: confirm or reject a pending critical action, or classify
//! the conversation and reply, clarify, ask for confirmation, or dispatch an
//! operation from the [`herald_dispatch::DispatchTable`].
//!
//! The crate also carries the process-local stores the orchestrator needs
//! (pending confirmations, per-requester locks) and in-memory
//! implementations of the session and audit seams for embedded use.

pub mod audit;
pub mod confirmation;
pub mod locks;
pub mod orchestrator;
pub mod prompts;
pub mod reply;
pub mod session;

pub use audit::MemoryAuditLog;
pub use confirmation::ConfirmationStore;
pub use locks::RequesterLocks;
pub use orchestrator::{CycleOutcome, CycleReport, CycleState, Orchestrator, OrchestratorDeps};
pub use reply::{ReplyClassifier, ReplyKind};
pub use session::InMemorySessionStore;
