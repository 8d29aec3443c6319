// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Herald integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without external services.
//!
//! # Components
//!
//! - [`MockTransport`] - Captures sends, fails chosen addresses
//! - [`ScriptedLanguageModel`] - Replays queued classifications
//! - [`RecordingHandler`] / [`StaticResolver`] - Operation and target doubles
//! - [`TestHarness`] - A wired orchestrator with in-memory or SQLite stores

pub mod harness;
pub mod mock_handler;
pub mod mock_language_model;
pub mod mock_transport;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_handler::{HandlerBehavior, Invocation, RecordingHandler, StaticResolver};
pub use mock_language_model::{Scripted, ScriptedLanguageModel};
pub use mock_transport::{MockTransport, SentMessage};
