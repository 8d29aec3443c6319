// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for Herald's external collaborators.
//!
//! Adapters for remote systems extend the [`PluginAdapter`] base trait. All
//! traits use `#[async_trait]` so they can be held as `Arc<dyn Trait>`.

pub mod adapter;
pub mod handler;
pub mod language_model;
pub mod resolver;
pub mod storage;
pub mod transport;

pub use adapter::PluginAdapter;
pub use handler::OperationHandler;
pub use language_model::LanguageModel;
pub use resolver::TargetResolver;
pub use storage::{AuditSink, SessionStore};
pub use transport::Transport;
