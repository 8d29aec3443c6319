// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for Herald.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, a hash-chained audit log and a
//! conversation session store.

pub mod audit;
pub mod database;
pub mod migrations;
pub mod queries;
pub mod sessions;

pub use audit::SqliteAuditLog;
pub use database::Database;
pub use queries::audit::ChainVerification;
pub use sessions::SqliteSessionStore;
