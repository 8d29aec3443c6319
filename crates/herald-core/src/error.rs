// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every Herald crate.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across Herald adapter traits and core operations.
#[derive(Debug, Error)]
pub enum HeraldError {
    /// Configuration errors (invalid TOML, out-of-range pacing values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Outbound transport errors. Scoped to a single recipient during bulk delivery.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Intent classifier failure (API error, malformed classification).
    #[error("language model error: {message}")]
    LanguageModel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Arguments did not satisfy the operation's parameter schema.
    #[error("invalid arguments for `{operation}`: {message}")]
    Validation {
        operation: String,
        message: String,
        /// Required parameters that were absent or null.
        missing: Vec<String>,
    },

    /// A delivery batch exceeds the hourly send budget. Nothing was sent.
    #[error(
        "batch of {requested} messages exceeds the hourly limit of {limit}; split it into smaller sends"
    )]
    Capacity { requested: usize, limit: usize },

    /// An operation handler failed.
    #[error("operation `{operation}` failed: {message}")]
    Handler { operation: String, message: String },

    /// A classifier or handler call did not finish in time.
    #[error("`{operation}` timed out after {duration:?}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// The classifier selected an operation that is not registered.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// A confirmation could not be created or resolved.
    #[error("confirmation error: {0}")]
    Confirmation(String),

    /// A delivery job was built with no targets.
    #[error("delivery batch is empty")]
    EmptyBatch,

    /// The delivery queue is already running a job.
    #[error("delivery queue is busy with another job")]
    QueueBusy,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HeraldError {
    /// Whether the error message is safe and useful to show to the requester.
    ///
    /// Everything else is replaced by a generic apology and only kept in the
    /// audit trail.
    pub fn is_user_actionable(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Capacity { .. })
    }

    /// Whether the error should be treated as a handler failure.
    pub fn is_handler_failure(&self) -> bool {
        matches!(self, Self::Handler { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_message_names_both_numbers() {
        let err = HeraldError::Capacity {
            requested: 201,
            limit: 200,
        };
        let msg = err.to_string();
        assert!(msg.contains("201"));
        assert!(msg.contains("200"));
        assert!(err.is_user_actionable());
    }

    #[test]
    fn timeout_counts_as_handler_failure() {
        let err = HeraldError::Timeout {
            operation: "delete_cell".into(),
            duration: Duration::from_secs(60),
        };
        assert!(err.is_handler_failure());
        assert!(!err.is_user_actionable());
    }

    #[test]
    fn transport_errors_stay_internal() {
        let err = HeraldError::Transport {
            message: "socket closed".into(),
            source: None,
        };
        assert!(!err.is_user_actionable());
        assert!(!err.is_handler_failure());
    }
}
