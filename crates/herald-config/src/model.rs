// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Herald.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level Herald configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeraldConfig {
    /// Assistant identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Conversation context and timeouts.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Confirmation workflow for critical operations.
    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    /// Bulk delivery pacing.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Operation dispatch policy.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Assistant identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant, used in the default system prompt.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline system prompt. When unset a built-in prompt is used.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
        }
    }
}

fn default_agent_name() -> String {
    "herald".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Conversation context configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationConfig {
    /// Number of most recent messages sent to the intent classifier.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Upper bound for a single classifier call.
    #[serde(default = "default_classifier_timeout_secs")]
    pub classifier_timeout_secs: u64,

    /// Upper bound for a single operation handler call.
    #[serde(default = "default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            classifier_timeout_secs: default_classifier_timeout_secs(),
            handler_timeout_secs: default_handler_timeout_secs(),
        }
    }
}

fn default_context_window() -> usize {
    10
}

fn default_classifier_timeout_secs() -> u64 {
    30
}

fn default_handler_timeout_secs() -> u64 {
    60
}

/// What happens when a critical operation is requested while another is pending.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConfirmationPolicy {
    /// The new request overwrites the pending one.
    #[default]
    Replace,
    /// The new request is refused until the pending one is resolved or expires.
    RejectNew,
}

/// Confirmation workflow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmationConfig {
    /// Seconds a pending confirmation stays answerable.
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: u64,

    /// Handling of a second critical request while one is pending.
    #[serde(default)]
    pub policy: ConfirmationPolicy,

    /// Replies accepted as "yes". Compared after case and accent folding.
    #[serde(default = "default_affirmative_tokens")]
    pub affirmative_tokens: Vec<String>,

    /// Replies accepted as "no". Compared after case and accent folding.
    #[serde(default = "default_negative_tokens")]
    pub negative_tokens: Vec<String>,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            expiry_secs: default_expiry_secs(),
            policy: ConfirmationPolicy::default(),
            affirmative_tokens: default_affirmative_tokens(),
            negative_tokens: default_negative_tokens(),
        }
    }
}

fn default_expiry_secs() -> u64 {
    300
}

fn default_affirmative_tokens() -> Vec<String> {
    ["sim", "s", "yes", "y"].map(String::from).to_vec()
}

fn default_negative_tokens() -> Vec<String> {
    ["nao", "n", "no", "cancelar"].map(String::from).to_vec()
}

/// Bulk delivery pacing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Lower bound of the simulated typing delay before each send.
    #[serde(default = "default_min_typing_ms")]
    pub min_typing_ms: u64,

    /// Upper bound of the simulated typing delay before each send.
    #[serde(default = "default_max_typing_ms")]
    pub max_typing_ms: u64,

    /// Lower bound of the delay after each send.
    #[serde(default = "default_min_bulk_ms")]
    pub min_bulk_ms: u64,

    /// Upper bound of the delay after each send.
    #[serde(default = "default_max_bulk_ms")]
    pub max_bulk_ms: u64,

    /// A long pause is inserted after every this many sends.
    #[serde(default = "default_pause_after")]
    pub pause_after: usize,

    /// Length of the long pause.
    #[serde(default = "default_pause_duration_secs")]
    pub pause_duration_secs: u64,

    /// Maximum messages a single bulk send may contain.
    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: usize,

    /// Token replaced with the recipient's first name in message templates.
    #[serde(default = "default_name_placeholder")]
    pub name_placeholder: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            min_typing_ms: default_min_typing_ms(),
            max_typing_ms: default_max_typing_ms(),
            min_bulk_ms: default_min_bulk_ms(),
            max_bulk_ms: default_max_bulk_ms(),
            pause_after: default_pause_after(),
            pause_duration_secs: default_pause_duration_secs(),
            max_per_hour: default_max_per_hour(),
            name_placeholder: default_name_placeholder(),
        }
    }
}

fn default_min_typing_ms() -> u64 {
    2_000
}

fn default_max_typing_ms() -> u64 {
    5_000
}

fn default_min_bulk_ms() -> u64 {
    5_000
}

fn default_max_bulk_ms() -> u64 {
    15_000
}

fn default_pause_after() -> usize {
    50
}

fn default_pause_duration_secs() -> u64 {
    300
}

fn default_max_per_hour() -> usize {
    200
}

fn default_name_placeholder() -> String {
    "{nome}".to_string()
}

/// Operation dispatch policy.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Require confirmation before `send_bulk_message` runs.
    #[serde(default)]
    pub bulk_send_critical: bool,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "herald.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}
