// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as ordered delay ranges, positive caps, and disjoint reply tokens.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::HeraldConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Longest confirmation window accepted: one day.
pub const MAX_CONFIRMATION_EXPIRY_SECS: u64 = 86_400;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &HeraldConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(validation(format!(
            "agent.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.agent.log_level
        )));
    }

    if config.conversation.context_window == 0 {
        errors.push(validation(
            "conversation.context_window must be at least 1".to_string(),
        ));
    }

    if config.conversation.classifier_timeout_secs == 0 {
        errors.push(validation(
            "conversation.classifier_timeout_secs must be positive".to_string(),
        ));
    }

    if config.conversation.handler_timeout_secs == 0 {
        errors.push(validation(
            "conversation.handler_timeout_secs must be positive".to_string(),
        ));
    }

    // Confirmation workflow
    if config.confirmation.expiry_secs == 0 {
        errors.push(validation(
            "confirmation.expiry_secs must be positive".to_string(),
        ));
    } else if config.confirmation.expiry_secs > MAX_CONFIRMATION_EXPIRY_SECS {
        errors.push(validation(format!(
            "confirmation.expiry_secs must be at most {MAX_CONFIRMATION_EXPIRY_SECS}, got {}",
            config.confirmation.expiry_secs
        )));
    }

    if config.confirmation.affirmative_tokens.is_empty() {
        errors.push(validation(
            "confirmation.affirmative_tokens must not be empty".to_string(),
        ));
    }

    if config.confirmation.negative_tokens.is_empty() {
        errors.push(validation(
            "confirmation.negative_tokens must not be empty".to_string(),
        ));
    }

    let affirmative: HashSet<String> = config
        .confirmation
        .affirmative_tokens
        .iter()
        .map(|t| t.trim().to_lowercase())
        .collect();
    for token in &config.confirmation.negative_tokens {
        if affirmative.contains(&token.trim().to_lowercase()) {
            errors.push(validation(format!(
                "confirmation token `{token}` is listed as both affirmative and negative"
            )));
        }
    }

    // Delivery pacing
    let delivery = &config.delivery;
    if delivery.min_typing_ms > delivery.max_typing_ms {
        errors.push(validation(format!(
            "delivery.min_typing_ms ({}) must not exceed delivery.max_typing_ms ({})",
            delivery.min_typing_ms, delivery.max_typing_ms
        )));
    }

    if delivery.min_bulk_ms > delivery.max_bulk_ms {
        errors.push(validation(format!(
            "delivery.min_bulk_ms ({}) must not exceed delivery.max_bulk_ms ({})",
            delivery.min_bulk_ms, delivery.max_bulk_ms
        )));
    }

    if delivery.pause_after == 0 {
        errors.push(validation("delivery.pause_after must be at least 1".to_string()));
    }

    if delivery.max_per_hour == 0 {
        errors.push(validation("delivery.max_per_hour must be at least 1".to_string()));
    }

    if delivery.name_placeholder.trim().is_empty() {
        errors.push(validation(
            "delivery.name_placeholder must not be empty".to_string(),
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(validation(
            "storage.database_path must not be empty".to_string(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validation(message: String) -> ConfigError {
    ConfigError::Validation { message }
}
