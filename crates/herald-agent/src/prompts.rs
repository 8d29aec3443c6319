// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed texts of the orchestrator: classifier instructions and canned replies.

/// Sent in place of any internal failure detail.
pub const APOLOGY: &str =
    "Sorry, something went wrong while handling your request. Please try again in a moment.";

pub const UNKNOWN_OPERATION: &str =
    "Sorry, I don't know how to do that yet. Could you rephrase what you need?";

pub const CANCELLED: &str = "Okay, cancelled. Nothing was changed.";

pub const CONFIRMATION_BUSY: &str = "You still have an action waiting for confirmation. \
     Please answer it before starting a new one.";

const DEFAULT_SYSTEM_PROMPT: &str = "You are Herald, an assistant that helps community \
     leaders manage their members. Answer briefly and in the requester's language. When the \
     request matches one of the available operations, call it with the arguments you can \
     extract from the conversation. Never invent argument values.";

const ONBOARDING_NOTE: &str = "The requester has not finished onboarding yet. Help them \
     complete it before offering anything else.";

/// Appended to the system context for the post-execution summary call.
const SUMMARY_INSTRUCTION: &str = "An operation has just been executed; its result is the \
     last message. Summarize the outcome for the requester in one or two sentences. Do not \
     call another operation.";

/// System context for a classification call.
pub fn system_context(configured: Option<&str>, agent_name: &str, onboarding_complete: bool) -> String {
    let base = match configured {
        Some(prompt) => prompt.to_string(),
        None => DEFAULT_SYSTEM_PROMPT.replace("Herald", agent_name),
    };
    if onboarding_complete {
        base
    } else {
        format!("{base}\n\n{ONBOARDING_NOTE}")
    }
}

/// System context for the summary call that follows a handler run.
pub fn summary_context(system_context: &str) -> String {
    format!("{system_context}\n\n{SUMMARY_INSTRUCTION}")
}

/// Reply when arguments fail validation.
pub fn clarification(missing: &[String], detail: &str) -> String {
    if missing.is_empty() {
        format!("I couldn't use those details ({detail}). Could you check them and try again?")
    } else {
        format!(
            "I need a bit more information to do that. Please tell me: {}.",
            missing.join(", ")
        )
    }
}

/// A confirmation prompt with the accepted answers appended.
pub fn confirmation_request(prompt: &str, hint: &str) -> String {
    format!("{prompt}\n\n{hint}")
}

/// Re-sent when a reply to a pending confirmation is not recognized.
pub fn confirmation_reminder(prompt: &str, hint: &str) -> String {
    format!("{prompt}\n\nI didn't understand your answer. {hint}")
}
