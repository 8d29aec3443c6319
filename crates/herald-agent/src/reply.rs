// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Yes/no parsing of replies to a pending confirmation.

use std::collections::HashSet;

use herald_config::model::ConfirmationConfig;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// How a reply to a confirmation prompt reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Affirmative,
    Negative,
    Unrecognized,
}

/// Trim, lowercase, decompose and drop combining marks: `" NÃO "` becomes `"nao"`.
pub fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Exact-token matcher for confirmation replies.
#[derive(Debug, Clone)]
pub struct ReplyClassifier {
    affirmative: HashSet<String>,
    negative: HashSet<String>,
    /// First token of each list, shown in reminders.
    hint_yes: String,
    hint_no: String,
}

impl ReplyClassifier {
    pub fn new<S: AsRef<str>>(affirmative: &[S], negative: &[S]) -> Self {
        let first = |tokens: &[S], fallback: &str| {
            tokens
                .first()
                .map(|t| normalize(t.as_ref()))
                .unwrap_or_else(|| fallback.to_string())
        };
        Self {
            affirmative: affirmative.iter().map(|t| normalize(t.as_ref())).collect(),
            negative: negative.iter().map(|t| normalize(t.as_ref())).collect(),
            hint_yes: first(affirmative, "yes"),
            hint_no: first(negative, "no"),
        }
    }

    pub fn from_config(config: &ConfirmationConfig) -> Self {
        Self::new(&config.affirmative_tokens, &config.negative_tokens)
    }

    /// Anything that is not exactly a known token is unrecognized.
    pub fn classify(&self, reply: &str) -> ReplyKind {
        let reply = normalize(reply);
        if self.affirmative.contains(&reply) {
            ReplyKind::Affirmative
        } else if self.negative.contains(&reply) {
            ReplyKind::Negative
        } else {
            ReplyKind::Unrecognized
        }
    }

    /// e.g. `Reply *sim* to confirm or *nao* to cancel.`
    pub fn hint(&self) -> String {
        format!(
            "Reply *{}* to confirm or *{}* to cancel.",
            self.hint_yes, self.hint_no
        )
    }
}

impl Default for ReplyClassifier {
    fn default() -> Self {
        Self::from_config(&ConfirmationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_case_space_and_accents() {
        assert_eq!(normalize("  NÃO "), "nao");
        assert_eq!(normalize("Sím"), "sim");
        assert_eq!(normalize("cancelar"), "cancelar");
    }

    #[test]
    fn default_tokens() {
        let replies = ReplyClassifier::default();
        for yes in ["sim", "SIM", " s ", "Yes", "y"] {
            assert_eq!(replies.classify(yes), ReplyKind::Affirmative, "{yes}");
        }
        for no in ["não", "NAO", "n", "No", "Cancelar"] {
            assert_eq!(replies.classify(no), ReplyKind::Negative, "{no}");
        }
    }

    #[test]
    fn matching_is_exact() {
        let replies = ReplyClassifier::default();
        for other in ["sim!", "sim por favor", "talvez", "", "yess"] {
            assert_eq!(replies.classify(other), ReplyKind::Unrecognized, "{other}");
        }
    }

    #[test]
    fn configured_tokens_are_normalized() {
        let replies = ReplyClassifier::new(&["CONFIRMO"], &["Não quero"]);
        assert_eq!(replies.classify("confirmo"), ReplyKind::Affirmative);
        assert_eq!(replies.classify("nao quero"), ReplyKind::Negative);
        assert_eq!(
            replies.hint(),
            "Reply *confirmo* to confirm or *nao quero* to cancel."
        );
    }
}
