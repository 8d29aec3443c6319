// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-recipient message rendering.

use herald_core::Recipient;

use crate::queue::DeliveryTarget;

/// First whitespace-separated token of a display name, or `""` when blank.
pub fn first_name(display_name: &str) -> &str {
    display_name.split_whitespace().next().unwrap_or("")
}

/// Replace every occurrence of `placeholder` with the recipient's first name.
///
/// Matching is exact and case-sensitive.
pub fn render(template: &str, placeholder: &str, display_name: &str) -> String {
    if placeholder.is_empty() {
        return template.to_string();
    }
    template.replace(placeholder, first_name(display_name))
}

/// Render `template` for each recipient, preserving order.
pub fn build_targets(
    recipients: &[Recipient],
    template: &str,
    placeholder: &str,
) -> Vec<DeliveryTarget> {
    recipients
        .iter()
        .map(|r| DeliveryTarget {
            address: r.address.clone(),
            body: render(template, placeholder, &r.display_name),
            display_name: r.display_name.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_name_takes_first_token() {
        assert_eq!(first_name("Maria da Silva"), "Maria");
        assert_eq!(first_name("  João  "), "João");
        assert_eq!(first_name(""), "");
        assert_eq!(first_name("   "), "");
    }

    #[test]
    fn render_replaces_every_occurrence() {
        let out = render("Olá {nome}! {nome}, até domingo.", "{nome}", "Ana Paula");
        assert_eq!(out, "Olá Ana! Ana, até domingo.");
    }

    #[test]
    fn render_is_case_sensitive() {
        let out = render("Olá {NOME}", "{nome}", "Ana");
        assert_eq!(out, "Olá {NOME}");
    }

    #[test]
    fn build_targets_keeps_order_and_names() {
        let recipients = vec![
            Recipient {
                address: "1".into(),
                display_name: "Carlos Lima".into(),
            },
            Recipient {
                address: "2".into(),
                display_name: "Bia".into(),
            },
        ];
        let targets = build_targets(&recipients, "Oi {nome}", "{nome}");
        assert_eq!(targets[0].body, "Oi Carlos");
        assert_eq!(targets[0].display_name, "Carlos Lima");
        assert_eq!(targets[1].address, "2");
        assert_eq!(targets[1].body, "Oi Bia");
    }
}
