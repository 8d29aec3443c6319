// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete Herald pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite, mock adapters
//! and the built-in operations. Tests are independent and order-insensitive.

use herald_agent::{CycleOutcome, CycleState};
use herald_config::HeraldConfig;
use herald_core::{AuditKind, Recipient, Role};
use herald_storage::SqliteAuditLog;
use herald_test_utils::TestHarness;
use herald_test_utils::harness::{DEFAULT_ADDRESS, DEFAULT_REQUESTER};
use serde_json::json;

/// Millisecond pacing so real-time runs finish quickly.
fn fast_config() -> HeraldConfig {
    let mut config = HeraldConfig::default();
    config.delivery.min_typing_ms = 1;
    config.delivery.max_typing_ms = 2;
    config.delivery.min_bulk_ms = 1;
    config.delivery.max_bulk_ms = 2;
    config.delivery.pause_after = 2;
    config.delivery.pause_duration_secs = 0;
    config.dispatch.bulk_send_critical = true;
    config
}

fn members(n: usize) -> Vec<Recipient> {
    (1..=n)
        .map(|i| Recipient {
            address: format!("5511{i:07}"),
            display_name: format!("Irmã{i} Silva"),
        })
        .collect()
}

// ---- Confirmed bulk send with persistent stores ----

#[tokio::test]
async fn confirmed_bulk_send_is_delivered_summarized_and_audited() {
    let h = TestHarness::builder()
        .with_config(fast_config())
        .with_recipients(members(5))
        .with_sqlite()
        .build()
        .await
        .unwrap();

    h.language_model.reply("Olá! Em que posso ajudar?").await;
    let greeting = h.send("oi").await;
    assert_eq!(greeting.outcome, CycleOutcome::Chat);

    h.language_model
        .invoke(
            "send_bulk_message",
            json!({"message": "Paz, {nome}! Culto às 19h.", "filter": {"group": "mulheres"}}),
        )
        .await;
    let asked = h.send("avise as mulheres do culto").await;
    assert_eq!(asked.state, CycleState::AwaitingConfirmation);
    assert!(asked.reply.contains("Paz, {nome}! Culto às 19h."));

    let started = h.send("Sim").await;
    assert!(matches!(
        started.outcome,
        CycleOutcome::Confirmed { success: true, .. }
    ));
    assert!(started.reply.starts_with("Sending to 5 recipients"));
    assert_eq!(h.resolver.filters().await, vec![json!({"group": "mulheres"})]);

    let job = h.tracker.job_for(DEFAULT_REQUESTER).expect("job tracked");
    let report = job.wait().await.unwrap();
    assert_eq!(report.sent, 5);
    assert_eq!(
        h.transport.bodies_to("55110000003").await,
        vec!["Paz, Irmã3! Culto às 19h.".to_string()]
    );

    let replies = h.replies().await;
    assert_eq!(replies.len(), 4);
    assert!(replies[3].starts_with("Bulk send finished: 5 of 5 delivered"));

    let kinds: Vec<AuditKind> = h
        .audit_trail()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            AuditKind::Chat,
            AuditKind::ConfirmationRequested,
            AuditKind::ConfirmationAccepted,
        ]
    );

    let chain = SqliteAuditLog::new(h.database.clone().unwrap())
        .verify_chain()
        .await
        .unwrap();
    assert!(chain.is_intact());
    assert_eq!(chain.records, 3);
}

// ---- Conversation persistence ----

#[tokio::test]
async fn executed_operation_is_persisted_in_the_session() {
    let h = TestHarness::builder()
        .with_config(fast_config())
        .with_sqlite()
        .build()
        .await
        .unwrap();

    h.language_model.invoke("bulk_message_status", json!({})).await;
    h.language_model.reply("Nenhum envio ainda.").await;
    let report = h.send("como está o envio?").await;
    assert_eq!(report.reply, "Nenhum envio ainda.");

    let session = h.sessions.get_or_create(DEFAULT_REQUESTER).await.unwrap();
    let roles: Vec<Role> = session.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::User,
            Role::Assistant,
            Role::FunctionResult,
            Role::Assistant
        ]
    );
    let call = session.messages[1].function_call.as_ref().unwrap();
    assert_eq!(call.operation, "bulk_message_status");
    assert!(session.messages[2].content.contains("No bulk send has been started yet."));
}

// ---- Onboarding ----

#[tokio::test]
async fn onboarding_requester_only_sees_reset() {
    let h = TestHarness::builder().build().await.unwrap();
    let mut message = TestHarness::message("oi");
    message.onboarding_complete = false;
    h.send_as(message).await;

    let request = &h.language_model.requests().await[0];
    let names: Vec<&str> = request.operations.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["reset_conversation"]);
    assert!(request.system_context.contains("onboarding"));
}

// ---- Failure isolation ----

#[tokio::test]
async fn reply_send_failure_does_not_break_the_cycle() {
    let h = TestHarness::builder().build().await.unwrap();
    h.transport.fail_for(DEFAULT_ADDRESS).await;
    h.language_model.reply("Olá!").await;

    let report = h.send("oi").await;
    assert_eq!(report.outcome, CycleOutcome::Chat);
    assert_eq!(h.audit_trail().await.unwrap().len(), 1);
    assert!(h.transport.delivered().await.is_empty());
}
