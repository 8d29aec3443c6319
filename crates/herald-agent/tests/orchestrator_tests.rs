// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Full cycles through the harness: built-in operations, stores and delivery.

use std::sync::Arc;

use herald_agent::{CycleOutcome, CycleState, prompts};
use herald_config::HeraldConfig;
use herald_core::{AuditKind, AuditStatus, PermissionLevel, Recipient};
use herald_dispatch::{OperationSpec, ParamKind, ParamSpec};
use herald_test_utils::harness::DEFAULT_REQUESTER;
use herald_test_utils::{RecordingHandler, TestHarness};
use serde_json::json;

fn recipients(n: usize) -> Vec<Recipient> {
    (1..=n)
        .map(|i| Recipient {
            address: format!("addr-{i}"),
            display_name: format!("Person {i}"),
        })
        .collect()
}

fn delete_cell_spec() -> OperationSpec {
    OperationSpec::new("delete_cell", "Delete a cell group")
        .param(ParamSpec::required("cell_id", ParamKind::Integer, "Cell id"))
        .critical()
        .confirm_with("Delete cell {cell_id}?")
}

#[tokio::test(start_paused = true)]
async fn bulk_send_reports_partial_failure() {
    let h = TestHarness::builder()
        .with_recipients(recipients(3))
        .build()
        .await
        .unwrap();
    h.transport.fail_for("addr-2").await;
    h.language_model
        .invoke(
            "send_bulk_message",
            json!({"message": "Olá {nome}, culto domingo às 19h!"}),
        )
        .await;
    h.language_model.reply("Started sending to 3 people.").await;

    let report = h.send("avise todos do culto").await;
    assert_eq!(
        report.outcome,
        CycleOutcome::Executed {
            operation: "send_bulk_message".into(),
            success: true
        }
    );
    assert_eq!(report.reply, "Started sending to 3 people.");

    let job = h.tracker.job_for(DEFAULT_REQUESTER).expect("job tracked");
    let delivery = job.wait().await.unwrap();
    assert_eq!(delivery.total, 3);
    assert_eq!(delivery.sent, 2);
    assert_eq!(delivery.failed, 1);
    assert_eq!(delivery.errors[0].display_name, "Person 2");

    let attempted: Vec<String> = h
        .transport
        .attempts()
        .await
        .into_iter()
        .filter(|m| m.address.starts_with("addr-"))
        .map(|m| m.address)
        .collect();
    assert_eq!(attempted, vec!["addr-1", "addr-2", "addr-3"]);
    assert_eq!(
        h.transport.bodies_to("addr-1").await,
        vec!["Olá Person, culto domingo às 19h!".to_string()]
    );

    let replies = h.replies().await;
    let summary = replies.last().unwrap();
    assert!(summary.contains("2 of 3 delivered"));
    assert!(summary.contains("Person 2"));
}

#[tokio::test]
async fn over_capacity_batch_sends_nothing() {
    let h = TestHarness::builder()
        .with_recipients(recipients(201))
        .build()
        .await
        .unwrap();
    h.language_model
        .invoke("send_bulk_message", json!({"message": "Oi {nome}"}))
        .await;

    let report = h.send("mande para todos").await;
    assert!(report.reply.contains("201"));
    assert!(report.reply.contains("200"));
    assert!(matches!(report.outcome, CycleOutcome::Failed { .. }));
    assert!(h.tracker.job_for(DEFAULT_REQUESTER).is_none());

    let attempts = h.transport.attempts().await;
    assert!(attempts.iter().all(|m| !m.address.starts_with("addr-")));

    let trail = h.audit_trail().await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].status, AuditStatus::Error);
    assert_eq!(trail[0].action, "send_bulk_message");
}

#[tokio::test(start_paused = true)]
async fn bulk_send_can_require_confirmation() {
    let mut config = HeraldConfig::default();
    config.dispatch.bulk_send_critical = true;
    let h = TestHarness::builder()
        .with_config(config)
        .with_recipients(recipients(2))
        .build()
        .await
        .unwrap();
    h.language_model
        .invoke("send_bulk_message", json!({"message": "Reunião amanhã"}))
        .await;

    let asked = h.send("avise a liderança").await;
    assert_eq!(asked.state, CycleState::AwaitingConfirmation);
    assert!(asked.reply.contains("Reunião amanhã"));
    assert!(h.tracker.job_for(DEFAULT_REQUESTER).is_none());

    let started = h.send("sim").await;
    assert!(matches!(started.outcome, CycleOutcome::Confirmed { success: true, .. }));
    let job = h.tracker.job_for(DEFAULT_REQUESTER).expect("job tracked");
    assert_eq!(job.wait().await.unwrap().sent, 2);
}

#[tokio::test(start_paused = true)]
async fn status_and_cancel_follow_the_running_job() {
    let h = TestHarness::builder()
        .with_recipients(recipients(10))
        .build()
        .await
        .unwrap();
    h.language_model
        .invoke("send_bulk_message", json!({"message": "Oi {nome}"}))
        .await;
    h.send("mande para todos").await;

    h.language_model.invoke("bulk_message_status", json!({})).await;
    h.language_model.reply("").await;
    let status = h.send("como está o envio?").await;
    assert!(status.reply.starts_with("Bulk send in progress"));

    h.language_model.invoke("cancel_bulk_message", json!({})).await;
    h.language_model.reply("").await;
    let cancelled = h.send("pare o envio").await;
    assert!(cancelled.reply.starts_with("Bulk send cancelled."));

    let job = h.tracker.job_for(DEFAULT_REQUESTER).unwrap();
    let report = job.wait().await.unwrap();
    assert!(report.cleared);
    assert!(report.sent < 10);
}

#[tokio::test]
async fn members_cannot_see_bulk_operations() {
    let h = TestHarness::builder()
        .with_recipients(recipients(2))
        .build()
        .await
        .unwrap();
    h.language_model
        .invoke("send_bulk_message", json!({"message": "Oi"}))
        .await;

    let mut message = TestHarness::message("mande para todos");
    message.permission = PermissionLevel::Member;
    let report = h.send_as(message).await;

    assert_eq!(report.reply, prompts::UNKNOWN_OPERATION);
    let names: Vec<String> = h.language_model.requests().await[0]
        .operations
        .iter()
        .map(|d| d.name.clone())
        .collect();
    assert_eq!(names, vec!["reset_conversation"]);
}

#[tokio::test]
async fn every_terminal_branch_writes_one_audit_record() {
    let delete = Arc::new(RecordingHandler::ok("delete_cell", "Cell deleted."));
    let h = TestHarness::builder()
        .with_operation(delete_cell_spec(), delete.clone())
        .build()
        .await
        .unwrap();

    // chat
    h.language_model.reply("Olá!").await;
    h.send("oi").await;
    // clarification
    h.language_model.invoke("delete_cell", json!({})).await;
    h.send("apague a célula").await;
    // confirmation requested, then an unrecognized answer, then accepted
    h.language_model.invoke("delete_cell", json!({"cell_id": 3})).await;
    h.send("apague a célula 3").await;
    h.send("hmm").await;
    h.send("s").await;
    // confirmation requested, then rejected
    h.language_model.invoke("delete_cell", json!({"cell_id": 4})).await;
    h.send("apague a célula 4").await;
    h.send("n").await;
    // unknown operation
    h.language_model.invoke("fly", json!({})).await;
    h.send("voe").await;
    // classifier failure
    h.language_model.fail("boom").await;
    h.send("oi").await;

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
            AuditKind::Clarification,
            AuditKind::ConfirmationRequested,
            AuditKind::ConfirmationAccepted,
            AuditKind::ConfirmationRequested,
            AuditKind::ConfirmationRejected,
            AuditKind::Failure,
            AuditKind::Failure,
        ]
    );
    assert_eq!(delete.call_count().await, 1);
    assert_eq!(h.replies().await.len(), 9);
}

#[tokio::test]
async fn back_to_back_critical_requests_keep_only_the_second() {
    let delete = Arc::new(RecordingHandler::ok("delete_cell", "Cell deleted."));
    let h = TestHarness::builder()
        .with_operation(delete_cell_spec(), delete.clone())
        .build()
        .await
        .unwrap();

    h.language_model.invoke("delete_cell", json!({"cell_id": 3})).await;
    let first = h.send("apague a célula 3").await;
    assert_eq!(first.state, CycleState::AwaitingConfirmation);

    h.language_model.invoke("delete_cell", json!({"cell_id": 4})).await;
    let second = h.send("apague a célula 4").await;
    assert!(second.reply.starts_with("Delete cell 4?"));

    let pending = h
        .orchestrator
        .confirmations()
        .latest(DEFAULT_REQUESTER)
        .expect("pending confirmation");
    assert_eq!(pending.payload, json!({"cell_id": 4}));

    let done = h.send("sim").await;
    assert!(matches!(done.outcome, CycleOutcome::Confirmed { success: true, .. }));
    let calls = delete.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].arguments, json!({"cell_id": 4}));

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
            AuditKind::ConfirmationRequested,
            AuditKind::ConfirmationRequested,
            AuditKind::ConfirmationAccepted,
        ]
    );
}

#[tokio::test]
async fn reset_conversation_starts_a_new_session() {
    let h = TestHarness::builder().with_sqlite().build().await.unwrap();
    h.language_model.reply("Olá!").await;
    h.send("oi").await;
    let before = h.sessions.get_or_create(DEFAULT_REQUESTER).await.unwrap();
    assert_eq!(before.messages.len(), 2);

    h.language_model.invoke("reset_conversation", json!({})).await;
    h.language_model.reply("Fresh start!").await;
    let report = h.send("vamos recomeçar").await;
    assert_eq!(report.reply, "Fresh start!");

    let after = h.sessions.get_or_create(DEFAULT_REQUESTER).await.unwrap();
    assert_ne!(after.session_id, before.session_id);
    // The call, its result and the summary land in the new conversation.
    assert_eq!(after.messages.len(), 3);

    let trail = h.audit_trail().await.unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].conversation_id, before.session_id);
}

#[tokio::test]
async fn sqlite_audit_chain_stays_intact_across_cycles() {
    let h = TestHarness::builder().with_sqlite().build().await.unwrap();
    for i in 0..5 {
        h.language_model.reply(&format!("reply {i}")).await;
        h.send(&format!("message {i}")).await;
    }
    let db = h.database.clone().unwrap();
    let log = herald_storage::SqliteAuditLog::new(db);
    let verification = log.verify_chain().await.unwrap();
    assert_eq!(verification.records, 5);
    assert!(verification.is_intact());
}

#[tokio::test]
async fn context_window_limits_history() {
    let mut config = HeraldConfig::default();
    config.conversation.context_window = 4;
    let h = TestHarness::builder()
        .with_config(config)
        .build()
        .await
        .unwrap();
    for i in 0..5 {
        h.send(&format!("message {i}")).await;
    }
    let requests = h.language_model.requests().await;
    let last = requests.last().unwrap();
    assert_eq!(last.history.len(), 4);
    assert_eq!(last.history.last().unwrap().content, "message 4");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn requesters_are_handled_concurrently_and_in_isolation() {
    let h = Arc::new(TestHarness::builder().build().await.unwrap());
    let mut tasks = Vec::new();
    for i in 0..8 {
        let h = Arc::clone(&h);
        tasks.push(tokio::spawn(async move {
            let mut message = TestHarness::message("oi");
            message.requester_id = format!("requester-{i}");
            message.reply_address = format!("addr-{i}");
            h.send_as(message).await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().outcome, CycleOutcome::Chat);
    }
    assert_eq!(h.orchestrator.locks().len(), 8);
    assert_eq!(h.audit_trail().await.unwrap().len(), 8);
}
