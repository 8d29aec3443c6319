// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-message orchestration cycle.
//!
//! One inbound message runs one cycle: answer a pending confirmation, or
//! classify the conversation and either chat, ask for confirmation or run an
//! operation. Every cycle yields a single reply and, except when a
//! confirmation answer is not understood, exactly one audit record.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use herald_config::HeraldConfig;
use herald_core::{
    AuditKind, AuditRecord, AuditSink, AuditStatus, CallContext, ChatMessage, Classification,
    ClassifyRequest, HandlerOutcome, HeraldError, InboundMessage, LanguageModel,
    PendingConfirmation, SessionStore, Transport,
};
use herald_dispatch::{AccessContext, DispatchEntry, DispatchTable};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::confirmation::ConfirmationStore;
use crate::locks::RequesterLocks;
use crate::prompts;
use crate::reply::{ReplyClassifier, ReplyKind};

/// Where a requester's cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// No cycle running and nothing awaited.
    Idle,
    /// A critical action is waiting for a yes or no.
    AwaitingConfirmation,
    /// Waiting on the language model.
    ClassifyingIntent,
    /// Running an operation handler.
    Dispatching,
    /// Sending the reply.
    Responding,
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleState::Idle => write!(f, "idle"),
            CycleState::AwaitingConfirmation => write!(f, "awaiting_confirmation"),
            CycleState::ClassifyingIntent => write!(f, "classifying_intent"),
            CycleState::Dispatching => write!(f, "dispatching"),
            CycleState::Responding => write!(f, "responding"),
        }
    }
}

/// Which branch a cycle ended in.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Plain conversational reply.
    Chat,
    /// A non-critical operation ran.
    Executed { operation: String, success: bool },
    /// A critical operation is now waiting for confirmation.
    ConfirmationRequested {
        operation: String,
        confirmation_id: String,
    },
    /// A confirmed operation ran.
    Confirmed { operation: String, success: bool },
    /// The requester declined a pending operation.
    Rejected { operation: String },
    /// The answer to a pending confirmation was not understood.
    Reprompted,
    /// Arguments were incomplete or malformed.
    Clarification {
        operation: String,
        missing: Vec<String>,
    },
    /// The classifier named an operation the requester cannot use.
    UnknownOperation { operation: String },
    /// The cycle failed; the requester got an apology.
    Failed { error: String },
}

/// Result of one [`Orchestrator::handle`] call.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Text sent to the requester.
    pub reply: String,
    pub outcome: CycleOutcome,
    /// The requester's state once the cycle is over.
    pub state: CycleState,
}

/// External collaborators of the orchestrator.
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub table: Arc<DispatchTable>,
    pub language_model: Arc<dyn LanguageModel>,
    pub transport: Arc<dyn Transport>,
    pub sessions: Arc<dyn SessionStore>,
    pub audit: Arc<dyn AuditSink>,
}

/// A finished branch before its reply is sent.
struct Turn {
    reply: String,
    outcome: CycleOutcome,
    state: CycleState,
    audit: Option<AuditRecord>,
}

/// What the cycle was working on, for the failure audit.
struct Attempt {
    action: String,
    input: Value,
}

pub struct Orchestrator {
    table: Arc<DispatchTable>,
    language_model: Arc<dyn LanguageModel>,
    transport: Arc<dyn Transport>,
    sessions: Arc<dyn SessionStore>,
    audit: Arc<dyn AuditSink>,
    confirmations: ConfirmationStore,
    replies: ReplyClassifier,
    locks: RequesterLocks,
    agent_name: String,
    system_prompt: Option<String>,
    context_window: usize,
    classifier_timeout: Duration,
    handler_timeout: Duration,
}

impl Orchestrator {
    /// Fails with [`HeraldError::Config`] when the confirmation expiry
    /// cannot be represented.
    pub fn new(config: &HeraldConfig, deps: OrchestratorDeps) -> Result<Self, HeraldError> {
        Ok(Self {
            table: deps.table,
            language_model: deps.language_model,
            transport: deps.transport,
            sessions: deps.sessions,
            audit: deps.audit,
            confirmations: ConfirmationStore::from_config(&config.confirmation)?,
            replies: ReplyClassifier::from_config(&config.confirmation),
            locks: RequesterLocks::new(),
            agent_name: config.agent.name.clone(),
            system_prompt: config.agent.system_prompt.clone(),
            context_window: config.conversation.context_window,
            classifier_timeout: Duration::from_secs(config.conversation.classifier_timeout_secs),
            handler_timeout: Duration::from_secs(config.conversation.handler_timeout_secs),
        })
    }

    pub fn confirmations(&self) -> &ConfirmationStore {
        &self.confirmations
    }

    pub fn locks(&self) -> &RequesterLocks {
        &self.locks
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Run one cycle for `message`.
    ///
    /// Cycles of the same requester run one at a time. Failures never
    /// escape: they become an apology reply and a failure audit record.
    pub async fn handle(&self, message: InboundMessage) -> CycleReport {
        let _guard = self.locks.acquire(&message.requester_id).await;

        let mut ctx = CallContext {
            requester_id: message.requester_id.clone(),
            tenant_id: message.tenant_id.clone(),
            session_id: String::new(),
            channel_handle: message.channel_handle.clone(),
            reply_address: message.reply_address.clone(),
            confirmed: false,
        };
        let mut attempt = Attempt {
            action: "chat".to_string(),
            input: json!({ "text": message.text }),
        };

        let turn = match self.run_cycle(&message, &mut ctx, &mut attempt).await {
            Ok(turn) => turn,
            Err(e) => self.failure_turn(&ctx, attempt, e).await,
        };

        debug!(
            requester_id = %ctx.requester_id,
            state = %CycleState::Responding,
            "cycle state"
        );
        if let Err(e) = self
            .transport
            .send_text(&message.channel_handle, &message.reply_address, &turn.reply)
            .await
        {
            warn!(requester_id = %ctx.requester_id, error = %e, "failed to send reply");
        }

        if let Some(record) = &turn.audit
            && let Err(e) = self.audit.record(record).await
        {
            error!(
                requester_id = %ctx.requester_id,
                action = %record.action,
                error = %e,
                "failed to write audit record"
            );
        }

        CycleReport {
            reply: turn.reply,
            outcome: turn.outcome,
            state: turn.state,
        }
    }

    async fn run_cycle(
        &self,
        message: &InboundMessage,
        ctx: &mut CallContext,
        attempt: &mut Attempt,
    ) -> Result<Turn, HeraldError> {
        let session = self.sessions.open(&message.requester_id).await?;
        ctx.session_id = session.session_id;

        if let Some(pending) = self.confirmations.active(&message.requester_id, Utc::now()) {
            debug!(
                requester_id = %ctx.requester_id,
                state = %CycleState::AwaitingConfirmation,
                confirmation_id = %pending.id,
                "cycle state"
            );
            return self.answer_confirmation(message, ctx, attempt, pending).await;
        }

        self.sessions
            .append(&message.requester_id, ChatMessage::user(&message.text))
            .await?;

        let access = AccessContext::new(message.permission, message.onboarding_complete);
        let system_context = prompts::system_context(
            self.system_prompt.as_deref(),
            &self.agent_name,
            message.onboarding_complete,
        );
        let history = self
            .sessions
            .recent(&message.requester_id, self.context_window)
            .await?;

        debug!(
            requester_id = %ctx.requester_id,
            state = %CycleState::ClassifyingIntent,
            history = history.len(),
            "cycle state"
        );
        let classification = self
            .classify(ClassifyRequest {
                system_context: system_context.clone(),
                history,
                operations: self.table.descriptors_for(&access),
            })
            .await?;

        match classification {
            Classification::Reply { text } => {
                self.sessions
                    .append(&message.requester_id, ChatMessage::assistant(&text))
                    .await?;
                let record = AuditRecord::new(ctx, AuditKind::Chat, "chat", AuditStatus::Success)
                    .with_description("conversational reply")
                    .with_input(attempt.input.clone())
                    .with_output(json!({ "reply": text }));
                Ok(Turn {
                    reply: text,
                    outcome: CycleOutcome::Chat,
                    state: CycleState::Idle,
                    audit: Some(record),
                })
            }
            Classification::Invoke {
                operation,
                arguments,
            } => {
                attempt.action = operation.clone();
                attempt.input = arguments.clone();
                self.dispatch(ctx, &access, &system_context, &operation, arguments)
                    .await
            }
        }
    }

    async fn dispatch(
        &self,
        ctx: &CallContext,
        access: &AccessContext,
        system_context: &str,
        operation: &str,
        arguments: Value,
    ) -> Result<Turn, HeraldError> {
        let entry = self
            .table
            .lookup(operation)
            .filter(|e| e.spec.visible_to(access))
            .ok_or_else(|| HeraldError::UnknownOperation(operation.to_string()))?;

        let arguments = match self.table.validate(operation, &arguments) {
            Ok(map) => Value::Object(map),
            Err(HeraldError::Validation {
                operation,
                message,
                missing,
            }) => {
                info!(
                    requester_id = %ctx.requester_id,
                    operation = %operation,
                    missing = ?missing,
                    "arguments need clarification"
                );
                let reply = prompts::clarification(&missing, &message);
                self.sessions
                    .append(&ctx.requester_id, ChatMessage::assistant(&reply))
                    .await?;
                let record = AuditRecord::new(
                    ctx,
                    AuditKind::Clarification,
                    &operation,
                    AuditStatus::Error,
                )
                .with_description("arguments failed validation")
                .with_input(arguments)
                .with_output(json!({ "missing": missing }))
                .with_error(message);
                return Ok(Turn {
                    reply,
                    outcome: CycleOutcome::Clarification { operation, missing },
                    state: CycleState::Idle,
                    audit: Some(record),
                });
            }
            Err(e) => return Err(e),
        };

        if entry.spec.critical {
            let prompt = entry.spec.render_confirmation(&arguments);
            return self.request_confirmation(ctx, operation, arguments, &prompt).await;
        }

        let outcome = self.invoke(entry, arguments.clone(), ctx).await?;
        if outcome.requires_confirmation {
            let prompt = if outcome.message.trim().is_empty() {
                entry.spec.render_confirmation(&arguments)
            } else {
                outcome.message.clone()
            };
            return self.request_confirmation(ctx, operation, arguments, &prompt).await;
        }

        self.record_execution(ctx, operation, &arguments, &outcome)
            .await?;
        let reply = self.summarize(ctx, system_context, &outcome).await;
        self.sessions
            .append(&ctx.requester_id, ChatMessage::assistant(&reply))
            .await?;

        let record = execution_record(ctx, AuditKind::Operation, operation, arguments, &outcome);
        Ok(Turn {
            reply,
            outcome: CycleOutcome::Executed {
                operation: operation.to_string(),
                success: outcome.success,
            },
            state: CycleState::Idle,
            audit: Some(record),
        })
    }

    async fn request_confirmation(
        &self,
        ctx: &CallContext,
        operation: &str,
        arguments: Value,
        prompt: &str,
    ) -> Result<Turn, HeraldError> {
        let pending = match self
            .confirmations
            .open(ctx, operation, arguments.clone(), prompt)
        {
            Ok(pending) => pending,
            Err(HeraldError::Confirmation(reason)) => {
                info!(
                    requester_id = %ctx.requester_id,
                    operation,
                    reason = %reason,
                    "new confirmation refused"
                );
                let record =
                    AuditRecord::new(ctx, AuditKind::Failure, operation, AuditStatus::Error)
                        .with_description("a confirmation is already pending")
                        .with_input(arguments)
                        .with_error(reason.clone());
                return Ok(Turn {
                    reply: prompts::CONFIRMATION_BUSY.to_string(),
                    outcome: CycleOutcome::Failed { error: reason },
                    state: CycleState::AwaitingConfirmation,
                    audit: Some(record),
                });
            }
            Err(e) => return Err(e),
        };

        let reply = prompts::confirmation_request(&pending.prompt, &self.replies.hint());
        self.sessions
            .append(&ctx.requester_id, ChatMessage::assistant(&reply))
            .await?;
        self.sessions
            .set_intent(&ctx.requester_id, Some(operation.to_string()))
            .await?;

        info!(
            requester_id = %ctx.requester_id,
            operation,
            confirmation_id = %pending.id,
            "confirmation requested"
        );
        let record = AuditRecord::new(
            ctx,
            AuditKind::ConfirmationRequested,
            operation,
            AuditStatus::Pending,
        )
        .with_description(pending.prompt.clone())
        .with_input(arguments)
        .with_output(json!({
            "confirmation_id": pending.id,
            "expires_at": pending.expires_at,
        }));
        Ok(Turn {
            reply,
            outcome: CycleOutcome::ConfirmationRequested {
                operation: operation.to_string(),
                confirmation_id: pending.id,
            },
            state: CycleState::AwaitingConfirmation,
            audit: Some(record),
        })
    }

    async fn answer_confirmation(
        &self,
        message: &InboundMessage,
        ctx: &mut CallContext,
        attempt: &mut Attempt,
        pending: PendingConfirmation,
    ) -> Result<Turn, HeraldError> {
        attempt.action = pending.action.clone();
        attempt.input = pending.payload.clone();

        match self.replies.classify(&message.text) {
            ReplyKind::Unrecognized => {
                if let Some(turn) = self.superseding_request(message, ctx, attempt).await? {
                    return Ok(turn);
                }
                debug!(
                    requester_id = %ctx.requester_id,
                    confirmation_id = %pending.id,
                    "confirmation reply not recognized"
                );
                Ok(Turn {
                    reply: prompts::confirmation_reminder(&pending.prompt, &self.replies.hint()),
                    outcome: CycleOutcome::Reprompted,
                    state: CycleState::AwaitingConfirmation,
                    audit: None,
                })
            }
            ReplyKind::Negative => {
                self.confirmations
                    .resolve(&ctx.requester_id, &pending.id, false, Utc::now())?;
                info!(
                    requester_id = %ctx.requester_id,
                    operation = %pending.action,
                    "confirmation rejected"
                );
                self.sessions
                    .append(&ctx.requester_id, ChatMessage::user(&message.text))
                    .await?;
                self.sessions
                    .append(&ctx.requester_id, ChatMessage::assistant(prompts::CANCELLED))
                    .await?;
                self.sessions.set_intent(&ctx.requester_id, None).await?;

                let record = AuditRecord::new(
                    ctx,
                    AuditKind::ConfirmationRejected,
                    &pending.action,
                    AuditStatus::Success,
                )
                .with_description("requester declined")
                .with_input(pending.payload)
                .with_output(json!({ "confirmation_id": pending.id }));
                Ok(Turn {
                    reply: prompts::CANCELLED.to_string(),
                    outcome: CycleOutcome::Rejected {
                        operation: pending.action,
                    },
                    state: CycleState::Idle,
                    audit: Some(record),
                })
            }
            ReplyKind::Affirmative => {
                let claimed =
                    self.confirmations
                        .resolve(&ctx.requester_id, &pending.id, true, Utc::now())?;
                info!(
                    requester_id = %ctx.requester_id,
                    operation = %claimed.action,
                    "confirmation accepted"
                );
                self.sessions
                    .append(&ctx.requester_id, ChatMessage::user(&message.text))
                    .await?;

                let entry = self
                    .table
                    .lookup(&claimed.action)
                    .ok_or_else(|| HeraldError::UnknownOperation(claimed.action.clone()))?;
                ctx.confirmed = true;
                let outcome = self.invoke(entry, claimed.payload.clone(), ctx).await?;

                self.record_execution(ctx, &claimed.action, &claimed.payload, &outcome)
                    .await?;
                let reply = outcome.message.clone();
                self.sessions
                    .append(&ctx.requester_id, ChatMessage::assistant(&reply))
                    .await?;
                self.sessions.set_intent(&ctx.requester_id, None).await?;

                let record = execution_record(
                    ctx,
                    AuditKind::ConfirmationAccepted,
                    &claimed.action,
                    claimed.payload,
                    &outcome,
                );
                Ok(Turn {
                    reply,
                    outcome: CycleOutcome::Confirmed {
                        operation: claimed.action,
                        success: outcome.success,
                    },
                    state: CycleState::Idle,
                    audit: Some(record),
                })
            }
        }
    }

    /// Classify an answer that is neither yes nor no.
    ///
    /// Only a new request for a critical operation replaces the pending
    /// confirmation. Chat, other operations, invalid arguments and
    /// classifier failures leave it in place and yield `None`, without
    /// touching the session.
    async fn superseding_request(
        &self,
        message: &InboundMessage,
        ctx: &CallContext,
        attempt: &mut Attempt,
    ) -> Result<Option<Turn>, HeraldError> {
        let access = AccessContext::new(message.permission, message.onboarding_complete);
        let mut history = self
            .sessions
            .recent(&message.requester_id, self.context_window)
            .await?;
        history.push(ChatMessage::user(&message.text));
        if history.len() > self.context_window {
            let excess = history.len() - self.context_window;
            history.drain(..excess);
        }

        let request = ClassifyRequest {
            system_context: prompts::system_context(
                self.system_prompt.as_deref(),
                &self.agent_name,
                message.onboarding_complete,
            ),
            history,
            operations: self.table.descriptors_for(&access),
        };
        let (operation, arguments) = match self.classify(request).await {
            Ok(Classification::Invoke {
                operation,
                arguments,
            }) => (operation, arguments),
            Ok(Classification::Reply { .. }) => return Ok(None),
            Err(e) => {
                warn!(
                    requester_id = %ctx.requester_id,
                    error = %e,
                    "could not classify confirmation answer"
                );
                return Ok(None);
            }
        };

        let Some(entry) = self
            .table
            .lookup(&operation)
            .filter(|e| e.spec.critical && e.spec.visible_to(&access))
        else {
            return Ok(None);
        };
        let Ok(arguments) = self.table.validate(&operation, &arguments) else {
            return Ok(None);
        };
        let arguments = Value::Object(arguments);

        self.sessions
            .append(&message.requester_id, ChatMessage::user(&message.text))
            .await?;
        attempt.action = operation.clone();
        attempt.input = arguments.clone();
        let prompt = entry.spec.render_confirmation(&arguments);
        self.request_confirmation(ctx, &operation, arguments, &prompt)
            .await
            .map(Some)
    }

    async fn classify(&self, request: ClassifyRequest) -> Result<Classification, HeraldError> {
        tokio::time::timeout(self.classifier_timeout, self.language_model.classify(request))
            .await
            .map_err(|_| HeraldError::Timeout {
                operation: "classify".to_string(),
                duration: self.classifier_timeout,
            })?
    }

    async fn invoke(
        &self,
        entry: &DispatchEntry,
        arguments: Value,
        ctx: &CallContext,
    ) -> Result<HandlerOutcome, HeraldError> {
        debug!(
            requester_id = %ctx.requester_id,
            state = %CycleState::Dispatching,
            operation = %entry.spec.name,
            confirmed = ctx.confirmed,
            "cycle state"
        );
        let outcome = tokio::time::timeout(
            self.handler_timeout,
            entry.handler.invoke(arguments, ctx),
        )
        .await
        .map_err(|_| HeraldError::Timeout {
            operation: entry.spec.name.clone(),
            duration: self.handler_timeout,
        })??;

        info!(
            requester_id = %ctx.requester_id,
            operation = %entry.spec.name,
            success = outcome.success,
            "operation finished"
        );
        Ok(outcome)
    }

    /// Append the call and its result so later turns can refer to them.
    async fn record_execution(
        &self,
        ctx: &CallContext,
        operation: &str,
        arguments: &Value,
        outcome: &HandlerOutcome,
    ) -> Result<(), HeraldError> {
        let result = serde_json::to_string(outcome)
            .map_err(|e| HeraldError::Internal(format!("serialize handler outcome: {e}")))?;
        self.sessions
            .append(
                &ctx.requester_id,
                ChatMessage::function_call(operation, arguments.clone()),
            )
            .await?;
        self.sessions
            .append(&ctx.requester_id, ChatMessage::function_result(result))
            .await
    }

    /// Ask the language model to phrase the handler result.
    ///
    /// Falls back to the handler's own message when the call fails or tries
    /// to chain another operation.
    async fn summarize(
        &self,
        ctx: &CallContext,
        system_context: &str,
        outcome: &HandlerOutcome,
    ) -> String {
        let history = match self
            .sessions
            .recent(&ctx.requester_id, self.context_window)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!(requester_id = %ctx.requester_id, error = %e, "summary history unavailable");
                return outcome.message.clone();
            }
        };

        let request = ClassifyRequest {
            system_context: prompts::summary_context(system_context),
            history,
            operations: Vec::new(),
        };
        match self.classify(request).await {
            Ok(Classification::Reply { text }) if !text.trim().is_empty() => text,
            Ok(Classification::Reply { .. }) => outcome.message.clone(),
            Ok(Classification::Invoke { operation, .. }) => {
                warn!(
                    requester_id = %ctx.requester_id,
                    operation = %operation,
                    "summary call selected an operation; using handler message"
                );
                outcome.message.clone()
            }
            Err(e) => {
                warn!(requester_id = %ctx.requester_id, error = %e, "summary call failed");
                outcome.message.clone()
            }
        }
    }

    async fn failure_turn(&self, ctx: &CallContext, attempt: Attempt, err: HeraldError) -> Turn {
        let (reply, outcome) = match &err {
            HeraldError::UnknownOperation(operation) => (
                prompts::UNKNOWN_OPERATION.to_string(),
                CycleOutcome::UnknownOperation {
                    operation: operation.clone(),
                },
            ),
            e if e.is_user_actionable() => (
                e.to_string(),
                CycleOutcome::Failed {
                    error: e.to_string(),
                },
            ),
            e => (
                prompts::APOLOGY.to_string(),
                CycleOutcome::Failed {
                    error: e.to_string(),
                },
            ),
        };

        if err.is_handler_failure() || matches!(err, HeraldError::UnknownOperation(_)) {
            warn!(
                requester_id = %ctx.requester_id,
                action = %attempt.action,
                error = %err,
                "cycle failed"
            );
        } else {
            error!(
                requester_id = %ctx.requester_id,
                action = %attempt.action,
                error = %err,
                "cycle failed"
            );
        }

        if !ctx.session_id.is_empty()
            && let Err(e) = self
                .sessions
                .append(&ctx.requester_id, ChatMessage::assistant(&reply))
                .await
        {
            warn!(requester_id = %ctx.requester_id, error = %e, "failed to store failure reply");
        }

        let record = AuditRecord::new(ctx, AuditKind::Failure, &attempt.action, AuditStatus::Error)
            .with_description("cycle failed")
            .with_input(attempt.input)
            .with_output(json!({ "reply": reply }))
            .with_error(err.to_string());
        Turn {
            reply,
            outcome,
            state: CycleState::Idle,
            audit: Some(record),
        }
    }
}

fn execution_record(
    ctx: &CallContext,
    kind: AuditKind,
    operation: &str,
    arguments: Value,
    outcome: &HandlerOutcome,
) -> AuditRecord {
    let status = if outcome.success {
        AuditStatus::Success
    } else {
        AuditStatus::Error
    };
    let mut record = AuditRecord::new(ctx, kind, operation, status)
        .with_description(outcome.message.clone())
        .with_input(arguments)
        .with_output(serde_json::to_value(outcome).unwrap_or(Value::Null));
    if let Some(error) = &outcome.error {
        record = record.with_error(error.clone());
    }
    record
}
