// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operation handlers and a target resolver for tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use herald_core::traits::handler::OperationHandler;
use herald_core::traits::resolver::TargetResolver;
use herald_core::types::{CallContext, HandlerOutcome, Recipient};
use herald_core::HeraldError;

/// How a [`RecordingHandler`] answers.
#[derive(Debug, Clone)]
pub enum HandlerBehavior {
    Succeed(HandlerOutcome),
    /// Return `Err(HeraldError::Handler)`.
    Error(String),
    /// Sleep before succeeding; exercises handler timeouts.
    Slow(Duration, HandlerOutcome),
    /// Ask for confirmation unless the call is already confirmed.
    ConfirmFirst { prompt: String, then: HandlerOutcome },
}

/// One observed invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub arguments: serde_json::Value,
    pub confirmed: bool,
    pub requester_id: String,
}

/// Handler that records every invocation and answers per its behavior.
pub struct RecordingHandler {
    operation: String,
    behavior: HandlerBehavior,
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl RecordingHandler {
    pub fn new(operation: &str, behavior: HandlerBehavior) -> Self {
        Self {
            operation: operation.to_string(),
            behavior,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handler that always succeeds with `message`.
    pub fn ok(operation: &str, message: &str) -> Self {
        Self::new(
            operation,
            HandlerBehavior::Succeed(HandlerOutcome::ok(message)),
        )
    }

    pub async fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl OperationHandler for RecordingHandler {
    async fn invoke(
        &self,
        arguments: serde_json::Value,
        ctx: &CallContext,
    ) -> Result<HandlerOutcome, HeraldError> {
        self.calls.lock().await.push(Invocation {
            arguments,
            confirmed: ctx.confirmed,
            requester_id: ctx.requester_id.clone(),
        });
        match &self.behavior {
            HandlerBehavior::Succeed(outcome) => Ok(outcome.clone()),
            HandlerBehavior::Error(message) => Err(HeraldError::Handler {
                operation: self.operation.clone(),
                message: message.clone(),
            }),
            HandlerBehavior::Slow(delay, outcome) => {
                tokio::time::sleep(*delay).await;
                Ok(outcome.clone())
            }
            HandlerBehavior::ConfirmFirst { prompt, then } => {
                if ctx.confirmed {
                    Ok(then.clone())
                } else {
                    Ok(HandlerOutcome::needs_confirmation(prompt.clone()))
                }
            }
        }
    }
}

/// Resolver that returns a fixed recipient list and records the filters it saw.
pub struct StaticResolver {
    recipients: Vec<Recipient>,
    filters: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl StaticResolver {
    pub fn new(recipients: Vec<Recipient>) -> Self {
        Self {
            recipients,
            filters: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// `count` recipients named `Member{i} Surname` at `addr-{i}`.
    pub fn numbered(count: usize) -> Self {
        Self::new(
            (1..=count)
                .map(|i| Recipient {
                    address: format!("addr-{i}"),
                    display_name: format!("Member{i} Surname"),
                })
                .collect(),
        )
    }

    pub async fn filters(&self) -> Vec<serde_json::Value> {
        self.filters.lock().await.clone()
    }
}

#[async_trait]
impl TargetResolver for StaticResolver {
    async fn resolve_targets(
        &self,
        filter: &serde_json::Value,
        _ctx: &CallContext,
    ) -> Result<Vec<Recipient>, HeraldError> {
        self.filters.lock().await.push(filter.clone());
        Ok(self.recipients.clone())
    }
}
