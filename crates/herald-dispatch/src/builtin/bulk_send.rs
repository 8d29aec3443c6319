// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `send_bulk_message`: paced broadcast to resolved recipients.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{CallContext, HandlerOutcome, HeraldError, OperationHandler, TargetResolver};
use herald_delivery::{DeliveryJob, build_targets, format_eta};
use serde_json::{Value, json};
use tracing::info;

use super::tracker::DeliveryTracker;
use crate::schema::{ParamKind, ParamSpec};
use crate::table::OperationSpec;

pub const NAME: &str = "send_bulk_message";

/// Resolves recipients, renders the message and hands the batch to the
/// [`DeliveryTracker`]. Returns as soon as the job is scheduled.
pub struct BulkSendHandler {
    resolver: Arc<dyn TargetResolver>,
    tracker: Arc<DeliveryTracker>,
    placeholder: String,
}

impl BulkSendHandler {
    pub fn new(
        resolver: Arc<dyn TargetResolver>,
        tracker: Arc<DeliveryTracker>,
        placeholder: &str,
    ) -> Self {
        Self {
            resolver,
            tracker,
            placeholder: placeholder.to_string(),
        }
    }

    pub fn spec(placeholder: &str) -> OperationSpec {
        OperationSpec::new(
            NAME,
            &format!(
                "Send the same message to many members. Write {placeholder} where the \
                 recipient's first name should appear."
            ),
        )
        .param(ParamSpec::required(
            "message",
            ParamKind::String,
            "Message text, may contain the name placeholder",
        ))
        .param(ParamSpec::optional(
            "filter",
            ParamKind::Object,
            "Criteria selecting the recipients, e.g. a group or role",
        ))
        .restricted()
        .confirm_with("Send this message to the selected members?\n\n{message}")
    }
}

#[async_trait]
impl OperationHandler for BulkSendHandler {
    async fn invoke(
        &self,
        arguments: Value,
        ctx: &CallContext,
    ) -> Result<HandlerOutcome, HeraldError> {
        let message = arguments
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| HeraldError::Validation {
                operation: NAME.to_string(),
                message: "missing required fields: message".to_string(),
                missing: vec!["message".to_string()],
            })?;
        let filter = match arguments.get("filter") {
            Some(Value::Null) | None => json!({}),
            Some(filter) => filter.clone(),
        };

        let recipients = self.resolver.resolve_targets(&filter, ctx).await?;
        if recipients.is_empty() {
            return Ok(HandlerOutcome::failure(
                "No recipients matched that filter, so nothing was sent.",
                "no recipients",
            ));
        }

        let targets = build_targets(&recipients, message, &self.placeholder);
        let job = DeliveryJob::new(targets, self.tracker.pacer())?;

        let tracked = match self.tracker.start(job, ctx) {
            Ok(tracked) => tracked,
            Err(HeraldError::QueueBusy) => {
                return Ok(HandlerOutcome::failure(
                    "A bulk send is already running. Wait for it to finish or cancel it first.",
                    "bulk send already running",
                ));
            }
            Err(e) => return Err(e),
        };

        info!(
            requester_id = %ctx.requester_id,
            job_id = %tracked.job_id,
            total = tracked.total,
            "bulk send accepted"
        );

        Ok(HandlerOutcome::ok(format!(
            "Sending to {} recipients, {}. I'll report back when it's done.",
            tracked.total,
            format_eta(tracked.eta)
        ))
        .with_data(json!({
            "job_id": tracked.job_id,
            "total": tracked.total,
            "eta_secs": tracked.eta.as_secs(),
        })))
    }
}
