// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `bulk_message_status` and `cancel_bulk_message`.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{CallContext, HandlerOutcome, HeraldError, OperationHandler};
use serde_json::{Value, json};
use tracing::info;

use super::tracker::{DeliveryTracker, summarize};
use crate::table::OperationSpec;

pub const STATUS_NAME: &str = "bulk_message_status";
pub const CANCEL_NAME: &str = "cancel_bulk_message";

/// Reports on the requester's most recent bulk send.
pub struct BulkStatusHandler {
    tracker: Arc<DeliveryTracker>,
}

impl BulkStatusHandler {
    pub fn new(tracker: Arc<DeliveryTracker>) -> Self {
        Self { tracker }
    }

    pub fn spec() -> OperationSpec {
        OperationSpec::new(
            STATUS_NAME,
            "Report the progress or final result of the latest bulk message send.",
        )
        .restricted()
    }
}

#[async_trait]
impl OperationHandler for BulkStatusHandler {
    async fn invoke(
        &self,
        _arguments: Value,
        ctx: &CallContext,
    ) -> Result<HandlerOutcome, HeraldError> {
        let Some(job) = self.tracker.job_for(&ctx.requester_id) else {
            return Ok(HandlerOutcome::ok("No bulk send has been started yet."));
        };

        if let Some(report) = job.report() {
            let data = serde_json::to_value(&report)
                .map_err(|e| HeraldError::Internal(format!("serialize delivery report: {e}")))?;
            return Ok(HandlerOutcome::ok(summarize(&report)).with_data(data));
        }

        let status = job.status();
        Ok(HandlerOutcome::ok(format!(
            "Bulk send in progress: {} of {} delivered, {} failed, {} still to go.",
            status.sent, status.total, status.failed, status.pending
        ))
        .with_data(json!({
            "job_id": job.job_id,
            "status": status,
        })))
    }
}

/// Stops the requester's running bulk send.
pub struct CancelBulkHandler {
    tracker: Arc<DeliveryTracker>,
}

impl CancelBulkHandler {
    pub fn new(tracker: Arc<DeliveryTracker>) -> Self {
        Self { tracker }
    }

    pub fn spec() -> OperationSpec {
        OperationSpec::new(
            CANCEL_NAME,
            "Stop the bulk message send that is currently running.",
        )
        .restricted()
    }
}

#[async_trait]
impl OperationHandler for CancelBulkHandler {
    async fn invoke(
        &self,
        _arguments: Value,
        ctx: &CallContext,
    ) -> Result<HandlerOutcome, HeraldError> {
        let running = self
            .tracker
            .job_for(&ctx.requester_id)
            .filter(|job| !job.is_finished());
        let Some(job) = running else {
            return Ok(HandlerOutcome::ok("There is no bulk send running."));
        };

        let discarded = job.cancel()?;
        info!(
            requester_id = %ctx.requester_id,
            job_id = %job.job_id,
            discarded,
            "bulk send cancelled"
        );
        Ok(
            HandlerOutcome::ok(format!("Bulk send cancelled. {discarded} messages will not be sent."))
                .with_data(json!({ "job_id": job.job_id, "discarded": discarded })),
        )
    }
}
