// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operation handler trait implemented by every dispatchable operation.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::types::{CallContext, HandlerOutcome};

/// Executes one named operation with schema-validated arguments.
///
/// Handlers receive arguments that already passed the dispatch table's
/// parameter validation. Returning `Ok` with `success == false` reports a
/// domain failure that is still summarized for the requester; returning `Err`
/// is treated as an internal failure.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn invoke(
        &self,
        arguments: serde_json::Value,
        ctx: &CallContext,
    ) -> Result<HandlerOutcome, HeraldError>;
}
