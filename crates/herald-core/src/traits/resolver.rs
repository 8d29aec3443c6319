// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Target resolution for bulk sends.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::types::{CallContext, Recipient};

/// Resolves a caller-supplied filter into the recipients of a bulk send.
///
/// The filter is opaque to Herald; its shape is defined by the data layer
/// that backs the resolver.
#[async_trait]
pub trait TargetResolver: Send + Sync {
    async fn resolve_targets(
        &self,
        filter: &serde_json::Value,
        ctx: &CallContext,
    ) -> Result<Vec<Recipient>, HeraldError>;
}
