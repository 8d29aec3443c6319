// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message transport (the rate-limited external messaging channel).

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::traits::adapter::PluginAdapter;

/// Sends plain-text messages through an external messaging channel.
///
/// Implementations must not retry internally: the delivery queue records a
/// failed send per recipient and moves on.
#[async_trait]
pub trait Transport: PluginAdapter {
    /// Sends `body` to `address` over the transport session `channel_handle`.
    async fn send_text(
        &self,
        channel_handle: &str,
        address: &str,
        body: &str,
    ) -> Result<(), HeraldError>;
}
