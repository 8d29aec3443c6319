// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock message transport for deterministic testing.
//!
//! `MockTransport` implements `Transport`, captures every send attempt with
//! the (possibly paused) tokio clock time it happened at, and fails sends to
//! addresses registered with `fail_for()`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use herald_core::traits::adapter::PluginAdapter;
use herald_core::traits::transport::Transport;
use herald_core::types::{AdapterType, HealthStatus};
use herald_core::HeraldError;

/// One captured send attempt.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub channel_handle: String,
    pub address: String,
    pub body: String,
    pub at: Instant,
    /// False when the attempt was failed by injection.
    pub delivered: bool,
}

/// A mock transport for testing.
pub struct MockTransport {
    attempts: Arc<Mutex<Vec<SentMessage>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Make every send to `address` fail with a transport error.
    pub async fn fail_for(&self, address: &str) {
        self.failing.lock().await.insert(address.to_string());
    }

    /// Every send attempt, in order, including failed ones.
    pub async fn attempts(&self) -> Vec<SentMessage> {
        self.attempts.lock().await.clone()
    }

    /// Successful sends only.
    pub async fn delivered(&self) -> Vec<SentMessage> {
        self.attempts
            .lock()
            .await
            .iter()
            .filter(|m| m.delivered)
            .cloned()
            .collect()
    }

    /// Bodies of successful sends to `address`.
    pub async fn bodies_to(&self, address: &str) -> Vec<String> {
        self.attempts
            .lock()
            .await
            .iter()
            .filter(|m| m.delivered && m.address == address)
            .map(|m| m.body.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.attempts.lock().await.clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(
        &self,
        channel_handle: &str,
        address: &str,
        body: &str,
    ) -> Result<(), HeraldError> {
        let fail = self.failing.lock().await.contains(address);
        self.attempts.lock().await.push(SentMessage {
            channel_handle: channel_handle.to_string(),
            address: address.to_string(),
            body: body.to_string(),
            at: Instant::now(),
            delivered: !fail,
        });
        if fail {
            return Err(HeraldError::Transport {
                message: format!("recipient {address} unreachable"),
                source: None,
            });
        }
        Ok(())
    }
}
