// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted intent classifier for deterministic testing.
//!
//! `ScriptedLanguageModel` pops classifications from a FIFO queue and keeps
//! every request it received so tests can inspect the context window and
//! the operations that were offered.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use herald_core::traits::adapter::PluginAdapter;
use herald_core::traits::language_model::LanguageModel;
use herald_core::types::{AdapterType, Classification, ClassifyRequest, HealthStatus};
use herald_core::HeraldError;

/// A scripted response: a classification or a failure.
#[derive(Debug, Clone)]
pub enum Scripted {
    Classify(Classification),
    Fail(String),
    /// Never answers; exercises classifier timeouts.
    Hang,
}

/// A classifier that replays scripted responses.
///
/// When the script is exhausted the classifier replies with `"mock reply"`.
pub struct ScriptedLanguageModel {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<ClassifyRequest>>>,
}

impl ScriptedLanguageModel {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a plain-text reply.
    pub async fn reply(&self, text: &str) {
        self.push(Scripted::Classify(Classification::Reply {
            text: text.to_string(),
        }))
        .await;
    }

    /// Queue an operation call.
    pub async fn invoke(&self, operation: &str, arguments: serde_json::Value) {
        self.push(Scripted::Classify(Classification::Invoke {
            operation: operation.to_string(),
            arguments,
        }))
        .await;
    }

    /// Queue a classifier error.
    pub async fn fail(&self, message: &str) {
        self.push(Scripted::Fail(message.to_string())).await;
    }

    /// Queue a call that never completes.
    pub async fn hang(&self) {
        self.push(Scripted::Hang).await;
    }

    pub async fn push(&self, scripted: Scripted) {
        self.script.lock().await.push_back(scripted);
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<ClassifyRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for ScriptedLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for ScriptedLanguageModel {
    fn name(&self) -> &str {
        "scripted-language-model"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::LanguageModel
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl LanguageModel for ScriptedLanguageModel {
    async fn classify(&self, request: ClassifyRequest) -> Result<Classification, HeraldError> {
        self.requests.lock().await.push(request);
        let next = self.script.lock().await.pop_front();
        match next {
            Some(Scripted::Classify(c)) => Ok(c),
            Some(Scripted::Fail(message)) => Err(HeraldError::LanguageModel {
                message,
                source: None,
            }),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Ok(Classification::Reply {
                text: "mock reply".to_string(),
            }),
        }
    }
}
