// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent classifier adapter.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Classification, ClassifyRequest};

/// Turns a conversation window into either a reply or an operation call.
#[async_trait]
pub trait LanguageModel: PluginAdapter {
    async fn classify(&self, request: ClassifyRequest) -> Result<Classification, HeraldError>;
}
