// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete orchestrator with mock adapters, the
//! built-in operations and either in-memory stores or a temp SQLite
//! database. `send()` drives one full cycle.

use std::sync::Arc;

use herald_agent::{
    CycleReport, InMemorySessionStore, MemoryAuditLog, Orchestrator, OrchestratorDeps,
};
use herald_config::HeraldConfig;
use herald_core::types::{AuditRecord, InboundMessage, PermissionLevel, Recipient};
use herald_core::{AuditSink, HeraldError, OperationHandler, SessionStore};
use herald_delivery::Pacer;
use herald_dispatch::{BuiltinDeps, DeliveryTracker, DispatchTable, OperationSpec, register_builtins};
use herald_storage::{Database, SqliteAuditLog, SqliteSessionStore};

use crate::mock_handler::StaticResolver;
use crate::mock_language_model::ScriptedLanguageModel;
use crate::mock_transport::MockTransport;

/// Requester used by [`TestHarness::send`].
pub const DEFAULT_REQUESTER: &str = "requester-1";
/// Reply address of [`DEFAULT_REQUESTER`].
pub const DEFAULT_ADDRESS: &str = "5511900000001";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: HeraldConfig,
    recipients: Vec<Recipient>,
    operations: Vec<(OperationSpec, Arc<dyn OperationHandler>)>,
    sqlite: bool,
    seed: u64,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: HeraldConfig::default(),
            recipients: Vec::new(),
            operations: Vec::new(),
            sqlite: false,
            seed: 7,
        }
    }

    pub fn with_config(mut self, config: HeraldConfig) -> Self {
        self.config = config;
        self
    }

    /// Recipients returned by the target resolver for any filter.
    pub fn with_recipients(mut self, recipients: Vec<Recipient>) -> Self {
        self.recipients = recipients;
        self
    }

    /// Register a domain operation next to the built-ins.
    pub fn with_operation(mut self, spec: OperationSpec, handler: Arc<dyn OperationHandler>) -> Self {
        self.operations.push((spec, handler));
        self
    }

    /// Back sessions and the audit log with a temp SQLite database.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Seed for delivery jitter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, HeraldError> {
        let (sessions, audit, database, temp_dir): (
            Arc<dyn SessionStore>,
            Arc<dyn AuditSink>,
            Option<Database>,
            Option<tempfile::TempDir>,
        ) = if self.sqlite {
            let temp_dir =
                tempfile::TempDir::new().map_err(|e| HeraldError::Storage { source: e.into() })?;
            let db_path = temp_dir.path().join("test.db");
            let db = Database::open(&db_path.to_string_lossy()).await?;
            (
                Arc::new(SqliteSessionStore::new(db.clone())),
                Arc::new(SqliteAuditLog::new(db.clone())),
                Some(db),
                Some(temp_dir),
            )
        } else {
            (
                Arc::new(InMemorySessionStore::new()),
                Arc::new(MemoryAuditLog::new()),
                None,
                None,
            )
        };

        let language_model = Arc::new(ScriptedLanguageModel::new());
        let transport = Arc::new(MockTransport::new());
        let resolver = Arc::new(StaticResolver::new(self.recipients));

        let pacer = Pacer::from_config(&self.config.delivery)?;
        let tracker =
            Arc::new(DeliveryTracker::new(pacer, transport.clone()).with_seed(self.seed));

        let mut builder = register_builtins(
            DispatchTable::builder(),
            BuiltinDeps {
                resolver: resolver.clone(),
                tracker: Arc::clone(&tracker),
                sessions: Arc::clone(&sessions),
                name_placeholder: self.config.delivery.name_placeholder.clone(),
                bulk_send_critical: self.config.dispatch.bulk_send_critical,
            },
        );
        for (spec, handler) in self.operations {
            builder = builder.register(spec, handler);
        }
        let table = Arc::new(builder.build()?);

        let orchestrator = Arc::new(Orchestrator::new(
            &self.config,
            OrchestratorDeps {
                table,
                language_model: language_model.clone(),
                transport: transport.clone(),
                sessions: Arc::clone(&sessions),
                audit: Arc::clone(&audit),
            },
        )?);

        Ok(TestHarness {
            orchestrator,
            language_model,
            transport,
            resolver,
            tracker,
            sessions,
            audit,
            database,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and chosen stores.
pub struct TestHarness {
    pub orchestrator: Arc<Orchestrator>,
    pub language_model: Arc<ScriptedLanguageModel>,
    pub transport: Arc<MockTransport>,
    pub resolver: Arc<StaticResolver>,
    pub tracker: Arc<DeliveryTracker>,
    pub sessions: Arc<dyn SessionStore>,
    pub audit: Arc<dyn AuditSink>,
    /// Set when built with [`TestHarnessBuilder::with_sqlite`].
    pub database: Option<Database>,
    pub config: HeraldConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// An inbound message from the default requester, an onboarded admin.
    pub fn message(text: &str) -> InboundMessage {
        InboundMessage {
            requester_id: DEFAULT_REQUESTER.to_string(),
            tenant_id: "tenant-1".to_string(),
            channel_handle: "session-1".to_string(),
            reply_address: DEFAULT_ADDRESS.to_string(),
            text: text.to_string(),
            permission: PermissionLevel::Admin,
            onboarding_complete: true,
        }
    }

    /// Run one cycle for the default requester.
    pub async fn send(&self, text: &str) -> CycleReport {
        self.orchestrator.handle(Self::message(text)).await
    }

    /// Run one cycle for an arbitrary message.
    pub async fn send_as(&self, message: InboundMessage) -> CycleReport {
        self.orchestrator.handle(message).await
    }

    /// The whole audit trail, oldest first.
    pub async fn audit_trail(&self) -> Result<Vec<AuditRecord>, HeraldError> {
        let mut records = self.audit.recent(None, usize::MAX).await?;
        records.reverse();
        Ok(records)
    }

    /// Replies sent to the default requester, oldest first.
    pub async fn replies(&self) -> Vec<String> {
        self.transport.bodies_to(DEFAULT_ADDRESS).await
    }
}
