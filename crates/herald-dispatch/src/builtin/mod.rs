// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operations Herald provides on its own.
//!
//! Domain operations (members, events, cells) come from the embedding
//! application; these cover bulk messaging and conversation control.

pub mod bulk_send;
pub mod reset;
pub mod status;
pub mod tracker;

pub use bulk_send::BulkSendHandler;
pub use reset::ResetConversationHandler;
pub use status::{BulkStatusHandler, CancelBulkHandler};
pub use tracker::{DeliveryTracker, TrackedJob, summarize};

use std::sync::Arc;

use herald_core::{SessionStore, TargetResolver};

use crate::table::DispatchTableBuilder;

/// Collaborators the built-in handlers need.
pub struct BuiltinDeps {
    pub resolver: Arc<dyn TargetResolver>,
    pub tracker: Arc<DeliveryTracker>,
    pub sessions: Arc<dyn SessionStore>,
    pub name_placeholder: String,
    /// Require confirmation before `send_bulk_message` runs.
    pub bulk_send_critical: bool,
}

/// Registers all built-in operations into the given builder.
pub fn register_builtins(builder: DispatchTableBuilder, deps: BuiltinDeps) -> DispatchTableBuilder {
    let builder = builder
        .register(
            BulkSendHandler::spec(&deps.name_placeholder),
            Arc::new(BulkSendHandler::new(
                deps.resolver,
                Arc::clone(&deps.tracker),
                &deps.name_placeholder,
            )),
        )
        .register(
            BulkStatusHandler::spec(),
            Arc::new(BulkStatusHandler::new(Arc::clone(&deps.tracker))),
        )
        .register(
            CancelBulkHandler::spec(),
            Arc::new(CancelBulkHandler::new(deps.tracker)),
        )
        .register(
            ResetConversationHandler::spec(),
            Arc::new(ResetConversationHandler::new(deps.sessions)),
        );

    if deps.bulk_send_critical {
        builder.force_critical(bulk_send::NAME)
    } else {
        builder
    }
}
