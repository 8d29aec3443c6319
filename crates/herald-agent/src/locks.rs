// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One orchestration cycle in flight per requester.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct RequesterLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RequesterLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the requester's previous cycle to finish and hold the slot.
    ///
    /// The map shard lock is released before awaiting, so other requesters
    /// are never blocked.
    pub async fn acquire(&self, requester_id: &str) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(
            self.locks
                .entry(requester_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        lock.lock_owned().await
    }

    /// Number of requesters seen so far.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
