// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential, paced delivery of a batch through a [`Transport`].
//!
//! A [`DeliveryQueue`] runs one [`DeliveryJob`] at a time. Each target goes
//! through typing delay, send, inter-message delay and (every
//! `pause_after` sends) a long pause. A failed send is recorded against the
//! target's display name and the batch continues.
//!
//! [`DeliveryQueue::clear`] discards targets that have not been sent yet and
//! interrupts a pending delay. A send already in flight always completes.
//! Callers that start the run on another task call
//! [`DeliveryQueue::prepare`] first, so a clear issued before the task is
//! polled still discards the whole batch.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use herald_core::{HeraldError, Transport};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pacer::Pacer;

/// One rendered outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryTarget {
    pub address: String,
    pub body: String,
    /// Used in error reports.
    pub display_name: String,
}

/// A validated batch, ready to run.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    id: String,
    targets: Vec<DeliveryTarget>,
}

impl DeliveryJob {
    /// Validate a batch against the pacer's hourly budget.
    ///
    /// Fails with [`HeraldError::EmptyBatch`] for no targets and
    /// [`HeraldError::Capacity`] above the budget.
    pub fn new(targets: Vec<DeliveryTarget>, pacer: &Pacer) -> Result<Self, HeraldError> {
        if targets.is_empty() {
            return Err(HeraldError::EmptyBatch);
        }
        pacer.check_capacity(targets.len())?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            targets,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn targets(&self) -> &[DeliveryTarget] {
        &self.targets
    }
}

/// A target that could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub display_name: String,
    pub error: String,
}

/// Aggregate result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub job_id: String,
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub errors: Vec<DeliveryFailure>,
    /// The run was stopped by [`DeliveryQueue::clear`].
    pub cleared: bool,
}

/// Snapshot passed to [`DeliveryObserver::on_progress`] after every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryProgress {
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
    /// Display name of the target just attempted.
    pub current: String,
}

/// Optional callbacks for callers that want live progress.
#[async_trait]
pub trait DeliveryObserver: Send + Sync {
    async fn on_progress(&self, _progress: &DeliveryProgress) {}

    async fn on_error(&self, _target: &DeliveryTarget, _error: &HeraldError) {}
}

/// Point-in-time status of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QueueStatus {
    /// Targets not yet attempted.
    pub pending: usize,
    /// A run is in progress.
    pub processing: bool,
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Paced, sequential delivery queue. One job at a time.
pub struct DeliveryQueue {
    pacer: Pacer,
    transport: Arc<dyn Transport>,
    seed: Option<u64>,
    processing: AtomicBool,
    pending: AtomicUsize,
    total: AtomicUsize,
    sent: AtomicUsize,
    failed: AtomicUsize,
    slot: Mutex<RunSlot>,
}

/// Cancellation token of the current or next run.
struct RunSlot {
    token: CancellationToken,
    /// Job id armed by [`DeliveryQueue::prepare`] and not yet run.
    prepared_for: Option<String>,
}

impl DeliveryQueue {
    pub fn new(pacer: Pacer, transport: Arc<dyn Transport>) -> Self {
        Self {
            pacer,
            transport,
            seed: None,
            processing: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            sent: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            slot: Mutex::new(RunSlot {
                token: CancellationToken::new(),
                prepared_for: None,
            }),
        }
    }

    /// Use a deterministic delay sequence.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            pending: self.pending.load(Ordering::Acquire),
            processing: self.processing.load(Ordering::Acquire),
            total: self.total.load(Ordering::Acquire),
            sent: self.sent.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
        }
    }

    /// Arm the queue for `job` before its run starts.
    ///
    /// Status reports the batch as pending from here on, and a [`clear`]
    /// before [`run`] makes the run send nothing.
    ///
    /// [`clear`]: DeliveryQueue::clear
    /// [`run`]: DeliveryQueue::run
    pub fn prepare(&self, job: &DeliveryJob) -> Result<(), HeraldError> {
        if self.processing.load(Ordering::Acquire) {
            return Err(HeraldError::QueueBusy);
        }
        let mut slot = self.lock_slot()?;
        slot.token = CancellationToken::new();
        slot.prepared_for = Some(job.id().to_string());
        self.reset_counters(job.len());
        debug!(job_id = job.id(), total = job.len(), "delivery prepared");
        Ok(())
    }

    /// Discard not-yet-sent targets of the current run.
    ///
    /// Returns the number of targets discarded.
    pub fn clear(&self) -> Result<usize, HeraldError> {
        self.lock_slot()?.token.cancel();
        let discarded = self.pending.swap(0, Ordering::AcqRel);
        info!(discarded, "delivery queue cleared");
        Ok(discarded)
    }

    /// Run `job` to completion (or until cleared).
    ///
    /// Returns [`HeraldError::QueueBusy`] if another run is in progress.
    pub async fn run(
        &self,
        job: DeliveryJob,
        channel_handle: &str,
        observer: Option<&dyn DeliveryObserver>,
    ) -> Result<DeliveryReport, HeraldError> {
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(HeraldError::QueueBusy);
        }
        let _running = RunningGuard(&self.processing);

        let total = job.len();
        let token = self.claim_token(&job)?;

        info!(job_id = job.id(), total, "delivery started");

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut sent = 0;
        let mut failed = 0;
        let mut errors = Vec::new();

        for (index, target) in job.targets().iter().enumerate() {
            let step = self.pacer.step(index, &mut rng);

            if !wait(&token, step.typing).await {
                break;
            }

            // From here the target is in flight and is no longer pending.
            decrement(&self.pending);
            match self
                .transport
                .send_text(channel_handle, &target.address, &target.body)
                .await
            {
                Ok(()) => {
                    sent += 1;
                    self.sent.fetch_add(1, Ordering::AcqRel);
                    debug!(job_id = job.id(), index, "message delivered");
                }
                Err(e) => {
                    failed += 1;
                    self.failed.fetch_add(1, Ordering::AcqRel);
                    warn!(
                        job_id = job.id(),
                        recipient = %target.display_name,
                        error = %e,
                        "message delivery failed"
                    );
                    if let Some(observer) = observer {
                        observer.on_error(target, &e).await;
                    }
                    errors.push(DeliveryFailure {
                        display_name: target.display_name.clone(),
                        error: e.to_string(),
                    });
                }
            }

            if let Some(observer) = observer {
                observer
                    .on_progress(&DeliveryProgress {
                        sent,
                        failed,
                        total,
                        current: target.display_name.clone(),
                    })
                    .await;
            }

            if !wait(&token, step.after).await {
                break;
            }
            if let Some(pause) = step.long_pause {
                info!(job_id = job.id(), after = index + 1, ?pause, "long pause");
                if !wait(&token, pause).await {
                    break;
                }
            }
        }

        let cleared = token.is_cancelled();
        self.pending.store(0, Ordering::Release);

        info!(
            job_id = job.id(),
            total, sent, failed, cleared, "delivery finished"
        );

        Ok(DeliveryReport {
            job_id: job.id().to_string(),
            total,
            sent,
            failed,
            errors,
            cleared,
        })
    }
}

impl DeliveryQueue {
    fn lock_slot(&self) -> Result<std::sync::MutexGuard<'_, RunSlot>, HeraldError> {
        self.slot
            .lock()
            .map_err(|e| HeraldError::Internal(format!("delivery queue lock poisoned: {e}")))
    }

    /// Token for a run that is starting.
    ///
    /// A job armed by `prepare` keeps its token, possibly already cancelled,
    /// and its counters. Any other job gets a fresh token.
    fn claim_token(&self, job: &DeliveryJob) -> Result<CancellationToken, HeraldError> {
        let mut slot = self.lock_slot()?;
        if slot.prepared_for.take().as_deref() == Some(job.id()) {
            return Ok(slot.token.clone());
        }
        slot.token = CancellationToken::new();
        self.reset_counters(job.len());
        Ok(slot.token.clone())
    }

    fn reset_counters(&self, total: usize) {
        self.total.store(total, Ordering::Release);
        self.pending.store(total, Ordering::Release);
        self.sent.store(0, Ordering::Release);
        self.failed.store(0, Ordering::Release);
    }
}

/// Resets the processing flag when a run ends, including on panic.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sleep for `duration`. Returns false if cancelled first.
async fn wait(token: &CancellationToken, duration: Duration) -> bool {
    if token.is_cancelled() {
        return false;
    }
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// `clear()` may have zeroed the counter concurrently.
fn decrement(counter: &AtomicUsize) {
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
}
