// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background bulk-send jobs, one slot per requester.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use herald_core::{CallContext, HeraldError, Transport};
use herald_delivery::{
    DeliveryFailure, DeliveryJob, DeliveryObserver, DeliveryProgress, DeliveryQueue,
    DeliveryReport, Pacer, QueueStatus,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// A bulk send started by one requester.
pub struct TrackedJob {
    pub job_id: String,
    pub requester_id: String,
    pub total: usize,
    pub eta: Duration,
    pub started_at: DateTime<Utc>,
    queue: Arc<DeliveryQueue>,
    report: watch::Receiver<Option<DeliveryReport>>,
}

impl TrackedJob {
    pub fn status(&self) -> QueueStatus {
        self.queue.status()
    }

    /// Final report, once the run has ended and the summary was sent.
    pub fn report(&self) -> Option<DeliveryReport> {
        self.report.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.report.borrow().is_some()
    }

    /// Stop scheduling further sends. Returns the number discarded.
    pub fn cancel(&self) -> Result<usize, HeraldError> {
        self.queue.clear()
    }

    /// Wait for the run to end.
    pub async fn wait(&self) -> Result<DeliveryReport, HeraldError> {
        let mut rx = self.report.clone();
        let report = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| HeraldError::Internal(format!("bulk job {} was dropped", self.job_id)))?;
        report
            .clone()
            .ok_or_else(|| HeraldError::Internal(format!("bulk job {} has no report", self.job_id)))
    }
}

/// Owns the delivery queues of running and recently finished bulk sends.
///
/// Each requester has at most one job slot. Starting a new job replaces a
/// finished one and is refused while one is still running.
pub struct DeliveryTracker {
    pacer: Pacer,
    transport: Arc<dyn Transport>,
    seed: Option<u64>,
    jobs: DashMap<String, Arc<TrackedJob>>,
}

impl DeliveryTracker {
    pub fn new(pacer: Pacer, transport: Arc<dyn Transport>) -> Self {
        Self {
            pacer,
            transport,
            seed: None,
            jobs: DashMap::new(),
        }
    }

    /// Use a deterministic delay sequence for every queue.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    /// The requester's most recent job.
    pub fn job_for(&self, requester_id: &str) -> Option<Arc<TrackedJob>> {
        self.jobs.get(requester_id).map(|job| Arc::clone(&job))
    }

    /// Number of jobs still sending.
    pub fn running(&self) -> usize {
        self.jobs.iter().filter(|job| !job.is_finished()).count()
    }

    /// Start `job` on a background task.
    ///
    /// When the run ends a summary is sent to `ctx.reply_address`.
    /// Fails with [`HeraldError::QueueBusy`] while the requester already has
    /// a job running.
    pub fn start(&self, job: DeliveryJob, ctx: &CallContext) -> Result<Arc<TrackedJob>, HeraldError> {
        let mut queue = DeliveryQueue::new(self.pacer.clone(), Arc::clone(&self.transport));
        if let Some(seed) = self.seed {
            queue = queue.with_seed(seed);
        }
        queue.prepare(&job)?;
        let queue = Arc::new(queue);
        let (tx, rx) = watch::channel(None);

        let tracked = Arc::new(TrackedJob {
            job_id: job.id().to_string(),
            requester_id: ctx.requester_id.clone(),
            total: job.len(),
            eta: self.pacer.estimate(job.len()),
            started_at: Utc::now(),
            queue: Arc::clone(&queue),
            report: rx,
        });

        match self.jobs.entry(ctx.requester_id.clone()) {
            Entry::Occupied(mut slot) => {
                if !slot.get().is_finished() {
                    return Err(HeraldError::QueueBusy);
                }
                slot.insert(Arc::clone(&tracked));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&tracked));
            }
        }

        info!(
            requester_id = %ctx.requester_id,
            job_id = %tracked.job_id,
            total = tracked.total,
            eta_secs = tracked.eta.as_secs(),
            "bulk send scheduled"
        );

        tokio::spawn(run_job(
            queue,
            job,
            ctx.clone(),
            Arc::clone(&self.transport),
            tx,
        ));

        Ok(tracked)
    }
}

async fn run_job(
    queue: Arc<DeliveryQueue>,
    job: DeliveryJob,
    ctx: CallContext,
    transport: Arc<dyn Transport>,
    tx: watch::Sender<Option<DeliveryReport>>,
) {
    let job_id = job.id().to_string();
    let total = job.len();
    let observer = ProgressLog {
        job_id: job_id.clone(),
    };

    let report = match queue.run(job, &ctx.channel_handle, Some(&observer)).await {
        Ok(report) => report,
        Err(e) => {
            error!(job_id = %job_id, error = %e, "bulk send could not run");
            DeliveryReport {
                job_id: job_id.clone(),
                total,
                sent: 0,
                failed: total,
                errors: vec![DeliveryFailure {
                    display_name: "*".to_string(),
                    error: e.to_string(),
                }],
                cleared: false,
            }
        }
    };

    if let Err(e) = transport
        .send_text(&ctx.channel_handle, &ctx.reply_address, &summarize(&report))
        .await
    {
        warn!(
            requester_id = %ctx.requester_id,
            job_id = %job_id,
            error = %e,
            "failed to send bulk summary"
        );
    }

    tx.send_replace(Some(report));
}

struct ProgressLog {
    job_id: String,
}

#[async_trait]
impl DeliveryObserver for ProgressLog {
    async fn on_progress(&self, progress: &DeliveryProgress) {
        debug!(
            job_id = %self.job_id,
            sent = progress.sent,
            failed = progress.failed,
            total = progress.total,
            recipient = %progress.current,
            "bulk send progress"
        );
    }
}

/// Requester-facing summary of a finished run.
pub fn summarize(report: &DeliveryReport) -> String {
    let head = if report.cleared {
        "Bulk send stopped"
    } else {
        "Bulk send finished"
    };
    let mut summary = format!("{head}: {} of {} delivered", report.sent, report.total);
    if report.failed > 0 {
        let _ = write!(summary, ", {} failed", report.failed);
    }
    summary.push('.');
    if !report.errors.is_empty() {
        let names: Vec<&str> = report
            .errors
            .iter()
            .map(|f| f.display_name.as_str())
            .collect();
        let _ = write!(summary, " Not delivered to: {}.", names.join(", "));
    }
    summary
}
