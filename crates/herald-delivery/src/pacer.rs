// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-like pacing for bulk sends.
//!
//! The pacer is a stateless policy plus a sampler. Before each send it draws
//! a typing delay, after each send an inter-message delay, and every
//! `pause_after` sends it adds a fixed long pause. A batch larger than the
//! hourly budget is refused before anything is sent.

use std::time::Duration;

use herald_config::model::DeliveryConfig;
use herald_core::HeraldError;
use rand::Rng;
use serde::Serialize;
use tracing::warn;

/// Pacing parameters, validated on construction of a [`Pacer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacingPolicy {
    pub min_typing: Duration,
    pub max_typing: Duration,
    pub min_bulk: Duration,
    pub max_bulk: Duration,
    pub pause_after: usize,
    pub pause_duration: Duration,
    pub max_per_hour: usize,
}

impl From<&DeliveryConfig> for PacingPolicy {
    fn from(config: &DeliveryConfig) -> Self {
        Self {
            min_typing: Duration::from_millis(config.min_typing_ms),
            max_typing: Duration::from_millis(config.max_typing_ms),
            min_bulk: Duration::from_millis(config.min_bulk_ms),
            max_bulk: Duration::from_millis(config.max_bulk_ms),
            pause_after: config.pause_after,
            pause_duration: Duration::from_secs(config.pause_duration_secs),
            max_per_hour: config.max_per_hour,
        }
    }
}

/// Delays surrounding one send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingStep {
    /// Wait before the send.
    pub typing: Duration,
    /// Wait after the send.
    pub after: Duration,
    /// Extra wait after `after`, set on every `pause_after`-th send.
    pub long_pause: Option<Duration>,
}

/// Rate limiter and delay generator for a delivery queue.
#[derive(Debug, Clone)]
pub struct Pacer {
    policy: PacingPolicy,
}

impl Pacer {
    /// Build a pacer, rejecting inverted ranges and zero caps.
    pub fn new(policy: PacingPolicy) -> Result<Self, HeraldError> {
        if policy.min_typing > policy.max_typing {
            return Err(HeraldError::Config(format!(
                "typing delay range is inverted ({:?} > {:?})",
                policy.min_typing, policy.max_typing
            )));
        }
        if policy.min_bulk > policy.max_bulk {
            return Err(HeraldError::Config(format!(
                "inter-message delay range is inverted ({:?} > {:?})",
                policy.min_bulk, policy.max_bulk
            )));
        }
        if policy.pause_after == 0 {
            return Err(HeraldError::Config("pause_after must be at least 1".into()));
        }
        if policy.max_per_hour == 0 {
            return Err(HeraldError::Config("max_per_hour must be at least 1".into()));
        }
        Ok(Self { policy })
    }

    pub fn from_config(config: &DeliveryConfig) -> Result<Self, HeraldError> {
        Self::new(PacingPolicy::from(config))
    }

    pub fn policy(&self) -> &PacingPolicy {
        &self.policy
    }

    /// Refuse batches above the hourly budget.
    ///
    /// Emits `tracing::warn` when a batch uses 80% or more of the budget.
    pub fn check_capacity(&self, batch_size: usize) -> Result<(), HeraldError> {
        let limit = self.policy.max_per_hour;
        if batch_size > limit {
            return Err(HeraldError::Capacity {
                requested: batch_size,
                limit,
            });
        }
        if batch_size.saturating_mul(5) >= limit.saturating_mul(4) {
            warn!(
                batch_size,
                limit, "bulk send uses 80%+ of the hourly message budget"
            );
        }
        Ok(())
    }

    /// Sample the delays for the send at zero-based position `index`.
    pub fn step<R: Rng>(&self, index: usize, rng: &mut R) -> PacingStep {
        let p = &self.policy;
        let long_pause = ((index + 1) % p.pause_after == 0).then_some(p.pause_duration);
        PacingStep {
            typing: rng.gen_range(p.min_typing..=p.max_typing),
            after: rng.gen_range(p.min_bulk..=p.max_bulk),
            long_pause,
        }
    }

    /// Lazily generate the delays for a batch of `batch_size` sends.
    pub fn schedule<R: Rng>(&self, batch_size: usize, rng: R) -> PacingSchedule<'_, R> {
        PacingSchedule {
            pacer: self,
            rng,
            index: 0,
            len: batch_size,
        }
    }

    /// Number of long pauses a batch incurs: `floor(batch_size / pause_after)`.
    pub fn long_pauses(&self, batch_size: usize) -> usize {
        batch_size / self.policy.pause_after
    }

    /// Expected wall-clock duration of a batch using the mean of each range.
    pub fn estimate(&self, batch_size: usize) -> Duration {
        let p = &self.policy;
        let mean_typing = (p.min_typing + p.max_typing) / 2;
        let mean_bulk = (p.min_bulk + p.max_bulk) / 2;
        let per_message = mean_typing + mean_bulk;
        let pauses = saturating_mul(p.pause_duration, self.long_pauses(batch_size));
        saturating_mul(per_message, batch_size).saturating_add(pauses)
    }
}

fn saturating_mul(d: Duration, n: usize) -> Duration {
    d.checked_mul(u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(Duration::MAX)
}

/// Iterator over the [`PacingStep`]s of one batch.
pub struct PacingSchedule<'a, R> {
    pacer: &'a Pacer,
    rng: R,
    index: usize,
    len: usize,
}

impl<R: Rng> Iterator for PacingSchedule<'_, R> {
    type Item = PacingStep;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }
        let step = self.pacer.step(self.index, &mut self.rng);
        self.index += 1;
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl<R: Rng> ExactSizeIterator for PacingSchedule<'_, R> {}

/// Render a duration estimate for a requester, e.g. `about 3 min`.
pub fn format_eta(eta: Duration) -> String {
    let total_minutes = eta.as_secs().div_ceil(60);
    match total_minutes {
        0 | 1 => "about 1 min".to_string(),
        m if m < 60 => format!("about {m} min"),
        m if m % 60 == 0 => format!("about {} h", m / 60),
        m => format!("about {} h {} min", m / 60, m % 60),
    }
}
