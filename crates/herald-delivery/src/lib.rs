// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anti-throttling bulk message delivery.
//!
//! [`Pacer`] decides how long to wait around each send and whether a batch is
//! within the hourly budget. [`DeliveryQueue`] pushes a validated
//! [`DeliveryJob`] through a transport one message at a time, honoring the
//! pacer's delays.

pub mod pacer;
pub mod queue;
pub mod template;

pub use pacer::{Pacer, PacingPolicy, PacingStep, format_eta};
pub use queue::{
    DeliveryFailure, DeliveryJob, DeliveryObserver, DeliveryProgress, DeliveryQueue,
    DeliveryReport, DeliveryTarget, QueueStatus,
};
pub use template::{build_targets, first_name, render};
