// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `herald estimate` command implementation.

use herald_config::HeraldConfig;
use herald_core::HeraldError;
use herald_delivery::{Pacer, format_eta};
use serde::Serialize;

/// Structured output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct EstimateReport {
    pub batch_size: usize,
    pub max_per_hour: usize,
    pub within_capacity: bool,
    pub long_pauses: usize,
    pub eta_secs: u64,
    pub eta_human: String,
}

pub fn estimate(config: &HeraldConfig, batch_size: usize) -> Result<EstimateReport, HeraldError> {
    let pacer = Pacer::from_config(&config.delivery)?;
    let eta = pacer.estimate(batch_size);
    Ok(EstimateReport {
        batch_size,
        max_per_hour: pacer.policy().max_per_hour,
        within_capacity: pacer.check_capacity(batch_size).is_ok(),
        long_pauses: pacer.long_pauses(batch_size),
        eta_secs: eta.as_secs(),
        eta_human: format_eta(eta),
    })
}

/// Run the `herald estimate` command.
///
/// Over-capacity batches are reported, then returned as
/// [`HeraldError::Capacity`] so the process exits non-zero.
pub fn run_estimate(config: &HeraldConfig, batch_size: usize, json: bool) -> Result<(), HeraldError> {
    let report = estimate(config, batch_size)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        println!("Batch size:    {}", report.batch_size);
        println!("Hourly cap:    {}", report.max_per_hour);
        println!("Long pauses:   {}", report.long_pauses);
        println!("Estimated:     {} ({}s)", report.eta_human, report.eta_secs);
    }

    if report.within_capacity {
        Ok(())
    } else {
        Err(HeraldError::Capacity {
            requested: report.batch_size,
            limit: report.max_per_hour,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_uses_mean_delays_and_pauses() {
        let mut config = HeraldConfig::default();
        config.delivery.min_typing_ms = 2_000;
        config.delivery.max_typing_ms = 4_000;
        config.delivery.min_bulk_ms = 6_000;
        config.delivery.max_bulk_ms = 10_000;
        config.delivery.pause_after = 50;
        config.delivery.pause_duration_secs = 300;

        let report = estimate(&config, 100).unwrap();
        // 100 * (3s + 8s) + 2 * 300s
        assert_eq!(report.eta_secs, 1_700);
        assert_eq!(report.long_pauses, 2);
        assert!(report.within_capacity);
        assert_eq!(report.eta_human, "about 29 min");
    }

    #[test]
    fn over_capacity_is_an_error() {
        let config = HeraldConfig::default();
        let err = run_estimate(&config, 201, true).unwrap_err();
        assert!(matches!(
            err,
            HeraldError::Capacity {
                requested: 201,
                limit: 200
            }
        ));
    }
}
