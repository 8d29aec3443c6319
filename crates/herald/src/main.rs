// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Herald - conversational command orchestrator and paced bulk messaging.
//!
//! This is the operator CLI: it inspects configuration, estimates bulk
//! deliveries and reads the audit log. The orchestrator itself is embedded
//! by the ingestion service through the `herald-agent` crate.

mod audit;
mod estimate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use herald_config::HeraldConfig;
use herald_core::HeraldError;

/// Herald - conversational command orchestrator and paced bulk messaging.
#[derive(Parser, Debug)]
#[command(name = "herald", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the lookup hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate and print the effective configuration.
    Config,
    /// Check a batch size against the hourly cap and estimate its duration.
    Estimate {
        /// Number of recipients.
        count: usize,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// List recent audit records.
    Audit {
        /// Only records of this requester.
        #[arg(long)]
        requester: Option<String>,
        /// Maximum number of records.
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Print JSON lines instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Verify the audit log hash chain.
    VerifyAudit,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => herald_config::load_and_validate_path(path),
        None => herald_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            herald_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);
    tracing::debug!(
        agent = %config.agent.name,
        database = %config.storage.database_path,
        "configuration loaded"
    );

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("herald: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Option<Commands>, config: &HeraldConfig) -> Result<(), HeraldError> {
    match command {
        Some(Commands::Config) => {
            let rendered = toml::to_string_pretty(config)
                .map_err(|e| HeraldError::Internal(format!("failed to render config: {e}")))?;
            print!("{rendered}");
            Ok(())
        }
        Some(Commands::Estimate { count, json }) => estimate::run_estimate(config, count, json),
        Some(Commands::Audit {
            requester,
            limit,
            json,
        }) => audit::run_audit(config, requester.as_deref(), limit, json).await,
        Some(Commands::VerifyAudit) => audit::run_verify(config).await,
        None => {
            println!("herald: use --help for available commands");
            Ok(())
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "herald={log_level},herald_agent={log_level},herald_dispatch={log_level},\
             herald_delivery={log_level},herald_storage={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
