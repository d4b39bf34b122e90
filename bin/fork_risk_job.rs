//! # Fork Risk Job
//!
//! One-shot entry point for the scheduled fork risk calculation.
//!
//! ## Overview
//!
//! This binary:
//! - Loads settings (`Config.toml`, or `--config`, plus `FORK_RISK_*` env overrides)
//! - Runs the fork risk pipeline with endpoint fallback
//! - Writes the snapshot (success or error variant) to the output path
//! - Exits 0 on success, 1 when every endpoint failed
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release --bin fork_risk_job
//! cargo run --bin fork_risk_job -- --output /tmp/fork-risk.json
//! ```

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use fork_risk_monitor::{
    contracts::ManifestContractLoader,
    orchestrator::{ForkRiskJob, EXIT_FAILURE},
    rpc_pool::HttpConnector,
    settings::Settings,
    snapshot::{write_snapshot, RiskSnapshot},
};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "fork_risk_job", about = "Publishes the Augur fork risk snapshot")]
struct Args {
    /// Settings file (defaults to ./Config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `output.path`
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("🚀 Starting fork risk calculation");

    let mut settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("❌ Failed to load settings: {}", e);
            let defaults = Settings::default();
            let path = args
                .output
                .unwrap_or_else(|| PathBuf::from(&defaults.output.path));
            let snapshot = RiskSnapshot::error(
                Utc::now(),
                defaults.output.update_interval_minutes,
                0,
                format!("Failed to load settings: {}", e),
            );
            write_snapshot(&path, &snapshot)?;
            std::process::exit(EXIT_FAILURE);
        }
    };
    if let Some(output) = &args.output {
        settings.output.path = output.to_string_lossy().into_owned();
    }
    info!(
        "✅ Settings loaded ({} endpoints, output {})",
        settings.rpc.endpoints.len(),
        settings.output.path
    );

    let settings = Arc::new(settings);
    let job = ForkRiskJob::new(
        settings.clone(),
        HttpConnector::new(Duration::from_secs(settings.rpc.probe_timeout_seconds)),
        ManifestContractLoader::new(settings.contracts.manifest_path.clone()),
    );

    let exit_code = match job.run_and_write(Path::new(&settings.output.path)).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ Failed to write snapshot: {:#}", e);
            EXIT_FAILURE
        }
    };

    info!("🏁 Fork risk calculation finished with exit code {}", exit_code);
    std::process::exit(exit_code);
}
