//! # Fork Risk Orchestrator
//!
//! The `ForkRiskJob` sequences one run of the fork-risk calculation and decides the
//! process exit status.
//!
//! ## Overview
//!
//! For each endpoint attempt (see `pipeline`):
//! - Load the contract handles for the selected connection
//! - Check whether the universe is forking (retried; degrades to "not forking")
//! - If forking: publish the pinned critical snapshot, skipping the event scan
//! - Otherwise: scan the lookback window, reconcile disputes, classify the largest stake
//!
//! A run that exhausts every endpoint produces the error snapshot and exit code 1.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fork_risk_monitor::contracts::ManifestContractLoader;
//! use fork_risk_monitor::orchestrator::ForkRiskJob;
//! use fork_risk_monitor::rpc_pool::HttpConnector;
//! use fork_risk_monitor::settings::Settings;
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let settings = Arc::new(Settings::new()?);
//! let job = ForkRiskJob::new(
//!     settings.clone(),
//!     HttpConnector::new(Duration::from_secs(settings.rpc.probe_timeout_seconds)),
//!     ManifestContractLoader::new(settings.contracts.manifest_path.clone()),
//! );
//! let exit_code = job.run_and_write(Path::new(&settings.output.path)).await?;
//! std::process::exit(exit_code);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use std::path::Path;
use std::sync::Arc;

use crate::chain::DisputeChain;
use crate::contracts::ContractLoader;
use crate::event_scanner::scan_dispute_events;
use crate::pipeline::run_with_fallback;
use crate::reconciler::{self, DisputeDetail};
use crate::risk::{self, assess, fork_assessment};
use crate::rpc_pool::{EndpointConnector, RpcConnection};
use crate::settings::Settings;
use crate::snapshot::{write_snapshot, CalculationMethod, Metrics, RiskSnapshot, RpcInfo};
use crate::utils::{address_to_string, wei_to_tokens};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Snapshot plus the exit code the process should report.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub snapshot: RiskSnapshot,
    pub exit_code: i32,
}

/// One invocation of the fork risk job. Holds no chain state between runs.
pub struct ForkRiskJob<C, L> {
    settings: Arc<Settings>,
    connector: C,
    loader: L,
}

impl<C, L> ForkRiskJob<C, L>
where
    C: EndpointConnector,
    L: ContractLoader<C::Client>,
{
    pub fn new(settings: Arc<Settings>, connector: C, loader: L) -> Self {
        Self {
            settings,
            connector,
            loader,
        }
    }

    /// Runs the pipeline across the endpoint list. Never fails: a fatal outcome is
    /// returned as the error snapshot with `EXIT_FAILURE`.
    pub async fn run(&self) -> JobOutcome {
        let settings = self.settings.as_ref();
        let loader = &self.loader;

        let result = run_with_fallback(&self.connector, &settings.rpc.endpoints, |connection| {
            async move {
                let chain = loader
                    .load(&connection)
                    .with_context(|| format!("Contract loading failed on {}", connection.endpoint))?;
                compute_snapshot(&chain, &connection, settings, Utc::now()).await
            }
        })
        .await;

        match result {
            Ok(snapshot) => {
                info!(
                    "✅ [Orchestrator] Risk {} ({:.2}%), {} active disputes, block {}",
                    snapshot.risk_level,
                    snapshot.risk_percentage,
                    snapshot.metrics.active_disputes,
                    snapshot.block_number
                );
                JobOutcome {
                    snapshot,
                    exit_code: EXIT_SUCCESS,
                }
            }
            Err(e) => {
                error!("❌ [Orchestrator] Fork risk calculation failed: {}", e);
                JobOutcome {
                    snapshot: RiskSnapshot::error(
                        Utc::now(),
                        settings.output.update_interval_minutes,
                        e.attempted(),
                        e.to_string(),
                    ),
                    exit_code: EXIT_FAILURE,
                }
            }
        }
    }

    /// Runs the job and always writes the resulting snapshot to `path`.
    pub async fn run_and_write(&self, path: &Path) -> Result<i32> {
        let outcome = self.run().await;
        write_snapshot(path, &outcome.snapshot)?;
        Ok(outcome.exit_code)
    }
}

/// Full computation against one connection's contracts.
pub async fn compute_snapshot<D, Client>(
    chain: &D,
    connection: &RpcConnection<Client>,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<RiskSnapshot>
where
    D: DisputeChain + ?Sized,
{
    let rpc_info = RpcInfo {
        endpoint: Some(connection.endpoint.clone()),
        latency: Some(connection.latency_ms),
        fallbacks_attempted: connection.fallbacks_attempted,
    };
    let block_number = connection.block_number;

    if risk::check_fork_state(chain, settings).await {
        let forking_market = risk::lookup_forking_market(chain, settings).await;
        return Ok(fork_snapshot(forking_market, block_number, rpc_info, settings, now));
    }

    let scan = scan_dispute_events(chain, block_number, &settings.scan).await?;
    let summary = reconciler::reconcile(chain, &scan, &settings.risk).await;

    let largest_rep = wei_to_tokens(summary.largest_stake);
    let assessment = assess(largest_rep, settings.risk.fork_threshold);
    let details = summary.details(
        settings.risk.max_reported_disputes,
        now.timestamp().max(0) as u64,
        settings.risk.dispute_window_days,
    );

    Ok(RiskSnapshot::computed(
        now,
        settings.output.update_interval_minutes,
        block_number,
        assessment,
        Metrics {
            largest_dispute_bond: largest_rep,
            fork_threshold_percent: assessment.percentage,
            active_disputes: summary.active_count,
            dispute_details: details,
        },
        rpc_info,
        CalculationMethod::EventReconciliation,
    ))
}

/// Pinned snapshot while the universe is forking.
fn fork_snapshot(
    forking_market: ethers::types::Address,
    block_number: u64,
    rpc_info: RpcInfo,
    settings: &Settings,
    now: DateTime<Utc>,
) -> RiskSnapshot {
    let detail = DisputeDetail {
        market_id: address_to_string(forking_market),
        title: "Protocol fork in progress".to_string(),
        stake_size: settings.risk.fork_threshold,
        round: 0,
        days_remaining: settings.risk.fork_period_days,
    };
    let assessment = fork_assessment();

    RiskSnapshot::computed(
        now,
        settings.output.update_interval_minutes,
        block_number,
        assessment,
        Metrics {
            largest_dispute_bond: settings.risk.fork_threshold,
            fork_threshold_percent: assessment.percentage,
            active_disputes: 1,
            dispute_details: vec![detail],
        },
        rpc_info,
        CalculationMethod::ForkDetected,
    )
}
