//! # Fork Risk Monitor
//!
//! A scheduled batch job that estimates how close the Augur v2 protocol on Ethereum
//! mainnet is to a fork, and publishes the result as a single JSON snapshot.
//!
//! ## Overview
//!
//! Augur forks when a dispute bond reaches the fork threshold (275,000 REP). Each run:
//!
//! - **Selection**: picks the first responsive public JSON-RPC endpoint
//! - **Fork check**: short-circuits to `critical` when the universe is already forking
//! - **Scan**: pulls dispute crowdsourcer events over a 7-day lookback in 1,000-block chunks
//! - **Reconciliation**: folds events into per-crowdsourcer stakes and drops finished disputes
//! - **Classification**: maps the largest active stake to a percentage and a risk level
//!
//! Any step that fails on one endpoint restarts the whole computation on the next. When
//! every endpoint fails the job still writes an error snapshot and exits non-zero.
//!
//! ## Architecture
//!
//! ### Chain Access
//! `rpc_pool` selects endpoints, `contracts` binds the Augur ABIs, and `chain` is the
//! read-only seam the computation runs against.
//!
//! ### Computation
//! `event_scanner`, `reconciler` and `risk` turn raw logs into an assessment.
//!
//! ### Orchestration & Output
//! `pipeline` owns the endpoint fallback state machine, `orchestrator` sequences a run,
//! and `snapshot` writes the artifact.

// Chain Access
/// Endpoint selection and liveness probing
pub mod rpc_pool;
/// Augur ABIs, address manifest and contract loader
pub mod contracts;
/// Read-only chain interface used by the computation
pub mod chain;
/// Decoded dispute event types
pub mod events;

// Computation
/// Chunked event scanning over the lookback window
pub mod event_scanner;
/// Dispute reconciliation
pub mod reconciler;
/// Risk percentage, level classification and fork check
pub mod risk;

// Orchestration & Output
/// Pipeline-level endpoint fallback
pub mod pipeline;
/// Job sequencing and exit status
pub mod orchestrator;
/// Snapshot schema and writer
pub mod snapshot;

// Infrastructure
/// Retry with exponential backoff
pub mod retry;
/// Configuration management
pub mod settings;
/// General utilities
pub mod utils;

// Re-exports for convenience
pub use chain::DisputeChain;
pub use orchestrator::{ForkRiskJob, JobOutcome};
pub use risk::RiskLevel;
pub use settings::Settings;
pub use snapshot::RiskSnapshot;
