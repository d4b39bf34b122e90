use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::env;
use std::path::Path;

/// Stake (in REP) at which a dispute escalates into a universe fork.
pub const FORK_THRESHOLD_REP: f64 = 275_000.0;
/// Lookback window; sized to exceed the per-round dispute window.
pub const LOOKBACK_DAYS: u64 = 7;
/// ~12s slots on Ethereum mainnet.
pub const BLOCKS_PER_DAY: u64 = 7_200;
/// Largest `eth_getLogs` range most public providers accept.
pub const CHUNK_SIZE_BLOCKS: u64 = 1_000;
pub const MAX_RETRY_ATTEMPTS: usize = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 1_000;

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    #[serde(default = "default_rpc_endpoints")]
    pub endpoints: Vec<String>,
    #[serde(default = "default_probe_timeout_seconds")]
    pub probe_timeout_seconds: u64,
}

fn default_rpc_endpoints() -> Vec<String> {
    vec![
        "https://eth.llamarpc.com".to_string(),
        "https://rpc.ankr.com/eth".to_string(),
        "https://ethereum-rpc.publicnode.com".to_string(),
        "https://cloudflare-eth.com".to_string(),
    ]
}
fn default_probe_timeout_seconds() -> u64 {
    10
}

impl Default for Rpc {
    fn default() -> Self {
        Self {
            endpoints: default_rpc_endpoints(),
            probe_timeout_seconds: default_probe_timeout_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Contracts {
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
}

fn default_manifest_path() -> String {
    "config/augur-contracts.json".to_string()
}

impl Default for Contracts {
    fn default() -> Self {
        Self {
            manifest_path: default_manifest_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Scan {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u64,
    #[serde(default = "default_blocks_per_day")]
    pub blocks_per_day: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
}

fn default_lookback_days() -> u64 {
    LOOKBACK_DAYS
}
fn default_blocks_per_day() -> u64 {
    BLOCKS_PER_DAY
}
fn default_chunk_size() -> u64 {
    CHUNK_SIZE_BLOCKS
}

impl Default for Scan {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            blocks_per_day: default_blocks_per_day(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Scan {
    /// Number of blocks covered by the lookback window.
    pub fn lookback_blocks(&self) -> u64 {
        self.lookback_days.saturating_mul(self.blocks_per_day)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Risk {
    #[serde(default = "default_fork_threshold")]
    pub fork_threshold: f64,
    #[serde(default = "default_max_tracked_disputes")]
    pub max_tracked_disputes: usize,
    #[serde(default = "default_max_reported_disputes")]
    pub max_reported_disputes: usize,
    #[serde(default = "default_dispute_window_days")]
    pub dispute_window_days: u64,
    #[serde(default = "default_fork_period_days")]
    pub fork_period_days: u64,
}

fn default_fork_threshold() -> f64 {
    FORK_THRESHOLD_REP
}
fn default_max_tracked_disputes() -> usize {
    10
}
fn default_max_reported_disputes() -> usize {
    5
}
fn default_dispute_window_days() -> u64 {
    7
}
fn default_fork_period_days() -> u64 {
    60
}

impl Default for Risk {
    fn default() -> Self {
        Self {
            fork_threshold: default_fork_threshold(),
            max_tracked_disputes: default_max_tracked_disputes(),
            max_reported_disputes: default_max_reported_disputes(),
            dispute_window_days: default_dispute_window_days(),
            fork_period_days: default_fork_period_days(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Retry {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> usize {
    MAX_RETRY_ATTEMPTS
}
fn default_base_delay_ms() -> u64 {
    RETRY_BASE_DELAY_MS
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Output {
    #[serde(default = "default_output_path")]
    pub path: String,
    /// Hint written to `nextUpdate`; matches the scheduler cadence.
    #[serde(default = "default_update_interval_minutes")]
    pub update_interval_minutes: i64,
}

fn default_output_path() -> String {
    "public/data/fork-risk.json".to_string()
}
fn default_update_interval_minutes() -> i64 {
    60
}

impl Default for Output {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            update_interval_minutes: default_update_interval_minutes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub rpc: Rpc,
    #[serde(default)]
    pub contracts: Contracts,
    #[serde(default)]
    pub scan: Scan,
    #[serde(default)]
    pub risk: Risk,
    #[serde(default)]
    pub retry: Retry,
    #[serde(default)]
    pub output: Output,
}

impl Settings {
    /// Loads `Config.toml` from the working directory if present.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Loads settings from an explicit file (required) or the optional default
    /// `Config.toml`, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let source = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name("Config.toml").required(false),
        };
        let s = Config::builder().add_source(source).build()?;

        let mut settings: Self = s.try_deserialize()?;

        if let Ok(raw_urls) = env::var("FORK_RISK_RPC_URLS") {
            if let Some(list) = parse_string_list(&raw_urls) {
                if !list.is_empty() {
                    settings.rpc.endpoints = list;
                }
            }
        }
        if let Ok(output) = env::var("FORK_RISK_OUTPUT_PATH") {
            let trimmed = output.trim();
            if !trimmed.is_empty() {
                settings.output.path = trimmed.to_string();
            }
        }
        if let Ok(manifest) = env::var("FORK_RISK_CONTRACTS_MANIFEST") {
            let trimmed = manifest.trim();
            if !trimmed.is_empty() {
                settings.contracts.manifest_path = trimmed.to_string();
            }
        }

        settings.validate();

        Ok(settings)
    }

    /// Clamps values that would stall or invert the pipeline.
    pub fn validate(&mut self) {
        self.scan.chunk_size = self.scan.chunk_size.max(1);
        self.retry.max_attempts = self.retry.max_attempts.max(1);
        self.risk.max_tracked_disputes = self.risk.max_tracked_disputes.max(1);
        self.risk.max_reported_disputes = self
            .risk
            .max_reported_disputes
            .min(self.risk.max_tracked_disputes);
        if !(self.risk.fork_threshold.is_finite() && self.risk.fork_threshold > 0.0) {
            self.risk.fork_threshold = FORK_THRESHOLD_REP;
        }
        self.rpc.endpoints.retain(|url| !url.trim().is_empty());
    }
}

/// Accepts either a JSON array or a comma separated list.
fn parse_string_list(input: &str) -> Option<Vec<String>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some(vec![]);
    }

    if trimmed.starts_with('[') {
        if let Ok(v) = serde_json::from_str::<Vec<String>>(trimmed) {
            return Some(v);
        }
        let without_brackets = trimmed.trim_start_matches('[').trim_end_matches(']');
        return Some(split_list(without_brackets));
    }

    Some(split_list(trimmed))
}

fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
