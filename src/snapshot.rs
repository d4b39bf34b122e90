//! # Risk Snapshot
//!
//! The single JSON artifact the job publishes. Consumers read it from a fixed path;
//! every run overwrites it completely, including failed runs, which publish the
//! error variant (`riskLevel: "unknown"` with a populated `error`).

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::reconciler::DisputeDetail;
use crate::risk::{RiskAssessment, RiskLevel};

/// How the numbers in a snapshot were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalculationMethod {
    EventReconciliation,
    ForkDetected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// REP.
    pub largest_dispute_bond: f64,
    pub fork_threshold_percent: f64,
    pub active_disputes: usize,
    pub dispute_details: Vec<DisputeDetail>,
}

impl Metrics {
    pub fn empty() -> Self {
        Self {
            largest_dispute_bond: 0.0,
            fork_threshold_percent: 0.0,
            active_disputes: 0,
            dispute_details: Vec::new(),
        }
    }
}

/// Which endpoint produced the snapshot. `endpoint` and `latency` are null on
/// the error variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcInfo {
    pub endpoint: Option<String>,
    /// Liveness probe latency, ms.
    pub latency: Option<u64>,
    pub fallbacks_attempted: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSnapshot {
    pub timestamp: String,
    pub block_number: u64,
    pub risk_level: RiskLevel,
    pub risk_percentage: f64,
    pub metrics: Metrics,
    pub next_update: String,
    pub rpc_info: RpcInfo,
    pub calculation: CalculationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl RiskSnapshot {
    /// Snapshot for a completed computation.
    pub fn computed(
        now: DateTime<Utc>,
        update_interval_minutes: i64,
        block_number: u64,
        assessment: RiskAssessment,
        metrics: Metrics,
        rpc_info: RpcInfo,
        calculation: CalculationMethod,
    ) -> Self {
        Self {
            timestamp: rfc3339(now),
            block_number,
            risk_level: assessment.level,
            risk_percentage: assessment.percentage,
            metrics,
            next_update: rfc3339(now + Duration::minutes(update_interval_minutes)),
            rpc_info,
            calculation,
            error: None,
        }
    }

    /// Error variant: level unknown, zeroed metrics, no endpoint.
    pub fn error(
        now: DateTime<Utc>,
        update_interval_minutes: i64,
        fallbacks_attempted: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: rfc3339(now),
            block_number: 0,
            risk_level: RiskLevel::Unknown,
            risk_percentage: 0.0,
            metrics: Metrics::empty(),
            next_update: rfc3339(now + Duration::minutes(update_interval_minutes)),
            rpc_info: RpcInfo {
                endpoint: None,
                latency: None,
                fallbacks_attempted,
            },
            calculation: CalculationMethod::Error,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Writes `snapshot` as pretty JSON to `path`, creating parent directories and
/// replacing any previous file.
pub fn write_snapshot(path: &Path, snapshot: &RiskSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }
    }
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;
    fs::write(path, json).with_context(|| format!("Failed to write snapshot to {:?}", path))?;
    info!(
        "💾 [SnapshotWriter] Wrote {} snapshot ({}, {:.2}%) to {:?}",
        if snapshot.is_error() { "error" } else { "risk" },
        snapshot.risk_level,
        snapshot.risk_percentage,
        path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_error_snapshot_shape() {
        let snapshot = RiskSnapshot::error(now(), 60, 4, "All 4 RPC endpoints failed");
        let json: Value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["riskLevel"], "unknown");
        assert_eq!(json["riskPercentage"], 0.0);
        assert_eq!(json["calculation"], "error");
        assert!(json["rpcInfo"]["endpoint"].is_null());
        assert!(json["rpcInfo"]["latency"].is_null());
        assert_eq!(json["rpcInfo"]["fallbacksAttempted"], 4);
        assert_eq!(json["metrics"]["activeDisputes"], 0);
        assert_eq!(json["metrics"]["disputeDetails"].as_array().unwrap().len(), 0);
        assert_eq!(json["error"], "All 4 RPC endpoints failed");
        assert_eq!(json["timestamp"], "2024-03-01T12:00:00.000Z");
        assert_eq!(json["nextUpdate"], "2024-03-01T13:00:00.000Z");
    }

    #[test]
    fn test_success_snapshot_omits_error_field() {
        let snapshot = RiskSnapshot::computed(
            now(),
            60,
            19_000_000,
            RiskAssessment {
                percentage: 18.18,
                level: RiskLevel::Moderate,
            },
            Metrics::empty(),
            RpcInfo {
                endpoint: Some("https://rpc.example".to_string()),
                latency: Some(120),
                fallbacks_attempted: 1,
            },
            CalculationMethod::EventReconciliation,
        );
        let json: Value = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["calculation"], "event-reconciliation");
        assert_eq!(json["blockNumber"], 19_000_000);
        assert_eq!(json["riskLevel"], "moderate");
    }

    #[test]
    fn test_write_creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public").join("data").join("fork-risk.json");

        let first = RiskSnapshot::error(now(), 60, 4, "first");
        write_snapshot(&path, &first).unwrap();

        let second = RiskSnapshot::error(now(), 60, 2, "second");
        write_snapshot(&path, &second).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains('\n'), "expected pretty-printed JSON");
        let parsed: RiskSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, second);
    }
}
