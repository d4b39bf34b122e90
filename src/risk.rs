//! # Risk Classifier
//!
//! Maps the largest active dispute stake to a fork-threshold percentage and a
//! categorical level, and owns the protocol-wide fork check that short-circuits it.

use ethers::types::Address;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chain::DisputeChain;
use crate::retry::with_settings_retry;
use crate::settings::Settings;
use crate::utils::round2;

/// Categorical fork risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
    /// Only used by the error snapshot.
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
            RiskLevel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage and level for one computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    pub percentage: f64,
    pub level: RiskLevel,
}

/// `clamp(100 * stake / threshold, 0, 100)`, rounded to two decimals.
pub fn risk_percentage(largest_stake_rep: f64, fork_threshold_rep: f64) -> f64 {
    if fork_threshold_rep.is_nan() || fork_threshold_rep <= 0.0 || !largest_stake_rep.is_finite() {
        return if largest_stake_rep > 0.0 { 100.0 } else { 0.0 };
    }
    round2((100.0 * largest_stake_rep / fork_threshold_rep).clamp(0.0, 100.0))
}

/// Upper bounds are exclusive: 10, 25 and 75 belong to the next tier.
pub fn classify(percentage: f64) -> RiskLevel {
    if percentage < 10.0 {
        RiskLevel::Low
    } else if percentage < 25.0 {
        RiskLevel::Moderate
    } else if percentage < 75.0 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

/// Classifies the published (rounded) percentage so the two always agree.
pub fn assess(largest_stake_rep: f64, fork_threshold_rep: f64) -> RiskAssessment {
    let percentage = risk_percentage(largest_stake_rep, fork_threshold_rep);
    RiskAssessment {
        percentage,
        level: classify(percentage),
    }
}

/// The pinned result while the universe is forking.
pub fn fork_assessment() -> RiskAssessment {
    RiskAssessment {
        percentage: 100.0,
        level: RiskLevel::Critical,
    }
}

/// Checks `Universe.isForking()` under the retry policy.
///
/// KNOWN RISK: when the check still fails after every retry the job proceeds as if
/// the universe were not forking, so a transient RPC outage can mask a real fork.
/// Changing this to fail closed would change the published output.
pub async fn check_fork_state<D: DisputeChain + ?Sized>(chain: &D, settings: &Settings) -> bool {
    match with_settings_retry("universe.isForking", settings, || chain.is_forking()).await {
        Ok(forking) => {
            if forking {
                warn!("🚨 [RiskClassifier] Universe is FORKING");
            } else {
                info!("[RiskClassifier] Universe is not forking");
            }
            forking
        }
        Err(e) => {
            error!(
                "❌ [RiskClassifier] Fork-state check failed, assuming no fork (known risk): {:#}",
                e
            );
            false
        }
    }
}

/// Best-effort lookup of the market that triggered the fork.
pub async fn lookup_forking_market<D: DisputeChain + ?Sized>(
    chain: &D,
    settings: &Settings,
) -> Address {
    match with_settings_retry("universe.getForkingMarket", settings, || chain.forking_market()).await {
        Ok(market) => market,
        Err(e) => {
            warn!("⚠️ [RiskClassifier] Could not resolve forking market: {:#}", e);
            Address::zero()
        }
    }
}
