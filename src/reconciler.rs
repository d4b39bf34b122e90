//! # Dispute State Reconciler
//!
//! Folds the three dispute event streams into one aggregate per crowdsourcer and
//! reduces them to the currently active, non-finalized disputes.
//!
//! Processing is by event kind, not by chronology:
//!
//! 1. **Created** seeds an aggregate with the initial bond at round 1.
//! 2. **Contribution** overwrites the stake with the reported running total and the
//!    round with the reported round. A contribution whose creation fell outside the
//!    window seeds the aggregate itself.
//! 3. **Completed** marks the aggregate completed.
//!
//! Because creation is applied before any contribution, a creation event that sorts
//! after a contribution for the same crowdsourcer never resets the stake back to the
//! initial bond.

use ethers::types::{Address, U256};
use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::chain::DisputeChain;
use crate::event_scanner::ScanResult;
use crate::settings::Risk;
use crate::utils::{address_to_string, short_address, wei_to_tokens};

const SECONDS_PER_DAY: u64 = 86_400;

/// Per-crowdsourcer state rebuilt from the lookback window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisputeAggregate {
    pub market: Address,
    /// Cumulative stake, REP wei.
    pub stake: U256,
    pub round: u64,
    pub completed: bool,
    /// Latest contribution timestamp (unix seconds).
    pub last_contribution: Option<u64>,
}

/// A dispute that survived the completed / finalized filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDispute {
    pub crowdsourcer: Address,
    pub market: Address,
    pub stake: U256,
    pub round: u64,
    pub last_contribution: Option<u64>,
}

/// Output-facing description of one active dispute.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisputeDetail {
    pub market_id: String,
    pub title: String,
    /// REP.
    pub stake_size: f64,
    pub round: u64,
    pub days_remaining: u64,
}

/// Result of reconciliation: the risk input plus the tracked survivors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisputeSummary {
    /// Largest active stake (REP wei); zero with no active disputes.
    pub largest_stake: U256,
    /// Number of active disputes before truncation.
    pub active_count: usize,
    /// Survivors sorted descending by stake, truncated to the tracked cap.
    pub tracked: Vec<ActiveDispute>,
}

/// Steps 1-3: fold the streams into aggregates keyed by crowdsourcer, in
/// first-seen order.
pub fn fold_events(scan: &ScanResult) -> IndexMap<Address, DisputeAggregate> {
    let mut aggregates: IndexMap<Address, DisputeAggregate> = IndexMap::new();

    for created in &scan.created {
        aggregates.insert(
            created.crowdsourcer,
            DisputeAggregate {
                market: created.market,
                stake: created.size,
                round: 1,
                completed: false,
                last_contribution: None,
            },
        );
    }

    for contribution in &scan.contributions {
        let aggregate = aggregates
            .entry(contribution.crowdsourcer)
            .or_insert_with(|| DisputeAggregate {
                market: contribution.market,
                stake: contribution.current_stake,
                round: contribution.dispute_round,
                completed: false,
                last_contribution: None,
            });
        aggregate.stake = contribution.current_stake;
        aggregate.round = contribution.dispute_round;
        aggregate.last_contribution = Some(
            aggregate
                .last_contribution
                .map_or(contribution.timestamp, |t| t.max(contribution.timestamp)),
        );
    }

    for completed in &scan.completed {
        if let Some(aggregate) = aggregates.get_mut(&completed.crowdsourcer) {
            aggregate.completed = true;
        }
    }

    aggregates
}

/// Steps 4-5: drop completed and finalized disputes, rank the rest.
///
/// A failed finalized check keeps the dispute: over-reporting risk is preferred
/// to under-reporting it.
pub async fn summarize_active<D: DisputeChain + ?Sized>(
    chain: &D,
    aggregates: IndexMap<Address, DisputeAggregate>,
    max_tracked: usize,
) -> DisputeSummary {
    let total = aggregates.len();
    let mut active = Vec::new();

    for (crowdsourcer, aggregate) in aggregates {
        if aggregate.completed {
            debug!("[Reconciler] {:?} completed, excluded", crowdsourcer);
            continue;
        }

        match chain.is_market_finalized(aggregate.market).await {
            Ok(true) => {
                debug!(
                    "[Reconciler] Market {:?} finalized, excluding {:?}",
                    aggregate.market, crowdsourcer
                );
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(
                    "⚠️ [Reconciler] Finalized check failed for market {:?}, keeping dispute: {:#}",
                    aggregate.market, e
                );
            }
        }

        active.push(ActiveDispute {
            crowdsourcer,
            market: aggregate.market,
            stake: aggregate.stake,
            round: aggregate.round,
            last_contribution: aggregate.last_contribution,
        });
    }

    let summary = rank_active(active, max_tracked);
    info!(
        "✅ [Reconciler] {} aggregates, {} active, largest stake {:.2} REP",
        total,
        summary.active_count,
        wei_to_tokens(summary.largest_stake)
    );
    summary
}

/// Sorts descending by stake (ties by crowdsourcer address) and truncates.
pub fn rank_active(mut active: Vec<ActiveDispute>, max_tracked: usize) -> DisputeSummary {
    active.sort_by(|a, b| {
        b.stake
            .cmp(&a.stake)
            .then_with(|| a.crowdsourcer.cmp(&b.crowdsourcer))
    });
    let active_count = active.len();
    active.truncate(max_tracked);

    DisputeSummary {
        largest_stake: active.first().map(|d| d.stake).unwrap_or_default(),
        active_count,
        tracked: active,
    }
}

/// Full reconciliation of one scan.
pub async fn reconcile<D: DisputeChain + ?Sized>(
    chain: &D,
    scan: &ScanResult,
    risk: &Risk,
) -> DisputeSummary {
    let aggregates = fold_events(scan);
    summarize_active(chain, aggregates, risk.max_tracked_disputes).await
}

impl ActiveDispute {
    /// Whole days left in the current dispute window, rounded up, never negative.
    /// Without a contribution timestamp the full window is reported.
    pub fn days_remaining(&self, now_unix: u64, window_days: u64) -> u64 {
        let window = window_days.saturating_mul(SECONDS_PER_DAY);
        match self.last_contribution {
            Some(ts) => {
                let ends_at = ts.saturating_add(window);
                let left = ends_at.saturating_sub(now_unix);
                (left + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
            }
            None => window_days,
        }
    }

    pub fn to_detail(&self, now_unix: u64, window_days: u64) -> DisputeDetail {
        DisputeDetail {
            market_id: address_to_string(self.market),
            title: format!("Dispute on market {}", short_address(self.market)),
            stake_size: wei_to_tokens(self.stake),
            round: self.round,
            days_remaining: self.days_remaining(now_unix, window_days),
        }
    }
}

impl DisputeSummary {
    /// The first `max_reported` tracked disputes as output records.
    pub fn details(&self, max_reported: usize, now_unix: u64, window_days: u64) -> Vec<DisputeDetail> {
        self.tracked
            .iter()
            .take(max_reported)
            .map(|d| d.to_detail(now_unix, window_days))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{
        CrowdsourcerCompleted, CrowdsourcerContribution, CrowdsourcerCreated, EventPosition,
    };
    use crate::events::DisputeEventKind;
    use crate::utils::tokens_to_wei;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct MarketStatus {
        finalized: HashSet<Address>,
        unreachable: HashSet<Address>,
    }

    impl MarketStatus {
        fn open() -> Self {
            Self {
                finalized: HashSet::new(),
                unreachable: HashSet::new(),
            }
        }
    }

    #[async_trait]
    impl DisputeChain for MarketStatus {
        async fn is_forking(&self) -> Result<bool> {
            Ok(false)
        }
        async fn forking_market(&self) -> Result<Address> {
            Ok(Address::zero())
        }
        async fn is_market_finalized(&self, market: Address) -> Result<bool> {
            if self.unreachable.contains(&market) {
                return Err(anyhow!("execution reverted"));
            }
            Ok(self.finalized.contains(&market))
        }
        async fn created_events(&self, _f: u64, _t: u64) -> Result<Vec<CrowdsourcerCreated>> {
            Err(anyhow!("{} not served", DisputeEventKind::Created))
        }
        async fn contribution_events(
            &self,
            _f: u64,
            _t: u64,
        ) -> Result<Vec<CrowdsourcerContribution>> {
            Err(anyhow!("{} not served", DisputeEventKind::Contribution))
        }
        async fn completed_events(&self, _f: u64, _t: u64) -> Result<Vec<CrowdsourcerCompleted>> {
            Err(anyhow!("{} not served", DisputeEventKind::Completed))
        }
    }

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn created(block: u64, crowdsourcer: u64, market: u64, bond: f64) -> CrowdsourcerCreated {
        CrowdsourcerCreated {
            position: EventPosition::new(block, 0),
            universe: Address::zero(),
            market: addr(market),
            crowdsourcer: addr(crowdsourcer),
            size: tokens_to_wei(bond),
            dispute_round: 1,
        }
    }

    fn contribution(
        block: u64,
        crowdsourcer: u64,
        market: u64,
        current_stake: f64,
        round: u64,
        timestamp: u64,
    ) -> CrowdsourcerContribution {
        CrowdsourcerContribution {
            position: EventPosition::new(block, 1),
            universe: Address::zero(),
            reporter: addr(999),
            market: addr(market),
            crowdsourcer: addr(crowdsourcer),
            amount_staked: tokens_to_wei(1.0),
            current_stake: tokens_to_wei(current_stake),
            stake_remaining: U256::zero(),
            dispute_round: round,
            timestamp,
        }
    }

    fn completed(block: u64, crowdsourcer: u64, market: u64) -> CrowdsourcerCompleted {
        CrowdsourcerCompleted {
            position: EventPosition::new(block, 2),
            universe: Address::zero(),
            market: addr(market),
            crowdsourcer: addr(crowdsourcer),
            dispute_round: 2,
            total_rep_staked_in_market: U256::zero(),
        }
    }

    #[test]
    fn test_contribution_replaces_stake_with_running_total() {
        let scan = ScanResult {
            created: vec![created(1, 10, 100, 1_000.0)],
            contributions: vec![
                contribution(2, 10, 100, 20_000.0, 2, 1_000),
                contribution(3, 10, 100, 50_000.0, 2, 2_000),
            ],
            ..Default::default()
        };

        let aggregates = fold_events(&scan);
        let agg = &aggregates[&addr(10)];
        assert_eq!(agg.stake, tokens_to_wei(50_000.0));
        assert_eq!(agg.round, 2);
        assert_eq!(agg.last_contribution, Some(2_000));
        assert!(!agg.completed);
    }

    #[test]
    fn test_contribution_without_creation_seeds_aggregate() {
        let scan = ScanResult {
            contributions: vec![contribution(5, 11, 101, 7_000.0, 3, 500)],
            ..Default::default()
        };

        let aggregates = fold_events(&scan);
        let agg = &aggregates[&addr(11)];
        assert_eq!(agg.market, addr(101));
        assert_eq!(agg.stake, tokens_to_wei(7_000.0));
        assert_eq!(agg.round, 3);
    }

    #[test]
    fn test_creation_after_contribution_in_merged_order_does_not_reset_stake() {
        // Creation sorts later than the contribution, but creation is still applied first.
        let scan = ScanResult {
            created: vec![created(50, 12, 102, 1_000.0)],
            contributions: vec![contribution(40, 12, 102, 30_000.0, 2, 100)],
            ..Default::default()
        };

        let agg = &fold_events(&scan)[&addr(12)];
        assert_eq!(agg.stake, tokens_to_wei(30_000.0));
        assert_eq!(agg.round, 2);
    }

    #[test]
    fn test_last_contribution_keeps_maximum_timestamp() {
        let scan = ScanResult {
            contributions: vec![
                contribution(1, 13, 103, 1.0, 1, 9_000),
                contribution(2, 13, 103, 2.0, 1, 4_000),
            ],
            ..Default::default()
        };
        let agg = &fold_events(&scan)[&addr(13)];
        assert_eq!(agg.last_contribution, Some(9_000));
        assert_eq!(agg.stake, tokens_to_wei(2.0));
    }

    #[test]
    fn test_completion_for_unknown_crowdsourcer_is_ignored() {
        let scan = ScanResult {
            completed: vec![completed(1, 77, 177)],
            ..Default::default()
        };
        assert!(fold_events(&scan).is_empty());
    }

    #[tokio::test]
    async fn test_completed_dispute_never_survives() {
        let scan = ScanResult {
            created: vec![created(1, 10, 100, 1_000.0), created(1, 20, 200, 1_000.0)],
            contributions: vec![contribution(2, 10, 100, 270_000.0, 5, 100)],
            completed: vec![completed(3, 10, 100)],
            ..Default::default()
        };

        let summary = reconcile(&MarketStatus::open(), &scan, &Risk::default()).await;
        assert_eq!(summary.active_count, 1);
        assert_eq!(summary.tracked[0].crowdsourcer, addr(20));
        assert_eq!(summary.largest_stake, tokens_to_wei(1_000.0));
    }

    #[tokio::test]
    async fn test_finalized_market_dropped_and_failed_check_kept() {
        let mut chain = MarketStatus::open();
        chain.finalized.insert(addr(100));
        chain.unreachable.insert(addr(200));

        let scan = ScanResult {
            created: vec![created(1, 10, 100, 5_000.0), created(1, 20, 200, 3_000.0)],
            ..Default::default()
        };

        let summary = reconcile(&chain, &scan, &Risk::default()).await;
        assert_eq!(summary.active_count, 1);
        assert_eq!(summary.tracked[0].market, addr(200));
    }

    #[tokio::test]
    async fn test_no_events_yields_empty_summary() {
        let summary = reconcile(&MarketStatus::open(), &ScanResult::default(), &Risk::default()).await;
        assert_eq!(summary, DisputeSummary::default());
        assert!(summary.largest_stake.is_zero());
    }

    #[test]
    fn test_rank_sorts_descending_and_caps() {
        let active: Vec<ActiveDispute> = (1..=12u64)
            .map(|i| ActiveDispute {
                crowdsourcer: addr(i),
                market: addr(100 + i),
                stake: tokens_to_wei((i * 37 % 13) as f64 * 1_000.0),
                round: 1,
                last_contribution: None,
            })
            .collect();

        let summary = rank_active(active, 10);
        assert_eq!(summary.active_count, 12);
        assert_eq!(summary.tracked.len(), 10);
        assert!(summary.tracked.windows(2).all(|w| w[0].stake >= w[1].stake));
        assert_eq!(summary.largest_stake, summary.tracked[0].stake);

        let details = summary.details(5, 0, 7);
        assert_eq!(details.len(), 5);
        assert!(details.windows(2).all(|w| w[0].stake_size >= w[1].stake_size));
    }

    #[tokio::test]
    async fn test_reconcile_is_deterministic() {
        let scan = ScanResult {
            created: vec![
                created(1, 10, 100, 2_000.0),
                created(2, 20, 200, 2_000.0),
                created(3, 30, 300, 9_000.0),
            ],
            contributions: vec![contribution(4, 20, 200, 4_000.0, 2, 10)],
            completed: vec![completed(5, 30, 300)],
            ..Default::default()
        };

        let chain = MarketStatus::open();
        let first = reconcile(&chain, &scan, &Risk::default()).await;
        let second = reconcile(&chain, &scan, &Risk::default()).await;
        assert_eq!(first, second);
    }

    #[test]
    fn test_days_remaining() {
        let dispute = ActiveDispute {
            crowdsourcer: addr(1),
            market: addr(2),
            stake: U256::zero(),
            round: 2,
            last_contribution: Some(1_000_000),
        };
        // 7-day window, 2.5 days elapsed → 4.5 days left → 5
        assert_eq!(dispute.days_remaining(1_000_000 + 216_000, 7), 5);
        assert_eq!(dispute.days_remaining(1_000_000 + 30 * 86_400, 7), 0);

        let fresh = ActiveDispute {
            last_contribution: None,
            ..dispute
        };
        assert_eq!(fresh.days_remaining(0, 7), 7);
    }

    #[test]
    fn test_detail_formatting() {
        let dispute = ActiveDispute {
            crowdsourcer: addr(1),
            market: addr(0xabcd),
            stake: tokens_to_wei(50_000.0),
            round: 2,
            last_contribution: None,
        };
        let detail = dispute.to_detail(0, 7);
        assert_eq!(detail.market_id, "0x000000000000000000000000000000000000abcd");
        assert_eq!(detail.title, "Dispute on market 0x0000…abcd");
        assert_eq!(detail.stake_size, 50_000.0);
        assert_eq!(detail.round, 2);
    }
}
