//! # Dispute Chain Seam
//!
//! `DisputeChain` is the read-only view of the Augur contracts the pipeline needs.
//! The production implementation is `contracts::AugurContracts` (typed ethers bindings);
//! tests drive the pipeline with in-memory implementations.
//!
//! Every method is a single network round trip. Retry policy is applied by the
//! caller (`retry::with_retry`), never inside an implementation.

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::Address;

use crate::events::{CrowdsourcerCompleted, CrowdsourcerContribution, CrowdsourcerCreated};

#[async_trait]
pub trait DisputeChain: Send + Sync {
    /// `Universe.isForking()`.
    async fn is_forking(&self) -> Result<bool>;

    /// `Universe.getForkingMarket()`; zero address when no fork is active.
    async fn forking_market(&self) -> Result<Address>;

    /// `Market.isFinalized()` for the given market.
    async fn is_market_finalized(&self, market: Address) -> Result<bool>;

    /// `DisputeCrowdsourcerCreated` logs in `[from_block, to_block]`.
    async fn created_events(&self, from_block: u64, to_block: u64)
        -> Result<Vec<CrowdsourcerCreated>>;

    /// `DisputeCrowdsourcerContribution` logs in `[from_block, to_block]`.
    async fn contribution_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CrowdsourcerContribution>>;

    /// `DisputeCrowdsourcerCompleted` logs in `[from_block, to_block]`.
    async fn completed_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CrowdsourcerCompleted>>;
}
