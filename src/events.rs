//! # Dispute Events
//!
//! Named schemas for the three dispute-crowdsourcer event streams emitted by the
//! Augur contract. Every field is decoded by name from the typed ABI bindings
//! (see `contracts::i_augur`), never by argument position.

use ethers::types::{Address, U256};
use std::fmt;

/// Location of a log inside the chain; orders events within a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EventPosition {
    pub block_number: u64,
    pub log_index: u64,
}

impl EventPosition {
    pub fn new(block_number: u64, log_index: u64) -> Self {
        Self {
            block_number,
            log_index,
        }
    }
}

/// The three categorically distinct streams the scanner queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisputeEventKind {
    Created,
    Contribution,
    Completed,
}

impl DisputeEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeEventKind::Created => "DisputeCrowdsourcerCreated",
            DisputeEventKind::Contribution => "DisputeCrowdsourcerContribution",
            DisputeEventKind::Completed => "DisputeCrowdsourcerCompleted",
        }
    }
}

impl fmt::Display for DisputeEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `DisputeCrowdsourcerCreated`: a new crowdsourcer opened against a market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrowdsourcerCreated {
    pub position: EventPosition,
    pub universe: Address,
    pub market: Address,
    pub crowdsourcer: Address,
    /// Bond size required to fill the crowdsourcer (REP wei).
    pub size: U256,
    pub dispute_round: u64,
}

/// `DisputeCrowdsourcerContribution`: stake added to a crowdsourcer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrowdsourcerContribution {
    pub position: EventPosition,
    pub universe: Address,
    pub reporter: Address,
    pub market: Address,
    pub crowdsourcer: Address,
    pub amount_staked: U256,
    /// Running total staked on the crowdsourcer after this contribution.
    pub current_stake: U256,
    pub stake_remaining: U256,
    pub dispute_round: u64,
    /// Unix seconds, as reported by the contract.
    pub timestamp: u64,
}

/// `DisputeCrowdsourcerCompleted`: the crowdsourcer filled its bond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrowdsourcerCompleted {
    pub position: EventPosition,
    pub universe: Address,
    pub market: Address,
    pub crowdsourcer: Address,
    pub dispute_round: u64,
    pub total_rep_staked_in_market: U256,
}

/// Sorts a stream by `(block_number, log_index)`; stable for equal positions.
pub fn sort_by_position<T, F>(events: &mut [T], position: F)
where
    F: Fn(&T) -> EventPosition,
{
    events.sort_by_key(|e| position(e));
}
