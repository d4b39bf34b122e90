//! # Event Ingestion Scanner
//!
//! Walks the lookback window in fixed-size block chunks and collects the three
//! dispute-crowdsourcer event streams.
//!
//! ## Behaviour
//!
//! - **Window**: `current_block - lookback_days * blocks_per_day` up to `current_block`
//! - **Chunking**: `chunk_size` blocks per `eth_getLogs` range, walked oldest first
//! - **Best effort**: if any of the three queries for a chunk fails, the chunk is logged
//!   and skipped as a unit so the streams stay consistent with each other
//! - **Ordering**: each stream is returned sorted by `(block_number, log_index)`
//!
//! A window in which every chunk failed is not a degraded scan but a broken endpoint;
//! that case is returned as `ScanError::AllChunksFailed` so the caller can fall back.

use anyhow::Result;
use log::{debug, info, warn};

use crate::chain::DisputeChain;
use crate::events::{
    sort_by_position, CrowdsourcerCompleted, CrowdsourcerContribution, CrowdsourcerCreated,
};
use crate::settings::Scan;
use crate::utils::create_block_chunks;

/// Decoded streams plus scan statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub from_block: u64,
    pub to_block: u64,
    pub created: Vec<CrowdsourcerCreated>,
    pub contributions: Vec<CrowdsourcerContribution>,
    pub completed: Vec<CrowdsourcerCompleted>,
    pub chunks_total: usize,
    pub chunks_failed: usize,
}

impl ScanResult {
    pub fn event_count(&self) -> usize {
        self.created.len() + self.contributions.len() + self.completed.len()
    }
}

/// Errores del scanner de eventos
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("All {chunks} log-query chunks failed for blocks {from_block}..={to_block}")]
    AllChunksFailed {
        chunks: usize,
        from_block: u64,
        to_block: u64,
    },
}

/// First block of the lookback window ending at `current_block`.
pub fn window_start(current_block: u64, scan: &Scan) -> u64 {
    current_block.saturating_sub(scan.lookback_blocks())
}

/// Scans `[window_start(current_block), current_block]` for dispute events.
pub async fn scan_dispute_events<D: DisputeChain + ?Sized>(
    chain: &D,
    current_block: u64,
    scan: &Scan,
) -> Result<ScanResult, ScanError> {
    let from_block = window_start(current_block, scan);
    let chunks = create_block_chunks(from_block, current_block, scan.chunk_size);

    info!(
        "🔍 [EventScanner] Scanning blocks {}..={} in {} chunks of {}",
        from_block,
        current_block,
        chunks.len(),
        scan.chunk_size
    );

    let mut result = ScanResult {
        from_block,
        to_block: current_block,
        chunks_total: chunks.len(),
        ..Default::default()
    };

    for (chunk_from, chunk_to) in chunks {
        match scan_chunk(chain, chunk_from, chunk_to).await {
            Ok((created, contributions, completed)) => {
                if !created.is_empty() || !contributions.is_empty() || !completed.is_empty() {
                    debug!(
                        "[EventScanner] Blocks {}..={}: {} created, {} contributions, {} completed",
                        chunk_from,
                        chunk_to,
                        created.len(),
                        contributions.len(),
                        completed.len()
                    );
                }
                result.created.extend(created);
                result.contributions.extend(contributions);
                result.completed.extend(completed);
            }
            Err(e) => {
                result.chunks_failed += 1;
                warn!(
                    "⚠️ [EventScanner] Skipping blocks {}..={}: {:#}",
                    chunk_from, chunk_to, e
                );
            }
        }
    }

    if result.chunks_total > 0 && result.chunks_failed == result.chunks_total {
        return Err(ScanError::AllChunksFailed {
            chunks: result.chunks_total,
            from_block,
            to_block: current_block,
        });
    }

    sort_by_position(&mut result.created, |e| e.position);
    sort_by_position(&mut result.contributions, |e| e.position);
    sort_by_position(&mut result.completed, |e| e.position);

    info!(
        "✅ [EventScanner] Found {} created, {} contributions, {} completed ({} of {} chunks skipped)",
        result.created.len(),
        result.contributions.len(),
        result.completed.len(),
        result.chunks_failed,
        result.chunks_total
    );

    Ok(result)
}

type ChunkEvents = (
    Vec<CrowdsourcerCreated>,
    Vec<CrowdsourcerContribution>,
    Vec<CrowdsourcerCompleted>,
);

async fn scan_chunk<D: DisputeChain + ?Sized>(
    chain: &D,
    from_block: u64,
    to_block: u64,
) -> Result<ChunkEvents> {
    let created = chain.created_events(from_block, to_block).await?;
    let contributions = chain.contribution_events(from_block, to_block).await?;
    let completed = chain.completed_events(from_block, to_block).await?;
    Ok((created, contributions, completed))
}
