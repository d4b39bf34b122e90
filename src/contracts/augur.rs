// Augur contract handle set: typed bindings for the universe and the Augur event
// registry, plus the `DisputeChain` implementation used in production.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::prelude::{Http, LogMeta, Middleware, Provider};
use ethers::types::{Address, H256, U256};
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;

use super::i_augur::{
    DisputeCrowdsourcerCompletedFilter, DisputeCrowdsourcerContributionFilter,
    DisputeCrowdsourcerCreatedFilter, IAugur,
};
use super::i_market::IMarket;
use super::i_universe::IUniverse;
use super::manifest::{ContractManifest, ManifestError, AUGUR, UNIVERSE};
use super::ContractLoader;
use crate::chain::DisputeChain;
use crate::events::{
    CrowdsourcerCompleted, CrowdsourcerContribution, CrowdsourcerCreated, EventPosition,
};
use crate::rpc_pool::RpcConnection;

/// Callable handles bound to one connection.
pub struct AugurContracts<M> {
    client: Arc<M>,
    universe_address: Address,
    pub universe: IUniverse<M>,
    pub augur: IAugur<M>,
}

impl<M: Middleware + 'static> AugurContracts<M> {
    /// Binds the manifest's `Universe` and `Augur` entries to `client`.
    pub fn bind(client: Arc<M>, manifest: &ContractManifest) -> Result<Self, ManifestError> {
        let universe_address = manifest.address(UNIVERSE)?;
        let augur_address = manifest.address(AUGUR)?;
        debug!(
            "[ContractLoader] Binding Universe={:?} Augur={:?} (manifest {} / {})",
            universe_address, augur_address, manifest.network, manifest.version
        );
        Ok(Self {
            universe: IUniverse::new(universe_address, client.clone()),
            augur: IAugur::new(augur_address, client.clone()),
            universe_address,
            client,
        })
    }

    pub fn universe_address(&self) -> Address {
        self.universe_address
    }

    fn universe_topic(&self) -> H256 {
        H256::from(self.universe_address)
    }
}

fn position(meta: &LogMeta) -> EventPosition {
    EventPosition::new(meta.block_number.as_u64(), meta.log_index.low_u64())
}

fn to_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.low_u64()
    }
}

impl From<(DisputeCrowdsourcerCreatedFilter, LogMeta)> for CrowdsourcerCreated {
    fn from((event, meta): (DisputeCrowdsourcerCreatedFilter, LogMeta)) -> Self {
        Self {
            position: position(&meta),
            universe: event.universe,
            market: event.market,
            crowdsourcer: event.dispute_crowdsourcer,
            size: event.size,
            dispute_round: to_u64(event.dispute_round),
        }
    }
}

impl From<(DisputeCrowdsourcerContributionFilter, LogMeta)> for CrowdsourcerContribution {
    fn from((event, meta): (DisputeCrowdsourcerContributionFilter, LogMeta)) -> Self {
        Self {
            position: position(&meta),
            universe: event.universe,
            reporter: event.reporter,
            market: event.market,
            crowdsourcer: event.dispute_crowdsourcer,
            amount_staked: event.amount_staked,
            current_stake: event.current_stake,
            stake_remaining: event.stake_remaining,
            dispute_round: to_u64(event.dispute_round),
            timestamp: to_u64(event.timestamp),
        }
    }
}

impl From<(DisputeCrowdsourcerCompletedFilter, LogMeta)> for CrowdsourcerCompleted {
    fn from((event, meta): (DisputeCrowdsourcerCompletedFilter, LogMeta)) -> Self {
        Self {
            position: position(&meta),
            universe: event.universe,
            market: event.market,
            crowdsourcer: event.dispute_crowdsourcer,
            dispute_round: to_u64(event.dispute_round),
            total_rep_staked_in_market: event.total_rep_staked_in_market,
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> DisputeChain for AugurContracts<M> {
    async fn is_forking(&self) -> Result<bool> {
        self.universe
            .is_forking()
            .call()
            .await
            .context("Universe.isForking call failed")
    }

    async fn forking_market(&self) -> Result<Address> {
        self.universe
            .get_forking_market()
            .call()
            .await
            .context("Universe.getForkingMarket call failed")
    }

    async fn is_market_finalized(&self, market: Address) -> Result<bool> {
        IMarket::new(market, self.client.clone())
            .is_finalized()
            .call()
            .await
            .with_context(|| format!("Market({:?}).isFinalized call failed", market))
    }

    async fn created_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CrowdsourcerCreated>> {
        let logs = self
            .augur
            .dispute_crowdsourcer_created_filter()
            .from_block(from_block)
            .to_block(to_block)
            .topic1(self.universe_topic())
            .query_with_meta()
            .await
            .with_context(|| {
                format!("eth_getLogs DisputeCrowdsourcerCreated [{}, {}]", from_block, to_block)
            })?;
        Ok(logs.into_iter().map(CrowdsourcerCreated::from).collect())
    }

    async fn contribution_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CrowdsourcerContribution>> {
        let logs = self
            .augur
            .dispute_crowdsourcer_contribution_filter()
            .from_block(from_block)
            .to_block(to_block)
            .topic1(self.universe_topic())
            .query_with_meta()
            .await
            .with_context(|| {
                format!(
                    "eth_getLogs DisputeCrowdsourcerContribution [{}, {}]",
                    from_block, to_block
                )
            })?;
        Ok(logs.into_iter().map(CrowdsourcerContribution::from).collect())
    }

    async fn completed_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CrowdsourcerCompleted>> {
        let logs = self
            .augur
            .dispute_crowdsourcer_completed_filter()
            .from_block(from_block)
            .to_block(to_block)
            .topic1(self.universe_topic())
            .query_with_meta()
            .await
            .with_context(|| {
                format!(
                    "eth_getLogs DisputeCrowdsourcerCompleted [{}, {}]",
                    from_block, to_block
                )
            })?;
        Ok(logs.into_iter().map(CrowdsourcerCompleted::from).collect())
    }
}

/// Loads the manifest from disk on every attempt and binds it to the attempt's provider.
#[derive(Debug, Clone)]
pub struct ManifestContractLoader {
    manifest_path: PathBuf,
}

impl ManifestContractLoader {
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
        }
    }
}

impl ContractLoader<Arc<Provider<Http>>> for ManifestContractLoader {
    type Chain = AugurContracts<Provider<Http>>;

    fn load(&self, connection: &RpcConnection<Arc<Provider<Http>>>) -> Result<Self::Chain> {
        let manifest = ContractManifest::load(&self.manifest_path)?;
        let contracts = AugurContracts::bind(connection.client.clone(), &manifest)
            .with_context(|| format!("Failed to bind contracts for {}", connection.endpoint))?;
        Ok(contracts)
    }
}
