// Contracts Module - Augur v2 read-only ABIs and the contract client loader

pub mod augur;
pub mod i_augur;
pub mod i_market;
pub mod i_universe;
pub mod manifest;

use anyhow::Result;

use crate::chain::DisputeChain;
use crate::rpc_pool::RpcConnection;

// Public exports
pub use augur::{AugurContracts, ManifestContractLoader};
pub use i_augur::IAugur;
pub use i_market::IMarket;
pub use i_universe::IUniverse;
pub use manifest::{ContractManifest, ManifestError};

/// Turns a live connection into callable contract handles.
///
/// A failure here is fatal for the current endpoint attempt only; the fallback
/// wrapper moves on to the next endpoint.
pub trait ContractLoader<C>: Send + Sync {
    type Chain: DisputeChain;

    fn load(&self, connection: &RpcConnection<C>) -> Result<Self::Chain>;
}
