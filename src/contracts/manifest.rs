//! Contract address manifest.
//!
//! The manifest is an external, versioned artifact (`config/augur-contracts.json` by
//! default) mapping contract names to deployed addresses:
//!
//! ```json
//! {
//!   "version": "v2",
//!   "network": "mainnet",
//!   "addresses": { "Universe": "0x...", "Augur": "0x..." }
//! }
//! ```
//!
//! The job only reads it; ABIs are compiled in via `abigen!`.

use ethers::types::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const UNIVERSE: &str = "Universe";
pub const AUGUR: &str = "Augur";

#[derive(Debug, Clone, Deserialize)]
pub struct ContractManifest {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub network: String,
    pub addresses: HashMap<String, String>,
}

impl ContractManifest {
    /// Reads and parses the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let raw = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw).map_err(|e| match e {
            ManifestError::Parse { source, .. } => ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(raw).map_err(|source| ManifestError::Parse {
            path: PathBuf::new(),
            source,
        })
    }

    /// Resolves a named contract to its address.
    pub fn address(&self, name: &str) -> Result<Address, ManifestError> {
        let raw = self
            .addresses
            .get(name)
            .ok_or_else(|| ManifestError::MissingContract(name.to_string()))?;
        let address = Address::from_str(raw.trim()).map_err(|_| ManifestError::InvalidAddress {
            name: name.to_string(),
            value: raw.clone(),
        })?;
        if address.is_zero() {
            return Err(ManifestError::InvalidAddress {
                name: name.to_string(),
                value: raw.clone(),
            });
        }
        Ok(address)
    }
}

/// Errores del manifest de contratos
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read contract manifest {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse contract manifest {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Contract {0} missing from manifest")]
    MissingContract(String),
    #[error("Invalid address for {name}: {value}")]
    InvalidAddress { name: String, value: String },
}
