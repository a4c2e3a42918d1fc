//! Marketplace endpoints and contract binding.
//!
//! Load from: env `TRIPCOVER_CONFIG_PATH`, or `./config/tripcover.json`, or
//! `./tripcover.json`. Missing file or fields fall back to the built-in
//! defaults (the deployed testnet contract and its indexer subgraph).

use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_CONTRACT_ADDRESS: &str = "0x607ccf60493a51c61d86f4616e93014db9e32b77";
const DEFAULT_INDEXER_URL: &str =
    "https://api.studio.thegraph.com/query/87341/insurancetest/v0.0.4";
const DEFAULT_WALLET_RPC_URL: &str = "http://127.0.0.1:8545";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Marketplace contract address (hex, 0x-prefixed).
    #[serde(default = "default_contract_address")]
    pub contract_address: String,
    /// GraphQL endpoint of the event indexer.
    #[serde(default = "default_indexer_url")]
    pub indexer_url: String,
    /// JSON-RPC endpoint of the wallet holding the signing key.
    #[serde(default = "default_wallet_rpc_url")]
    pub wallet_rpc_url: String,
}

fn default_contract_address() -> String {
    DEFAULT_CONTRACT_ADDRESS.to_string()
}

fn default_indexer_url() -> String {
    DEFAULT_INDEXER_URL.to_string()
}

fn default_wallet_rpc_url() -> String {
    DEFAULT_WALLET_RPC_URL.to_string()
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            contract_address: default_contract_address(),
            indexer_url: default_indexer_url(),
            wallet_rpc_url: default_wallet_rpc_url(),
        }
    }
}

impl MarketConfig {
    /// Load config from path. Returns defaults on error or missing file.
    pub fn load_from_path(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Load config: env `TRIPCOVER_CONFIG_PATH`, then `./config/tripcover.json`,
    /// then `./tripcover.json`.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("TRIPCOVER_CONFIG_PATH") {
            let p = Path::new(&path);
            if p.exists() {
                return Self::load_from_path(p);
            }
        }
        for candidate in [
            Path::new("./config/tripcover.json"),
            Path::new("./tripcover.json"),
        ] {
            if candidate.exists() {
                return Self::load_from_path(candidate);
            }
        }
        Self::default()
    }
}
