//! RPC endpoint configuration
//!
//! The chain table is closed: only the chains listed in [`chains`] have
//! endpoints, and an unknown chain id is rejected rather than defaulted.
//! URLs for known chains can be replaced:
//! 1. Per-chain env vars (ETH_RPC_URL, ARBITRUM_RPC_URL, etc.) - highest priority
//! 2. ALCHEMY_API_KEY - builds URLs for the chains Alchemy serves
//! 3. Public RPC fallbacks - for testing only
//!
//! # Examples
//!
//! ```bash
//! export ETH_RPC_URL="https://eth-mainnet.g.alchemy.com/v2/YOUR_KEY"
//! export SEPOLIA_RPC_URL="http://127.0.0.1:8545"
//! ```

use crate::rpc::RpcError;
use std::collections::BTreeMap;
use url::Url;

/// RPC configuration for multiple chains
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// RPC URLs indexed by chain ID
    urls: BTreeMap<u64, String>,
    /// Replacements shown to callers for URLs that embed a provider key
    shared: BTreeMap<u64, String>,
}

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const OPTIMISM: u64 = 10;
    pub const POLYGON: u64 = 137;
    pub const BASE: u64 = 8453;
    pub const ARBITRUM: u64 = 42161;
    pub const SEPOLIA: u64 = 11155111;

    pub const ALL: [u64; 6] = [ETHEREUM, OPTIMISM, POLYGON, BASE, ARBITRUM, SEPOLIA];
}

/// Environment variable names, one per known chain
const CHAIN_ENV_VARS: [(u64, &str); 6] = [
    (chains::ETHEREUM, "ETH_RPC_URL"),
    (chains::OPTIMISM, "OPTIMISM_RPC_URL"),
    (chains::POLYGON, "POLYGON_RPC_URL"),
    (chains::BASE, "BASE_RPC_URL"),
    (chains::ARBITRUM, "ARBITRUM_RPC_URL"),
    (chains::SEPOLIA, "SEPOLIA_RPC_URL"),
];

const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";

/// Public RPC endpoints (rate limited, for testing only)
fn public_rpc(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        chains::ETHEREUM => Some("https://eth.llamarpc.com"),
        chains::OPTIMISM => Some("https://mainnet.optimism.io"),
        chains::POLYGON => Some("https://polygon-rpc.com"),
        chains::BASE => Some("https://mainnet.base.org"),
        chains::ARBITRUM => Some("https://arb1.arbitrum.io/rpc"),
        chains::SEPOLIA => Some("https://rpc.sepolia.org"),
        _ => None,
    }
}

fn alchemy_subdomain(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        chains::ETHEREUM => Some("eth-mainnet"),
        chains::OPTIMISM => Some("opt-mainnet"),
        chains::POLYGON => Some("polygon-mainnet"),
        chains::BASE => Some("base-mainnet"),
        chains::ARBITRUM => Some("arb-mainnet"),
        chains::SEPOLIA => Some("eth-sepolia"),
        _ => None,
    }
}

impl RpcConfig {
    /// Create RPC config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let alchemy_key = lookup(ALCHEMY_API_KEY);
        let mut urls = BTreeMap::new();
        let mut shared = BTreeMap::new();

        for (chain_id, var) in CHAIN_ENV_VARS {
            if let Some(url) = lookup(var) {
                tracing::debug!(chain_id, var, "Using RPC URL from environment");
                urls.insert(chain_id, url);
            } else if let (Some(key), Some(sub)) = (&alchemy_key, alchemy_subdomain(chain_id)) {
                urls.insert(chain_id, format!("https://{}.g.alchemy.com/v2/{}", sub, key));
                if let Some(url) = public_rpc(chain_id) {
                    shared.insert(chain_id, url.to_string());
                }
            } else if let Some(url) = public_rpc(chain_id) {
                if chain_id == chains::ETHEREUM {
                    tracing::warn!("No RPC configured for Ethereum, using public RPC (rate limited)");
                }
                urls.insert(chain_id, url.to_string());
            }
        }

        Self { urls, shared }
    }

    /// Create with explicit RPC URLs
    ///
    /// The given map becomes the whole table: chains not in it are unsupported.
    pub fn with_urls(urls: impl IntoIterator<Item = (u64, String)>) -> Self {
        Self {
            urls: urls.into_iter().collect(),
            shared: BTreeMap::new(),
        }
    }

    /// Get RPC URL for a chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.as_str())
    }

    /// Resolve and parse the endpoint for a chain
    pub fn endpoint(&self, chain_id: u64) -> Result<Url, RpcError> {
        let raw = self
            .get(chain_id)
            .ok_or(RpcError::UnsupportedChain(chain_id))?;
        parse_endpoint(raw)
    }

    /// Endpoint that can be handed to untrusted callers
    ///
    /// Userinfo, query, and fragment are dropped. A URL built from
    /// ALCHEMY_API_KEY is replaced by the chain's public RPC.
    pub fn shared_endpoint(&self, chain_id: u64) -> Result<Url, RpcError> {
        let mut url = self.endpoint(chain_id)?;
        if let Some(public) = self.shared.get(&chain_id) {
            return parse_endpoint(public);
        }
        // Only fails for cannot-be-a-base URLs, which http(s) never are
        let _ = url.set_username("");
        let _ = url.set_password(None);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    /// Get all configured chain IDs
    pub fn chains(&self) -> impl Iterator<Item = &u64> {
        self.urls.keys()
    }

    /// Check if a chain is configured
    pub fn has_chain(&self, chain_id: u64) -> bool {
        self.urls.contains_key(&chain_id)
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, RpcError> {
    let url = Url::parse(raw).map_err(|e| RpcError::InvalidEndpoint(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RpcError::InvalidEndpoint(format!(
            "unsupported scheme {} in {}",
            other, raw
        ))),
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
