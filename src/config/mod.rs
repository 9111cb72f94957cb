//! Configuration for the wallet broker

pub mod rpc;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// Re-export RPC config
pub use rpc::RpcConfig;

/// Receipt polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationSettings {
    /// Give up waiting for a receipt after this long (milliseconds)
    pub timeout_ms: u64,
    /// Delay between receipt lookups (milliseconds)
    pub poll_interval_ms: u64,
}

impl ConfirmationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ConfirmationSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 120_000,     // 2 minutes
            poll_interval_ms: 3_000, // roughly a quarter of a mainnet block
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chain reported to read-chain-config callers and used by default
    pub active_chain_id: u64,
    /// Receipt polling settings
    #[serde(default)]
    pub confirmation: ConfirmationSettings,
    /// Directory holding the account secret
    #[serde(default)]
    pub vault_dir: Option<PathBuf>,
    /// Path to audit log file
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,
}

impl Config {
    /// Vault directory, falling back to `./vault`
    pub fn vault_dir(&self) -> PathBuf {
        self.vault_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("vault"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active_chain_id: rpc::chains::ETHEREUM,
            confirmation: ConfirmationSettings::default(),
            vault_dir: None,
            audit_log_path: Some(PathBuf::from("audit.jsonl")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserialize_defaults() {
        let value = serde_json::json!({ "active_chain_id": 11155111 });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.active_chain_id, rpc::chains::SEPOLIA);
        assert_eq!(parsed.confirmation.timeout_ms, 120_000);
        assert!(parsed.audit_log_path.is_none());
        assert_eq!(parsed.vault_dir(), PathBuf::from("vault"));
    }

    #[test]
    fn config_deserialize_explicit() {
        let value = serde_json::json!({
            "active_chain_id": 1,
            "confirmation": { "timeout_ms": 5000, "poll_interval_ms": 250 },
            "vault_dir": "/tmp/vault",
            "audit_log_path": "audit.jsonl"
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.confirmation.timeout(), Duration::from_secs(5));
        assert_eq!(parsed.confirmation.poll_interval(), Duration::from_millis(250));
        assert_eq!(parsed.vault_dir(), PathBuf::from("/tmp/vault"));
    }
}
