//! Value objects shared across the runtime, broker, and signing pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a caller: an installed module or a web origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub id: String,
    pub version: String,
}

impl CallerIdentity {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }

    /// Identity used for callers reached through the external bridge.
    pub fn web_origin(origin: impl Into<String>) -> Self {
        Self::new(origin, "web")
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

/// A request to transfer value and/or call a contract.
///
/// All numeric fields are decimal strings; they are parsed (and rejected
/// field by field) by the signer, never by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Who asked for the transfer
    pub caller: CallerIdentity,
    /// Sender; `None` means the vault's active account
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
    /// Value in wei
    pub value: String,
    /// Hex calldata, with or without 0x prefix
    #[serde(default)]
    pub data: Option<String>,
    pub chain_id: u64,
    #[serde(default)]
    pub gas_limit: Option<String>,
    /// Legacy gas price in wei
    #[serde(default)]
    pub gas_price: Option<String>,
}

impl TransferRequest {
    /// Plain value transfer from the active account.
    pub fn new(
        caller: CallerIdentity,
        to: impl Into<String>,
        value: impl Into<String>,
        chain_id: u64,
    ) -> Self {
        Self {
            caller,
            from: None,
            to: to.into(),
            value: value.into(),
            data: None,
            chain_id,
            gas_limit: None,
            gas_price: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_gas(mut self, gas_limit: impl Into<String>, gas_price: impl Into<String>) -> Self {
        self.gas_limit = Some(gas_limit.into());
        self.gas_price = Some(gas_price.into());
        self
    }

    /// Calldata, treating an empty or bare "0x" string as no calldata.
    pub fn calldata(&self) -> Option<&str> {
        self.data
            .as_deref()
            .filter(|d| !d.is_empty() && *d != "0x")
    }
}

/// Active chain as reported to callers with read-chain-config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calldata_ignores_empty_payloads() {
        let caller = CallerIdentity::new("wallet", "1.0.0");
        let base = TransferRequest::new(caller, "0x01", "0", 1);
        assert_eq!(base.calldata(), None);
        assert_eq!(base.clone().with_data("0x").calldata(), None);
        assert_eq!(base.with_data("0xabcd").calldata(), Some("0xabcd"));
    }

    #[test]
    fn transfer_request_deserializes_optional_fields() {
        let value = serde_json::json!({
            "caller": { "id": "https://dapp.example", "version": "web" },
            "to": "0x0000000000000000000000000000000000000001",
            "value": "1000",
            "chain_id": 1
        });
        let parsed: TransferRequest = serde_json::from_value(value).expect("parse request");
        assert!(parsed.from.is_none());
        assert!(parsed.gas_limit.is_none());
        assert_eq!(parsed.caller, CallerIdentity::web_origin("https://dapp.example"));
    }
}
