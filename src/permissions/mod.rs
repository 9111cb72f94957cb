//! Capability permissions
//!
//! Every sensitive operation a caller can perform maps to one [`Capability`].
//! The [`PermissionManager`] is the only authority on whether a caller may
//! exercise it.

mod manager;

pub use manager::PermissionManager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of permissioned operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    ReadAddress,
    ReadChainConfig,
    SignMessage,
    SignTypedData,
    SendTransaction,
    NamespacedStorage,
    Network,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::ReadAddress,
        Capability::ReadChainConfig,
        Capability::SignMessage,
        Capability::SignTypedData,
        Capability::SendTransaction,
        Capability::NamespacedStorage,
        Capability::Network,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Capability::ReadAddress => "read-address",
            Capability::ReadChainConfig => "read-chain-config",
            Capability::SignMessage => "sign-message",
            Capability::SignTypedData => "sign-typed-data",
            Capability::SendTransaction => "send-transaction",
            Capability::NamespacedStorage => "namespaced-storage",
            Capability::Network => "network",
        }
    }

    /// Whether exercising the capability signs with the account key.
    pub fn is_signing(&self) -> bool {
        matches!(
            self,
            Capability::SignMessage | Capability::SignTypedData | Capability::SendTransaction
        )
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|cap| cap.name() == s)
            .ok_or_else(|| format!("unknown capability: {}", s))
    }
}

/// Tri-state permission status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionStatus {
    #[default]
    NotDetermined,
    Granted,
    Denied,
}

/// Snapshot of one (caller, capability) permission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub caller_id: String,
    pub capability: Capability,
    pub status: PermissionStatus,
    pub updated_at: DateTime<Utc>,
}

impl PermissionRecord {
    pub fn is_granted(&self) -> bool {
        self.status == PermissionStatus::Granted
    }
}

/// A caller asking to be granted one capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRequest {
    pub capability: Capability,
    /// Shown to the user when consent is asked
    #[serde(default)]
    pub reason: Option<String>,
}

impl CapabilityRequest {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
