//! Wallet Capability Broker
//!
//! Brokers access to one wallet account on behalf of untrusted callers:
//! installable modules and web dApps.
//! - Callers are registered by manifest and hold per-capability grants
//! - Every signing action is confirmed individually before it happens
//! - Legacy transactions are signed locally and broadcast over JSON-RPC
//! - Receipts are polled until the transaction is mined, reverted, or the
//!   wait times out
//!
//! # Security Model
//!
//! - The account secret never leaves the `wallet` module
//! - The permission manager is the only authority on capability access
//! - Full audit trail of broker invocations

pub mod audit;
pub mod bridge;
pub mod broker;
pub mod chain;
pub mod config;
pub mod confirmation;
pub mod permissions;
pub mod rpc;
pub mod runtime;
pub mod services;
pub mod types;
pub mod wallet;

mod error;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use bridge::{BridgeError, ExternalBridge, WireValue};
pub use broker::CapabilityBroker;
pub use config::{Config, RpcConfig};
pub use error::{Error, Result};
pub use permissions::{Capability, CapabilityRequest, PermissionManager, PermissionStatus};
pub use runtime::{ModuleManifest, ModuleRuntime, RuntimeContext};
pub use services::WalletServices;
pub use types::{CallerIdentity, ChainConfig, TransferRequest};
