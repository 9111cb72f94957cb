//! Error types for the wallet broker

use crate::bridge::BridgeError;
use crate::permissions::Capability;
use crate::rpc::RpcError;
use crate::wallet::{SignerError, VaultError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Caller not installed: {0}")]
    CallerNotInstalled(String),

    #[error("No route for path: {0}")]
    RouteNotFound(String),

    #[error("Permission denied: {caller} does not hold {capability}")]
    PermissionDenied {
        caller: String,
        capability: Capability,
    },

    #[error("Confirmation rejected: {reason}")]
    ConfirmationRejected { reason: String },

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
