//! Chain JSON-RPC client
//!
//! Talks to the node for one chain at a time, resolved from the closed
//! endpoint table in [`crate::config::RpcConfig`]. Single calls are never
//! retried; only the receipt-polling loop repeats lookups, and only while the
//! transaction is not yet mined.

mod client;
mod quantity;
mod receipt;
mod transport;

pub use client::{RpcClient, MIN_CONFIRMATION_TIMEOUT, MIN_POLL_INTERVAL};
pub use quantity::{decimal_to_hex, hex_to_decimal, parse_hex_quantity, parse_hex_u64};
pub use receipt::{Confirmation, Receipt};
pub use transport::{HttpTransport, JsonRpcRequest, RpcTransport};

/// Error type for chain RPC operations
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(u64),

    #[error("Invalid RPC endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid JSON-RPC response: {0}")]
    InvalidResponse(String),

    #[error("RPC endpoint returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    RpcFailure { code: i64, message: String },

    #[error("Invalid hex quantity: {0:?}")]
    InvalidHexQuantity(String),

    #[error("Invalid decimal quantity: {0:?}")]
    InvalidDecimalQuantity(String),

    #[error("Invalid receipt field {field}: {reason}")]
    InvalidReceiptField { field: &'static str, reason: String },

    #[error("Timed out waiting for confirmation of {tx_hash}")]
    ConfirmationTimeout { tx_hash: String },

    #[error("Transaction {tx_hash} reverted in block {block_number}")]
    TransactionExecutionFailed { tx_hash: String, block_number: u64 },

    #[error("Confirmation wait cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for RpcError {
    fn from(error: reqwest::Error) -> Self {
        RpcError::Transport(error.to_string())
    }
}
