//! Key custody and signing
//!
//! This module handles private key storage and transaction signing.
//! The private key NEVER leaves this module: callers see addresses,
//! signatures, and signed transactions only.

mod signer;
mod store;
mod vault;

pub use signer::{
    sign_legacy_transaction, signature_hex, typed_data_hash, SecureSigner, SignedTransaction,
    SignerError, SigningPayload, SigningRequest, ValidatedTransfer,
};
pub use store::{FileSecretStore, MemorySecretStore, SecretStore};
pub use vault::{KeyVault, SecretBytes, VaultError};
