//! Key vault
//!
//! SECURITY: the vault is the only owner of the account secret.
//! - The secret is persisted through a [`SecretStore`] and never logged
//! - Decoded key material lives in zeroizing buffers
//! - [`KeyVault::load_secret`] is crate-internal and feeds the signer only

use super::SecretStore;
use alloy::hex;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use parking_lot::RwLock;
use secrecy::zeroize::Zeroizing;
use secrecy::SecretBox;
use std::sync::Arc;
use tracing::{info, warn};

const SECRET_TAG: &str = "account.secret";
const ADDRESS_TAG: &str = "account.address";

/// Raw 32-byte secp256k1 secret
pub type SecretBytes = SecretBox<[u8; 32]>;

/// Error type for key custody
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    #[error("No secret has been stored")]
    MissingSecret,

    #[error("No active account")]
    NoActiveAccount,

    #[error("Secure storage failure (code {code}): {reason}")]
    StorageFailure { code: i32, reason: String },
}

impl From<std::io::Error> for VaultError {
    fn from(error: std::io::Error) -> Self {
        VaultError::StorageFailure {
            code: error.raw_os_error().unwrap_or(-1),
            reason: error.to_string(),
        }
    }
}

/// Holds the single active account
pub struct KeyVault {
    store: Arc<dyn SecretStore>,
    cached_address: RwLock<Option<Address>>,
}

impl KeyVault {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            cached_address: RwLock::new(None),
        }
    }

    /// Generate a fresh account, replacing any previous one
    pub fn create_account(&self) -> Result<Address, VaultError> {
        let signer = PrivateKeySigner::random();
        let address = self.persist(&signer)?;
        info!(address = %address, "Created new account");
        Ok(address)
    }

    /// Import a hex-encoded secret (with or without 0x prefix)
    pub fn import_account(&self, encoded_secret: &str) -> Result<Address, VaultError> {
        let bytes = decode_secret(encoded_secret)?;
        let signer = PrivateKeySigner::from_slice(bytes.as_slice())
            .map_err(|e| VaultError::InvalidSecret(format!("not a valid signing key: {}", e)))?;
        let address = self.persist(&signer)?;
        info!(address = %address, "Imported account");
        Ok(address)
    }

    /// Address of the active account, derived from the stored secret on first use
    pub fn active_address(&self) -> Result<Address, VaultError> {
        if let Some(address) = *self.cached_address.read() {
            return Ok(address);
        }

        let secret = match self.store.read(SECRET_TAG)? {
            Some(bytes) => Zeroizing::new(bytes),
            None => return Err(VaultError::NoActiveAccount),
        };
        let signer = PrivateKeySigner::from_slice(secret.as_slice())
            .map_err(|e| VaultError::InvalidSecret(format!("stored secret is corrupt: {}", e)))?;
        let address = signer.address();

        *self.cached_address.write() = Some(address);
        Ok(address)
    }

    pub fn has_account(&self) -> Result<bool, VaultError> {
        Ok(self.store.read(SECRET_TAG)?.is_some())
    }

    pub(crate) fn load_secret(&self) -> Result<SecretBytes, VaultError> {
        let bytes = self
            .store
            .read(SECRET_TAG)?
            .map(Zeroizing::new)
            .ok_or(VaultError::MissingSecret)?;

        let array: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            VaultError::InvalidSecret(format!("stored secret has {} bytes", bytes.len()))
        })?;
        Ok(SecretBox::new(Box::new(array)))
    }

    /// Replace the stored account
    ///
    /// When the address record cannot be written the previous secret is put
    /// back. The cached address is dropped first and only set once both
    /// records are stored, so it always matches the stored secret.
    fn persist(&self, signer: &PrivateKeySigner) -> Result<Address, VaultError> {
        let secret = Zeroizing::new(signer.to_bytes().0);
        let address = signer.address();
        let previous = self.store.read(SECRET_TAG)?.map(Zeroizing::new);

        *self.cached_address.write() = None;
        self.store.write(SECRET_TAG, secret.as_slice())?;
        if let Err(e) = self
            .store
            .write(ADDRESS_TAG, address.to_checksum(None).as_bytes())
        {
            match &previous {
                Some(old) => {
                    if let Err(restore) = self.store.write(SECRET_TAG, old.as_slice()) {
                        warn!(error = %restore, "Failed to restore previous account secret");
                    }
                }
                None => warn!("Address record not written; new secret remains stored"),
            }
            return Err(e);
        }

        *self.cached_address.write() = Some(address);
        Ok(address)
    }
}

impl std::fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVault")
            .field("address", &*self.cached_address.read())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

fn decode_secret(encoded: &str) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    let trimmed = encoded.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = Zeroizing::new(
        hex::decode(trimmed).map_err(|e| VaultError::InvalidSecret(format!("not hex: {}", e)))?,
    );
    if bytes.len() != 32 {
        return Err(VaultError::InvalidSecret(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}
