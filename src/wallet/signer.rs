//! Transaction encoding and signing
//!
//! SECURITY: signing keys only exist inside [`SecureSigner`], built from the
//! vault's secret for the duration of one signing operation.
//! - Keys are never serialized or logged
//! - `Debug` redacts the key
//! - Outputs are signatures, raw transactions, and hashes only

use super::SecretBytes;
use crate::types::{CallerIdentity, TransferRequest};
use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::dyn_abi::TypedData;
use alloy::eips::eip2718::Encodable2718;
use alloy::hex;
use alloy::primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::{Signature, SignerSync};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Error type for encoding and signing
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Invalid from address: {0}")]
    InvalidFromAddress(String),

    #[error("Invalid to address: {0}")]
    InvalidToAddress(String),

    #[error("Invalid signing key: {0}")]
    InvalidSecret(String),

    #[error("Invalid value: {0:?} is not a non-negative decimal integer")]
    InvalidValue(String),

    #[error("Invalid nonce: {0:?} is not a non-negative decimal integer")]
    InvalidNonce(String),

    #[error("Invalid gas price: {0:?} is not a non-negative decimal integer")]
    InvalidGasPrice(String),

    #[error("Invalid gas limit: {0:?} is not a non-negative decimal integer")]
    InvalidGasLimit(String),

    #[error("Invalid calldata: {0}")]
    InvalidData(String),

    #[error("Invalid typed data: {0}")]
    InvalidTypedData(String),

    #[error("Signing failed: {0}")]
    SignFailed(String),
}

/// A signed legacy transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// 0x-prefixed canonical encoding
    pub raw: String,
    /// keccak-256 of the signed encoding
    pub hash: String,
}

/// What a signing request asks the key to sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningPayload {
    /// EIP-191 personal message
    Message(String),
    /// EIP-712 typed data as JSON text
    TypedData(String),
}

/// A message signing request, tagged with the caller that asked for it
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub provenance: CallerIdentity,
    pub address: Address,
    pub chain_id: u64,
    pub payload: SigningPayload,
}

/// Transfer fields parsed out of a [`TransferRequest`]
///
/// Parsing happens before any network I/O so a malformed request never
/// reaches the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransfer {
    pub from: Option<Address>,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub chain_id: u64,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
}

impl ValidatedTransfer {
    pub fn parse(request: &TransferRequest) -> Result<Self, SignerError> {
        let from = request
            .from
            .as_deref()
            .map(|from| {
                Address::from_str(from)
                    .map_err(|e| SignerError::InvalidFromAddress(format!("{}: {}", from, e)))
            })
            .transpose()?;
        let to = Address::from_str(&request.to)
            .map_err(|e| SignerError::InvalidToAddress(format!("{}: {}", request.to, e)))?;
        let value = parse_decimal::<U256>(&request.value)
            .ok_or_else(|| SignerError::InvalidValue(request.value.clone()))?;
        let data = match request.calldata() {
            Some(data) => Bytes::from(
                hex::decode(data.strip_prefix("0x").unwrap_or(data))
                    .map_err(|e| SignerError::InvalidData(e.to_string()))?,
            ),
            None => Bytes::new(),
        };
        let gas_limit = request
            .gas_limit
            .as_deref()
            .map(|g| parse_decimal::<u64>(g).ok_or_else(|| SignerError::InvalidGasLimit(g.into())))
            .transpose()?;
        let gas_price = request
            .gas_price
            .as_deref()
            .map(|g| parse_decimal::<u128>(g).ok_or_else(|| SignerError::InvalidGasPrice(g.into())))
            .transpose()?;

        Ok(Self {
            from,
            to,
            value,
            data,
            chain_id: request.chain_id,
            gas_limit,
            gas_price,
        })
    }
}

/// Account key held for one signing operation
pub struct SecureSigner {
    signer: PrivateKeySigner,
    address: Address,
}

impl SecureSigner {
    pub(crate) fn from_secret(secret: &SecretBytes) -> Result<Self, SignerError> {
        let signer = PrivateKeySigner::from_slice(secret.expose_secret())
            .map_err(|e| SignerError::InvalidSecret(e.to_string()))?;
        let address = signer.address();
        Ok(Self { signer, address })
    }

    /// Get the public address (safe to share)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a personal message or typed data on behalf of `request.provenance`
    ///
    /// A message given as 0x-prefixed hex is signed as the decoded bytes.
    pub fn sign(&self, request: &SigningRequest) -> Result<Signature, SignerError> {
        if request.address != self.address {
            return Err(SignerError::InvalidFromAddress(format!(
                "request is for {} but the active key is {}",
                request.address, self.address
            )));
        }

        match &request.payload {
            SigningPayload::Message(message) => self
                .signer
                .sign_message_sync(&message_bytes(message))
                .map_err(|e| SignerError::SignFailed(e.to_string())),
            SigningPayload::TypedData(json) => self
                .signer
                .sign_hash_sync(&typed_data_hash(json)?)
                .map_err(|e| SignerError::SignFailed(e.to_string())),
        }
    }

    /// Build, sign, and encode an EIP-155 legacy transaction
    pub fn sign_legacy_transaction(
        &self,
        transfer: &ValidatedTransfer,
        nonce: u64,
        gas_price: u128,
        gas_limit: u64,
    ) -> Result<SignedTransaction, SignerError> {
        if let Some(from) = transfer.from {
            if from != self.address {
                return Err(SignerError::InvalidFromAddress(format!(
                    "{} is not the active account",
                    from
                )));
            }
        }

        let tx = TxLegacy {
            chain_id: Some(transfer.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(transfer.to),
            value: transfer.value,
            input: transfer.data.clone(),
        };

        let signature = self
            .signer
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|e| SignerError::SignFailed(e.to_string()))?;
        let envelope = TxEnvelope::Legacy(tx.into_signed(signature));
        let raw = envelope.encoded_2718();
        let hash = keccak256(&raw);

        Ok(SignedTransaction {
            raw: format!("0x{}", hex::encode(&raw)),
            hash: format!("{:#x}", hash),
        })
    }
}

// Implement Debug manually to avoid exposing the signer
impl std::fmt::Debug for SecureSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureSigner")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

/// Validate every input and sign a legacy transaction with `secret`
///
/// `nonce`, `gas_price`, and `gas_limit` are decimal strings as returned by
/// the RPC client; each is rejected with its own error kind.
pub fn sign_legacy_transaction(
    request: &TransferRequest,
    secret: &SecretBytes,
    nonce: &str,
    gas_price: &str,
    gas_limit: &str,
) -> Result<SignedTransaction, SignerError> {
    let transfer = ValidatedTransfer::parse(request)?;
    let signer = SecureSigner::from_secret(secret)?;
    let nonce = parse_decimal::<u64>(nonce).ok_or_else(|| SignerError::InvalidNonce(nonce.into()))?;
    let gas_price = parse_decimal::<u128>(gas_price)
        .ok_or_else(|| SignerError::InvalidGasPrice(gas_price.into()))?;
    let gas_limit = parse_decimal::<u64>(gas_limit)
        .ok_or_else(|| SignerError::InvalidGasLimit(gas_limit.into()))?;

    signer.sign_legacy_transaction(&transfer, nonce, gas_price, gas_limit)
}

/// EIP-712 signing hash of typed data given as JSON text
pub fn typed_data_hash(json: &str) -> Result<B256, SignerError> {
    let typed: TypedData =
        serde_json::from_str(json).map_err(|e| SignerError::InvalidTypedData(e.to_string()))?;
    typed
        .eip712_signing_hash()
        .map_err(|e| SignerError::InvalidTypedData(e.to_string()))
}

/// 65-byte `r || s || v` signature as 0x-hex
pub fn signature_hex(signature: &Signature) -> String {
    hex::encode_prefixed(signature.as_bytes())
}

/// Parse a non-negative decimal integer, rejecting signs, whitespace, and hex
fn parse_decimal<T: FromStr>(input: &str) -> Option<T> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    input.parse().ok()
}

fn message_bytes(message: &str) -> Vec<u8> {
    if let Some(stripped) = message.strip_prefix("0x") {
        if let Ok(bytes) = hex::decode(stripped) {
            return bytes;
        }
    }
    message.as_bytes().to_vec()
}
