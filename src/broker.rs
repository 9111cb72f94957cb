//! Capability broker
//!
//! One broker per caller. Every operation:
//! 1. checks the caller's grant synchronously, before any I/O
//! 2. validates its input locally
//! 3. asks the confirmation flow (signing operations only)
//! 4. talks to the vault, signer, and node
//!
//! Each invocation is written to the audit log when one is configured.

use crate::confirmation::{risk, ConfirmRequest, ConfirmationKind, ConfirmationSummary, Decision};
use crate::error::{Error, Result};
use crate::permissions::Capability;
use crate::services::WalletServices;
use crate::types::{CallerIdentity, ChainConfig, TransferRequest};
use crate::wallet::{
    sign_legacy_transaction, signature_hex, typed_data_hash, SecureSigner, SignerError,
    SigningPayload, SigningRequest, ValidatedTransfer,
};
use alloy::hex;
use alloy::primitives::Address;
use alloy::signers::Signature;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Longest message excerpt shown in a confirmation summary
const MESSAGE_PREVIEW_CHARS: usize = 200;

/// Performs wallet operations on behalf of one caller
#[derive(Debug, Clone)]
pub struct CapabilityBroker {
    caller: CallerIdentity,
    services: WalletServices,
}

impl CapabilityBroker {
    pub fn new(caller: CallerIdentity, services: WalletServices) -> Self {
        Self { caller, services }
    }

    pub fn caller(&self) -> &CallerIdentity {
        &self.caller
    }

    /// Active account address
    pub async fn read_address(&self) -> Result<Address> {
        self.invoke(
            Capability::ReadAddress,
            json!({}),
            async { self.services.vault.active_address().map_err(Error::from) },
            |address: &Address| json!(address.to_checksum(None)),
        )
        .await
    }

    /// Active chain id and endpoint
    pub async fn read_chain_config(&self) -> Result<ChainConfig> {
        self.invoke(
            Capability::ReadChainConfig,
            json!({}),
            async { self.services.chains.active_chain_config().map_err(Error::from) },
            |config: &ChainConfig| json!({"chain_id": config.chain_id}),
        )
        .await
    }

    /// EIP-191 personal signature over `message`
    ///
    /// A 0x-prefixed hex message is signed as the bytes it decodes to.
    pub async fn sign_message(&self, message: &str) -> Result<Signature> {
        self.invoke(
            Capability::SignMessage,
            json!({ "message": message }),
            self.sign_message_inner(message),
            |sig: &Signature| json!(signature_hex(sig)),
        )
        .await
    }

    /// EIP-712 signature over typed data given as JSON text
    pub async fn sign_typed_data(&self, typed_data: &str) -> Result<Signature> {
        self.invoke(
            Capability::SignTypedData,
            json!({ "typed_data": typed_data }),
            self.sign_typed_data_inner(typed_data),
            |sig: &Signature| json!(signature_hex(sig)),
        )
        .await
    }

    /// Sign a legacy transaction and broadcast it; returns the node's hash
    ///
    /// Malformed requests fail before confirmation and before any RPC call.
    /// Gas limit and gas price overrides skip the matching lookup.
    pub async fn send_transaction(&self, request: TransferRequest) -> Result<String> {
        let args = json!({
            "to": request.to,
            "value": request.value,
            "chain_id": request.chain_id,
            "data": request.data,
        });
        self.invoke(
            Capability::SendTransaction,
            args,
            self.send_transaction_inner(request),
            |hash: &String| json!(hash),
        )
        .await
    }

    async fn sign_message_inner(&self, message: &str) -> Result<Signature> {
        let address = self.services.vault.active_address()?;
        let chain = self.services.chains.active_chain_config()?;

        let summary = ConfirmationSummary::new("Sign message")
            .field("account", address.to_checksum(None))
            .field("message", preview(message));
        self.confirm(
            ConfirmRequest::new(
                self.caller.clone(),
                ConfirmationKind::SignMessage,
                chain.chain_id,
                summary,
            )
            .with_risks(risk::message_risks(message)),
        )
        .await?;

        self.sign(SigningRequest {
            provenance: self.caller.clone(),
            address,
            chain_id: chain.chain_id,
            payload: SigningPayload::Message(message.to_string()),
        })
    }

    async fn sign_typed_data_inner(&self, typed_data: &str) -> Result<Signature> {
        typed_data_hash(typed_data)?;
        let parsed: Value = serde_json::from_str(typed_data)?;
        let address = self.services.vault.active_address()?;
        let chain = self.services.chains.active_chain_config()?;

        let primary_type = parsed
            .get("primaryType")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let domain = parsed
            .get("domain")
            .and_then(|d| d.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let summary = ConfirmationSummary::new("Sign typed data")
            .field("account", address.to_checksum(None))
            .field("domain", domain)
            .field("primary type", primary_type);
        self.confirm(
            ConfirmRequest::new(
                self.caller.clone(),
                ConfirmationKind::SignTypedData,
                chain.chain_id,
                summary,
            )
            .with_risks(risk::typed_data_risks(&parsed, chain.chain_id)),
        )
        .await?;

        self.sign(SigningRequest {
            provenance: self.caller.clone(),
            address,
            chain_id: chain.chain_id,
            payload: SigningPayload::TypedData(typed_data.to_string()),
        })
    }

    async fn send_transaction_inner(&self, request: TransferRequest) -> Result<String> {
        let transfer = ValidatedTransfer::parse(&request)?;
        let chain_id = request.chain_id;
        self.services.rpc.endpoints().endpoint(chain_id)?;

        let active = self.services.vault.active_address()?;
        if let Some(from) = transfer.from {
            if from != active {
                return Err(SignerError::InvalidFromAddress(format!(
                    "{} is not the active account",
                    from
                ))
                .into());
            }
        }
        let from = active.to_checksum(None);

        let mut summary = ConfirmationSummary::new("Send transaction")
            .field("from", from.as_str())
            .field("to", transfer.to.to_checksum(None))
            .field("value (wei)", transfer.value.to_string());
        if !transfer.data.is_empty() {
            summary = summary.field("data", format!("{} bytes", transfer.data.len()));
        }
        if let Some(gas_limit) = transfer.gas_limit {
            summary = summary.field("gas limit", gas_limit.to_string());
        }
        if let Some(gas_price) = transfer.gas_price {
            summary = summary.field("gas price (wei)", gas_price.to_string());
        }
        self.confirm(
            ConfirmRequest::new(
                self.caller.clone(),
                ConfirmationKind::SendTransaction,
                chain_id,
                summary,
            )
            .with_risks(risk::transaction_risks(&transfer, active)),
        )
        .await?;

        let rpc = &self.services.rpc;
        let nonce = rpc.next_nonce(chain_id, &from).await?;
        let gas_price = match &request.gas_price {
            Some(price) => price.clone(),
            None => rpc.gas_price(chain_id).await?,
        };
        let gas_limit = match &request.gas_limit {
            Some(limit) => limit.clone(),
            None => {
                let data = (!transfer.data.is_empty())
                    .then(|| hex::encode_prefixed(&transfer.data));
                rpc.estimate_gas(
                    chain_id,
                    &from,
                    &transfer.to.to_checksum(None),
                    &transfer.value.to_string(),
                    data.as_deref(),
                )
                .await?
            }
        };
        debug!(chain_id, %nonce, %gas_price, %gas_limit, "Transaction parameters resolved");

        let secret = self.services.vault.load_secret()?;
        let signed = sign_legacy_transaction(&request, &secret, &nonce, &gas_price, &gas_limit)?;
        drop(secret);

        let tx_hash = rpc.send_raw_transaction(chain_id, &signed.raw).await?;
        if !tx_hash.eq_ignore_ascii_case(&signed.hash) {
            warn!(
                local_hash = %signed.hash,
                node_hash = %tx_hash,
                "Node returned a different transaction hash"
            );
        }
        info!(caller = %self.caller, chain_id, tx_hash = %tx_hash, "Transaction sent");
        Ok(tx_hash)
    }

    fn sign(&self, request: SigningRequest) -> Result<Signature> {
        let secret = self.services.vault.load_secret()?;
        let signer = SecureSigner::from_secret(&secret)?;
        Ok(signer.sign(&request)?)
    }

    async fn confirm(&self, request: ConfirmRequest) -> Result<()> {
        let request_id = request.id;
        let kind = request.kind;
        debug!(%request_id, ?kind, risks = request.risks.len(), "Requesting confirmation");

        match self.services.confirmation.confirm(request).await {
            Decision::Approved => Ok(()),
            Decision::Rejected { reason } => {
                info!(caller = %self.caller, %request_id, %reason, "Confirmation rejected");
                Err(Error::ConfirmationRejected { reason })
            }
        }
    }

    fn require(&self, capability: Capability) -> Result<()> {
        if self
            .services
            .permissions
            .is_granted(&self.caller.id, capability)
        {
            Ok(())
        } else {
            Err(Error::PermissionDenied {
                caller: self.caller.id.clone(),
                capability,
            })
        }
    }

    /// Permission check, then `op`, with audit entries around it
    async fn invoke<T, F>(
        &self,
        capability: Capability,
        args: Value,
        op: F,
        summarize: impl FnOnce(&T) -> Value,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Err(e) = self.require(capability) {
            warn!(caller = %self.caller, %capability, "Permission denied");
            if let Some(audit) = &self.services.audit {
                audit.call_denied(&self.caller, capability, &args).await;
            }
            return Err(e);
        }

        if let Some(audit) = &self.services.audit {
            audit.call_started(&self.caller, capability, &args).await;
        }
        let started = Instant::now();
        let result = op.await;

        if let Some(audit) = &self.services.audit {
            let outcome = match &result {
                Ok(value) => Ok(summarize(value)),
                Err(e) => Err(e.to_string()),
            };
            audit
                .call_completed(
                    &self.caller,
                    capability,
                    &args,
                    outcome,
                    started.elapsed().as_millis() as u64,
                )
                .await;
        }
        result
    }
}

fn preview(message: &str) -> String {
    if message.chars().count() <= MESSAGE_PREVIEW_CHARS {
        return message.to_string();
    }
    let head: String = message.chars().take(MESSAGE_PREVIEW_CHARS).collect();
    format!("{}...", head)
}
