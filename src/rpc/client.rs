//! Multi-chain JSON-RPC client and receipt polling

use super::quantity::hex_to_decimal;
use super::{decimal_to_hex, Confirmation, HttpTransport, JsonRpcRequest, Receipt, RpcError, RpcTransport};
use crate::config::RpcConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Lower bound applied to the polling interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Lower bound applied to the confirmation timeout
pub const MIN_CONFIRMATION_TIMEOUT: Duration = Duration::from_millis(10);

/// JSON-RPC client over the closed chain table
#[derive(Clone)]
pub struct RpcClient {
    endpoints: RpcConfig,
    transport: Arc<dyn RpcTransport>,
}

impl RpcClient {
    pub fn new(endpoints: RpcConfig, transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            endpoints,
            transport,
        }
    }

    /// Client over HTTP with the default request timeout
    pub fn http(endpoints: RpcConfig) -> Result<Self, RpcError> {
        Ok(Self::new(endpoints, Arc::new(HttpTransport::new()?)))
    }

    pub fn endpoints(&self) -> &RpcConfig {
        &self.endpoints
    }

    /// Issue one JSON-RPC call and return its `result`
    pub async fn call(&self, chain_id: u64, method: &str, params: Value) -> Result<Value, RpcError> {
        let endpoint = self.endpoints.endpoint(chain_id)?;
        let request = JsonRpcRequest::new(method, params);

        debug!(chain_id, method, "JSON-RPC call");
        let envelope = self.transport.send(&endpoint, &request).await?;
        decode_envelope(envelope)
    }

    /// Pending nonce for `address`, as a decimal string
    pub async fn next_nonce(&self, chain_id: u64, address: &str) -> Result<String, RpcError> {
        self.call_quantity(
            chain_id,
            "eth_getTransactionCount",
            json!([address, "pending"]),
        )
        .await
    }

    /// Legacy gas price in wei, as a decimal string
    pub async fn gas_price(&self, chain_id: u64) -> Result<String, RpcError> {
        self.call_quantity(chain_id, "eth_gasPrice", json!([])).await
    }

    /// Gas estimate for a call, as a decimal string
    ///
    /// `value` is a decimal wei amount; `data` is hex calldata.
    pub async fn estimate_gas(
        &self,
        chain_id: u64,
        from: &str,
        to: &str,
        value: &str,
        data: Option<&str>,
    ) -> Result<String, RpcError> {
        let mut tx = json!({
            "from": from,
            "to": to,
            "value": decimal_to_hex(value)?,
        });
        if let Some(data) = data {
            tx["data"] = json!(data);
        }
        self.call_quantity(chain_id, "eth_estimateGas", json!([tx]))
            .await
    }

    /// Broadcast a signed transaction and return the node-assigned hash
    pub async fn send_raw_transaction(
        &self,
        chain_id: u64,
        raw_hex: &str,
    ) -> Result<String, RpcError> {
        let result = self
            .call(chain_id, "eth_sendRawTransaction", json!([raw_hex]))
            .await?;
        let tx_hash = result.as_str().ok_or_else(|| {
            RpcError::InvalidResponse(format!("eth_sendRawTransaction returned {}", result))
        })?;

        info!(chain_id, tx_hash, "Broadcast transaction");
        Ok(tx_hash.to_string())
    }

    /// Receipt for `tx_hash`, or `None` if the node has not mined it yet
    pub async fn transaction_receipt(
        &self,
        chain_id: u64,
        tx_hash: &str,
    ) -> Result<Option<Receipt>, RpcError> {
        let result = self
            .call(chain_id, "eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Receipt::from_json(&result).map(Some)
    }

    /// Poll for a receipt until the transaction is mined, the timeout
    /// elapses, or `cancel` flips to `true`
    ///
    /// Only "not yet mined" is retried. Transport and protocol errors end the
    /// wait immediately. A reverted transaction fails with
    /// [`RpcError::TransactionExecutionFailed`], never with a timeout.
    pub async fn wait_for_confirmation(
        &self,
        tx_hash: &str,
        chain_id: u64,
        timeout: Duration,
        interval: Duration,
        cancel: &watch::Receiver<bool>,
    ) -> Result<Confirmation, RpcError> {
        let timeout = timeout.max(MIN_CONFIRMATION_TIMEOUT);
        let interval = interval.max(MIN_POLL_INTERVAL);
        let started = Instant::now();
        let mut attempts: u32 = 0;

        info!(
            chain_id,
            tx_hash,
            timeout_ms = timeout.as_millis() as u64,
            interval_ms = interval.as_millis() as u64,
            "Waiting for confirmation"
        );

        loop {
            if *cancel.borrow() {
                warn!(tx_hash, attempts, "Confirmation wait cancelled");
                return Err(RpcError::Cancelled);
            }

            attempts += 1;
            if let Some(receipt) = self.transaction_receipt(chain_id, tx_hash).await? {
                match receipt.outcome() {
                    Some(Ok(confirmation)) => {
                        info!(
                            tx_hash,
                            block_number = confirmation.block_number,
                            attempts,
                            "Transaction confirmed"
                        );
                        return Ok(confirmation);
                    }
                    Some(Err(e)) => {
                        warn!(tx_hash, error = %e, "Transaction reverted");
                        return Err(e);
                    }
                    None => {}
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                warn!(tx_hash, attempts, "Timed out waiting for confirmation");
                return Err(RpcError::ConfirmationTimeout {
                    tx_hash: tx_hash.to_string(),
                });
            }

            debug!(tx_hash, attempts, "Transaction not yet mined");
            tokio::time::sleep(interval.min(timeout - elapsed)).await;
        }
    }

    async fn call_quantity(
        &self,
        chain_id: u64,
        method: &str,
        params: Value,
    ) -> Result<String, RpcError> {
        let result = self.call(chain_id, method, params).await?;
        let quantity = result.as_str().ok_or_else(|| {
            RpcError::InvalidResponse(format!("{} returned non-string result {}", method, result))
        })?;
        hex_to_decimal(quantity)
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// Split a response envelope into its result or its error object
fn decode_envelope(envelope: Value) -> Result<Value, RpcError> {
    let Value::Object(mut map) = envelope else {
        return Err(RpcError::InvalidResponse(
            "response is not a JSON object".to_string(),
        ));
    };

    if let Some(error) = map.remove("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(Value::as_i64).ok_or_else(|| {
            RpcError::InvalidResponse(format!("error object without numeric code: {}", error))
        })?;
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(RpcError::RpcFailure { code, message });
    }

    map.remove("result").ok_or_else(|| {
        RpcError::InvalidResponse("response has neither result nor error".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    const TX_HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    fn client(transport: &Arc<ScriptedTransport>) -> RpcClient {
        RpcClient::new(
            RpcConfig::with_urls([(1, "http://127.0.0.1:8545".to_string())]),
            transport.clone(),
        )
    }

    fn no_cancel() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    #[tokio::test]
    async fn quantities_are_returned_as_decimal() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("eth_gasPrice", json!("0x4a817c800"));
        transport.respond("eth_getTransactionCount", json!("0x0"));
        transport.respond("eth_estimateGas", json!("0x5208"));
        let client = client(&transport);

        assert_eq!(client.gas_price(1).await.unwrap(), "20000000000");
        assert_eq!(client.next_nonce(1, "0x01").await.unwrap(), "0");
        assert_eq!(
            client
                .estimate_gas(1, "0x01", "0x02", "255", None)
                .await
                .unwrap(),
            "21000"
        );

        let estimate = transport.last_request("eth_estimateGas").unwrap();
        assert_eq!(estimate.params[0]["value"], json!("0xff"));
        let nonce = transport.last_request("eth_getTransactionCount").unwrap();
        assert_eq!(nonce.params, json!(["0x01", "pending"]));
    }

    #[tokio::test]
    async fn malformed_quantity_is_rejected() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("eth_gasPrice", json!("0xzz"));
        assert!(matches!(
            client(&transport).gas_price(1).await,
            Err(RpcError::InvalidHexQuantity(_))
        ));
    }

    #[tokio::test]
    async fn rpc_error_objects_surface_verbatim() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_envelope(
            "eth_sendRawTransaction",
            json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "nonce too low"}}),
        );
        let err = client(&transport)
            .send_raw_transaction(1, "0x00")
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::RpcFailure { code: -32000, ref message } if message == "nonce too low"));
    }

    #[tokio::test]
    async fn malformed_envelopes_are_invalid_responses() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_envelope("eth_gasPrice", json!({"jsonrpc": "2.0", "id": 1}));
        transport.respond_envelope("eth_chainId", json!("oops"));
        let client = client(&transport);

        assert!(matches!(
            client.gas_price(1).await,
            Err(RpcError::InvalidResponse(_))
        ));
        assert!(matches!(
            client.call(1, "eth_chainId", json!([])).await,
            Err(RpcError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn unknown_chain_fails_before_io() {
        let transport = Arc::new(ScriptedTransport::new());
        assert!(matches!(
            client(&transport).gas_price(999).await,
            Err(RpcError::UnsupportedChain(999))
        ));
        assert!(transport.methods().is_empty());
    }

    #[tokio::test]
    async fn absent_receipt_is_not_an_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("eth_getTransactionReceipt", Value::Null);
        assert!(client(&transport)
            .transaction_receipt(1, TX_HASH)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_until_receipt_is_mined() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("eth_getTransactionReceipt", Value::Null);
        transport.respond(
            "eth_getTransactionReceipt",
            json!({"transactionHash": TX_HASH, "blockNumber": "0x2a", "status": "0x1"}),
        );

        let confirmation = client(&transport)
            .wait_for_confirmation(
                TX_HASH,
                1,
                Duration::from_secs(60),
                Duration::from_secs(1),
                &no_cancel(),
            )
            .await
            .unwrap();

        assert_eq!(confirmation.block_number, 42);
        assert_eq!(confirmation.status, Some(1));
        assert_eq!(transport.call_count("eth_getTransactionReceipt"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_with_original_hash() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("eth_getTransactionReceipt", Value::Null);

        let started = Instant::now();
        let err = client(&transport)
            .wait_for_confirmation(
                TX_HASH,
                1,
                Duration::from_secs(5),
                Duration::from_secs(1),
                &no_cancel(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::ConfirmationTimeout { ref tx_hash } if tx_hash == TX_HASH));
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(transport.call_count("eth_getTransactionReceipt"), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_receipt_is_not_a_timeout() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            "eth_getTransactionReceipt",
            json!({"transactionHash": TX_HASH, "blockNumber": "0x2a", "status": "0x0"}),
        );

        let err = client(&transport)
            .wait_for_confirmation(
                TX_HASH,
                1,
                Duration::from_secs(60),
                Duration::from_secs(1),
                &no_cancel(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RpcError::TransactionExecutionFailed { block_number: 42, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_is_checked_before_polling() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("eth_getTransactionReceipt", Value::Null);
        let (cancel_tx, cancel_rx) = watch::channel(true);

        let err = client(&transport)
            .wait_for_confirmation(
                TX_HASH,
                1,
                Duration::from_secs(60),
                Duration::from_secs(1),
                &cancel_rx,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::Cancelled));
        assert_eq!(transport.call_count("eth_getTransactionReceipt"), 0);
        drop(cancel_tx);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_an_ongoing_wait() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("eth_getTransactionReceipt", Value::Null);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let client = client(&transport);

        let waiter = tokio::spawn(async move {
            client
                .wait_for_confirmation(
                    TX_HASH,
                    1,
                    Duration::from_secs(600),
                    Duration::from_secs(1),
                    &cancel_rx,
                )
                .await
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        cancel_tx.send(true).unwrap();

        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, RpcError::Cancelled));
        assert!(transport.call_count("eth_getTransactionReceipt") >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_not_retried() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_envelope(
            "eth_getTransactionReceipt",
            json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32603, "message": "internal"}}),
        );

        let err = client(&transport)
            .wait_for_confirmation(
                TX_HASH,
                1,
                Duration::from_secs(60),
                Duration::from_secs(1),
                &no_cancel(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::RpcFailure { code: -32603, .. }));
        assert_eq!(transport.call_count("eth_getTransactionReceipt"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_durations_are_clamped() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("eth_getTransactionReceipt", Value::Null);

        let err = client(&transport)
            .wait_for_confirmation(TX_HASH, 1, Duration::ZERO, Duration::ZERO, &no_cancel())
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::ConfirmationTimeout { .. }));
        // One poll at start, one at the clamped deadline
        assert_eq!(transport.call_count("eth_getTransactionReceipt"), 2);
    }
}
