//! External bridge for web dApps
//!
//! Translates provider-style wire calls from one web origin into broker
//! invocations. The bridge itself checks nothing: the broker enforces the
//! origin's grants.

use crate::broker::CapabilityBroker;
use crate::error::Result;
use crate::types::{CallerIdentity, TransferRequest};
use crate::wallet::signature_hex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};
use tracing::debug;

/// Error type for wire call translation
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// One positional wire parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    String(String),
    Number(Number),
    Bool(bool),
}

impl WireValue {
    /// Parse a JSON array of parameters, rejecting nested values and null
    pub fn parse_params(json: &str) -> std::result::Result<Vec<WireValue>, BridgeError> {
        serde_json::from_str(json).map_err(|e| BridgeError::InvalidParameters(e.to_string()))
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExternalBridge {
    origin: String,
    broker: CapabilityBroker,
}

impl ExternalBridge {
    pub fn new(origin: impl Into<String>, broker: CapabilityBroker) -> Self {
        Self {
            origin: origin.into(),
            broker,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub async fn call(&self, method: &str, params: &[WireValue]) -> Result<Value> {
        debug!(origin = %self.origin, method, params = params.len(), "Bridge call");

        match method {
            "eth_requestAccounts" | "eth_accounts" => {
                let address = self.broker.read_address().await?;
                Ok(json!([address.to_checksum(None)]))
            }
            "personal_sign" => {
                let message = string_param(method, params, 0)?;
                let signature = self.broker.sign_message(message).await?;
                Ok(json!(signature_hex(&signature)))
            }
            "eth_signTypedData_v4" => {
                let typed_data = string_param(method, params, 0)?;
                let signature = self.broker.sign_typed_data(typed_data).await?;
                Ok(json!(signature_hex(&signature)))
            }
            "eth_sendTransaction" => {
                let request = self.transfer_request(params)?;
                let tx_hash = self.broker.send_transaction(request).await?;
                Ok(json!(tx_hash))
            }
            other => Err(BridgeError::UnsupportedMethod(other.to_string()).into()),
        }
    }

    /// `[to, value, chainId, data?]`
    fn transfer_request(
        &self,
        params: &[WireValue],
    ) -> std::result::Result<TransferRequest, BridgeError> {
        const METHOD: &str = "eth_sendTransaction";
        if params.len() < 3 {
            return Err(BridgeError::InvalidParameters(format!(
                "{} expects [to, value, chainId, data?], got {} params",
                METHOD,
                params.len()
            )));
        }

        let to = string_param(METHOD, params, 0)?;
        let value = match &params[1] {
            WireValue::String(s) => s.clone(),
            WireValue::Number(n) if n.is_u64() => n.to_string(),
            other => return Err(invalid(METHOD, 1, "decimal wei amount", other)),
        };
        let chain_id = match &params[2] {
            WireValue::Number(n) => n.as_u64(),
            WireValue::String(s) => match s.strip_prefix("0x") {
                Some(digits) => u64::from_str_radix(digits, 16).ok(),
                None => s.parse().ok(),
            },
            WireValue::Bool(_) => None,
        }
        .ok_or_else(|| invalid(METHOD, 2, "chain id", &params[2]))?;

        let mut request =
            TransferRequest::new(CallerIdentity::web_origin(&self.origin), to, value, chain_id);
        if let Some(data) = params.get(3) {
            let data = data
                .as_str()
                .ok_or_else(|| invalid(METHOD, 3, "hex calldata", data))?;
            request = request.with_data(data);
        }
        Ok(request)
    }
}

fn string_param<'a>(
    method: &str,
    params: &'a [WireValue],
    index: usize,
) -> std::result::Result<&'a str, BridgeError> {
    let param = params.get(index).ok_or_else(|| {
        BridgeError::InvalidParameters(format!("{} missing param {}", method, index))
    })?;
    param
        .as_str()
        .ok_or_else(|| invalid(method, index, "string", param))
}

fn invalid(method: &str, index: usize, expected: &str, got: &WireValue) -> BridgeError {
    BridgeError::InvalidParameters(format!(
        "{} param {}: expected {}, got {:?}",
        method, index, expected, got
    ))
}
