//! JSON-RPC transports

use super::RpcError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// JSON-RPC request structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method: method.into(),
            params,
        }
    }
}

/// Moves one JSON-RPC request to a node and returns the raw response envelope
///
/// Implementations report transport failures (connection, non-2xx status,
/// undecodable body) and leave envelope interpretation to the client.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn send(&self, endpoint: &Url, request: &JsonRpcRequest) -> Result<Value, RpcError>;
}

/// HTTP POST transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, RpcError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, endpoint: &Url, request: &JsonRpcRequest) -> Result<Value, RpcError> {
        let response = self
            .client
            .post(endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::HttpStatus(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RpcError::InvalidResponse(format!("body is not JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_matches_wire_format() {
        let request = JsonRpcRequest::new("eth_gasPrice", serde_json::json!([]));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "eth_gasPrice",
                "params": []
            })
        );
    }
}
