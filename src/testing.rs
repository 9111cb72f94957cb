//! Shared test fixtures

use crate::rpc::{JsonRpcRequest, RpcError, RpcTransport};
use crate::wallet::{KeyVault, MemorySecretStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use url::Url;

// Test private key (DO NOT use in production!)
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

/// Vault in memory holding the test account
pub fn test_vault() -> Arc<KeyVault> {
    let vault = KeyVault::new(Arc::new(MemorySecretStore::new()));
    vault.import_account(TEST_KEY).unwrap();
    Arc::new(vault)
}

/// In-process JSON-RPC node with per-method response queues
///
/// Each queued response is served once, except the last one for a method,
/// which keeps being served. Unscripted methods fail with a transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<Value>>>,
    requests: Mutex<Vec<JsonRpcRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful `result` for `method`
    pub fn respond(&self, method: &str, result: Value) {
        self.respond_envelope(method, json!({"jsonrpc": "2.0", "id": 1, "result": result}));
    }

    /// Queue a raw response envelope for `method`
    pub fn respond_envelope(&self, method: &str, envelope: Value) {
        self.responses
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(envelope);
    }

    /// Methods called so far, in order
    pub fn methods(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| r.method.clone())
            .collect()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    pub fn last_request(&self, method: &str) -> Option<JsonRpcRequest> {
        self.requests
            .lock()
            .iter()
            .rev()
            .find(|r| r.method == method)
            .cloned()
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn send(&self, _endpoint: &Url, request: &JsonRpcRequest) -> Result<Value, RpcError> {
        self.requests.lock().push(request.clone());

        let mut responses = self.responses.lock();
        let queue = responses
            .get_mut(&request.method)
            .ok_or_else(|| RpcError::Transport(format!("unscripted method {}", request.method)))?;
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.ok_or_else(|| RpcError::Transport(format!("unscripted method {}", request.method)))
    }
}
