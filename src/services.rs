//! Shared collaborators behind every caller's broker

use crate::audit::AuditLog;
use crate::broker::CapabilityBroker;
use crate::chain::ChainConfigProvider;
use crate::confirmation::{AutoConfirmation, ConfirmationFlow, ConsentPrompt};
use crate::permissions::PermissionManager;
use crate::rpc::RpcClient;
use crate::runtime::NamespacedStorage;
use crate::types::CallerIdentity;
use crate::wallet::KeyVault;
use std::sync::Arc;

/// Process-wide services; cheap to clone
#[derive(Clone)]
pub struct WalletServices {
    pub permissions: Arc<PermissionManager>,
    pub vault: Arc<KeyVault>,
    pub rpc: RpcClient,
    pub chains: Arc<dyn ChainConfigProvider>,
    pub confirmation: Arc<dyn ConfirmationFlow>,
    pub consent: Arc<dyn ConsentPrompt>,
    pub storage: Arc<NamespacedStorage>,
    pub audit: Option<AuditLog>,
}

impl WalletServices {
    /// Services with a fresh permission table, empty storage, no audit log,
    /// and consent that approves every grant
    pub fn new(
        vault: Arc<KeyVault>,
        rpc: RpcClient,
        chains: Arc<dyn ChainConfigProvider>,
        confirmation: Arc<dyn ConfirmationFlow>,
    ) -> Self {
        Self {
            permissions: Arc::new(PermissionManager::new()),
            vault,
            rpc,
            chains,
            confirmation,
            consent: Arc::new(AutoConfirmation::approve_all()),
            storage: Arc::new(NamespacedStorage::new()),
            audit: None,
        }
    }

    pub fn with_consent(mut self, consent: Arc<dyn ConsentPrompt>) -> Self {
        self.consent = consent;
        self
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Broker acting on behalf of `caller`
    pub fn broker(&self, caller: CallerIdentity) -> CapabilityBroker {
        CapabilityBroker::new(caller, self.clone())
    }
}

impl std::fmt::Debug for WalletServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletServices")
            .field("vault", &self.vault)
            .field("rpc", &self.rpc)
            .field("audit", &self.audit.is_some())
            .finish_non_exhaustive()
    }
}
