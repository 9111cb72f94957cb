//! Per-caller runtime context

use super::{ModuleManifest, NamespaceStore};
use crate::broker::CapabilityBroker;
use crate::confirmation::Decision;
use crate::error::{Error, Result};
use crate::permissions::{Capability, CapabilityRequest, PermissionRecord, PermissionStatus};
use crate::rpc::{Receipt, RpcClient};
use crate::services::WalletServices;
use crate::types::CallerIdentity;
use tracing::{debug, info};

/// Everything an installed module can reach
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    manifest: ModuleManifest,
    identity: CallerIdentity,
    broker: CapabilityBroker,
    services: WalletServices,
}

impl RuntimeContext {
    pub(crate) fn new(manifest: ModuleManifest, services: WalletServices) -> Self {
        let identity = manifest.identity();
        Self {
            broker: services.broker(identity.clone()),
            manifest,
            identity,
            services,
        }
    }

    pub fn identity(&self) -> &CallerIdentity {
        &self.identity
    }

    pub fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }

    pub fn permission_status(&self, capability: Capability) -> PermissionStatus {
        self.services
            .permissions
            .status(&self.identity.id, capability)
    }

    /// Every permission record held for this caller
    pub fn permissions(&self) -> Vec<PermissionRecord> {
        self.services.permissions.records(&self.identity.id)
    }

    /// Ask for a capability; the consent prompt decides
    ///
    /// An already granted capability is returned without prompting again.
    pub async fn request_permission(&self, request: CapabilityRequest) -> PermissionRecord {
        let caller_id = &self.identity.id;
        let capability = request.capability;
        if self.permission_status(capability) == PermissionStatus::Granted {
            if let Some(record) = self
                .permissions()
                .into_iter()
                .find(|r| r.capability == capability)
            {
                return record;
            }
        }

        if !self.manifest.declares(capability) {
            debug!(
                caller = %caller_id,
                %capability,
                "Requesting capability the manifest does not declare"
            );
        }
        match self.services.consent.decide(&self.identity, &request).await {
            Decision::Approved => self.services.permissions.grant(caller_id, capability),
            Decision::Rejected { reason } => {
                info!(caller = %caller_id, %capability, %reason, "Consent refused");
                self.services.permissions.deny(caller_id, capability)
            }
        }
    }

    pub fn revoke_permission(&self, capability: Capability) -> PermissionRecord {
        self.services
            .permissions
            .revoke(&self.identity.id, capability)
    }

    pub fn broker(&self) -> &CapabilityBroker {
        &self.broker
    }

    /// Private key/value namespace for this caller
    pub fn storage(&self, namespace: &str) -> Result<NamespaceStore> {
        self.require(Capability::NamespacedStorage)?;
        Ok(self
            .services
            .storage
            .namespace(self.identity.id.clone(), namespace))
    }

    /// Read-only chain access
    pub fn network(&self) -> Result<NetworkAccess> {
        self.require(Capability::Network)?;
        Ok(NetworkAccess {
            rpc: self.services.rpc.clone(),
        })
    }

    fn require(&self, capability: Capability) -> Result<()> {
        if self.services.permissions.is_granted(&self.identity.id, capability) {
            Ok(())
        } else {
            Err(Error::PermissionDenied {
                caller: self.identity.id.clone(),
                capability,
            })
        }
    }
}

/// Chain queries that never touch the account
#[derive(Debug, Clone)]
pub struct NetworkAccess {
    rpc: RpcClient,
}

impl NetworkAccess {
    pub async fn gas_price(&self, chain_id: u64) -> Result<String> {
        Ok(self.rpc.gas_price(chain_id).await?)
    }

    pub async fn transaction_receipt(&self, chain_id: u64, tx_hash: &str) -> Result<Option<Receipt>> {
        Ok(self.rpc.transaction_receipt(chain_id, tx_hash).await?)
    }

    pub fn supports_chain(&self, chain_id: u64) -> bool {
        self.rpc.endpoints().has_chain(chain_id)
    }
}
