//! Module runtime
//!
//! Registers installable modules by manifest, maps routes to the module that
//! owns them, and hands out a [`RuntimeContext`] per installed caller.

mod context;
mod manifest;
mod storage;

pub use context::{NetworkAccess, RuntimeContext};
pub use manifest::{ModuleManifest, Route};
pub use storage::{NamespaceStore, NamespacedStorage};

use crate::error::{Error, Result};
use crate::services::WalletServices;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct Registry {
    modules: HashMap<String, ModuleManifest>,
    routes: HashMap<String, Route>,
}

/// Registry of installed modules and their routes
#[derive(Debug)]
pub struct ModuleRuntime {
    services: WalletServices,
    registry: RwLock<Registry>,
}

impl ModuleRuntime {
    pub fn new(services: WalletServices) -> Self {
        Self {
            services,
            registry: RwLock::new(Registry::default()),
        }
    }

    pub fn services(&self) -> &WalletServices {
        &self.services
    }

    /// Install or replace modules by id
    ///
    /// Routes merge into one table; a later install takes over any path it
    /// shares with an earlier one.
    pub fn install(&self, manifests: impl IntoIterator<Item = ModuleManifest>) {
        let mut registry = self.registry.write();
        for mut manifest in manifests {
            for route in &mut manifest.routes {
                if route.module_id != manifest.id {
                    warn!(
                        module = %manifest.id,
                        path = %route.path,
                        claimed = %route.module_id,
                        "Route names another module; assigning it to the installer"
                    );
                    route.module_id = manifest.id.clone();
                }
            }
            for route in &manifest.routes {
                if let Some(previous) = registry.routes.insert(route.path.clone(), route.clone()) {
                    if previous.module_id != route.module_id {
                        debug!(
                            path = %route.path,
                            from = %previous.module_id,
                            to = %route.module_id,
                            "Route taken over"
                        );
                    }
                }
            }
            info!(
                module = %manifest.id,
                version = %manifest.version,
                routes = manifest.routes.len(),
                "Installed module"
            );
            registry.modules.insert(manifest.id.clone(), manifest);
        }
    }

    pub fn route(&self, path: &str) -> Option<Route> {
        self.registry.read().routes.get(path).cloned()
    }

    pub fn resolve(&self, path: &str) -> Result<Route> {
        self.route(path)
            .ok_or_else(|| Error::RouteNotFound(path.to_string()))
    }

    /// Installed manifests, sorted by id
    pub fn modules(&self) -> Vec<ModuleManifest> {
        let mut modules: Vec<_> = self.registry.read().modules.values().cloned().collect();
        modules.sort_by(|a, b| a.id.cmp(&b.id));
        modules
    }

    pub fn context(&self, caller_id: &str) -> Result<RuntimeContext> {
        let manifest = self
            .registry
            .read()
            .modules
            .get(caller_id)
            .cloned()
            .ok_or_else(|| Error::CallerNotInstalled(caller_id.to_string()))?;
        Ok(RuntimeContext::new(manifest, self.services.clone()))
    }
}
