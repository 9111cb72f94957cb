//! Module manifests and routes

use crate::permissions::Capability;
use crate::types::CallerIdentity;
use serde::{Deserialize, Serialize};

/// What an installable module declares about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub id: String,
    pub version: String,
    pub name: String,
    /// Capabilities the module expects to request
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl ModuleManifest {
    pub fn new(id: impl Into<String>, version: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            name: name.into(),
            capabilities: Vec::new(),
            routes: Vec::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    /// Add a route owned by this module
    pub fn with_route(mut self, path: impl Into<String>, title: impl Into<String>) -> Self {
        self.routes.push(Route {
            path: path.into(),
            module_id: self.id.clone(),
            title: title.into(),
        });
        self
    }

    pub fn identity(&self) -> CallerIdentity {
        CallerIdentity::new(&self.id, &self.version)
    }

    pub fn declares(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub path: String,
    /// Set to the installing manifest's id on install
    #[serde(default)]
    pub module_id: String,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_manifest_json() {
        let manifest: ModuleManifest = serde_json::from_value(json!({
            "id": "swap",
            "version": "1.2.0",
            "name": "Swap",
            "capabilities": ["read-address", "send-transaction"],
            "routes": [{"path": "/swap", "module_id": "swap", "title": "Swap"}]
        }))
        .unwrap();

        assert_eq!(manifest.identity(), CallerIdentity::new("swap", "1.2.0"));
        assert!(manifest.declares(Capability::SendTransaction));
        assert!(!manifest.declares(Capability::SignMessage));
        assert_eq!(manifest.routes[0].path, "/swap");
    }

    #[test]
    fn builder_routes_belong_to_the_module() {
        let manifest = ModuleManifest::new("swap", "1.0.0", "Swap").with_route("/swap", "Swap");
        assert_eq!(manifest.routes[0].module_id, "swap");
    }
}
