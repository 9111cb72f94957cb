//! Per-caller namespaced key/value storage

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

type NamespaceKey = (String, String);

/// All callers' namespaces behind one lock
///
/// A namespace is keyed by (caller id, namespace name), so two callers using
/// the same name never see each other's entries.
#[derive(Debug, Default)]
pub struct NamespacedStorage {
    entries: Mutex<HashMap<NamespaceKey, BTreeMap<String, String>>>,
}

impl NamespacedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(
        self: &Arc<Self>,
        caller_id: impl Into<String>,
        namespace: impl Into<String>,
    ) -> NamespaceStore {
        NamespaceStore {
            storage: Arc::clone(self),
            key: (caller_id.into(), namespace.into()),
        }
    }
}

/// Handle to one caller's namespace
#[derive(Debug, Clone)]
pub struct NamespaceStore {
    storage: Arc<NamespacedStorage>,
    key: NamespaceKey,
}

impl NamespaceStore {
    pub fn name(&self) -> &str {
        &self.key.1
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.storage
            .entries
            .lock()
            .get(&self.key)
            .and_then(|ns| ns.get(key).cloned())
    }

    /// Store `value`, returning the previous one
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.storage
            .entries
            .lock()
            .entry(self.key.clone())
            .or_default()
            .insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.storage
            .entries
            .lock()
            .get_mut(&self.key)
            .and_then(|ns| ns.remove(key))
    }

    /// Keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.storage
            .entries
            .lock()
            .get(&self.key)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        self.storage.entries.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let storage = Arc::new(NamespacedStorage::new());
        let prefs = storage.namespace("swap", "prefs");

        assert_eq!(prefs.set("slippage", "50"), None);
        assert_eq!(prefs.set("slippage", "30"), Some("50".to_string()));
        assert_eq!(prefs.get("slippage").as_deref(), Some("30"));
        assert_eq!(prefs.remove("slippage").as_deref(), Some("30"));
        assert_eq!(prefs.get("slippage"), None);
    }

    #[test]
    fn namespaces_of_one_caller_are_isolated() {
        let storage = Arc::new(NamespacedStorage::new());
        let prefs = storage.namespace("swap", "prefs");
        let cache = storage.namespace("swap", "cache");

        prefs.set("k", "prefs");
        cache.set("k", "cache");
        assert_eq!(prefs.get("k").as_deref(), Some("prefs"));
        assert_eq!(cache.get("k").as_deref(), Some("cache"));

        cache.clear();
        assert!(cache.keys().is_empty());
        assert_eq!(prefs.keys(), ["k"]);
    }

    #[test]
    fn colliding_namespace_names_are_isolated_across_callers() {
        let storage = Arc::new(NamespacedStorage::new());
        storage.namespace("swap", "prefs").set("k", "swap");
        storage.namespace("bridge", "prefs").set("k", "bridge");

        assert_eq!(storage.namespace("swap", "prefs").get("k").as_deref(), Some("swap"));
        assert_eq!(
            storage.namespace("bridge", "prefs").get("k").as_deref(),
            Some("bridge")
        );
    }
}
