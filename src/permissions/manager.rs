//! Permission manager
//!
//! One map guarded by one lock, no per-key locking and no expiry.

use super::{Capability, PermissionRecord, PermissionStatus};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::info;

type PermissionKey = (String, Capability);

/// Thread-safe (caller, capability) -> status map
#[derive(Debug, Default)]
pub struct PermissionManager {
    records: Mutex<HashMap<PermissionKey, PermissionRecord>>,
}

impl PermissionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status; never fails, unseen keys are not-determined
    pub fn status(&self, caller_id: &str, capability: Capability) -> PermissionStatus {
        self.records
            .lock()
            .get(&(caller_id.to_string(), capability))
            .map(|record| record.status)
            .unwrap_or_default()
    }

    pub fn is_granted(&self, caller_id: &str, capability: Capability) -> bool {
        self.status(caller_id, capability) == PermissionStatus::Granted
    }

    pub fn grant(&self, caller_id: &str, capability: Capability) -> PermissionRecord {
        self.set(caller_id, capability, PermissionStatus::Granted)
    }

    pub fn deny(&self, caller_id: &str, capability: Capability) -> PermissionRecord {
        self.set(caller_id, capability, PermissionStatus::Denied)
    }

    /// Reset to not-determined. The key is kept.
    pub fn revoke(&self, caller_id: &str, capability: Capability) -> PermissionRecord {
        self.set(caller_id, capability, PermissionStatus::NotDetermined)
    }

    /// Every record held for a caller, ordered by capability
    pub fn records(&self, caller_id: &str) -> Vec<PermissionRecord> {
        let mut records: Vec<PermissionRecord> = self
            .records
            .lock()
            .values()
            .filter(|record| record.caller_id == caller_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.capability);
        records
    }

    fn set(
        &self,
        caller_id: &str,
        capability: Capability,
        status: PermissionStatus,
    ) -> PermissionRecord {
        let record = PermissionRecord {
            caller_id: caller_id.to_string(),
            capability,
            status,
            updated_at: Utc::now(),
        };

        self.records
            .lock()
            .insert((caller_id.to_string(), capability), record.clone());

        info!(
            caller = caller_id,
            capability = %capability,
            status = ?status,
            "Permission updated"
        );

        record
    }
}
