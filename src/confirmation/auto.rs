//! Non-interactive confirmation policy

use super::{ConfirmRequest, ConfirmationFlow, ConsentPrompt, Decision};
use crate::permissions::CapabilityRequest;
use crate::types::CallerIdentity;
use async_trait::async_trait;
use tracing::debug;

pub const AUTO_REJECT_REASON: &str = "rejected by automatic confirmation policy";

/// Resolves every prompt immediately with a fixed answer
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirmation {
    approve: bool,
}

impl AutoConfirmation {
    pub fn approve_all() -> Self {
        Self { approve: true }
    }

    pub fn reject_all() -> Self {
        Self { approve: false }
    }

    fn decision(&self) -> Decision {
        if self.approve {
            Decision::Approved
        } else {
            Decision::rejected(AUTO_REJECT_REASON)
        }
    }
}

impl Default for AutoConfirmation {
    fn default() -> Self {
        Self::approve_all()
    }
}

#[async_trait]
impl ConfirmationFlow for AutoConfirmation {
    async fn confirm(&self, request: ConfirmRequest) -> Decision {
        debug!(
            request_id = %request.id,
            caller = %request.caller,
            approve = self.approve,
            "Auto-resolving confirmation"
        );
        self.decision()
    }
}

#[async_trait]
impl ConsentPrompt for AutoConfirmation {
    async fn decide(&self, caller: &CallerIdentity, request: &CapabilityRequest) -> Decision {
        debug!(
            caller = %caller,
            capability = %request.capability,
            approve = self.approve,
            "Auto-resolving consent"
        );
        self.decision()
    }
}
