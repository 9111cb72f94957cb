//! Confirmation and consent gates
//!
//! Two asynchronous gates stand between a caller and the key:
//! - [`ConsentPrompt`] decides whether a caller may be *granted* a capability
//! - [`ConfirmationFlow`] decides whether one *invocation* of a signing
//!   capability goes ahead
//!
//! A UI implements both. Either may suspend indefinitely waiting for a human;
//! dropping the future abandons the request.

mod auto;
mod channel;
pub mod risk;

pub use auto::{AutoConfirmation, AUTO_REJECT_REASON};
pub use channel::{ChannelConfirmation, PendingConfirmation};
pub use risk::{RiskCode, RiskHint};

use crate::permissions::CapabilityRequest;
use crate::types::CallerIdentity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which sensitive action is awaiting a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmationKind {
    SignMessage,
    SignTypedData,
    SendTransaction,
}

/// Human-readable description of the pending action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationSummary {
    pub title: String,
    /// Label/value pairs in display order
    pub fields: Vec<(String, String)>,
}

impl ConfirmationSummary {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((label.into(), value.into()));
        self
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

/// One pending sensitive action; built fresh for every invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmRequest {
    pub id: Uuid,
    pub caller: CallerIdentity,
    pub kind: ConfirmationKind,
    pub chain_id: u64,
    pub summary: ConfirmationSummary,
    pub risks: Vec<RiskHint>,
}

impl ConfirmRequest {
    pub fn new(
        caller: CallerIdentity,
        kind: ConfirmationKind,
        chain_id: u64,
        summary: ConfirmationSummary,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            caller,
            kind,
            chain_id,
            summary,
            risks: Vec::new(),
        }
    }

    pub fn with_risks(mut self, risks: Vec<RiskHint>) -> Self {
        self.risks = risks;
        self
    }

    pub fn has_risk(&self, code: RiskCode) -> bool {
        self.risks.iter().any(|r| r.code == code)
    }
}

/// Outcome of a confirmation or consent prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "kebab-case")]
pub enum Decision {
    Approved,
    Rejected { reason: String },
}

impl Decision {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Decision::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approved)
    }
}

/// Gate consulted before every signing invocation
#[async_trait]
pub trait ConfirmationFlow: Send + Sync {
    async fn confirm(&self, request: ConfirmRequest) -> Decision;
}

/// Gate consulted before a capability is granted
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    async fn decide(&self, caller: &CallerIdentity, request: &CapabilityRequest) -> Decision;
}
