//! Risk hints attached to confirmation requests
//!
//! Hints never block an action on their own. They are surfaced to the human
//! deciding the confirmation.

use crate::wallet::ValidatedTransfer;
use alloy::hex;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskCode {
    /// Calldata present: the recipient is expected to run code
    ContractInteraction,
    SelfTransfer,
    /// Calldata with zero value, typical of token approvals and transfers
    ZeroValueCall,
    GasPriceOverride,
    /// Message is hex, possibly a hash the user cannot read
    HexMessage,
    /// Typed data grants a token allowance by signature
    PermitSignature,
    ChainMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskHint {
    pub code: RiskCode,
    pub message: String,
}

impl RiskHint {
    pub fn new(code: RiskCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub fn transaction_risks(transfer: &ValidatedTransfer, active: Address) -> Vec<RiskHint> {
    let mut risks = Vec::new();
    let has_calldata = !transfer.data.is_empty();

    if has_calldata {
        risks.push(RiskHint::new(
            RiskCode::ContractInteraction,
            format!(
                "Calls contract {} with {} bytes of calldata",
                transfer.to,
                transfer.data.len()
            ),
        ));
    }
    if transfer.to == active {
        risks.push(RiskHint::new(
            RiskCode::SelfTransfer,
            "Recipient is the sending account",
        ));
    }
    if has_calldata && transfer.value.is_zero() {
        risks.push(RiskHint::new(
            RiskCode::ZeroValueCall,
            "Zero-value call; may approve or move tokens",
        ));
    }
    if let Some(gas_price) = transfer.gas_price {
        risks.push(RiskHint::new(
            RiskCode::GasPriceOverride,
            format!("Caller set gas price to {} wei", gas_price),
        ));
    }

    risks
}

pub fn message_risks(message: &str) -> Vec<RiskHint> {
    let looks_hex = message
        .strip_prefix("0x")
        .is_some_and(|digits| !digits.is_empty() && hex::decode(digits).is_ok());

    if looks_hex {
        vec![RiskHint::new(
            RiskCode::HexMessage,
            "Message is raw hex and may be a transaction or order hash",
        )]
    } else {
        Vec::new()
    }
}

/// Hints for typed data given as parsed JSON
pub fn typed_data_risks(typed_data: &Value, active_chain_id: u64) -> Vec<RiskHint> {
    let mut risks = Vec::new();

    let primary_type = typed_data
        .get("primaryType")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if primary_type.contains("Permit") {
        risks.push(RiskHint::new(
            RiskCode::PermitSignature,
            format!("{} signature can authorize token spending", primary_type),
        ));
    }

    if let Some(domain_chain) = typed_data
        .get("domain")
        .and_then(|d| d.get("chainId"))
        .and_then(chain_id_value)
    {
        if domain_chain != active_chain_id {
            risks.push(RiskHint::new(
                RiskCode::ChainMismatch,
                format!(
                    "Typed data is for chain {} but the active chain is {}",
                    domain_chain, active_chain_id
                ),
            ));
        }
    }

    risks
}

fn chain_id_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(digits) => u64::from_str_radix(digits, 16).ok(),
            None => s.parse().ok(),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallerIdentity, TransferRequest};
    use serde_json::json;
    use std::str::FromStr;

    const ACTIVE: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const TOKEN: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    fn codes(risks: &[RiskHint]) -> Vec<RiskCode> {
        risks.iter().map(|r| r.code).collect()
    }

    fn transfer(request: TransferRequest) -> ValidatedTransfer {
        ValidatedTransfer::parse(&request).unwrap()
    }

    #[test]
    fn plain_transfer_has_no_risks() {
        let request = TransferRequest::new(
            CallerIdentity::new("wallet", "1.0.0"),
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
            "1000",
            1,
        );
        let active = Address::from_str(ACTIVE).unwrap();
        assert!(transaction_risks(&transfer(request), active).is_empty());
    }

    #[test]
    fn token_approval_shape_is_flagged() {
        let request = TransferRequest::new(CallerIdentity::new("swap", "1.0.0"), TOKEN, "0", 1)
            .with_data("0x095ea7b3")
            .with_gas("60000", "1000000000");
        let active = Address::from_str(ACTIVE).unwrap();
        assert_eq!(
            codes(&transaction_risks(&transfer(request), active)),
            [
                RiskCode::ContractInteraction,
                RiskCode::ZeroValueCall,
                RiskCode::GasPriceOverride
            ]
        );
    }

    #[test]
    fn self_transfer_is_flagged() {
        let request = TransferRequest::new(CallerIdentity::new("swap", "1.0.0"), ACTIVE, "1", 1);
        let active = Address::from_str(ACTIVE).unwrap();
        assert_eq!(
            codes(&transaction_risks(&transfer(request), active)),
            [RiskCode::SelfTransfer]
        );
    }

    #[test]
    fn hex_messages_are_flagged() {
        assert_eq!(codes(&message_risks("0xdeadbeef")), [RiskCode::HexMessage]);
        assert!(message_risks("hello").is_empty());
        assert!(message_risks("0xnot hex").is_empty());
        assert!(message_risks("0x").is_empty());
    }

    #[test]
    fn permit_on_other_chain_is_flagged_twice() {
        let typed = json!({
            "primaryType": "Permit",
            "domain": { "name": "USD Coin", "chainId": "0x89" }
        });
        assert_eq!(
            codes(&typed_data_risks(&typed, 1)),
            [RiskCode::PermitSignature, RiskCode::ChainMismatch]
        );
        assert!(typed_data_risks(&json!({"primaryType": "Mail", "domain": {"chainId": 1}}), 1)
            .is_empty());
    }
}
