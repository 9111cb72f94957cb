//! Transaction receipts

use super::{parse_hex_u64, RpcError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The subset of `eth_getTransactionReceipt` the broker consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_hash: String,
    /// Present once mined
    pub block_number: Option<u64>,
    /// 0 = reverted, non-zero = success, absent = unknown
    pub status: Option<u64>,
}

/// A mined, non-reverted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub transaction_hash: String,
    pub block_number: u64,
    pub status: Option<u64>,
}

impl Receipt {
    pub fn from_json(value: &Value) -> Result<Self, RpcError> {
        let transaction_hash = value
            .get("transactionHash")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::InvalidReceiptField {
                field: "transactionHash",
                reason: "missing or not a string".to_string(),
            })?
            .to_string();

        Ok(Self {
            transaction_hash,
            block_number: optional_quantity(value, "blockNumber")?,
            status: optional_quantity(value, "status")?,
        })
    }

    pub fn is_mined(&self) -> bool {
        matches!(self.block_number, Some(block) if block > 0)
    }

    /// Terminal outcome, or `None` while the transaction is not yet mined
    pub fn outcome(&self) -> Option<Result<Confirmation, RpcError>> {
        let block_number = self.block_number.filter(|block| *block > 0)?;
        if self.status == Some(0) {
            return Some(Err(RpcError::TransactionExecutionFailed {
                tx_hash: self.transaction_hash.clone(),
                block_number,
            }));
        }
        Some(Ok(Confirmation {
            transaction_hash: self.transaction_hash.clone(),
            block_number,
            status: self.status,
        }))
    }
}

fn optional_quantity(value: &Value, field: &'static str) -> Result<Option<u64>, RpcError> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(quantity)) => parse_hex_u64(quantity)
            .map(Some)
            .map_err(|e| RpcError::InvalidReceiptField {
                field,
                reason: e.to_string(),
            }),
        Some(other) => Err(RpcError::InvalidReceiptField {
            field,
            reason: format!("expected hex string, got {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_mined_successful_receipt() {
        let receipt = Receipt::from_json(&json!({
            "transactionHash": "0xabc",
            "blockNumber": "0x10",
            "status": "0x1"
        }))
        .unwrap();

        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(receipt.status, Some(1));
        let confirmation = receipt.outcome().unwrap().unwrap();
        assert_eq!(confirmation.block_number, 16);
        assert_eq!(confirmation.status, Some(1));
    }

    #[test]
    fn reverted_receipt_is_execution_failure() {
        let receipt = Receipt::from_json(&json!({
            "transactionHash": "0xabc",
            "blockNumber": "0x10",
            "status": "0x0"
        }))
        .unwrap();

        assert!(matches!(
            receipt.outcome(),
            Some(Err(RpcError::TransactionExecutionFailed { block_number: 16, .. }))
        ));
    }

    #[test]
    fn pending_receipt_has_no_outcome() {
        let pending = Receipt::from_json(&json!({
            "transactionHash": "0xabc",
            "blockNumber": null,
            "status": null
        }))
        .unwrap();
        assert!(!pending.is_mined());
        assert!(pending.outcome().is_none());

        let block_zero = Receipt::from_json(&json!({
            "transactionHash": "0xabc",
            "blockNumber": "0x0"
        }))
        .unwrap();
        assert!(block_zero.outcome().is_none());
    }

    #[test]
    fn missing_status_counts_as_confirmed() {
        let receipt = Receipt::from_json(&json!({
            "transactionHash": "0xabc",
            "blockNumber": "0x1"
        }))
        .unwrap();
        assert_eq!(receipt.outcome().unwrap().unwrap().status, None);
    }

    #[test]
    fn rejects_malformed_fields() {
        assert!(matches!(
            Receipt::from_json(&json!({ "blockNumber": "0x1" })),
            Err(RpcError::InvalidReceiptField { field: "transactionHash", .. })
        ));
        assert!(matches!(
            Receipt::from_json(&json!({ "transactionHash": "0xabc", "blockNumber": "0xzz" })),
            Err(RpcError::InvalidReceiptField { field: "blockNumber", .. })
        ));
        assert!(matches!(
            Receipt::from_json(&json!({ "transactionHash": "0xabc", "status": 1 })),
            Err(RpcError::InvalidReceiptField { field: "status", .. })
        ));
    }
}
