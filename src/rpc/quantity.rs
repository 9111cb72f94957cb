//! JSON-RPC quantity encoding
//!
//! Quantities are 0x-prefixed lower-case hex without leading zeros, with
//! `0x0` for zero. Leading zeros are tolerated on input.

use super::RpcError;
use alloy::primitives::U256;

pub fn parse_hex_quantity(quantity: &str) -> Result<U256, RpcError> {
    let invalid = || RpcError::InvalidHexQuantity(quantity.to_string());
    let digits = quantity.strip_prefix("0x").ok_or_else(invalid)?;
    if digits.is_empty() || digits.len() > 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    U256::from_str_radix(digits, 16).map_err(|_| invalid())
}

pub fn parse_hex_u64(quantity: &str) -> Result<u64, RpcError> {
    let value = parse_hex_quantity(quantity)?;
    u64::try_from(value).map_err(|_| RpcError::InvalidHexQuantity(quantity.to_string()))
}

/// `"0xff"` -> `"255"`
pub fn hex_to_decimal(quantity: &str) -> Result<String, RpcError> {
    parse_hex_quantity(quantity).map(|value| value.to_string())
}

/// `"255"` -> `"0xff"`
pub fn decimal_to_hex(decimal: &str) -> Result<String, RpcError> {
    let invalid = || RpcError::InvalidDecimalQuantity(decimal.to_string());
    if decimal.is_empty() || !decimal.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let value = U256::from_str_radix(decimal, 10).map_err(|_| invalid())?;
    Ok(to_hex_quantity(value))
}

pub(crate) fn to_hex_quantity(value: U256) -> String {
    if value.is_zero() {
        "0x0".to_string()
    } else {
        format!("0x{:x}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_both_directions() {
        assert_eq!(hex_to_decimal("0x0").unwrap(), "0");
        assert_eq!(hex_to_decimal("0xff").unwrap(), "255");
        assert_eq!(decimal_to_hex("0").unwrap(), "0x0");
        assert_eq!(decimal_to_hex("255").unwrap(), "0xff");
        assert_eq!(decimal_to_hex("1000000000000000000").unwrap(), "0xde0b6b3a7640000");
    }

    #[test]
    fn tolerates_leading_zeros_and_upper_case_on_input() {
        assert_eq!(hex_to_decimal("0x00ff").unwrap(), "255");
        assert_eq!(hex_to_decimal("0xFF").unwrap(), "255");
    }

    #[test]
    fn rejects_malformed_hex() {
        let too_wide = format!("0x1{}", "0".repeat(64));
        for bad in ["0xzz", "ff", "0x", "", "0x-1", too_wide.as_str()] {
            assert!(
                matches!(hex_to_decimal(bad), Err(RpcError::InvalidHexQuantity(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn rejects_malformed_decimal() {
        for bad in ["", "-1", "1.5", "0x10", " 1"] {
            assert!(matches!(
                decimal_to_hex(bad),
                Err(RpcError::InvalidDecimalQuantity(_))
            ));
        }
    }

    #[test]
    fn u64_quantities_reject_overflow() {
        assert_eq!(parse_hex_u64("0x2a").unwrap(), 42);
        assert!(parse_hex_u64("0x10000000000000000").is_err());
    }
}
