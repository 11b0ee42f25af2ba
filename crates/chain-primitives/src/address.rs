// chain-primitives/src/address.rs

use crate::{PrimitiveError, PrimitiveResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 20-byte account or signer address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// Create address from bytes
    /// Deterministic address whose last eight bytes hold `n`, handy for fixtures
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> PrimitiveResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| PrimitiveError::InvalidAddress(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(PrimitiveError::InvalidAddress(format!(
                "expected 20 bytes, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn zero() -> Self {
        Self([0u8; 20])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex() {
        let address = Address::from_low_u64(0xdead_beef);
        let hex = address.to_hex();
        assert!(hex.ends_with("deadbeef"));
        let parsed = Address::from_hex(&hex).unwrap();
        assert_eq!(address, parsed);
    }

    #[test]
    fn test_address_without_prefix() {
        let parsed: Address = "0000000000000000000000000000000000000007".parse().unwrap();
        assert_eq!(parsed, Address::from_low_u64(7));
    }

    #[test]
    fn test_invalid_length() {
        assert!(Address::from_hex("0x1234").is_err());
        assert!(Address::from_hex("0xzz").is_err());
    }

    #[test]
    fn test_zero() {
        assert!(Address::zero().is_zero());
        assert!(!Address::from_low_u64(1).is_zero());
    }
}
