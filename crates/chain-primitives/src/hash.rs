// chain-primitives/src/hash.rs

use crate::{PrimitiveError, PrimitiveResult};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// Hash output size in bytes
pub const HASH_SIZE: usize = 32;

/// A 32-byte Keccak-256 hash, used for transaction hashes
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Keccak-256 of arbitrary bytes
    pub fn keccak(data: &[u8]) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Keccak-256 of the bincode encoding of a serializable value
    pub fn of<T: Serialize>(value: &T) -> PrimitiveResult<Self> {
        let bytes =
            bincode::serialize(value).map_err(|e| PrimitiveError::EncodingError(e.to_string()))?;
        Ok(Self::keccak(&bytes))
    }

    pub fn from_slice(slice: &[u8]) -> PrimitiveResult<Self> {
        if slice.len() != HASH_SIZE {
            return Err(PrimitiveError::InvalidHash);
        }
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn zero() -> Self {
        Self([0u8; HASH_SIZE])
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> PrimitiveResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| PrimitiveError::InvalidHash)?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hash({}...{})",
            hex::encode(&self.0[..4]),
            hex::encode(&self.0[28..])
        )
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty() {
        // Well-known Keccak-256 of the empty string
        assert_eq!(
            Hash::keccak(b"").to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_hash_of_is_deterministic() {
        let a = Hash::of(&(1u64, 2u64)).unwrap();
        let b = Hash::of(&(1u64, 2u64)).unwrap();
        let c = Hash::of(&(2u64, 1u64)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hash_hex() {
        let hash = Hash::keccak(b"slot");
        let parsed = Hash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, parsed);
        assert!(Hash::from_hex("0x01").is_err());
    }
}
