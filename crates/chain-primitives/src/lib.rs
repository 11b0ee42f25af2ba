// chain-primitives/src/lib.rs

//! Primitive types shared by the downtime slasher and the chain it talks to
//!
//! This crate provides:
//! - Account/signer addresses and 32-byte hashes
//! - Arbitrary precision token amounts
//! - Block and epoch arithmetic
//! - Transaction receipts and the slasher contract's events

pub mod address;
pub mod epoch;
pub mod hash;
pub mod receipt;
pub mod types;

pub use address::Address;
pub use epoch::{epoch_number_of_block, first_block_of_epoch, last_block_of_epoch};
pub use hash::{Hash, HASH_SIZE};
pub use receipt::{SlasherEvent, TxReceipt};
pub use types::*;

/// Result type for primitive conversions
pub type PrimitiveResult<T> = Result<T, PrimitiveError>;

/// Errors that can occur while parsing or encoding primitives
#[derive(Debug, thiserror::Error)]
pub enum PrimitiveError {
    #[error("Invalid hash")]
    InvalidHash,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
