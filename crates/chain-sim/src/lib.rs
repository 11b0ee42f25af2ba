// chain-sim/src/lib.rs

//! In-memory chain for exercising the downtime slasher
//!
//! This crate provides:
//! - A block/epoch registry with elections, signer rotation and group
//!   membership history
//! - Parent-seal bitmaps derived from recorded validator absences
//! - A locked-gold ledger with group vote lists and slashing parameters
//! - A downtime slasher contract with slot accumulators and the full set of
//!   slash-time checks
//!
//! [`ChainSimulator`] implements every port of `downtime_slasher::ports`.

pub mod contracts;
pub mod locked_gold;
pub mod simulator;
pub mod slasher;
pub mod state;

pub use locked_gold::LockedGoldLedger;
pub use simulator::ChainSimulator;
pub use slasher::SlasherContractState;
pub use state::SimState;

use chain_primitives::{Address, BlockNumber};
use downtime_slasher::SlasherError;

/// Maximum number of elected signers a seal bitmap can describe
pub const MAX_ELECTED: usize = 128;

/// Result type for simulated chain calls
pub type SimResult<T> = Result<T, SimError>;

/// Failures of simulated chain calls
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("revert: {0}")]
    Revert(String),

    #[error("unknown validator: {0}")]
    UnknownValidator(Address),

    #[error("unknown signer: {0}")]
    UnknownSigner(Address),

    #[error("block {0} has no parent seal yet")]
    SealUnavailable(BlockNumber),

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<SimError> for SlasherError {
    fn from(err: SimError) -> Self {
        match err {
            SimError::Encoding(reason) => SlasherError::Transport(reason),
            other => SlasherError::ChainRejected(other.to_string()),
        }
    }
}

impl From<chain_primitives::PrimitiveError> for SimError {
    fn from(err: chain_primitives::PrimitiveError) -> Self {
        SimError::Encoding(err.to_string())
    }
}
