// downtime-slasher/src/lib.rs

//! Slot-based downtime slashing client
//!
//! This crate assembles downtime slashing transactions for a
//! `DowntimeSlasherSlots` style contract:
//! - Resolves the block window to evaluate (relative to the chain head when
//!   no bound is given)
//! - Partitions the window into contiguous slots, or accepts caller supplied
//!   ones, and makes sure every slot has an on-chain validation proof
//! - Looks up the validator's signer index at both ends of the window, which
//!   may differ when an epoch boundary falls inside it
//! - Fetches fresh locked-gold list parameters and submits the slash
//!
//! Every check that matters for consensus happens on chain. The contracts are
//! reached through the async traits in [`ports`].

pub mod config;
pub mod orchestrator;
pub mod parameters;
pub mod ports;
pub mod signer;
pub mod slots;
pub mod window;

pub use config::SlasherConfig;
pub use orchestrator::{DowntimeSlasher, PreparedSlash};
pub use parameters::{
    InitialSlashingParameters, ListItem, ListUpdateParameters, SlashingIncentives,
    SlashingParameters,
};
pub use ports::{
    AccountsContract, ChainCollaborators, ChainHead, DowntimeClaim, DowntimeSlasherContract,
    ElectionContract, GroupMembership, LockedGoldContract, SlashRequest, ValidatorRecord,
    ValidatorsContract,
};
pub use signer::{BoundarySigner, SignerIndexResolver};
pub use slots::{
    partition, prove_slots, slot_signer_indices, ProofStrategy, Slot, SlotPlan, SlotProofReport,
};
pub use window::{DowntimeWindow, WindowResolver};

use chain_primitives::{Address, BlockNumber, SignerIndex};

/// Result type for slashing operations
pub type SlasherResult<T> = Result<T, SlasherError>;

/// Errors that can occur while preparing or submitting a downtime slash
#[derive(Debug, thiserror::Error)]
pub enum SlasherError {
    #[error("Invalid window length: {0}")]
    InvalidWindowLength(String),

    #[error("Invalid slot size {0}: slots must span at least two blocks")]
    InvalidSlotSize(u64),

    #[error("Invalid slot [{start}, {end}]")]
    InvalidSlot { start: BlockNumber, end: BlockNumber },

    #[error("Supplied slot bounds differ in length: {starts} starts, {ends} ends")]
    SlotBoundsMismatch { starts: usize, ends: usize },

    #[error("Signer {signer} was not elected at block {block}")]
    SignerNotElected { signer: Address, block: BlockNumber },

    #[error("Signer index {index} does not match the elected set at block {block}")]
    SignerIndexMismatch { index: SignerIndex, block: BlockNumber },

    #[error("Validator signed within slot [{start}, {end}]")]
    ValidatorNotDown { start: BlockNumber, end: BlockNumber },

    #[error("Rejected by chain: {0}")]
    ChainRejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SlasherError {
    /// Whether resubmitting the same request could succeed.
    ///
    /// Only transport failures qualify; everything else is a property of the
    /// inputs or of chain state that a blind retry will not change.
    pub fn is_transient(&self) -> bool {
        matches!(self, SlasherError::Transport(_))
    }
}
