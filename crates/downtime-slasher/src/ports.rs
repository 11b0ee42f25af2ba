// downtime-slasher/src/ports.rs

//! Outbound ports: the on-chain contracts the slasher depends on.
//!
//! Each trait mirrors the subset of a contract's ABI that the slasher calls.
//! Implementations wrap an RPC client in production and the in-memory chain
//! in tests. Reverts are reported as [`SlasherError::ChainRejected`], RPC
//! failures as [`SlasherError::Transport`].
//!
//! [`SlasherError::ChainRejected`]: crate::SlasherError::ChainRejected
//! [`SlasherError::Transport`]: crate::SlasherError::Transport

use crate::parameters::{
    InitialSlashingParameters, ListItem, ListUpdateParameters, SlashingIncentives,
};
use crate::slots::Slot;
use crate::SlasherResult;
use async_trait::async_trait;
use chain_primitives::{Address, Amount, BlockCount, BlockNumber, SignerIndex, TxReceipt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Source of the current chain head
#[async_trait]
pub trait ChainHead: Send + Sync {
    async fn latest_block(&self) -> SlasherResult<BlockNumber>;
}

#[async_trait]
pub trait AccountsContract: Send + Sync {
    /// Whether `address` is a registered account (as opposed to a signer key)
    async fn is_account(&self, address: Address) -> SlasherResult<bool>;
}

/// Validator registration as seen at some block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    pub signer: Address,
}

/// Group affiliation of a validator at some block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub group: Address,
    /// Position in the validator's membership history
    pub history_index: u64,
}

#[async_trait]
pub trait ValidatorsContract: Send + Sync {
    async fn get_validator(&self, account: Address, block: BlockNumber)
        -> SlasherResult<ValidatorRecord>;

    /// Account that authorized `signer`
    async fn get_validator_from_signer(&self, signer: Address) -> SlasherResult<Address>;

    async fn get_validator_membership_history_index(
        &self,
        validator: Address,
        block: BlockNumber,
    ) -> SlasherResult<GroupMembership>;
}

#[async_trait]
pub trait ElectionContract: Send + Sync {
    /// Elected signers at `block`, in signer-index order
    async fn get_validator_signers(&self, block: BlockNumber) -> SlasherResult<Vec<Address>>;

    async fn validator_signer_address_from_set(
        &self,
        index: SignerIndex,
        block: BlockNumber,
    ) -> SlasherResult<Address>;
}

#[async_trait]
pub trait LockedGoldContract: Send + Sync {
    async fn compute_initial_parameters_for_slashing(
        &self,
        account: Address,
        penalty: &Amount,
    ) -> SlasherResult<InitialSlashingParameters>;

    /// `list` is the eligible-group list returned with the initial parameters
    async fn compute_parameters_for_slashing(
        &self,
        group: Address,
        penalty: &Amount,
        list: &[ListItem],
    ) -> SlasherResult<ListUpdateParameters>;
}

/// Claim that a signer was absent for a whole window, as checked by `isDown`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DowntimeClaim {
    pub window_start: BlockNumber,
    pub start_slots: Vec<BlockNumber>,
    pub end_slots: Vec<BlockNumber>,
    pub start_signer_index: SignerIndex,
    pub end_signer_index: SignerIndex,
}

impl DowntimeClaim {
    pub fn new(
        window_start: BlockNumber,
        slots: &[Slot],
        start_signer_index: SignerIndex,
        end_signer_index: SignerIndex,
    ) -> Self {
        Self {
            window_start,
            start_slots: slots.iter().map(|s| s.start()).collect(),
            end_slots: slots.iter().map(|s| s.end()).collect(),
            start_signer_index,
            end_signer_index,
        }
    }
}

/// Arguments of the slasher contract's `slash` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashRequest {
    pub claim: DowntimeClaim,
    pub group_membership_history_index: u64,
    pub validator_params: ListUpdateParameters,
    pub group_params: ListUpdateParameters,
}

#[async_trait]
pub trait DowntimeSlasherContract: Send + Sync {
    async fn slashable_downtime(&self) -> SlasherResult<BlockCount>;

    async fn slashing_incentives(&self) -> SlasherResult<SlashingIncentives>;

    async fn once_per_epoch(&self) -> SlasherResult<bool>;

    async fn epoch_size(&self) -> SlasherResult<u64>;

    /// Compute and store the signature accumulator for `[start, end]`
    async fn generate_proof_of_slot_validation(
        &self,
        start: BlockNumber,
        end: BlockNumber,
    ) -> SlasherResult<TxReceipt>;

    async fn slot_already_calculated(
        &self,
        start: BlockNumber,
        end: BlockNumber,
    ) -> SlasherResult<bool>;

    async fn is_down(&self, claim: &DowntimeClaim) -> SlasherResult<bool>;

    /// Whether the signer missed every block of an already proven slot
    async fn is_down_for_slot(
        &self,
        slot: Slot,
        start_signer_index: SignerIndex,
        end_signer_index: SignerIndex,
    ) -> SlasherResult<bool>;

    async fn slash(&self, request: &SlashRequest) -> SlasherResult<TxReceipt>;
}

/// Handles to every contract the slasher talks to
#[derive(Clone)]
pub struct ChainCollaborators {
    pub head: Arc<dyn ChainHead>,
    pub accounts: Arc<dyn AccountsContract>,
    pub validators: Arc<dyn ValidatorsContract>,
    pub election: Arc<dyn ElectionContract>,
    pub locked_gold: Arc<dyn LockedGoldContract>,
    pub slasher: Arc<dyn DowntimeSlasherContract>,
}

impl ChainCollaborators {
    /// Use a single backend that implements every port
    pub fn from_shared<T>(chain: Arc<T>) -> Self
    where
        T: ChainHead
            + AccountsContract
            + ValidatorsContract
            + ElectionContract
            + LockedGoldContract
            + DowntimeSlasherContract
            + 'static,
    {
        Self {
            head: chain.clone(),
            accounts: chain.clone(),
            validators: chain.clone(),
            election: chain.clone(),
            locked_gold: chain.clone(),
            slasher: chain,
        }
    }
}
