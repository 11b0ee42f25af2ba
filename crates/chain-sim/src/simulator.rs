// chain-sim/src/simulator.rs

use crate::state::{SimState, ValidatorEntry};
use crate::{SimError, SimResult};
use chain_primitives::{Address, Amount, BlockCount, BlockNumber, Epoch, SlasherEvent, TxReceipt};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to a simulated chain.
///
/// Clones share the same state. Transactions sent through the contract ports
/// are attributed to `sender`, which collects slashing rewards.
#[derive(Debug, Clone)]
pub struct ChainSimulator {
    pub(crate) state: Arc<RwLock<SimState>>,
    sender: Address,
}

impl ChainSimulator {
    pub fn new(epoch_size: u64) -> Self {
        Self {
            state: Arc::new(RwLock::new(SimState::new(epoch_size))),
            sender: Address::zero(),
        }
    }

    /// Handle onto the same chain that sends transactions as `sender`
    pub fn with_sender(&self, sender: Address) -> Self {
        Self {
            state: self.state.clone(),
            sender,
        }
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    pub fn head(&self) -> BlockNumber {
        self.state.read().head
    }

    pub fn epoch_size(&self) -> u64 {
        self.state.read().epoch_size
    }

    pub fn mine_blocks(&self, count: BlockCount) -> BlockNumber {
        let mut state = self.state.write();
        state.head = state.head.saturating_add(count);
        state.head
    }

    pub fn mine_to(&self, block: BlockNumber) -> SimResult<()> {
        let mut state = self.state.write();
        if block < state.head {
            return Err(SimError::Revert(format!(
                "cannot rewind head from {} to {}",
                state.head, block
            )));
        }
        state.head = block;
        Ok(())
    }

    pub fn register_group(&self, group: Address) {
        let mut state = self.state.write();
        state.accounts.insert(group);
        state.ledger.mark_eligible(group);
    }

    /// Register `validator` with `signer` and `group` from epoch 0
    pub fn register_validator(&self, validator: Address, signer: Address, group: Address) -> SimResult<()> {
        let mut state = self.state.write();
        if !state.accounts.contains(&group) {
            return Err(SimError::Revert(format!("group {} is not registered", group)));
        }
        if state.signer_accounts.contains_key(&signer) {
            return Err(SimError::Revert(format!("signer {} already authorized", signer)));
        }

        let mut entry = ValidatorEntry::default();
        entry.signers.insert(0, signer);
        entry.memberships.insert(0, group);
        state.accounts.insert(validator);
        state.validators.insert(validator, entry);
        state.signer_accounts.insert(signer, validator);
        tracing::debug!("Registered validator {} with signer {} in group {}", validator, signer, group);
        Ok(())
    }

    /// Rotate the signer of `validator` starting at `from_epoch`
    pub fn authorize_signer(&self, validator: Address, signer: Address, from_epoch: Epoch) -> SimResult<()> {
        let mut state = self.state.write();
        if state.signer_accounts.contains_key(&signer) {
            return Err(SimError::Revert(format!("signer {} already authorized", signer)));
        }
        state
            .validators
            .get_mut(&validator)
            .ok_or(SimError::UnknownValidator(validator))?
            .signers
            .insert(from_epoch, signer);
        state.signer_accounts.insert(signer, validator);
        Ok(())
    }

    /// Move `validator` to `group` starting at `from_epoch`
    pub fn affiliate(&self, validator: Address, group: Address, from_epoch: Epoch) -> SimResult<()> {
        let mut state = self.state.write();
        if !state.accounts.contains(&group) {
            return Err(SimError::Revert(format!("group {} is not registered", group)));
        }
        state
            .validators
            .get_mut(&validator)
            .ok_or(SimError::UnknownValidator(validator))?
            .memberships
            .insert(from_epoch, group);
        Ok(())
    }

    /// Set the elected validators for `epoch` and every later epoch without its own election
    pub fn elect(&self, epoch: Epoch, validators: &[Address]) -> SimResult<()> {
        SimState::check_election_size(validators)?;
        let mut state = self.state.write();
        if let Some(unknown) = validators.iter().find(|v| !state.validators.contains_key(*v)) {
            return Err(SimError::UnknownValidator(*unknown));
        }
        state.elections.insert(epoch, validators.to_vec());
        Ok(())
    }

    /// `validator` signs none of the blocks in `[start, end]`
    pub fn mark_absent(&self, validator: Address, start: BlockNumber, end: BlockNumber) -> SimResult<()> {
        let mut state = self.state.write();
        state
            .validators
            .get_mut(&validator)
            .ok_or(SimError::UnknownValidator(validator))?
            .absences
            .push((start, end));
        Ok(())
    }

    pub fn lock_gold(&self, account: Address, amount: u64) {
        self.state.write().ledger.lock(account, &Amount::from_u64(amount));
    }

    pub fn vote(&self, voter: Address, group: Address, amount: u64) -> SimResult<()> {
        self.state
            .write()
            .ledger
            .vote(voter, group, &Amount::from_u64(amount))
    }

    pub fn locked_gold_balance(&self, account: &Address) -> Amount {
        self.state.read().ledger.locked_balance(account)
    }

    pub fn set_slashing_incentives(&self, penalty: u64, reward: u64) -> SimResult<TxReceipt> {
        self.state
            .write()
            .set_slashing_incentives(Amount::from_u64(penalty), Amount::from_u64(reward))
    }

    pub fn set_slashable_downtime(&self, interval: BlockCount) -> SimResult<TxReceipt> {
        self.state.write().set_slashable_downtime(interval)
    }

    pub fn set_once_per_epoch(&self, once_per_epoch: bool) -> SimResult<TxReceipt> {
        self.state.write().set_once_per_epoch(once_per_epoch)
    }

    pub fn set_outer_bound_checks(&self, enabled: bool) {
        self.state.write().slasher.outer_bound_checks = enabled;
    }

    /// Every event emitted so far, oldest first
    pub fn events(&self) -> Vec<SlasherEvent> {
        self.state.read().events.clone()
    }

    pub fn slashed_windows(&self, validator: &Address) -> Vec<(BlockNumber, BlockNumber)> {
        self.state.read().slasher.slashed_windows(validator).to_vec()
    }

    pub fn slot_calculated(&self, start: BlockNumber, end: BlockNumber) -> bool {
        self.state.read().slasher.slot_calculated(start, end)
    }
}
