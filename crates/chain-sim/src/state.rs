// chain-sim/src/state.rs

use crate::locked_gold::LockedGoldLedger;
use crate::slasher::SlasherContractState;
use crate::{SimError, SimResult, MAX_ELECTED};
use chain_primitives::{
    epoch_number_of_block, Address, BlockNumber, Epoch, Hash, SignerIndex, SlasherEvent, TxReceipt,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Registration of a validator account
#[derive(Debug, Clone, Default)]
pub struct ValidatorEntry {
    /// Signer key by the epoch it takes effect in
    pub signers: BTreeMap<Epoch, Address>,
    /// Group affiliation by the epoch it takes effect in
    pub memberships: BTreeMap<Epoch, Address>,
    /// Inclusive block ranges in which the validator did not sign
    pub absences: Vec<(BlockNumber, BlockNumber)>,
}

impl ValidatorEntry {
    fn signed(&self, block: BlockNumber) -> bool {
        !self
            .absences
            .iter()
            .any(|&(start, end)| start <= block && block <= end)
    }
}

/// Complete simulated chain state
#[derive(Debug)]
pub struct SimState {
    pub epoch_size: u64,
    pub head: BlockNumber,
    pub accounts: HashSet<Address>,
    pub validators: HashMap<Address, ValidatorEntry>,
    pub signer_accounts: HashMap<Address, Address>,
    /// Elected validator accounts in signer-index order; an epoch without an
    /// entry keeps the previous election
    pub elections: BTreeMap<Epoch, Vec<Address>>,
    pub ledger: LockedGoldLedger,
    pub slasher: SlasherContractState,
    pub events: Vec<SlasherEvent>,
    tx_count: u64,
}

impl SimState {
    pub fn new(epoch_size: u64) -> Self {
        Self {
            epoch_size: epoch_size.max(1),
            head: 0,
            accounts: HashSet::new(),
            validators: HashMap::new(),
            signer_accounts: HashMap::new(),
            elections: BTreeMap::new(),
            ledger: LockedGoldLedger::default(),
            slasher: SlasherContractState::default(),
            events: Vec::new(),
            tx_count: 0,
        }
    }

    pub fn epoch_of(&self, block: BlockNumber) -> Epoch {
        epoch_number_of_block(block, self.epoch_size)
    }

    fn validator(&self, account: &Address) -> SimResult<&ValidatorEntry> {
        self.validators
            .get(account)
            .ok_or(SimError::UnknownValidator(*account))
    }

    /// Signer key of `validator` during the epoch of `block`
    pub fn signer_at(&self, validator: &Address, block: BlockNumber) -> SimResult<Address> {
        let epoch = self.epoch_of(block);
        self.validator(validator)?
            .signers
            .range(..=epoch)
            .next_back()
            .map(|(_, signer)| *signer)
            .ok_or(SimError::UnknownValidator(*validator))
    }

    pub fn validator_from_signer(&self, signer: &Address) -> SimResult<Address> {
        self.signer_accounts
            .get(signer)
            .copied()
            .ok_or(SimError::UnknownSigner(*signer))
    }

    /// Group of `validator` at `block` and the position of that entry in its history
    pub fn membership_at(&self, validator: &Address, block: BlockNumber) -> SimResult<(Address, u64)> {
        let epoch = self.epoch_of(block);
        let entry = self.validator(validator)?;
        entry
            .memberships
            .range(..=epoch)
            .next_back()
            .map(|(from, group)| {
                let index = entry.memberships.range(..*from).count() as u64;
                (*group, index)
            })
            .ok_or_else(|| {
                SimError::Revert(format!("{} had no group at block {}", validator, block))
            })
    }

    /// Elected validator accounts at `block`
    pub fn elected_at(&self, block: BlockNumber) -> &[Address] {
        let epoch = self.epoch_of(block);
        self.elections
            .range(..=epoch)
            .next_back()
            .map(|(_, elected)| elected.as_slice())
            .unwrap_or(&[])
    }

    pub fn elected_signers_at(&self, block: BlockNumber) -> SimResult<Vec<Address>> {
        self.elected_at(block)
            .iter()
            .map(|validator| self.signer_at(validator, block))
            .collect()
    }

    /// Signer-index position of `validator` at `block`, if elected
    pub fn signer_index_of(&self, validator: &Address, block: BlockNumber) -> Option<SignerIndex> {
        self.elected_at(block)
            .iter()
            .position(|v| v == validator)
            .map(|i| i as SignerIndex)
    }

    /// Bitmap of the elected signers that signed `block`.
    ///
    /// The bitmap is carried by the parent seal of `block + 1`, so it only
    /// exists once that block has been mined.
    pub fn seal_bitmap(&self, block: BlockNumber) -> SimResult<u128> {
        if block >= self.head {
            return Err(SimError::SealUnavailable(block));
        }

        let mut bitmap = 0u128;
        for (index, validator) in self.elected_at(block).iter().enumerate() {
            if self.validator(validator)?.signed(block) {
                bitmap |= 1u128 << index;
            }
        }
        Ok(bitmap)
    }

    pub fn check_election_size(elected: &[Address]) -> SimResult<()> {
        if elected.len() > MAX_ELECTED {
            return Err(SimError::Revert(format!(
                "cannot elect {} validators, at most {}",
                elected.len(),
                MAX_ELECTED
            )));
        }
        Ok(())
    }

    /// Record a transaction at the current head
    pub fn record_tx<T: Serialize>(
        &mut self,
        kind: &str,
        payload: &T,
        events: Vec<SlasherEvent>,
    ) -> SimResult<TxReceipt> {
        self.tx_count += 1;
        let tx_hash = Hash::of(&(self.tx_count, kind, payload))?;
        self.events.extend(events.iter().cloned());
        Ok(TxReceipt {
            tx_hash,
            block_number: self.head,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> (SimState, Address, Address) {
        let mut state = SimState::new(10);
        let a = Address::from_low_u64(1);
        let b = Address::from_low_u64(2);
        for (validator, signer) in [(a, 11), (b, 12)] {
            let mut entry = ValidatorEntry::default();
            entry.signers.insert(0, Address::from_low_u64(signer));
            entry.memberships.insert(0, Address::from_low_u64(100));
            state.validators.insert(validator, entry);
        }
        state.elections.insert(1, vec![a, b]);
        state.elections.insert(3, vec![b]);
        state.head = 50;
        (state, a, b)
    }

    #[test]
    fn test_elections_carry_forward() {
        let (state, a, b) = state();
        assert_eq!(state.elected_at(15), &[a, b]);
        assert_eq!(state.elected_at(25), &[b]);
        assert!(state.elected_at(0).is_empty());
        assert_eq!(state.signer_index_of(&b, 5), Some(1));
        assert_eq!(state.signer_index_of(&a, 25), None);
    }

    #[test]
    fn test_seal_bitmap() {
        let (mut state, a, _) = state();
        state.validators.get_mut(&a).unwrap().absences.push((5, 7));

        assert_eq!(state.seal_bitmap(4).unwrap(), 0b11);
        assert_eq!(state.seal_bitmap(6).unwrap(), 0b10);
        assert!(matches!(state.seal_bitmap(50), Err(SimError::SealUnavailable(50))));
    }

    #[test]
    fn test_signer_rotation_and_membership_history() {
        let (mut state, a, _) = state();
        let entry = state.validators.get_mut(&a).unwrap();
        entry.signers.insert(2, Address::from_low_u64(21));
        entry.memberships.insert(2, Address::from_low_u64(200));

        assert_eq!(state.signer_at(&a, 10).unwrap(), Address::from_low_u64(11));
        assert_eq!(state.signer_at(&a, 11).unwrap(), Address::from_low_u64(21));
        assert_eq!(
            state.membership_at(&a, 10).unwrap(),
            (Address::from_low_u64(100), 0)
        );
        assert_eq!(
            state.membership_at(&a, 11).unwrap(),
            (Address::from_low_u64(200), 1)
        );
    }
}
