// chain-sim/src/contracts.rs

//! Contract ports backed by the simulated chain.

use crate::simulator::ChainSimulator;
use crate::SimError;
use async_trait::async_trait;
use chain_primitives::{Address, Amount, BlockCount, BlockNumber, SignerIndex, TxReceipt};
use downtime_slasher::{
    AccountsContract, ChainHead, DowntimeClaim, DowntimeSlasherContract, ElectionContract,
    GroupMembership, InitialSlashingParameters, ListItem, ListUpdateParameters,
    LockedGoldContract, SlashRequest, SlasherResult, SlashingIncentives, Slot, ValidatorRecord,
    ValidatorsContract,
};

#[async_trait]
impl ChainHead for ChainSimulator {
    async fn latest_block(&self) -> SlasherResult<BlockNumber> {
        Ok(self.head())
    }
}

#[async_trait]
impl AccountsContract for ChainSimulator {
    async fn is_account(&self, address: Address) -> SlasherResult<bool> {
        Ok(self.state.read().accounts.contains(&address))
    }
}

#[async_trait]
impl ValidatorsContract for ChainSimulator {
    async fn get_validator(
        &self,
        account: Address,
        block: BlockNumber,
    ) -> SlasherResult<ValidatorRecord> {
        let signer = self.state.read().signer_at(&account, block)?;
        Ok(ValidatorRecord { signer })
    }

    async fn get_validator_from_signer(&self, signer: Address) -> SlasherResult<Address> {
        Ok(self.state.read().validator_from_signer(&signer)?)
    }

    async fn get_validator_membership_history_index(
        &self,
        validator: Address,
        block: BlockNumber,
    ) -> SlasherResult<GroupMembership> {
        let (group, history_index) = self.state.read().membership_at(&validator, block)?;
        Ok(GroupMembership {
            group,
            history_index,
        })
    }
}

#[async_trait]
impl ElectionContract for ChainSimulator {
    async fn get_validator_signers(&self, block: BlockNumber) -> SlasherResult<Vec<Address>> {
        Ok(self.state.read().elected_signers_at(block)?)
    }

    async fn validator_signer_address_from_set(
        &self,
        index: SignerIndex,
        block: BlockNumber,
    ) -> SlasherResult<Address> {
        let signers = self.state.read().elected_signers_at(block)?;
        let signer = signers.get(index as usize).copied().ok_or_else(|| {
            SimError::Revert(format!("no elected signer at index {} for block {}", index, block))
        })?;
        Ok(signer)
    }
}

#[async_trait]
impl LockedGoldContract for ChainSimulator {
    async fn compute_initial_parameters_for_slashing(
        &self,
        account: Address,
        penalty: &Amount,
    ) -> SlasherResult<InitialSlashingParameters> {
        Ok(self
            .state
            .read()
            .ledger
            .compute_initial_parameters(&account, penalty))
    }

    async fn compute_parameters_for_slashing(
        &self,
        group: Address,
        penalty: &Amount,
        list: &[ListItem],
    ) -> SlasherResult<ListUpdateParameters> {
        Ok(self
            .state
            .read()
            .ledger
            .compute_parameters(&group, penalty, list))
    }
}

#[async_trait]
impl DowntimeSlasherContract for ChainSimulator {
    async fn slashable_downtime(&self) -> SlasherResult<BlockCount> {
        Ok(self.state.read().slasher.slashable_downtime)
    }

    async fn slashing_incentives(&self) -> SlasherResult<SlashingIncentives> {
        Ok(self.state.read().slasher.incentives.clone())
    }

    async fn once_per_epoch(&self) -> SlasherResult<bool> {
        Ok(self.state.read().slasher.once_per_epoch)
    }

    async fn epoch_size(&self) -> SlasherResult<u64> {
        Ok(self.epoch_size())
    }

    async fn generate_proof_of_slot_validation(
        &self,
        start: BlockNumber,
        end: BlockNumber,
    ) -> SlasherResult<TxReceipt> {
        Ok(self
            .state
            .write()
            .generate_proof_of_slot_validation(start, end)?)
    }

    async fn slot_already_calculated(
        &self,
        start: BlockNumber,
        end: BlockNumber,
    ) -> SlasherResult<bool> {
        Ok(self.slot_calculated(start, end))
    }

    async fn is_down(&self, claim: &DowntimeClaim) -> SlasherResult<bool> {
        Ok(self.state.read().is_down(claim)?)
    }

    async fn is_down_for_slot(
        &self,
        slot: Slot,
        start_signer_index: SignerIndex,
        end_signer_index: SignerIndex,
    ) -> SlasherResult<bool> {
        Ok(self.state.read().is_down_for_slot(
            slot.start(),
            slot.end(),
            start_signer_index,
            end_signer_index,
        )?)
    }

    async fn slash(&self, request: &SlashRequest) -> SlasherResult<TxReceipt> {
        let receipt = self.state.write().slash(request, self.sender())?;
        Ok(receipt)
    }
}
