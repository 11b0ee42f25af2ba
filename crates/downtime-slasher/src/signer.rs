// downtime-slasher/src/signer.rs

use crate::ports::{AccountsContract, ChainCollaborators, ElectionContract, ValidatorsContract};
use crate::window::DowntimeWindow;
use crate::{SlasherError, SlasherResult};
use chain_primitives::{Address, BlockNumber, SignerIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A signer and its position in the elected set, pinned to one block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundarySigner {
    pub block: BlockNumber,
    pub signer: Address,
    pub index: SignerIndex,
}

/// Maps validators and signers to elected-set indices at given blocks
#[derive(Clone)]
pub struct SignerIndexResolver {
    accounts: Arc<dyn AccountsContract>,
    validators: Arc<dyn ValidatorsContract>,
    election: Arc<dyn ElectionContract>,
}

impl SignerIndexResolver {
    pub fn new(chain: &ChainCollaborators) -> Self {
        Self {
            accounts: chain.accounts.clone(),
            validators: chain.validators.clone(),
            election: chain.election.clone(),
        }
    }

    /// Signer key of `validator_or_signer` at `block`
    pub async fn signer_at(
        &self,
        validator_or_signer: Address,
        block: BlockNumber,
    ) -> SlasherResult<Address> {
        if self.accounts.is_account(validator_or_signer).await? {
            Ok(self.validators.get_validator(validator_or_signer, block).await?.signer)
        } else {
            Ok(validator_or_signer)
        }
    }

    /// Validator account behind `validator_or_signer`
    pub async fn resolve_validator_account(
        &self,
        validator_or_signer: Address,
    ) -> SlasherResult<Address> {
        if self.accounts.is_account(validator_or_signer).await? {
            Ok(validator_or_signer)
        } else {
            self.validators.get_validator_from_signer(validator_or_signer).await
        }
    }

    /// Index of the validator's signer in the elected set at `block`
    pub async fn resolve_signer_index(
        &self,
        validator_or_signer: Address,
        block: BlockNumber,
    ) -> SlasherResult<BoundarySigner> {
        let signer = self.signer_at(validator_or_signer, block).await?;
        let elected = self.election.get_validator_signers(block).await?;

        let index = elected
            .iter()
            .position(|s| *s == signer)
            .ok_or(SlasherError::SignerNotElected { signer, block })?;

        Ok(BoundarySigner {
            block,
            signer,
            index: index as SignerIndex,
        })
    }

    /// Confirm the elected set still holds the signer at the recorded index
    pub async fn verify_signer_index(&self, boundary: &BoundarySigner) -> SlasherResult<()> {
        let at_index = self
            .election
            .validator_signer_address_from_set(boundary.index, boundary.block)
            .await?;
        if at_index != boundary.signer {
            return Err(SlasherError::SignerIndexMismatch {
                index: boundary.index,
                block: boundary.block,
            });
        }
        Ok(())
    }

    /// Signer indices at the first and last block of `window`.
    ///
    /// The two lookups are independent: across an epoch change the same
    /// validator can sit at a different index, or use a different signer.
    pub async fn resolve_boundaries(
        &self,
        validator_or_signer: Address,
        window: &DowntimeWindow,
        epoch_size: u64,
    ) -> SlasherResult<(BoundarySigner, BoundarySigner)> {
        let start = self
            .resolve_signer_index(validator_or_signer, window.start())
            .await?;
        let end = self
            .resolve_signer_index(validator_or_signer, window.end())
            .await?;

        if window.crosses_epoch_boundary(epoch_size) {
            let (first, last) = window.epochs(epoch_size);
            tracing::debug!(
                "Window {} spans epochs {} and {}: signer index {} -> {}",
                window,
                first,
                last,
                start.index,
                end.index
            );
        }

        Ok((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{
        InitialSlashingParameters, ListItem, ListUpdateParameters, SlashingIncentives,
    };
    use crate::ports::{
        ChainHead, DowntimeClaim, DowntimeSlasherContract, GroupMembership, LockedGoldContract,
        SlashRequest, ValidatorRecord,
    };
    use crate::slots::Slot;
    use async_trait::async_trait;
    use chain_primitives::{Amount, BlockCount, TxReceipt};

    const EPOCH: u64 = 10;

    /// Registry double: one validator whose signer rotates at epoch 2, and
    /// whose index moves from 0 to 1 at the same time
    struct Registry {
        validator: Address,
        old_signer: Address,
        new_signer: Address,
        other: Address,
    }

    impl Registry {
        fn new() -> Self {
            Self {
                validator: Address::from_low_u64(1),
                old_signer: Address::from_low_u64(11),
                new_signer: Address::from_low_u64(12),
                other: Address::from_low_u64(99),
            }
        }
    }

    #[async_trait]
    impl ChainHead for Registry {
        async fn latest_block(&self) -> SlasherResult<BlockNumber> {
            Ok(100)
        }
    }

    #[async_trait]
    impl AccountsContract for Registry {
        async fn is_account(&self, address: Address) -> SlasherResult<bool> {
            Ok(address == self.validator)
        }
    }

    #[async_trait]
    impl ValidatorsContract for Registry {
        async fn get_validator(
            &self,
            _account: Address,
            block: BlockNumber,
        ) -> SlasherResult<ValidatorRecord> {
            let signer = if block <= EPOCH {
                self.old_signer
            } else {
                self.new_signer
            };
            Ok(ValidatorRecord { signer })
        }

        async fn get_validator_from_signer(&self, signer: Address) -> SlasherResult<Address> {
            if signer == self.old_signer || signer == self.new_signer {
                Ok(self.validator)
            } else {
                Err(SlasherError::ChainRejected("unknown signer".into()))
            }
        }

        async fn get_validator_membership_history_index(
            &self,
            _validator: Address,
            _block: BlockNumber,
        ) -> SlasherResult<GroupMembership> {
            unreachable!()
        }
    }

    #[async_trait]
    impl ElectionContract for Registry {
        async fn get_validator_signers(&self, block: BlockNumber) -> SlasherResult<Vec<Address>> {
            if block <= EPOCH {
                Ok(vec![self.old_signer, self.other])
            } else if block <= 2 * EPOCH {
                Ok(vec![self.other, self.new_signer])
            } else {
                Ok(vec![self.other])
            }
        }

        async fn validator_signer_address_from_set(
            &self,
            index: SignerIndex,
            block: BlockNumber,
        ) -> SlasherResult<Address> {
            let signers = self.get_validator_signers(block).await?;
            signers
                .get(index as usize)
                .copied()
                .ok_or_else(|| SlasherError::ChainRejected("index out of range".into()))
        }
    }

    #[async_trait]
    impl LockedGoldContract for Registry {
        async fn compute_initial_parameters_for_slashing(
            &self,
            _account: Address,
            _penalty: &Amount,
        ) -> SlasherResult<InitialSlashingParameters> {
            unreachable!()
        }

        async fn compute_parameters_for_slashing(
            &self,
            _group: Address,
            _penalty: &Amount,
            _list: &[ListItem],
        ) -> SlasherResult<ListUpdateParameters> {
            unreachable!()
        }
    }

    #[async_trait]
    impl DowntimeSlasherContract for Registry {
        async fn slashable_downtime(&self) -> SlasherResult<BlockCount> {
            unreachable!()
        }
        async fn slashing_incentives(&self) -> SlasherResult<SlashingIncentives> {
            unreachable!()
        }
        async fn once_per_epoch(&self) -> SlasherResult<bool> {
            unreachable!()
        }
        async fn epoch_size(&self) -> SlasherResult<u64> {
            Ok(EPOCH)
        }
        async fn generate_proof_of_slot_validation(
            &self,
            _start: BlockNumber,
            _end: BlockNumber,
        ) -> SlasherResult<TxReceipt> {
            unreachable!()
        }
        async fn slot_already_calculated(
            &self,
            _start: BlockNumber,
            _end: BlockNumber,
        ) -> SlasherResult<bool> {
            unreachable!()
        }
        async fn is_down(&self, _claim: &DowntimeClaim) -> SlasherResult<bool> {
            unreachable!()
        }
        async fn is_down_for_slot(
            &self,
            _slot: Slot,
            _start_signer_index: SignerIndex,
            _end_signer_index: SignerIndex,
        ) -> SlasherResult<bool> {
            unreachable!()
        }
        async fn slash(&self, _request: &SlashRequest) -> SlasherResult<TxReceipt> {
            unreachable!()
        }
    }

    fn resolver() -> (SignerIndexResolver, Registry) {
        let registry = Registry::new();
        let chain = ChainCollaborators::from_shared(Arc::new(Registry::new()));
        (SignerIndexResolver::new(&chain), registry)
    }

    #[tokio::test]
    async fn test_account_resolves_through_validators() {
        let (resolver, registry) = resolver();
        let boundary = resolver.resolve_signer_index(registry.validator, 5).await.unwrap();
        assert_eq!(boundary.signer, registry.old_signer);
        assert_eq!(boundary.index, 0);
        assert_eq!(boundary.block, 5);
    }

    #[tokio::test]
    async fn test_raw_signer_is_used_directly() {
        let (resolver, registry) = resolver();
        let boundary = resolver.resolve_signer_index(registry.new_signer, 15).await.unwrap();
        assert_eq!(boundary.index, 1);
        assert_eq!(
            resolver.resolve_validator_account(registry.new_signer).await.unwrap(),
            registry.validator
        );
    }

    #[tokio::test]
    async fn test_not_elected() {
        let (resolver, registry) = resolver();
        let result = resolver.resolve_signer_index(registry.validator, 25).await;
        assert!(matches!(
            result,
            Err(SlasherError::SignerNotElected { block: 25, .. })
        ));
    }

    #[tokio::test]
    async fn test_boundaries_differ_across_epochs() {
        let (resolver, registry) = resolver();
        let window = DowntimeWindow::starting_at(8, 6).unwrap();

        let (start, end) = resolver
            .resolve_boundaries(registry.validator, &window, EPOCH)
            .await
            .unwrap();

        assert_eq!(start.index, 0);
        assert_eq!(start.signer, registry.old_signer);
        assert_eq!(end.index, 1);
        assert_eq!(end.signer, registry.new_signer);
    }

    #[tokio::test]
    async fn test_verify_signer_index() {
        let (resolver, registry) = resolver();
        let boundary = resolver.resolve_signer_index(registry.validator, 5).await.unwrap();
        resolver.verify_signer_index(&boundary).await.unwrap();

        let stale = BoundarySigner { block: 15, ..boundary };
        assert!(matches!(
            resolver.verify_signer_index(&stale).await,
            Err(SlasherError::SignerIndexMismatch { index: 0, block: 15 })
        ));
    }
}
