// downtime-slasher/src/orchestrator.rs

//! Assembles and submits downtime slashes.
//!
//! A slash runs through a fixed sequence of stages, each one a round trip to
//! the chain:
//!
//! ```text
//! ResolveWindow -> ResolveSignerIndices -> {PartitionSlots | UseSuppliedSlots}
//!     -> GenerateMissingProofs -> FetchSlashingParameters -> SubmitSlash
//! ```
//!
//! Nothing is retried here. The chain is the only judge of whether the
//! validator was down; local checks are limited to cheap input validation.

use crate::config::SlasherConfig;
use crate::parameters::{fetch_slashing_parameters, SlashingIncentives};
use crate::ports::{ChainCollaborators, DowntimeClaim, GroupMembership, SlashRequest};
use crate::signer::{BoundarySigner, SignerIndexResolver};
use crate::slots::{prove_slots, Slot, SlotPlan, SlotProofReport};
use crate::window::{DowntimeWindow, WindowResolver};
use crate::SlasherResult;
use chain_primitives::{epoch_number_of_block, Address, BlockCount, BlockNumber, Epoch, TxReceipt};
use serde::{Deserialize, Serialize};

/// Everything needed to submit a slash, resolved against current chain state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedSlash {
    pub validator: Address,
    pub membership: GroupMembership,
    pub window: DowntimeWindow,
    pub start_signer: BoundarySigner,
    pub end_signer: BoundarySigner,
    pub slots: Vec<Slot>,
    pub proofs: SlotProofReport,
    pub request: SlashRequest,
}

/// Downtime slashing client
pub struct DowntimeSlasher {
    chain: ChainCollaborators,
    signers: SignerIndexResolver,
    config: SlasherConfig,
}

impl DowntimeSlasher {
    pub fn new(chain: ChainCollaborators, config: SlasherConfig) -> SlasherResult<Self> {
        config.validate()?;
        Ok(Self {
            signers: SignerIndexResolver::new(&chain),
            chain,
            config,
        })
    }

    pub fn config(&self) -> &SlasherConfig {
        &self.config
    }

    pub fn signers(&self) -> &SignerIndexResolver {
        &self.signers
    }

    /// Generated slots at the configured default size
    pub fn default_slot_plan(&self) -> SlotPlan {
        SlotPlan::Generate {
            slot_size: self.config.default_slot_size,
        }
    }

    pub async fn slashable_downtime(&self) -> SlasherResult<BlockCount> {
        self.chain.slasher.slashable_downtime().await
    }

    pub async fn slashing_incentives(&self) -> SlasherResult<SlashingIncentives> {
        self.chain.slasher.slashing_incentives().await
    }

    pub async fn once_per_epoch(&self) -> SlasherResult<bool> {
        self.chain.slasher.once_per_epoch().await
    }

    pub async fn epoch_size(&self) -> SlasherResult<u64> {
        self.chain.slasher.epoch_size().await
    }

    pub async fn epoch_number_of_block(&self, block: BlockNumber) -> SlasherResult<Epoch> {
        Ok(epoch_number_of_block(block, self.epoch_size().await?))
    }

    /// Window of slashable-downtime length for the given bounds.
    ///
    /// The chain head is only queried when both bounds are missing.
    pub async fn resolve_window(
        &self,
        start: Option<BlockNumber>,
        end: Option<BlockNumber>,
    ) -> SlasherResult<DowntimeWindow> {
        let length = self.slashable_downtime().await?;
        let latest = if WindowResolver::needs_head(start, end) {
            Some(self.chain.head.latest_block().await?)
        } else {
            None
        };

        let window = WindowResolver::new(length)
            .with_head_lag(self.config.head_lag)
            .resolve(start, end, latest)?;
        tracing::debug!("Resolved downtime window {} ({} blocks)", window, length);
        Ok(window)
    }

    /// Read-only check of whether the chain considers the signer down.
    ///
    /// Slot proofs must already exist; none are generated here.
    pub async fn was_down(
        &self,
        validator_or_signer: Address,
        start: Option<BlockNumber>,
        end: Option<BlockNumber>,
        plan: &SlotPlan,
    ) -> SlasherResult<bool> {
        let window = self.resolve_window(start, end).await?;
        let epoch_size = self.epoch_size().await?;
        let (start_signer, end_signer) = self
            .signers
            .resolve_boundaries(validator_or_signer, &window, epoch_size)
            .await?;
        let slots = plan.slots_for(&window)?;

        let claim = DowntimeClaim::new(window.start(), &slots, start_signer.index, end_signer.index);
        self.chain.slasher.is_down(&claim).await
    }

    /// Run every stage up to, but not including, submission.
    ///
    /// Slot proofs are generated on chain as a side effect.
    pub async fn build_slash_request(
        &self,
        validator_or_signer: Address,
        start: Option<BlockNumber>,
        end: Option<BlockNumber>,
        plan: &SlotPlan,
    ) -> SlasherResult<PreparedSlash> {
        let window = self.resolve_window(start, end).await?;
        let epoch_size = self.epoch_size().await?;

        let (start_signer, end_signer) = self
            .signers
            .resolve_boundaries(validator_or_signer, &window, epoch_size)
            .await?;
        if self.config.verify_signer_indices {
            self.signers.verify_signer_index(&start_signer).await?;
            self.signers.verify_signer_index(&end_signer).await?;
        }

        let slots = plan.slots_for(&window)?;
        tracing::info!(
            "Slashing {} for window {} over {} slots (signer index {} -> {})",
            validator_or_signer,
            window,
            slots.len(),
            start_signer.index,
            end_signer.index
        );

        let proofs = prove_slots(
            self.chain.slasher.as_ref(),
            &slots,
            self.config.proof_strategy,
            &start_signer,
            &end_signer,
            epoch_size,
        )
        .await?;

        let validator = self
            .signers
            .resolve_validator_account(validator_or_signer)
            .await?;
        let membership = self
            .chain
            .validators
            .get_validator_membership_history_index(validator, window.start())
            .await?;
        let incentives = self.slashing_incentives().await?;
        let params = fetch_slashing_parameters(
            self.chain.locked_gold.as_ref(),
            validator,
            membership.group,
            &incentives.penalty,
        )
        .await?;

        let request = SlashRequest {
            claim: DowntimeClaim::new(
                window.start(),
                &slots,
                start_signer.index,
                end_signer.index,
            ),
            group_membership_history_index: membership.history_index,
            validator_params: params.validator,
            group_params: params.group,
        };

        Ok(PreparedSlash {
            validator,
            membership,
            window,
            start_signer,
            end_signer,
            slots,
            proofs,
            request,
        })
    }

    /// Submit a prepared slash
    pub async fn submit(&self, prepared: &PreparedSlash) -> SlasherResult<TxReceipt> {
        let receipt = self.chain.slasher.slash(&prepared.request).await?;

        match receipt.downtime_slash_for(&prepared.validator) {
            Some(start_block) => tracing::info!(
                "Validator {} slashed from block {} in tx {}",
                prepared.validator,
                start_block,
                receipt.tx_hash
            ),
            None => tracing::warn!(
                "Slash tx {} carries no DowntimeSlashPerformed event for {}",
                receipt.tx_hash,
                prepared.validator
            ),
        }
        Ok(receipt)
    }

    /// Slash `validator_or_signer` for being down over the resolved window
    pub async fn slash(
        &self,
        validator_or_signer: Address,
        start: Option<BlockNumber>,
        end: Option<BlockNumber>,
        plan: &SlotPlan,
    ) -> SlasherResult<TxReceipt> {
        let prepared = self
            .build_slash_request(validator_or_signer, start, end, plan)
            .await?;
        self.submit(&prepared).await
    }
}
