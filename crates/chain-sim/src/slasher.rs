// chain-sim/src/slasher.rs

//! Downtime slasher contract logic.
//!
//! Slot proofs OR together the seal bitmaps of every block in the slot,
//! keeping one accumulator per epoch the slot touches. A signer is down for a
//! slot when its bit is clear in every accumulator.

use crate::state::SimState;
use crate::{SimError, SimResult};
use chain_primitives::{
    Address, Amount, BlockCount, BlockNumber, Epoch, SignerIndex, SlasherEvent, TxReceipt,
};
use downtime_slasher::{DowntimeClaim, SlashRequest, SlashingIncentives};
use std::collections::{BTreeMap, HashMap};

/// Storage of the downtime slasher contract
#[derive(Debug, Clone)]
pub struct SlasherContractState {
    pub slashable_downtime: BlockCount,
    pub incentives: SlashingIncentives,
    pub once_per_epoch: bool,
    /// Require the validator to have signed the blocks right outside the window
    pub outer_bound_checks: bool,
    accumulators: HashMap<(BlockNumber, BlockNumber), BTreeMap<Epoch, u128>>,
    slashed_windows: HashMap<Address, Vec<(BlockNumber, BlockNumber)>>,
    last_slashed_epoch: HashMap<Address, Epoch>,
}

impl Default for SlasherContractState {
    fn default() -> Self {
        Self {
            slashable_downtime: 12,
            incentives: SlashingIncentives {
                penalty: Amount::from_u64(10_000),
                reward: Amount::from_u64(100),
            },
            once_per_epoch: false,
            outer_bound_checks: true,
            accumulators: HashMap::new(),
            slashed_windows: HashMap::new(),
            last_slashed_epoch: HashMap::new(),
        }
    }
}

impl SlasherContractState {
    pub fn slot_calculated(&self, start: BlockNumber, end: BlockNumber) -> bool {
        self.accumulators.contains_key(&(start, end))
    }

    pub fn slashed_windows(&self, validator: &Address) -> &[(BlockNumber, BlockNumber)] {
        self.slashed_windows
            .get(validator)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn bit_set(bitmap: u128, index: SignerIndex) -> bool {
    index < 128 && bitmap & (1u128 << index) != 0
}

impl SimState {
    pub fn set_slashable_downtime(&mut self, interval: BlockCount) -> SimResult<TxReceipt> {
        if interval == 0 || interval >= self.epoch_size {
            return Err(SimError::Revert(format!(
                "slashable downtime {} must be positive and shorter than an epoch ({})",
                interval, self.epoch_size
            )));
        }
        self.slasher.slashable_downtime = interval;
        self.record_tx(
            "setSlashableDowntime",
            &interval,
            vec![SlasherEvent::SlashableDowntimeSet { interval }],
        )
    }

    pub fn set_slashing_incentives(&mut self, penalty: Amount, reward: Amount) -> SimResult<TxReceipt> {
        if reward > penalty {
            return Err(SimError::Revert("reward cannot exceed penalty".into()));
        }
        self.slasher.incentives = SlashingIncentives {
            penalty: penalty.clone(),
            reward: reward.clone(),
        };
        self.record_tx(
            "setSlashingIncentives",
            &(penalty.to_string(), reward.to_string()),
            vec![SlasherEvent::SlashingIncentivesSet { penalty, reward }],
        )
    }

    pub fn set_once_per_epoch(&mut self, once_per_epoch: bool) -> SimResult<TxReceipt> {
        self.slasher.once_per_epoch = once_per_epoch;
        self.record_tx(
            "setOncePerEpoch",
            &once_per_epoch,
            vec![SlasherEvent::OncePerEpochSet { once_per_epoch }],
        )
    }

    /// Accumulate seal bitmaps over `[start, end]`; recomputing a slot is a no-op
    pub fn generate_proof_of_slot_validation(
        &mut self,
        start: BlockNumber,
        end: BlockNumber,
    ) -> SimResult<TxReceipt> {
        if end < start {
            return Err(SimError::Revert(format!("slot [{}, {}] ends before it starts", start, end)));
        }
        if end >= self.head {
            return Err(SimError::Revert(format!(
                "slot end {} must be below the current block {}",
                end, self.head
            )));
        }

        if !self.slasher.slot_calculated(start, end) {
            let mut accumulator: BTreeMap<Epoch, u128> = BTreeMap::new();
            for block in start..=end {
                let bitmap = self.seal_bitmap(block)?;
                *accumulator.entry(self.epoch_of(block)).or_insert(0) |= bitmap;
            }
            tracing::debug!("Slot [{}, {}] accumulated over {} epochs", start, end, accumulator.len());
            self.slasher.accumulators.insert((start, end), accumulator);
        }

        self.record_tx(
            "generateProofOfSlotValidation",
            &(start, end),
            vec![SlasherEvent::SlotValidationProven { start, end }],
        )
    }

    fn accumulator(&self, start: BlockNumber, end: BlockNumber) -> SimResult<&BTreeMap<Epoch, u128>> {
        self.slasher
            .accumulators
            .get(&(start, end))
            .ok_or_else(|| SimError::Revert(format!("slot [{}, {}] not calculated", start, end)))
    }

    /// `start_index` applies to the epoch of the slot's first block, `end_index` to any later one
    pub fn is_down_for_slot(
        &self,
        start: BlockNumber,
        end: BlockNumber,
        start_index: SignerIndex,
        end_index: SignerIndex,
    ) -> SimResult<bool> {
        let first_epoch = self.epoch_of(start);
        let accumulator = self.accumulator(start, end)?;
        Ok(accumulator.iter().all(|(&epoch, &bitmap)| {
            let index = if epoch == first_epoch { start_index } else { end_index };
            !bit_set(bitmap, index)
        }))
    }

    /// Structural checks of a claim, then the downtime verdict
    pub fn is_down(&self, claim: &DowntimeClaim) -> SimResult<bool> {
        let starts = &claim.start_slots;
        let ends = &claim.end_slots;
        if starts.is_empty() || starts.len() != ends.len() {
            return Err(SimError::Revert("slot arrays must be non-empty and of equal length".into()));
        }

        let window_start = claim.window_start;
        let window_end = window_start + self.slasher.slashable_downtime - 1;
        if starts[0] != window_start {
            return Err(SimError::Revert(format!(
                "first slot starts at {} instead of window start {}",
                starts[0], window_start
            )));
        }
        if ends[ends.len() - 1] != window_end {
            return Err(SimError::Revert(format!(
                "last slot ends at {} instead of window end {}",
                ends[ends.len() - 1],
                window_end
            )));
        }
        for i in 1..starts.len() {
            let previous_end = ends[i - 1];
            if starts[i] < previous_end || starts[i] > previous_end + 1 {
                return Err(SimError::Revert(format!(
                    "slot {} starting at {} is not chained to the previous slot ending at {}",
                    i, starts[i], previous_end
                )));
            }
        }

        let window_epoch = self.epoch_of(window_start);
        for (&start, &end) in starts.iter().zip(ends) {
            let accumulator = self.accumulator(start, end)?;
            let signed = accumulator.iter().any(|(&epoch, &bitmap)| {
                let index = if epoch == window_epoch {
                    claim.start_signer_index
                } else {
                    claim.end_signer_index
                };
                bit_set(bitmap, index)
            });
            if signed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn validator_at_index(&self, index: SignerIndex, block: BlockNumber) -> SimResult<Address> {
        self.elected_at(block)
            .get(index as usize)
            .copied()
            .ok_or_else(|| {
                SimError::Revert(format!("no elected signer at index {} for block {}", index, block))
            })
    }

    /// The validator must have signed `block` if it was elected then
    fn check_outer_bound(&self, validator: &Address, block: BlockNumber) -> SimResult<()> {
        let Some(index) = self.signer_index_of(validator, block) else {
            return Ok(());
        };
        if !bit_set(self.seal_bitmap(block)?, index) {
            return Err(SimError::Revert(format!(
                "validator {} did not sign outer bound block {}",
                validator, block
            )));
        }
        Ok(())
    }

    pub fn slash(&mut self, request: &SlashRequest, reporter: Address) -> SimResult<TxReceipt> {
        let claim = &request.claim;
        let window_start = claim.window_start;
        let window_end = window_start + self.slasher.slashable_downtime - 1;

        let validator = self.validator_at_index(claim.start_signer_index, window_start)?;
        let end_validator = self.validator_at_index(claim.end_signer_index, window_end)?;
        if validator != end_validator {
            return Err(SimError::Revert(
                "start and end signer indices refer to different validators".into(),
            ));
        }

        if !self.is_down(claim)? {
            return Err(SimError::Revert(format!(
                "validator {} was not down for window [{}, {}]",
                validator, window_start, window_end
            )));
        }

        if let Some(&(start, end)) = self
            .slasher
            .slashed_windows(&validator)
            .iter()
            .find(|&&(start, end)| start <= window_end && window_start <= end)
        {
            return Err(SimError::Revert(format!(
                "window [{}, {}] overlaps slashed window [{}, {}]",
                window_start, window_end, start, end
            )));
        }

        let window_epoch = self.epoch_of(window_start);
        if self.slasher.once_per_epoch
            && self.slasher.last_slashed_epoch.get(&validator) == Some(&window_epoch)
        {
            return Err(SimError::Revert(format!(
                "validator {} already slashed in epoch {}",
                validator, window_epoch
            )));
        }

        if self.slasher.outer_bound_checks {
            if window_start > 0 {
                self.check_outer_bound(&validator, window_start - 1)?;
            }
            self.check_outer_bound(&validator, window_end + 1)?;
        }

        let (group, history_index) = self.membership_at(&validator, window_start)?;
        if history_index != request.group_membership_history_index {
            return Err(SimError::Revert(format!(
                "membership history index {} does not match {}",
                request.group_membership_history_index, history_index
            )));
        }

        let SlashingIncentives { penalty, reward } = self.slasher.incentives.clone();
        let expected = self.ledger.compute_initial_parameters(&validator, &penalty);
        let expected_group = self
            .ledger
            .compute_parameters(&group, &penalty, &expected.list);
        if expected.params != request.validator_params || expected_group != request.group_params {
            return Err(SimError::Revert("stale lesser/greater list parameters".into()));
        }

        let slashed_validator = self.ledger.slash(&validator, &penalty, &reporter, &reward);
        let slashed_group = self.ledger.slash(&group, &penalty, &reporter, &reward);
        tracing::info!(
            "Slashed validator {} by {} and group {} by {}",
            validator,
            slashed_validator,
            group,
            slashed_group
        );

        self.slasher
            .slashed_windows
            .entry(validator)
            .or_default()
            .push((window_start, window_end));
        self.slasher.last_slashed_epoch.insert(validator, window_epoch);

        self.record_tx(
            "slash",
            request,
            vec![SlasherEvent::DowntimeSlashPerformed {
                validator,
                start_block: window_start,
            }],
        )
    }
}
