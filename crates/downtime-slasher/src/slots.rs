// downtime-slasher/src/slots.rs

use crate::ports::DowntimeSlasherContract;
use crate::signer::BoundarySigner;
use crate::window::DowntimeWindow;
use crate::{SlasherError, SlasherResult};
use chain_primitives::{epoch_number_of_block, BlockCount, BlockNumber, SignerIndex};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

/// Inclusive sub-range of a downtime window with its own on-chain accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    start: BlockNumber,
    end: BlockNumber,
}

impl Slot {
    pub fn new(start: BlockNumber, end: BlockNumber) -> SlasherResult<Self> {
        if end < start {
            return Err(SlasherError::InvalidSlot { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> BlockNumber {
        self.start
    }

    pub fn end(&self) -> BlockNumber {
        self.end
    }

    pub fn block_count(&self) -> BlockCount {
        self.end - self.start + 1
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Split `window` into consecutive slots of `slot_size` blocks.
///
/// The last slot is clamped to the window end and may be shorter.
pub fn partition(window: &DowntimeWindow, slot_size: u64) -> SlasherResult<Vec<Slot>> {
    if slot_size <= 1 {
        return Err(SlasherError::InvalidSlotSize(slot_size));
    }

    let mut slots = Vec::with_capacity(slot_capacity(window.length(), slot_size));
    let mut start = window.start();
    loop {
        let end = start.saturating_add(slot_size - 1).min(window.end());
        slots.push(Slot { start, end });
        if end == window.end() {
            break;
        }
        start = end + 1;
    }
    Ok(slots)
}

/// Slots to pre-allocate for a partition; long windows grow past this
const MAX_PRESIZED_SLOTS: usize = 4096;

fn slot_capacity(length: BlockCount, slot_size: u64) -> usize {
    usize::try_from(length.div_ceil(slot_size))
        .unwrap_or(usize::MAX)
        .min(MAX_PRESIZED_SLOTS)
}

/// Where the slots of a slash come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPlan {
    /// Use these slots as given; continuity is left to the chain to enforce
    Supplied(Vec<Slot>),
    /// Partition the window locally
    Generate { slot_size: u64 },
}

impl SlotPlan {
    /// Build a supplied plan from parallel start/end arrays
    pub fn from_bounds(starts: &[BlockNumber], ends: &[BlockNumber]) -> SlasherResult<Self> {
        if starts.len() != ends.len() {
            return Err(SlasherError::SlotBoundsMismatch {
                starts: starts.len(),
                ends: ends.len(),
            });
        }
        let slots = starts
            .iter()
            .zip(ends)
            .map(|(&start, &end)| Slot::new(start, end))
            .collect::<SlasherResult<Vec<_>>>()?;
        Ok(SlotPlan::Supplied(slots))
    }

    pub fn slots_for(&self, window: &DowntimeWindow) -> SlasherResult<Vec<Slot>> {
        match self {
            SlotPlan::Supplied(slots) => Ok(slots.clone()),
            SlotPlan::Generate { slot_size } => partition(window, *slot_size),
        }
    }
}

/// How missing slot proofs are submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ProofStrategy {
    /// One slot at a time. With `abort_when_signed`, stop at the first slot
    /// in which the signer shows up instead of paying for the rest.
    Sequential { abort_when_signed: bool },
    /// All missing proofs at once
    Concurrent,
}

impl Default for ProofStrategy {
    fn default() -> Self {
        ProofStrategy::Sequential {
            abort_when_signed: true,
        }
    }
}

/// Outcome of the proof generation stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotProofReport {
    pub generated: Vec<Slot>,
    pub reused: Vec<Slot>,
}

impl SlotProofReport {
    pub fn total(&self) -> usize {
        self.generated.len() + self.reused.len()
    }
}

/// Signer indices to check `slot` against.
///
/// Blocks in the epoch of the window's first block use the start index and
/// blocks in any later epoch use the end index, so a slot lying wholly after
/// an epoch change is checked against the end index only.
pub fn slot_signer_indices(
    slot: &Slot,
    start: &BoundarySigner,
    end: &BoundarySigner,
    epoch_size: u64,
) -> (SignerIndex, SignerIndex) {
    let window_epoch = epoch_number_of_block(start.block, epoch_size);
    let pick = |block: BlockNumber| {
        if epoch_number_of_block(block, epoch_size) == window_epoch {
            start.index
        } else {
            end.index
        }
    };
    (pick(slot.start()), pick(slot.end()))
}

/// Make sure every slot has an on-chain validation proof.
///
/// Slots whose accumulator already exists are not resubmitted.
pub async fn prove_slots(
    contract: &dyn DowntimeSlasherContract,
    slots: &[Slot],
    strategy: ProofStrategy,
    start: &BoundarySigner,
    end: &BoundarySigner,
    epoch_size: u64,
) -> SlasherResult<SlotProofReport> {
    let mut report = SlotProofReport::default();

    match strategy {
        ProofStrategy::Sequential { abort_when_signed } => {
            for slot in slots {
                if prove_slot(contract, *slot).await? {
                    report.generated.push(*slot);
                } else {
                    report.reused.push(*slot);
                }

                if !abort_when_signed {
                    continue;
                }
                let (slot_start_index, slot_end_index) =
                    slot_signer_indices(slot, start, end, epoch_size);
                if !contract
                    .is_down_for_slot(*slot, slot_start_index, slot_end_index)
                    .await?
                {
                    tracing::info!("Signer was present in slot {}, aborting", slot);
                    return Err(SlasherError::ValidatorNotDown {
                        start: slot.start(),
                        end: slot.end(),
                    });
                }
            }
        }
        ProofStrategy::Concurrent => {
            let outcomes = try_join_all(slots.iter().map(|slot| prove_slot(contract, *slot))).await?;
            for (slot, generated) in slots.iter().zip(outcomes) {
                if generated {
                    report.generated.push(*slot);
                } else {
                    report.reused.push(*slot);
                }
            }
        }
    }

    tracing::info!(
        "Slot proofs ready: {} generated, {} already on chain",
        report.generated.len(),
        report.reused.len()
    );
    Ok(report)
}

/// Returns true when a proof transaction was sent
async fn prove_slot(contract: &dyn DowntimeSlasherContract, slot: Slot) -> SlasherResult<bool> {
    if contract.slot_already_calculated(slot.start(), slot.end()).await? {
        tracing::debug!("Slot {} already calculated", slot);
        return Ok(false);
    }

    let receipt = contract
        .generate_proof_of_slot_validation(slot.start(), slot.end())
        .await?;
    tracing::debug!("Proved slot {} in tx {}", slot, receipt.tx_hash);
    Ok(true)
}
