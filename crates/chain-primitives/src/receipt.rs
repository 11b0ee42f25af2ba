// chain-primitives/src/receipt.rs

use crate::{Address, Amount, BlockCount, BlockNumber, Hash};
use serde::{Deserialize, Serialize};

/// Events emitted by the downtime slasher contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SlasherEvent {
    SlashingIncentivesSet { penalty: Amount, reward: Amount },
    SlashableDowntimeSet { interval: BlockCount },
    OncePerEpochSet { once_per_epoch: bool },
    /// A slot's signature accumulator was computed and stored
    SlotValidationProven { start: BlockNumber, end: BlockNumber },
    DowntimeSlashPerformed { validator: Address, start_block: BlockNumber },
}

/// Receipt of a mined state-changing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: Hash,
    pub block_number: BlockNumber,
    pub events: Vec<SlasherEvent>,
}

impl TxReceipt {
    /// The `DowntimeSlashPerformed` event for `validator`, if the receipt carries one
    pub fn downtime_slash_for(&self, validator: &Address) -> Option<BlockNumber> {
        self.events.iter().find_map(|event| match event {
            SlasherEvent::DowntimeSlashPerformed {
                validator: slashed,
                start_block,
            } if slashed == validator => Some(*start_block),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downtime_slash_lookup() {
        let validator = Address::from_low_u64(1);
        let receipt = TxReceipt {
            tx_hash: Hash::zero(),
            block_number: 10,
            events: vec![
                SlasherEvent::SlotValidationProven { start: 1, end: 4 },
                SlasherEvent::DowntimeSlashPerformed {
                    validator,
                    start_block: 1,
                },
            ],
        };

        assert_eq!(receipt.downtime_slash_for(&validator), Some(1));
        assert_eq!(receipt.downtime_slash_for(&Address::from_low_u64(2)), None);
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = SlasherEvent::OncePerEpochSet {
            once_per_epoch: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "OncePerEpochSet");
        assert_eq!(json["once_per_epoch"], true);
    }
}
