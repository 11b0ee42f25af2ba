// downtime-slasher/src/parameters.rs

use crate::ports::LockedGoldContract;
use crate::SlasherResult;
use chain_primitives::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Penalty charged to the validator and its group, and reward paid to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingIncentives {
    pub penalty: Amount,
    pub reward: Amount,
}

/// Entry of the eligible-group list ordered by votes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub group: Address,
    pub value: Amount,
}

/// Neighbour hints for re-sorting groups after their votes shrink.
///
/// Entry `i` of each vector describes one group the slashed account voted
/// for: its index in the account's voted-group list, and the groups directly
/// below and above it once the vote is decremented (zero address at the ends).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListUpdateParameters {
    pub lessers: Vec<Address>,
    pub greaters: Vec<Address>,
    pub indices: Vec<u64>,
}

impl ListUpdateParameters {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Parameters for the first slashed account, plus the list state after applying them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialSlashingParameters {
    pub params: ListUpdateParameters,
    pub list: Vec<ListItem>,
}

/// List parameters for both parties of a downtime slash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingParameters {
    pub validator: ListUpdateParameters,
    pub group: ListUpdateParameters,
}

/// Compute list parameters for slashing `validator` and then `group`.
///
/// The group's parameters depend on the list as it will look after the
/// validator's votes are decremented, so the two lookups are chained. Results
/// go stale as soon as any vote moves; call this right before submitting.
pub async fn fetch_slashing_parameters(
    locked_gold: &dyn LockedGoldContract,
    validator: Address,
    group: Address,
    penalty: &Amount,
) -> SlasherResult<SlashingParameters> {
    let initial = locked_gold
        .compute_initial_parameters_for_slashing(validator, penalty)
        .await?;
    let group_params = locked_gold
        .compute_parameters_for_slashing(group, penalty, &initial.list)
        .await?;

    tracing::debug!(
        "Slashing parameters: {} validator list updates, {} group list updates",
        initial.params.len(),
        group_params.len()
    );

    Ok(SlashingParameters {
        validator: initial.params,
        group: group_params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the list it is handed so the chaining can be asserted
    struct RecordingLockedGold {
        seen_list: Mutex<Vec<ListItem>>,
    }

    #[async_trait]
    impl LockedGoldContract for RecordingLockedGold {
        async fn compute_initial_parameters_for_slashing(
            &self,
            account: Address,
            _penalty: &Amount,
        ) -> SlasherResult<InitialSlashingParameters> {
            Ok(InitialSlashingParameters {
                params: ListUpdateParameters {
                    lessers: vec![Address::zero()],
                    greaters: vec![account],
                    indices: vec![0],
                },
                list: vec![ListItem {
                    group: Address::from_low_u64(9),
                    value: Amount::from_u64(42),
                }],
            })
        }

        async fn compute_parameters_for_slashing(
            &self,
            _group: Address,
            _penalty: &Amount,
            list: &[ListItem],
        ) -> SlasherResult<ListUpdateParameters> {
            *self.seen_list.lock().unwrap() = list.to_vec();
            Ok(ListUpdateParameters::default())
        }
    }

    #[tokio::test]
    async fn test_group_parameters_use_initial_list() {
        let locked_gold = RecordingLockedGold {
            seen_list: Mutex::new(Vec::new()),
        };
        let validator = Address::from_low_u64(1);

        let params = fetch_slashing_parameters(
            &locked_gold,
            validator,
            Address::from_low_u64(2),
            &Amount::from_u64(100),
        )
        .await
        .unwrap();

        assert_eq!(params.validator.greaters, vec![validator]);
        assert!(params.group.is_empty());
        let seen = locked_gold.seen_list.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].value, Amount::from_u64(42));
    }
}
