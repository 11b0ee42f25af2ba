// chain-sim/src/locked_gold.rs

use crate::{SimError, SimResult};
use chain_primitives::{Address, Amount};
use downtime_slasher::{InitialSlashingParameters, ListItem, ListUpdateParameters};
use std::collections::HashMap;

/// Locked balances and group votes
#[derive(Debug, Clone, Default)]
pub struct LockedGoldLedger {
    locked: HashMap<Address, Amount>,
    /// Groups each account votes for, in the order the votes were cast
    votes: HashMap<Address, Vec<(Address, Amount)>>,
    eligible: Vec<Address>,
}

impl LockedGoldLedger {
    pub fn lock(&mut self, account: Address, amount: &Amount) {
        let balance = self.locked.entry(account).or_insert_with(Amount::zero);
        *balance = balance.clone() + amount.clone();
    }

    pub fn locked_balance(&self, account: &Address) -> Amount {
        self.locked.get(account).cloned().unwrap_or_else(Amount::zero)
    }

    pub fn mark_eligible(&mut self, group: Address) {
        if !self.eligible.contains(&group) {
            self.eligible.push(group);
        }
    }

    pub fn voting_balance(&self, account: &Address) -> Amount {
        self.votes
            .get(account)
            .map(|votes| {
                votes
                    .iter()
                    .fold(Amount::zero(), |acc, (_, v)| acc + v.clone())
            })
            .unwrap_or_else(Amount::zero)
    }

    pub fn nonvoting_balance(&self, account: &Address) -> Amount {
        self.locked_balance(account)
            .saturating_sub(&self.voting_balance(account))
    }

    pub fn vote(&mut self, voter: Address, group: Address, amount: &Amount) -> SimResult<()> {
        if !self.eligible.contains(&group) {
            return Err(SimError::Revert(format!("group {} is not eligible", group)));
        }
        if self.nonvoting_balance(&voter) < *amount {
            return Err(SimError::Revert(format!(
                "{} has insufficient nonvoting balance to vote {}",
                voter, amount
            )));
        }

        let votes = self.votes.entry(voter).or_default();
        match votes.iter_mut().find(|(g, _)| *g == group) {
            Some((_, existing)) => *existing = existing.clone() + amount.clone(),
            None => votes.push((group, amount.clone())),
        }
        Ok(())
    }

    pub fn total_votes(&self, group: &Address) -> Amount {
        self.votes
            .values()
            .flatten()
            .filter(|(g, _)| g == group)
            .fold(Amount::zero(), |acc, (_, v)| acc + v.clone())
    }

    /// Eligible groups ordered by total votes, highest first
    pub fn eligible_list(&self) -> Vec<ListItem> {
        let mut list: Vec<ListItem> = self
            .eligible
            .iter()
            .map(|group| ListItem {
                group: *group,
                value: self.total_votes(group),
            })
            .collect();
        sort_list(&mut list);
        list
    }

    /// Amount actually taken when slashing `account` by `penalty`
    pub fn effective_penalty(&self, account: &Address, penalty: &Amount) -> Amount {
        std::cmp::min(self.locked_balance(account), penalty.clone())
    }

    /// Vote decrements needed to take `penalty` from `account`.
    ///
    /// Nonvoting gold is taken first, then votes from the most recently voted
    /// group backwards. `list` is updated in place to reflect the decrements.
    fn plan_decrements(
        &self,
        account: &Address,
        penalty: &Amount,
        list: &mut [ListItem],
    ) -> (ListUpdateParameters, Vec<(usize, Amount)>) {
        let mut params = ListUpdateParameters::default();
        let mut decrements = Vec::new();

        let effective = self.effective_penalty(account, penalty);
        let nonvoting = self.nonvoting_balance(account);
        let mut remaining = match effective.checked_sub(&nonvoting) {
            Some(rest) if !rest.is_zero() => rest,
            _ => return (params, decrements),
        };

        let votes = self.votes.get(account).map(Vec::as_slice).unwrap_or(&[]);
        for (index, (group, voted)) in votes.iter().enumerate().rev() {
            if remaining.is_zero() {
                break;
            }
            let decrement = std::cmp::min(remaining.clone(), voted.clone());
            remaining = remaining.saturating_sub(&decrement);

            let (lesser, greater) = match list.iter().position(|item| item.group == *group) {
                Some(pos) => {
                    list[pos].value = list[pos].value.saturating_sub(&decrement);
                    sort_list(list);
                    neighbours(list, group)
                }
                None => (Address::zero(), Address::zero()),
            };

            params.lessers.push(lesser);
            params.greaters.push(greater);
            params.indices.push(index as u64);
            decrements.push((index, decrement));
        }

        (params, decrements)
    }

    pub fn compute_initial_parameters(
        &self,
        account: &Address,
        penalty: &Amount,
    ) -> InitialSlashingParameters {
        let mut list = self.eligible_list();
        let (params, _) = self.plan_decrements(account, penalty, &mut list);
        InitialSlashingParameters { params, list }
    }

    pub fn compute_parameters(
        &self,
        account: &Address,
        penalty: &Amount,
        list: &[ListItem],
    ) -> ListUpdateParameters {
        let mut list = list.to_vec();
        self.plan_decrements(account, penalty, &mut list).0
    }

    /// Take `penalty` from `account` and pay up to `reward` of it to `reporter`.
    ///
    /// Returns the amount actually slashed.
    pub fn slash(
        &mut self,
        account: &Address,
        penalty: &Amount,
        reporter: &Address,
        reward: &Amount,
    ) -> Amount {
        let effective = self.effective_penalty(account, penalty);
        let mut list = self.eligible_list();
        let (_, decrements) = self.plan_decrements(account, penalty, &mut list);

        if let Some(votes) = self.votes.get_mut(account) {
            for (index, decrement) in decrements {
                votes[index].1 = votes[index].1.saturating_sub(&decrement);
            }
            votes.retain(|(_, v)| !v.is_zero());
        }

        let balance = self.locked_balance(account).saturating_sub(&effective);
        self.locked.insert(*account, balance);

        let paid = std::cmp::min(reward.clone(), effective.clone());
        self.lock(*reporter, &paid);
        effective
    }
}

fn sort_list(list: &mut [ListItem]) {
    list.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.group.cmp(&b.group)));
}

/// Groups directly below and above `group` in a sorted list
fn neighbours(list: &[ListItem], group: &Address) -> (Address, Address) {
    match list.iter().position(|item| item.group == *group) {
        Some(pos) => {
            let lesser = list.get(pos + 1).map(|i| i.group).unwrap_or_else(Address::zero);
            let greater = if pos > 0 {
                list[pos - 1].group
            } else {
                Address::zero()
            };
            (lesser, greater)
        }
        None => (Address::zero(), Address::zero()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn ledger() -> LockedGoldLedger {
        let mut ledger = LockedGoldLedger::default();
        ledger.mark_eligible(addr(100));
        ledger.mark_eligible(addr(200));
        ledger.lock(addr(1), &Amount::from_u64(50_000));
        ledger.lock(addr(2), &Amount::from_u64(50_000));
        ledger.vote(addr(1), addr(100), &Amount::from_u64(45_000)).unwrap();
        ledger.vote(addr(2), addr(200), &Amount::from_u64(38_000)).unwrap();
        ledger
    }

    #[test]
    fn test_nonvoting_taken_first() {
        let ledger = ledger();
        let initial = ledger.compute_initial_parameters(&addr(1), &Amount::from_u64(5_000));
        assert!(initial.params.is_empty());
        assert_eq!(initial.list[0].group, addr(100));
    }

    #[test]
    fn test_vote_decrement_parameters() {
        let ledger = ledger();
        let initial = ledger.compute_initial_parameters(&addr(1), &Amount::from_u64(10_000));

        // 5000 comes out of votes: group 100 drops to 40000, still above 200
        assert_eq!(initial.params.indices, vec![0]);
        assert_eq!(initial.params.lessers, vec![addr(200)]);
        assert_eq!(initial.params.greaters, vec![Address::zero()]);
        assert_eq!(initial.list[0].value, Amount::from_u64(40_000));
    }

    #[test]
    fn test_reordering_changes_neighbours() {
        let mut ledger = ledger();
        ledger.lock(addr(3), &Amount::from_u64(4_000));
        ledger.vote(addr(3), addr(200), &Amount::from_u64(4_000)).unwrap();

        let initial = ledger.compute_initial_parameters(&addr(1), &Amount::from_u64(10_000));
        assert_eq!(initial.params.lessers, vec![Address::zero()]);
        assert_eq!(initial.params.greaters, vec![addr(200)]);
    }

    #[test]
    fn test_slash_pays_reporter() {
        let mut ledger = ledger();
        let reporter = addr(9);

        let slashed = ledger.slash(
            &addr(1),
            &Amount::from_u64(10_000),
            &reporter,
            &Amount::from_u64(100),
        );

        assert_eq!(slashed, Amount::from_u64(10_000));
        assert_eq!(ledger.locked_balance(&addr(1)), Amount::from_u64(40_000));
        assert_eq!(ledger.voting_balance(&addr(1)), Amount::from_u64(40_000));
        assert_eq!(ledger.locked_balance(&reporter), Amount::from_u64(100));
    }

    #[test]
    fn test_slash_capped_at_balance() {
        let mut ledger = LockedGoldLedger::default();
        ledger.lock(addr(1), &Amount::from_u64(30));

        let slashed = ledger.slash(&addr(1), &Amount::from_u64(100), &addr(9), &Amount::from_u64(50));
        assert_eq!(slashed, Amount::from_u64(30));
        assert!(ledger.locked_balance(&addr(1)).is_zero());
        assert_eq!(ledger.locked_balance(&addr(9)), Amount::from_u64(30));
    }

    #[test]
    fn test_vote_requires_eligible_group_and_balance() {
        let mut ledger = ledger();
        assert!(ledger.vote(addr(1), addr(300), &Amount::from_u64(1)).is_err());
        assert!(ledger.vote(addr(1), addr(100), &Amount::from_u64(6_000)).is_err());
    }
}
