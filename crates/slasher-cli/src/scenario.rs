// slasher-cli/src/scenario.rs

//! Scenario files: a simulated chain plus one slash to run against it.
//!
//! ```toml
//! epoch_size = 100
//! head = 250
//! reporter = "0x00000000000000000000000000000000000001f4"
//!
//! [[groups]]
//! address = "0x0000000000000000000000000000000000000064"
//! locked = 50000
//!
//! [[validators]]
//! address = "0x0000000000000000000000000000000000000001"
//! signer = "0x000000000000000000000000000000000000000b"
//! group = "0x0000000000000000000000000000000000000064"
//! locked = 50000
//!
//! [[elections]]
//! epoch = 1
//! validators = ["0x0000000000000000000000000000000000000001"]
//!
//! [[absences]]
//! validator = "0x0000000000000000000000000000000000000001"
//! start = 10
//! end = 21
//!
//! [slash]
//! target = "0x0000000000000000000000000000000000000001"
//! start = 10
//! slot_size = 4
//! ```

use chain_primitives::{Address, BlockNumber, Epoch, TxReceipt};
use chain_sim::ChainSimulator;
use downtime_slasher::{
    ChainCollaborators, DowntimeSlasher, DowntimeWindow, SlasherConfig, SlotPlan,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub epoch_size: u64,
    pub head: BlockNumber,
    /// Account that sends the slash and collects the reward
    pub reporter: String,
    #[serde(default)]
    pub contract: ContractSettings,
    #[serde(default)]
    pub groups: Vec<GroupSetup>,
    #[serde(default)]
    pub validators: Vec<ValidatorSetup>,
    #[serde(default)]
    pub elections: Vec<ElectionSetup>,
    #[serde(default)]
    pub signer_rotations: Vec<SignerRotationSetup>,
    #[serde(default)]
    pub votes: Vec<VoteSetup>,
    #[serde(default)]
    pub absences: Vec<AbsenceSetup>,
    pub slash: SlashSetup,
}

/// Overrides of the slasher contract's parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractSettings {
    pub slashable_downtime: Option<u64>,
    pub penalty: Option<u64>,
    pub reward: Option<u64>,
    pub once_per_epoch: Option<bool>,
    pub outer_bound_checks: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSetup {
    pub address: String,
    #[serde(default)]
    pub locked: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorSetup {
    pub address: String,
    pub signer: String,
    pub group: String,
    #[serde(default)]
    pub locked: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSetup {
    pub epoch: Epoch,
    pub validators: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerRotationSetup {
    pub validator: String,
    pub signer: String,
    pub from_epoch: Epoch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteSetup {
    pub voter: String,
    pub group: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbsenceSetup {
    pub validator: String,
    pub start: BlockNumber,
    pub end: BlockNumber,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlashSetup {
    /// Validator account or signer address
    pub target: String,
    pub start: Option<BlockNumber>,
    pub end: Option<BlockNumber>,
    /// Generated slot size; the configured default when absent
    pub slot_size: Option<u64>,
    /// Explicit slots as `[start, end]` pairs, taking precedence over `slot_size`
    #[serde(default)]
    pub slots: Vec<(BlockNumber, BlockNumber)>,
}

/// Result of running a scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub validator: Address,
    pub group: Address,
    pub window: DowntimeWindow,
    pub slots: usize,
    pub proofs_generated: usize,
    pub proofs_reused: usize,
    pub receipt: TxReceipt,
    pub validator_balance: String,
    pub group_balance: String,
    pub reporter_balance: String,
}

fn address(value: &str) -> anyhow::Result<Address> {
    value
        .parse()
        .map_err(|e| anyhow::anyhow!("bad address {:?}: {}", value, e))
}

impl Scenario {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Populate a simulated chain with everything but the slash
    pub fn build_chain(&self) -> anyhow::Result<ChainSimulator> {
        let chain = ChainSimulator::new(self.epoch_size);

        let settings = &self.contract;
        if let Some(interval) = settings.slashable_downtime {
            chain.set_slashable_downtime(interval)?;
        }
        if settings.penalty.is_some() || settings.reward.is_some() {
            chain.set_slashing_incentives(
                settings.penalty.unwrap_or(10_000),
                settings.reward.unwrap_or(100),
            )?;
        }
        if let Some(once_per_epoch) = settings.once_per_epoch {
            chain.set_once_per_epoch(once_per_epoch)?;
        }
        if let Some(enabled) = settings.outer_bound_checks {
            chain.set_outer_bound_checks(enabled);
        }

        for group in &self.groups {
            let account = address(&group.address)?;
            chain.register_group(account);
            chain.lock_gold(account, group.locked);
        }
        for validator in &self.validators {
            let account = address(&validator.address)?;
            chain.register_validator(account, address(&validator.signer)?, address(&validator.group)?)?;
            chain.lock_gold(account, validator.locked);
        }
        for rotation in &self.signer_rotations {
            chain.authorize_signer(
                address(&rotation.validator)?,
                address(&rotation.signer)?,
                rotation.from_epoch,
            )?;
        }
        for election in &self.elections {
            let elected = election
                .validators
                .iter()
                .map(|v| address(v))
                .collect::<anyhow::Result<Vec<_>>>()?;
            chain.elect(election.epoch, &elected)?;
        }
        for vote in &self.votes {
            let voter = address(&vote.voter)?;
            if chain.locked_gold_balance(&voter).is_zero() {
                chain.lock_gold(voter, vote.amount);
            }
            chain.vote(voter, address(&vote.group)?, vote.amount)?;
        }
        for absence in &self.absences {
            chain.mark_absent(address(&absence.validator)?, absence.start, absence.end)?;
        }

        chain.mine_to(self.head)?;
        Ok(chain)
    }

    fn slot_plan(&self, config: &SlasherConfig) -> anyhow::Result<SlotPlan> {
        let slash = &self.slash;
        if !slash.slots.is_empty() {
            let (starts, ends): (Vec<_>, Vec<_>) = slash.slots.iter().copied().unzip();
            return Ok(SlotPlan::from_bounds(&starts, &ends)?);
        }
        Ok(SlotPlan::Generate {
            slot_size: slash.slot_size.unwrap_or(config.default_slot_size),
        })
    }

    /// Build the chain and run the slash end to end
    pub async fn run(&self, config: SlasherConfig) -> anyhow::Result<ScenarioOutcome> {
        let plan = self.slot_plan(&config)?;
        let chain = self.build_chain()?;
        let reporter = address(&self.reporter)?;
        let client = Arc::new(chain.with_sender(reporter));
        let slasher = DowntimeSlasher::new(ChainCollaborators::from_shared(client), config)?;

        let target = address(&self.slash.target)?;
        let prepared = slasher
            .build_slash_request(target, self.slash.start, self.slash.end, &plan)
            .await?;
        let receipt = slasher.submit(&prepared).await?;

        Ok(ScenarioOutcome {
            validator: prepared.validator,
            group: prepared.membership.group,
            window: prepared.window,
            slots: prepared.slots.len(),
            proofs_generated: prepared.proofs.generated.len(),
            proofs_reused: prepared.proofs.reused.len(),
            receipt,
            validator_balance: chain.locked_gold_balance(&prepared.validator).to_string(),
            group_balance: chain.locked_gold_balance(&prepared.membership.group).to_string(),
            reporter_balance: chain.locked_gold_balance(&reporter).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use downtime_slasher::SlasherError;

    const DOWNTIME: &str = include_str!("../scenarios/downtime.toml");

    #[tokio::test]
    async fn test_bundled_scenario() {
        let scenario: Scenario = toml::from_str(DOWNTIME).unwrap();
        let outcome = scenario.run(SlasherConfig::default()).await.unwrap();

        assert_eq!(outcome.window.start(), 10);
        assert_eq!(outcome.window.end(), 21);
        assert_eq!(outcome.slots, 3);
        assert_eq!(outcome.proofs_generated, 3);
        assert_eq!(outcome.validator_balance, "40000");
        assert_eq!(outcome.group_balance, "40000");
        assert_eq!(outcome.reporter_balance, "200");
        assert_eq!(outcome.receipt.downtime_slash_for(&outcome.validator), Some(10));
    }

    #[tokio::test]
    async fn test_signed_validator_fails() {
        let mut scenario: Scenario = toml::from_str(DOWNTIME).unwrap();
        scenario.absences[0].start = 11;

        let err = scenario.run(SlasherConfig::default()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SlasherError>(),
            Some(SlasherError::ValidatorNotDown { start: 10, end: 13 })
        ));
    }

    #[tokio::test]
    async fn test_explicit_slots() {
        let mut scenario: Scenario = toml::from_str(DOWNTIME).unwrap();
        scenario.slash.slots = vec![(10, 16), (17, 21)];

        let outcome = scenario.run(SlasherConfig::default()).await.unwrap();
        assert_eq!(outcome.slots, 2);
    }

    #[test]
    fn test_bad_address() {
        let mut scenario: Scenario = toml::from_str(DOWNTIME).unwrap();
        scenario.groups[0].address = "0x1234".into();
        assert!(scenario.build_chain().is_err());
    }
}
