// downtime-slasher/src/config.rs

use crate::slots::ProofStrategy;
use crate::window::DEFAULT_HEAD_LAG;
use crate::{SlasherError, SlasherResult};
use serde::{Deserialize, Serialize};

/// The chain reads the parent seal of `end + 1`, which exists once `end + 2` is mined
const MIN_HEAD_LAG: u64 = 2;

/// Tunables of the slashing client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlasherConfig {
    /// Blocks between the chain head and the end of a head-relative window
    pub head_lag: u64,
    /// Slot size used when the caller asks for generated slots without one
    pub default_slot_size: u64,
    /// How missing slot proofs are submitted
    pub proof_strategy: ProofStrategy,
    /// Re-read the elected set by index before submitting
    pub verify_signer_indices: bool,
}

impl Default for SlasherConfig {
    fn default() -> Self {
        Self {
            head_lag: DEFAULT_HEAD_LAG,
            default_slot_size: 720,
            proof_strategy: ProofStrategy::default(),
            verify_signer_indices: false,
        }
    }
}

impl SlasherConfig {
    pub fn validate(&self) -> SlasherResult<()> {
        if self.default_slot_size <= 1 {
            return Err(SlasherError::Config(format!(
                "default_slot_size must be greater than 1, got {}",
                self.default_slot_size
            )));
        }
        if self.head_lag < MIN_HEAD_LAG {
            return Err(SlasherError::Config(format!(
                "head_lag must be at least {} so the block after the window has a parent seal, got {}",
                MIN_HEAD_LAG, self.head_lag
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SlasherConfig::default();
        assert_eq!(config.head_lag, 2);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.proof_strategy,
            ProofStrategy::Sequential {
                abort_when_signed: true
            }
        );
    }

    #[test]
    fn test_invalid_config() {
        let config = SlasherConfig {
            default_slot_size: 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SlasherError::Config(_))));

        for head_lag in [0, 1] {
            let config = SlasherConfig {
                head_lag,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(SlasherError::Config(_))));
        }

        let config = SlasherConfig {
            head_lag: 2,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SlasherConfig =
            serde_json::from_str(r#"{"proof_strategy": {"mode": "concurrent"}}"#).unwrap();
        assert_eq!(config.proof_strategy, ProofStrategy::Concurrent);
        assert_eq!(config.head_lag, 2);
    }
}
