// slasher-cli/src/config.rs
use downtime_slasher::SlasherConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    pub chain: ChainParameters,
    pub slasher: SlasherConfig,
}

/// Contract values used by the offline commands, which never reach a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParameters {
    pub slashable_downtime: u64,
    pub epoch_size: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            chain: ChainParameters {
                slashable_downtime: 8640,
                epoch_size: 17280,
            },
            slasher: SlasherConfig::default(),
        }
    }
}

impl CliConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.slasher.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Config at `path`, or the defaults when no path is given
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use downtime_slasher::ProofStrategy;

    #[test]
    fn test_config_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("slasher-cli-{}.toml", std::process::id()));
        let path = path.to_str().unwrap();

        let mut config = CliConfig::default();
        config.slasher.proof_strategy = ProofStrategy::Concurrent;
        config.to_file(path).unwrap();

        assert_eq!(CliConfig::from_file(path).unwrap(), config);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_partial_slasher_section() {
        let config: CliConfig = toml::from_str(
            r#"
            [chain]
            slashable_downtime = 12
            epoch_size = 100

            [slasher]
            default_slot_size = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.slasher.default_slot_size, 4);
        assert_eq!(config.slasher.head_lag, 2);
        assert_eq!(config.chain.epoch_size, 100);
    }
}
