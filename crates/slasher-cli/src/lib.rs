// slasher-cli/src/lib.rs
pub mod config;
pub mod scenario;

pub use config::{ChainParameters, CliConfig};
pub use scenario::{Scenario, ScenarioOutcome};
