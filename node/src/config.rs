use anyhow::{anyhow, Result};
use config::{Config, Environment, File as ConfigFile};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use stakecast_consensus::{ConsensusConfig, FinalityThreshold};

/// Config file consulted when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "config/sim.toml";

/// Simulation configuration.
///
/// Resolved once at startup (defaults, then the TOML file, then
/// `STAKECAST_*` environment variables, then CLI overrides) and immutable
/// for the rest of the run.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub config_path: Option<PathBuf>,

    // Roster
    pub validator_count: usize,
    pub min_stake: u64,
    pub max_stake: u64,

    // Rounds
    pub rounds: u64,
    pub round_interval_ms: u64,
    pub finality_threshold: String,
    pub proposer_offline_probability: f64,
    pub validator_offline_probability: f64,
    pub max_block_transactions: usize,

    // Traffic
    pub min_transactions_per_round: usize,
    pub max_transactions_per_round: usize,
    pub max_transfer_amount: u64,

    // Reproducibility
    pub seed: Option<u64>,

    // Logging
    pub log_level: String,
    pub log_format: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            validator_count: 10,
            min_stake: 50,
            max_stake: 500,
            rounds: 5,
            round_interval_ms: 1_000,
            finality_threshold: "2/3".to_string(),
            proposer_offline_probability: 0.05,
            validator_offline_probability: 0.0,
            max_block_transactions: 1_000,
            min_transactions_per_round: 2,
            max_transactions_per_round: 8,
            max_transfer_amount: 10,
            seed: None,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl NodeConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let resolved_path = match config_path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!(
                        "configuration file {} not found (specified via --config)",
                        path.display()
                    );
                }
                Some(path.to_path_buf())
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                path.exists().then_some(path)
            }
        };

        let mut builder = Config::builder();
        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }
        builder = builder.add_source(Environment::with_prefix("STAKECAST"));
        let config = builder.build()?;

        let defaults = Self::default();
        Ok(Self {
            config_path: resolved_path,
            validator_count: parse_value(&config, "validator_count", defaults.validator_count)?,
            min_stake: parse_value(&config, "min_stake", defaults.min_stake)?,
            max_stake: parse_value(&config, "max_stake", defaults.max_stake)?,
            rounds: parse_value(&config, "rounds", defaults.rounds)?,
            round_interval_ms: parse_value(
                &config,
                "round_interval_ms",
                defaults.round_interval_ms,
            )?,
            finality_threshold: parse_value(
                &config,
                "finality_threshold",
                defaults.finality_threshold,
            )?,
            proposer_offline_probability: parse_value(
                &config,
                "proposer_offline_probability",
                defaults.proposer_offline_probability,
            )?,
            validator_offline_probability: parse_value(
                &config,
                "validator_offline_probability",
                defaults.validator_offline_probability,
            )?,
            max_block_transactions: parse_value(
                &config,
                "max_block_transactions",
                defaults.max_block_transactions,
            )?,
            min_transactions_per_round: parse_value(
                &config,
                "min_transactions_per_round",
                defaults.min_transactions_per_round,
            )?,
            max_transactions_per_round: parse_value(
                &config,
                "max_transactions_per_round",
                defaults.max_transactions_per_round,
            )?,
            max_transfer_amount: parse_value(
                &config,
                "max_transfer_amount",
                defaults.max_transfer_amount,
            )?,
            seed: match get_string_value(&config, "seed") {
                Some(raw) => Some(
                    raw.parse()
                        .map_err(|err| anyhow!("invalid seed value {raw:?}: {err}"))?,
                ),
                None => defaults.seed,
            },
            log_level: parse_value(&config, "log_level", defaults.log_level)?,
            log_format: parse_value(&config, "log_format", defaults.log_format)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.validator_count == 0 {
            anyhow::bail!("validator_count must be at least 1");
        }
        if self.min_stake == 0 {
            anyhow::bail!("min_stake must be positive");
        }
        if self.min_stake > self.max_stake {
            anyhow::bail!(
                "min_stake {} exceeds max_stake {}",
                self.min_stake,
                self.max_stake
            );
        }
        if self.rounds == 0 {
            anyhow::bail!("rounds must be at least 1");
        }
        if self.min_transactions_per_round > self.max_transactions_per_round {
            anyhow::bail!(
                "min_transactions_per_round {} exceeds max_transactions_per_round {}",
                self.min_transactions_per_round,
                self.max_transactions_per_round
            );
        }
        if self.max_transfer_amount == 0 {
            anyhow::bail!("max_transfer_amount must be positive");
        }
        if self.log_format != "pretty" && self.log_format != "json" {
            anyhow::bail!(
                "log_format must be \"pretty\" or \"json\", got {:?}",
                self.log_format
            );
        }
        self.consensus_config()?;
        Ok(())
    }

    /// Round engine view of this configuration.
    pub fn consensus_config(&self) -> Result<ConsensusConfig> {
        let finality_threshold: FinalityThreshold = self.finality_threshold.parse()?;
        let config = ConsensusConfig {
            finality_threshold,
            proposer_offline_probability: self.proposer_offline_probability,
            validator_offline_probability: self.validator_offline_probability,
            max_block_transactions: self.max_block_transactions,
        };
        config.validate()?;
        Ok(config)
    }
}

fn get_string_value(config: &Config, key: &str) -> Option<String> {
    config
        .get_string(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_value<T>(config: &Config, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match get_string_value(config, key) {
        Some(raw) => raw
            .parse()
            .map_err(|err| anyhow!("invalid {key} value {raw:?}: {err}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());

        let consensus = config.consensus_config().unwrap();
        assert_eq!(consensus.finality_threshold, FinalityThreshold::TWO_THIRDS);
        assert_eq!(consensus.max_block_transactions, 1_000);
    }

    #[test]
    fn test_load_reads_toml_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.toml");
        std::fs::write(
            &path,
            r#"
validator_count = 4
min_stake = 100
max_stake = 200
rounds = 12
finality_threshold = "3/5"
proposer_offline_probability = 0.25
seed = 42
log_format = "json"
"#,
        )
        .unwrap();

        let config = NodeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(config.validator_count, 4);
        assert_eq!(config.min_stake, 100);
        assert_eq!(config.max_stake, 200);
        assert_eq!(config.rounds, 12);
        assert_eq!(config.finality_threshold, "3/5");
        assert_eq!(config.proposer_offline_probability, 0.25);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.log_format, "json");

        // Untouched keys keep their defaults.
        assert_eq!(config.max_transactions_per_round, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_explicit_config_rejected() {
        let missing = Path::new("/nonexistent/stakecast/sim.toml");
        let err = NodeConfig::load(Some(missing)).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_validate_rejects_empty_roster() {
        let config = NodeConfig {
            validator_count: 0,
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_stake_bounds() {
        let config = NodeConfig {
            min_stake: 500,
            max_stake: 50,
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_threshold() {
        let config = NodeConfig {
            finality_threshold: "most of them".to_string(),
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_probability() {
        let config = NodeConfig {
            validator_offline_probability: 1.7,
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let config = NodeConfig {
            log_format: "xml".to_string(),
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
