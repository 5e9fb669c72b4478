use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("finality threshold must satisfy 0 < numerator < denominator, got {0}")]
    ThresholdOutOfRange(String),
    #[error("malformed threshold literal {0:?}, expected a ratio like \"2/3\"")]
    ThresholdParse(String),
    #[error("{name} must lie within [0.0, 1.0], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },
    #[error("max_block_transactions must be positive")]
    ZeroBatchBound,
}

/// Supermajority threshold as an exact share of total stake.
///
/// Kept as an integer ratio and compared in integer arithmetic, so the
/// finalize decision cannot be flipped by floating-point rounding at the
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalityThreshold {
    pub numerator: u32,
    pub denominator: u32,
}

impl FinalityThreshold {
    pub const TWO_THIRDS: Self = Self {
        numerator: 2,
        denominator: 3,
    };

    pub fn new(numerator: u32, denominator: u32) -> Result<Self, ConfigError> {
        let threshold = Self {
            numerator,
            denominator,
        };
        threshold.validate()?;
        Ok(threshold)
    }

    /// True when `attesting` stake strictly exceeds this share of `total`.
    pub fn is_met(&self, attesting: u64, total: u64) -> bool {
        (attesting as u128) * (self.denominator as u128)
            > (total as u128) * (self.numerator as u128)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.numerator == 0 || self.numerator >= self.denominator {
            return Err(ConfigError::ThresholdOutOfRange(self.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for FinalityThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for FinalityThreshold {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, den) = s
            .split_once('/')
            .ok_or_else(|| ConfigError::ThresholdParse(s.to_string()))?;
        let numerator = num
            .trim()
            .parse()
            .map_err(|_| ConfigError::ThresholdParse(s.to_string()))?;
        let denominator = den
            .trim()
            .parse()
            .map_err(|_| ConfigError::ThresholdParse(s.to_string()))?;
        Self::new(numerator, denominator)
    }
}

/// Round engine configuration.
///
/// Validated once at engine construction and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Share of total stake that attesting stake must strictly exceed.
    pub finality_threshold: FinalityThreshold,
    /// Chance that the selected proposer is unreachable for the round.
    pub proposer_offline_probability: f64,
    /// Chance, drawn per validator per round, that a non-proposing
    /// validator is unreachable.
    pub validator_offline_probability: f64,
    /// Upper bound on transactions drafted into a single block.
    pub max_block_transactions: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            finality_threshold: FinalityThreshold::TWO_THIRDS,
            proposer_offline_probability: 0.05,
            validator_offline_probability: 0.0,
            max_block_transactions: 1000,
        }
    }
}

impl ConsensusConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.finality_threshold.validate()?;
        Self::check_probability(
            "proposer_offline_probability",
            self.proposer_offline_probability,
        )?;
        Self::check_probability(
            "validator_offline_probability",
            self.validator_offline_probability,
        )?;
        if self.max_block_transactions == 0 {
            return Err(ConfigError::ZeroBatchBound);
        }
        Ok(())
    }

    fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
        // A NaN fails the range check as well.
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::ProbabilityOutOfRange { name, value });
        }
        Ok(())
    }
}
