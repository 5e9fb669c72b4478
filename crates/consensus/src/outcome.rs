use serde::{Deserialize, Serialize};
use stakecast_types::Block;
use std::fmt;

use crate::config::FinalityThreshold;
use crate::validator::ValidatorId;

/// Why a round ended without committing a block.
///
/// Both cases are ordinary outcomes of the protocol, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// The selected proposer was unreachable; no candidate was built.
    ProposerOffline,
    /// Attesting stake did not exceed the supermajority threshold.
    InsufficientAttestation,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardReason::ProposerOffline => write!(f, "proposer offline"),
            DiscardReason::InsufficientAttestation => write!(f, "insufficient attestation"),
        }
    }
}

/// Stake arithmetic for one round's attestation poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationTally {
    /// Stake behind `true` verdicts, proposer included.
    pub attesting_stake: u64,
    /// Stake of the full roster, offline validators included.
    pub total_stake: u64,
}

impl AttestationTally {
    pub fn new(total_stake: u64) -> Self {
        Self {
            attesting_stake: 0,
            total_stake,
        }
    }

    /// Count one attestation worth `stake` units.
    pub fn attest(&mut self, stake: u64) {
        self.attesting_stake = self.attesting_stake.saturating_add(stake);
    }

    /// Whether the tally strictly exceeds the threshold share of total.
    pub fn meets(&self, threshold: FinalityThreshold) -> bool {
        threshold.is_met(self.attesting_stake, self.total_stake)
    }

    /// Attesting share of total stake, for reporting only.
    pub fn ratio(&self) -> f64 {
        if self.total_stake == 0 {
            return 0.0;
        }
        self.attesting_stake as f64 / self.total_stake as f64
    }
}

/// Everything that happened in a single consensus round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// Round counter, starting at 1.
    pub round: u64,
    /// Validator selected to propose.
    pub proposer: ValidatorId,
    /// The candidate carried through the round: the committed block when
    /// `finalized`, the rejected draft otherwise. `None` when the proposer
    /// never got to build one.
    pub candidate: Option<Block>,
    /// Stake that attested to the candidate.
    pub attesting_stake: u64,
    /// Stake of the full roster.
    pub total_stake: u64,
    /// Whether the candidate was committed to the chain.
    pub finalized: bool,
    /// Set exactly when the round was discarded.
    pub discard: Option<DiscardReason>,
}

impl RoundOutcome {
    pub fn tally(&self) -> AttestationTally {
        AttestationTally {
            attesting_stake: self.attesting_stake,
            total_stake: self.total_stake,
        }
    }
}
