use anyhow::Result;
use tracing::info;

use stakecast_chain::Chain;
use stakecast_consensus::{DiscardReason, RoundOutcome};

/// Running tallies for the end-of-run report.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub rounds: u64,
    pub finalized: u64,
    pub proposer_offline: u64,
    pub insufficient_attestation: u64,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &RoundOutcome) {
        self.rounds += 1;
        match outcome.discard {
            None => self.finalized += 1,
            Some(DiscardReason::ProposerOffline) => self.proposer_offline += 1,
            Some(DiscardReason::InsufficientAttestation) => {
                self.insufficient_attestation += 1;
            }
        }
    }

    pub fn discarded(&self) -> u64 {
        self.proposer_offline + self.insufficient_attestation
    }
}

/// Final report: round tallies, then the chain the run left behind.
pub fn log_summary(summary: &RunSummary, chain: &Chain, total_stake: u64) {
    info!(
        rounds = summary.rounds,
        finalized = summary.finalized,
        discarded = summary.discarded(),
        proposer_offline = summary.proposer_offline,
        insufficient_attestation = summary.insufficient_attestation,
        "simulation finished"
    );
    info!(
        height = chain.height(),
        pending = chain.pending_len(),
        total_stake,
        "final chain state"
    );
}

/// The full chain as pretty JSON, for `--dump-chain`.
pub fn render_chain(chain: &Chain) -> Result<String> {
    Ok(serde_json::to_string_pretty(chain.blocks())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakecast_types::Block;

    fn outcome(round: u64, discard: Option<DiscardReason>) -> RoundOutcome {
        RoundOutcome {
            round,
            proposer: [1u8; 32],
            candidate: None,
            attesting_stake: 70,
            total_stake: 100,
            finalized: discard.is_none(),
            discard,
        }
    }

    #[test]
    fn test_record_partitions_outcomes() {
        let mut summary = RunSummary::default();
        summary.record(&outcome(1, None));
        summary.record(&outcome(2, Some(DiscardReason::ProposerOffline)));
        summary.record(&outcome(3, Some(DiscardReason::InsufficientAttestation)));
        summary.record(&outcome(4, None));

        assert_eq!(summary.rounds, 4);
        assert_eq!(summary.finalized, 2);
        assert_eq!(summary.proposer_offline, 1);
        assert_eq!(summary.insufficient_attestation, 1);
        assert_eq!(summary.discarded(), 2);
    }

    #[test]
    fn test_chain_renders_as_json() {
        let chain = Chain::new();
        let rendered = render_chain(&chain).unwrap();

        let blocks: Vec<Block> = serde_json::from_str(&rendered).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].index, 0);
    }
}
