use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

use stakecast_chain::{Chain, ChainIntegrityError};

use crate::config::{ConfigError, ConsensusConfig};
use crate::outcome::{AttestationTally, DiscardReason, RoundOutcome};
use crate::selection::{select_proposer, total_stake, EmptyRosterError};
use crate::validator::Validator;

/// Failures that terminate a run.
///
/// Discarded rounds are not errors; they come back as ordinary
/// [`RoundOutcome`]s with a discard reason set.
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error("proposer selection failed: {0}")]
    Selection(#[from] EmptyRosterError),
    #[error("chain integrity violated: {0}")]
    Chain(#[from] ChainIntegrityError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Stake-weighted consensus round engine.
///
/// Each round runs the full pipeline over the shared chain view: select a
/// proposer in proportion to stake, draft a candidate block, poll every
/// other validator for an independent verdict, and commit the candidate
/// only when attesting stake strictly exceeds the configured share of
/// total roster stake.
///
/// All randomness (proposer selection and offline faults) flows from one
/// seeded generator, so a fixed seed replays the identical schedule.
pub struct PoSConsensus {
    config: ConsensusConfig,
    validators: Vec<Validator>,
    chain: Arc<RwLock<Chain>>,
    rng: StdRng,
    round: u64,
}

impl PoSConsensus {
    /// Build an engine over the supplied roster and chain handle.
    ///
    /// The configuration is validated here and stays immutable afterwards.
    pub fn new(
        config: ConsensusConfig,
        validators: Vec<Validator>,
        chain: Arc<RwLock<Chain>>,
        seed: u64,
    ) -> Result<Self, ConsensusError> {
        config.validate()?;
        info!(
            validators = validators.len(),
            total_stake = total_stake(&validators),
            threshold = %config.finality_threshold,
            "consensus engine ready"
        );

        Ok(Self {
            config,
            validators,
            chain,
            rng: StdRng::seed_from_u64(seed),
            round: 0,
        })
    }

    /// Shared handle to the canonical chain.
    pub fn chain(&self) -> Arc<RwLock<Chain>> {
        self.chain.clone()
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Rounds driven so far, finalized or not.
    pub fn rounds_run(&self) -> u64 {
        self.round
    }

    /// Drive one consensus round to its outcome.
    ///
    /// An `Err` means the roster holds no stake or a commit invariant
    /// broke; both are fatal to the run. Every expected failure mode is an
    /// `Ok` outcome with `finalized == false`.
    pub fn run_round(&mut self) -> Result<RoundOutcome, ConsensusError> {
        self.round += 1;
        let round = self.round;
        let total = total_stake(&self.validators);

        let proposer = select_proposer(&mut self.rng, &self.validators)?.clone();
        debug!(
            round,
            proposer = %hex::encode(proposer.id),
            stake = proposer.stake,
            "proposer selected"
        );

        if self.rng.gen_bool(self.config.proposer_offline_probability) {
            warn!(
                round,
                proposer = %hex::encode(proposer.id),
                "proposer offline, round discarded"
            );
            return Ok(RoundOutcome {
                round,
                proposer: proposer.id,
                candidate: None,
                attesting_stake: 0,
                total_stake: total,
                finalized: false,
                discard: Some(DiscardReason::ProposerOffline),
            });
        }

        let candidate = {
            let chain = self.chain.read();
            proposer.propose_block(&chain, self.config.max_block_transactions)
        };
        debug!(
            round,
            height = candidate.index,
            txs = candidate.transactions.len(),
            "candidate drafted"
        );

        // Fault draws stay on the engine RNG, in roster order, so seeded
        // runs replay the same schedule regardless of validation order.
        let offline_probability = self.config.validator_offline_probability;
        let rng = &mut self.rng;
        let peers: Vec<(&Validator, bool)> = self
            .validators
            .iter()
            .filter(|validator| validator.id != proposer.id)
            .map(|validator| (validator, rng.gen_bool(offline_probability)))
            .collect();

        // Reachable peers judge the candidate in parallel; collect() is
        // the join barrier, so the tally below sees every verdict.
        let verdicts: Vec<(u64, Option<bool>)> = {
            let chain = self.chain.read();
            let view: &Chain = &chain;
            peers
                .par_iter()
                .map(|(validator, offline)| {
                    let verdict = if *offline {
                        None
                    } else {
                        Some(validator.validate_block(&candidate, view))
                    };
                    (validator.stake, verdict)
                })
                .collect()
        };

        // The proposer implicitly attests to its own candidate.
        let mut tally = AttestationTally::new(total);
        tally.attest(proposer.stake);

        let mut unreachable = 0usize;
        let mut rejections = 0usize;
        for (stake, verdict) in verdicts {
            match verdict {
                Some(true) => tally.attest(stake),
                Some(false) => rejections += 1,
                None => unreachable += 1,
            }
        }

        if !tally.meets(self.config.finality_threshold) {
            info!(
                round,
                attesting = tally.attesting_stake,
                total = tally.total_stake,
                unreachable,
                rejections,
                "attestation below threshold, round discarded"
            );
            return Ok(RoundOutcome {
                round,
                proposer: proposer.id,
                candidate: Some(candidate),
                attesting_stake: tally.attesting_stake,
                total_stake: tally.total_stake,
                finalized: false,
                discard: Some(DiscardReason::InsufficientAttestation),
            });
        }

        {
            let mut chain = self.chain.write();
            chain.add_block(candidate.clone())?;
        }
        info!(
            round,
            height = candidate.index,
            txs = candidate.transactions.len(),
            attesting = tally.attesting_stake,
            total = tally.total_stake,
            "block finalized"
        );

        Ok(RoundOutcome {
            round,
            proposer: proposer.id,
            candidate: Some(candidate),
            attesting_stake: tally.attesting_stake,
            total_stake: tally.total_stake,
            finalized: true,
            discard: None,
        })
    }
}
