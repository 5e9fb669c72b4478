use blake3::Hasher as Blake3;
use rand::rngs::StdRng;
use rand::Rng;

use stakecast_chain::Chain;
use stakecast_consensus::{Validator, ValidatorId};
use stakecast_types::{AccountId, Transaction};

use crate::config::NodeConfig;

/// Build a roster of `count` validators with deterministic identities and
/// stakes drawn uniformly from `[min_stake, max_stake]`.
pub fn build_roster(
    rng: &mut StdRng,
    count: usize,
    min_stake: u64,
    max_stake: u64,
) -> Vec<Validator> {
    (0..count)
        .map(|index| Validator::new(roster_id(index), rng.gen_range(min_stake..=max_stake)))
        .collect()
}

/// Identity of the validator at `index`: a digest of its roster position.
fn roster_id(index: usize) -> ValidatorId {
    let mut hasher = Blake3::new();
    hasher.update(&(index as u64).to_be_bytes());

    let hash = hasher.finalize();
    let mut id = [0u8; 32];
    id.copy_from_slice(&hash.as_bytes()[0..32]);
    id
}

/// Queues random transfer batches between roster accounts ahead of each
/// round, standing in for network activity.
pub struct TrafficGenerator {
    accounts: Vec<AccountId>,
    min_per_round: usize,
    max_per_round: usize,
    max_amount: u64,
    rng: StdRng,
}

impl TrafficGenerator {
    pub fn new(roster: &[Validator], config: &NodeConfig, rng: StdRng) -> Self {
        Self {
            accounts: roster.iter().map(|validator| validator.id).collect(),
            min_per_round: config.min_transactions_per_round,
            max_per_round: config.max_transactions_per_round,
            max_amount: config.max_transfer_amount,
            rng,
        }
    }

    /// Queue one round's worth of transfers; returns how many were queued.
    ///
    /// A roster of fewer than two accounts generates nothing, since a
    /// transfer needs distinct endpoints.
    pub fn submit_batch(&mut self, chain: &mut Chain) -> usize {
        if self.accounts.len() < 2 {
            return 0;
        }

        let count = self.rng.gen_range(self.min_per_round..=self.max_per_round);
        let mut queued = 0;
        for _ in 0..count {
            let sender_index = self.rng.gen_range(0..self.accounts.len());
            // Recipient is drawn by offset from the sender, so a transfer
            // never pays its own account.
            let offset = self.rng.gen_range(1..self.accounts.len());
            let recipient_index = (sender_index + offset) % self.accounts.len();

            let transaction = Transaction::new(
                self.accounts[sender_index],
                self.accounts[recipient_index],
                self.rng.gen_range(1..=self.max_amount),
            );
            if chain.submit_transaction(transaction) {
                queued += 1;
            }
        }
        queued
    }
}
