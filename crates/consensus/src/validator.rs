use serde::{Deserialize, Serialize};
use stakecast_chain::Chain;
use stakecast_types::{Block, TimeMicros};

/// Validator identity (32-byte digest).
pub type ValidatorId = [u8; 32];

/// A staked participant in the consensus roster.
///
/// Stake is fixed for the lifetime of a run; there is no bonding or
/// slashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub id: ValidatorId,
    pub stake: u64,
}

impl Validator {
    pub fn new(id: ValidatorId, stake: u64) -> Self {
        Self { id, stake }
    }

    /// Draft the next block from the shared chain view.
    ///
    /// The candidate takes the first `max_transactions` pending entries in
    /// arrival order and seals them over the current tip. The chain itself
    /// is never touched; pending entries stay queued until a commit.
    pub fn propose_block(&self, chain: &Chain, max_transactions: usize) -> Block {
        let transactions = chain.pending_snapshot(max_transactions);
        Block::new(
            chain.height(),
            transactions,
            TimeMicros::now(),
            chain.tip_digest(),
        )
    }

    /// Independently judge a candidate against the shared chain view.
    ///
    /// The verdict is `true` only if the candidate extends the current tip
    /// at the next height and its digest reproduces from its contents.
    pub fn validate_block(&self, candidate: &Block, chain: &Chain) -> bool {
        if candidate.index != chain.height() {
            return false;
        }

        if candidate.previous_digest != chain.tip_digest() {
            return false;
        }

        candidate.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakecast_types::Transaction;

    fn validator(seed: u8, stake: u64) -> Validator {
        Validator::new([seed; 32], stake)
    }

    fn chain_with_pending(count: u8) -> Chain {
        let mut chain = Chain::new();
        for seed in 0..count {
            chain.submit_transaction(Transaction::new(
                [seed; 32],
                [seed.wrapping_add(1); 32],
                100 + seed as u64,
            ));
        }
        chain
    }

    #[test]
    fn test_proposal_extends_tip() {
        let chain = chain_with_pending(3);
        let block = validator(1, 100).propose_block(&chain, 10);

        assert_eq!(block.index, chain.height());
        assert_eq!(block.previous_digest, chain.tip_digest());
        assert_eq!(block.transactions.len(), 3);
        assert!(block.is_valid());
        // Drafting never drains the pool.
        assert_eq!(chain.pending_len(), 3);
    }

    #[test]
    fn test_proposal_respects_batch_bound() {
        let chain = chain_with_pending(5);
        let block = validator(1, 100).propose_block(&chain, 2);

        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[0].amount, 100);
        assert_eq!(block.transactions[1].amount, 101);
    }

    #[test]
    fn test_round_trip_proposal_validates() {
        let chain = chain_with_pending(4);
        let proposer = validator(1, 100);
        let peer = validator(2, 50);

        let block = proposer.propose_block(&chain, 10);
        assert!(peer.validate_block(&block, &chain));
    }

    #[test]
    fn test_stale_candidate_rejected() {
        let mut chain = chain_with_pending(1);
        let proposer = validator(1, 100);
        let peer = validator(2, 50);

        let stale = proposer.propose_block(&chain, 10);
        // Another block lands first.
        let winner = proposer.propose_block(&chain, 10);
        chain.add_block(winner).unwrap();

        assert!(!peer.validate_block(&stale, &chain));
    }

    #[test]
    fn test_tampered_candidate_rejected() {
        let chain = chain_with_pending(2);
        let proposer = validator(1, 100);
        let peer = validator(2, 50);

        let mut block = proposer.propose_block(&chain, 10);
        block.transactions[0].amount += 1;

        assert!(!peer.validate_block(&block, &chain));
    }

    #[test]
    fn test_wrong_parent_rejected() {
        let chain = chain_with_pending(1);
        let proposer = validator(1, 100);
        let peer = validator(2, 50);

        let mut block = proposer.propose_block(&chain, 10);
        block.previous_digest = [7u8; 32];
        // Reseal so only the linkage is wrong.
        block = Block::new(
            block.index,
            block.transactions,
            block.timestamp,
            [7u8; 32],
        );

        assert!(!peer.validate_block(&block, &chain));
    }
}
