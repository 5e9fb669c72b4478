//! # Stakecast Chain
//!
//! The canonical chain view shared by every simulated validator: the
//! genesis-rooted list of sealed blocks plus the pool of pending
//! transactions awaiting inclusion.
//!
//! All mutation goes through [`Chain::submit_transaction`] and the atomic
//! [`Chain::add_block`] commit. A failed commit leaves the chain untouched.

use serde::{Deserialize, Serialize};
use stakecast_types::{Block, BlockDigest, Transaction, TxId, GENESIS_PARENT};
use std::collections::HashSet;
use tracing::debug;

/// Violation of a commit precondition.
///
/// Candidate blocks are validated against the same chain view they are
/// committed to, so these can only fire when the round driver is broken.
/// Callers must treat them as fatal rather than retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainIntegrityError {
    #[error("block index {got} does not match chain height {expected}")]
    IndexMismatch { expected: u64, got: u64 },
    #[error("previous digest {got} does not link to chain tip {expected}")]
    PreviousDigestMismatch { expected: String, got: String },
}

/// The canonical chain plus its pending transaction pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// Create a chain holding only the genesis block.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
            pending: Vec::new(),
        }
    }

    /// Number of sealed blocks. The next block to commit carries this index.
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Digest of the most recently sealed block.
    pub fn tip_digest(&self) -> BlockDigest {
        self.blocks
            .last()
            .map(|block| block.digest)
            .unwrap_or(GENESIS_PARENT)
    }

    /// All sealed blocks, genesis first.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Pending transactions in arrival order.
    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Clone of the first `max` pending transactions in arrival order.
    pub fn pending_snapshot(&self, max: usize) -> Vec<Transaction> {
        self.pending.iter().take(max).cloned().collect()
    }

    /// Queue a transaction for inclusion in a future block.
    ///
    /// Malformed transactions (zero amount or self-transfer) are dropped;
    /// returns whether the transaction was admitted.
    pub fn submit_transaction(&mut self, tx: Transaction) -> bool {
        if !tx.is_valid() {
            debug!(
                sender = %hex::encode(tx.sender),
                amount = tx.amount,
                "dropping malformed transaction"
            );
            return false;
        }

        self.pending.push(tx);
        true
    }

    /// Atomically append a sealed block.
    ///
    /// Re-checks the commit preconditions (height continuity and tip
    /// linkage) even for blocks that already passed validation, then
    /// removes exactly the included transactions from the pending pool.
    /// Pending entries that arrived after the block was assembled stay
    /// queued.
    pub fn add_block(&mut self, block: Block) -> Result<(), ChainIntegrityError> {
        if block.index != self.height() {
            return Err(ChainIntegrityError::IndexMismatch {
                expected: self.height(),
                got: block.index,
            });
        }

        let tip = self.tip_digest();
        if block.previous_digest != tip {
            return Err(ChainIntegrityError::PreviousDigestMismatch {
                expected: hex::encode(tip),
                got: hex::encode(block.previous_digest),
            });
        }

        let included: HashSet<TxId> = block.transactions.iter().map(|tx| tx.id()).collect();
        self.pending.retain(|tx| !included.contains(&tx.id()));

        debug!(
            height = block.index,
            txs = block.transactions.len(),
            pending = self.pending.len(),
            digest = %hex::encode(block.digest),
            "committed block"
        );
        self.blocks.push(block);

        Ok(())
    }

    /// Recheck the whole chain: genesis shape, per-block digests, and the
    /// index/digest links between consecutive blocks.
    pub fn verify(&self) -> bool {
        let Some(genesis) = self.blocks.first() else {
            return false;
        };

        if genesis.index != 0 || genesis.previous_digest != GENESIS_PARENT {
            return false;
        }

        for (i, block) in self.blocks.iter().enumerate() {
            if block.index != i as u64 {
                return false;
            }
            if !block.is_valid() {
                return false;
            }
            if i > 0 && block.previous_digest != self.blocks[i - 1].digest {
                return false;
            }
        }

        true
    }
}
