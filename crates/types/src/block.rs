use blake3::Hasher as Blake3;
use serde::{Deserialize, Serialize};

use crate::time::TimeMicros;
use crate::transaction::Transaction;

/// Canonical identifier for a block (32-byte digest).
pub type BlockDigest = [u8; 32];

/// Parent digest carried by the genesis block.
pub const GENESIS_PARENT: BlockDigest = [0u8; 32];

/// One sealed unit of the chain.
///
/// `digest` is a pure function of the remaining fields; recomputing it over
/// the stored contents always reproduces the stored value, so any mutation
/// after sealing is detectable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    /// Height of this block; genesis sits at 0.
    pub index: u64,
    /// Ordered transactions included in this block.
    pub transactions: Vec<Transaction>,
    /// Time the block was assembled.
    pub timestamp: TimeMicros,
    /// Digest of the preceding block.
    pub previous_digest: BlockDigest,
    /// Canonical digest over the fields above.
    pub digest: BlockDigest,
}

impl Block {
    /// Assemble and seal a block over the supplied contents.
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        timestamp: TimeMicros,
        previous_digest: BlockDigest,
    ) -> Self {
        let digest = Self::compute_digest(index, &transactions, timestamp, &previous_digest);
        Self {
            index,
            transactions,
            timestamp,
            previous_digest,
            digest,
        }
    }

    /// The fixed block every chain starts from.
    pub fn genesis() -> Self {
        Self::new(0, Vec::new(), TimeMicros(0), GENESIS_PARENT)
    }

    /// Compute the canonical digest for the supplied block contents.
    pub fn compute_digest(
        index: u64,
        transactions: &[Transaction],
        timestamp: TimeMicros,
        previous_digest: &BlockDigest,
    ) -> BlockDigest {
        let mut hasher = Blake3::new();
        hasher.update(&index.to_be_bytes());
        for tx in transactions {
            hasher.update(&tx.id());
        }
        hasher.update(&timestamp.0.to_be_bytes());
        hasher.update(previous_digest);

        let hash = hasher.finalize();
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hash.as_bytes()[0..32]);
        digest
    }

    /// Verify that the stored digest matches the stored contents.
    pub fn is_valid(&self) -> bool {
        self.digest
            == Self::compute_digest(
                self.index,
                &self.transactions,
                self.timestamp,
                &self.previous_digest,
            )
    }
}
