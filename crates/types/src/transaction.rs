use blake3::Hasher as Blake3;
use serde::{Deserialize, Serialize};

use crate::time::TimeMicros;

/// Account address (32-byte digest).
pub type AccountId = [u8; 32];
/// Canonical identifier for a transaction (32-byte digest).
pub type TxId = [u8; 32];

/// A single value transfer awaiting inclusion in a block.
///
/// Transactions are immutable once created; the creation timestamp is part
/// of the content digest, so two otherwise identical transfers still carry
/// distinct identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Sender address.
    pub sender: AccountId,
    /// Recipient address.
    pub recipient: AccountId,
    /// Amount to transfer.
    pub amount: u64,
    /// Timestamp when the transaction was created.
    pub timestamp: TimeMicros,
}

impl Transaction {
    /// Create a new transaction stamped with the current time.
    pub fn new(sender: AccountId, recipient: AccountId, amount: u64) -> Self {
        Self {
            sender,
            recipient,
            amount,
            timestamp: TimeMicros::now(),
        }
    }

    /// Canonical content digest for this transaction.
    pub fn id(&self) -> TxId {
        let mut hasher = Blake3::new();
        hasher.update(&self.sender);
        hasher.update(&self.recipient);
        hasher.update(&self.amount.to_be_bytes());
        hasher.update(&self.timestamp.0.to_be_bytes());

        let hash = hasher.finalize();
        let mut id = [0u8; 32];
        id.copy_from_slice(&hash.as_bytes()[0..32]);
        id
    }

    /// Check basic well-formedness.
    pub fn is_valid(&self) -> bool {
        if self.amount == 0 {
            return false;
        }

        if self.sender == self.recipient {
            return false;
        }

        true
    }
}
