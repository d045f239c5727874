//! Hash-linked ledger blocks.

use crate::entry::Entry;
use crate::hash::{block_hash, Hash};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One immutable, hash-linked record of a single state-changing event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (0 for genesis).
    pub index: u64,
    /// Hash of the previous block, [`Hash::ZERO`] for genesis.
    pub prev_hash: Hash,
    /// The recorded event.
    pub payload: Entry,
    /// Unix timestamp in fractional seconds.
    pub timestamp: f64,
    /// Content hash over the four fields above.
    pub hash: Hash,
}

impl Block {
    /// Build a block, computing its hash.
    pub fn new(index: u64, prev_hash: Hash, payload: Entry, timestamp: f64) -> Self {
        let hash = block_hash(index, &prev_hash, &payload, timestamp);
        Self {
            index,
            prev_hash,
            payload,
            timestamp,
            hash,
        }
    }

    /// Create the genesis block.
    pub fn genesis(timestamp: f64) -> Self {
        Self::new(0, Hash::ZERO, Entry::Genesis, timestamp)
    }

    /// Build the block that follows `self` in the chain.
    pub fn child(&self, payload: Entry, timestamp: f64) -> Self {
        Self::new(self.index + 1, self.hash, payload, timestamp)
    }

    /// Recompute the hash from the block contents.
    pub fn compute_hash(&self) -> Hash {
        block_hash(self.index, &self.prev_hash, &self.payload, self.timestamp)
    }

    /// Check the stored hash matches the contents.
    pub fn verify_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev_hash == Hash::ZERO && self.payload.is_genesis()
    }

    /// Get the current Unix timestamp with sub-second precision.
    pub fn current_timestamp() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_secs_f64()
    }
}
