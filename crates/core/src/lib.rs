//! Core ledger primitives for gridledger.
//!
//! This crate provides the fundamental types used throughout the ledger:
//! - Blake3 hashing and the block content hash
//! - Ledger entries (production, transfer, deposit, withdrawal)
//! - Hash-linked blocks
//! - Account state and the balance applier

pub mod account;
pub mod applier;
pub mod block;
pub mod entry;
pub mod hash;

// Re-export commonly used types at the crate root
pub use account::{Account, Role};
pub use applier::{apply, Accounts, ApplyError};
pub use block::Block;
pub use entry::{Entry, EntryError};
pub use hash::{block_hash, hash, hash_concat, Hash, H256};
