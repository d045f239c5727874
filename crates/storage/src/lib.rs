//! Persistent storage layer for gridledger.
//!
//! This crate provides the storage backend for the ledger:
//! - Block storage (by index, with a tip pointer)
//! - Account records (tokens, balances, roles)
//! - Transactional commit of a block together with its balance updates
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Application Layer                     │
//! │             (Ledger, Price Oracle, CLI)                  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                   Storage Layer                          │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────┐  │
//! │  │AccountStore │  │ ChainStore  │  │ Storage (DB)    │  │
//! │  │  - Register │  │  - Blocks   │  │  - sled trees   │  │
//! │  │  - Lookups  │  │  - Tip      │  │  - codecs       │  │
//! │  │  - Totals   │  │  - Commit   │  │  - key helpers  │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                    sled Database                         │
//! │              (Embedded Key-Value Store)                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use gridledger_storage::{AccountStore, ChainStore, ChainTip, Storage};
//! use gridledger_core::{Account, Block, Entry, Role};
//!
//! // Open database
//! let storage = Storage::open("./ledger_data").unwrap();
//!
//! // Register an account
//! let accounts = AccountStore::new(&storage);
//! accounts.register(&Account::new("alice", Role::Producer, 0.0)).unwrap();
//!
//! // Work with blocks
//! let chain = ChainStore::new(&storage);
//! let genesis = Block::genesis(Block::current_timestamp());
//! chain.init_genesis(&genesis).unwrap();
//!
//! let block = genesis.child(Entry::production("alice", 10.0), Block::current_timestamp());
//! chain.commit_block(&block, ChainTip::of(&genesis)).unwrap();
//! ```

pub mod chain;
pub mod db;
pub mod state;

// Re-export commonly used types
pub use chain::{ChainStore, ChainTip};
pub use db::{Result, Storage, StorageError};
pub use state::AccountStore;
