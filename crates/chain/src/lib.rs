//! Ledger orchestration for gridledger.
//!
//! This crate brings the storage layer and the core primitives together:
//! - **Ledger**: genesis, appends with optimistic retry, chain verification
//! - **Price oracle**: bounded market price driven by production and trades
//! - **Config**: JSON-backed ledger settings
//!
//! # Example
//!
//! ```rust,no_run
//! use gridledger_chain::{Ledger, LedgerConfig};
//! use gridledger_core::Role;
//!
//! let ledger = Ledger::open("./ledger_data", LedgerConfig::default()).unwrap();
//! ledger.initialize().unwrap();
//!
//! ledger.register("producer1", Role::Producer).unwrap();
//! ledger.register("buyer1", Role::Buyer).unwrap();
//!
//! ledger.produce("producer1", 15.0).unwrap();
//! ledger.buy("buyer1", "producer1", 4.0).unwrap();
//!
//! println!("price: {}", ledger.price_current());
//! ```

pub mod config;
pub mod ledger;
pub mod oracle;

// Re-export commonly used types
pub use config::{ConfigError, LedgerConfig, OracleConfig};
pub use ledger::{ChainReport, Ledger, LedgerError, LedgerStats, Result};
pub use oracle::{PriceOracle, PricePoint};
