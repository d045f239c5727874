//! Main ledger orchestration.
//!
//! [`Ledger`] owns the storage, the configuration and the price oracle. It
//! turns entries into hash-linked blocks and commits them together with their
//! balance updates.

use crate::config::{ConfigError, LedgerConfig};
use crate::oracle::{PriceOracle, PricePoint};
use chrono::{DateTime, Utc};
use gridledger_core::{Account, ApplyError, Block, Entry, EntryError, Hash, Role};
use gridledger_storage::{AccountStore, ChainStore, ChainTip, Storage, StorageError};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("chain integrity violated at block {index}: {reason}")]
    ChainIntegrity { index: u64, reason: String },

    #[error("insufficient funds: {username} needs {required}, has {available}")]
    InsufficientFunds {
        username: String,
        required: f64,
        available: f64,
    },

    #[error("insufficient tokens: {username} needs {required}, has {available}")]
    InsufficientTokens {
        username: String,
        required: f64,
        available: f64,
    },

    #[error("amount overflow on account {username}")]
    Overflow { username: String },

    #[error("account not found: {0}")]
    NotFound(String),

    #[error("account already exists: {0}")]
    AccountExists(String),

    #[error("invalid entry: {0}")]
    InvalidEntry(#[from] EntryError),

    #[error("lost the race for the chain tip {attempts} time(s), retry the append")]
    ConcurrencyConflict { attempts: u32 },

    #[error("storage error: {0}")]
    Store(StorageError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Apply(ApplyError::AccountNotFound(username)) => {
                LedgerError::NotFound(username)
            }
            StorageError::Apply(ApplyError::InsufficientFunds {
                username,
                required,
                available,
            }) => LedgerError::InsufficientFunds {
                username,
                required,
                available,
            },
            StorageError::Apply(ApplyError::InsufficientTokens {
                username,
                required,
                available,
            }) => LedgerError::InsufficientTokens {
                username,
                required,
                available,
            },
            StorageError::Apply(ApplyError::Overflow { username }) => {
                LedgerError::Overflow { username }
            }
            StorageError::NotFound(username) => LedgerError::NotFound(username),
            StorageError::AccountExists(username) => LedgerError::AccountExists(username),
            StorageError::Conflict { .. } => LedgerError::ConcurrencyConflict { attempts: 1 },
            other => LedgerError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Outcome of a successful [`Ledger::verify_chain`] pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainReport {
    /// Number of blocks checked, genesis included.
    pub length: u64,
    /// The verified tip, `None` for an empty chain.
    pub tip: Option<ChainTip>,
}

/// Ledger statistics.
#[derive(Debug, Clone)]
pub struct LedgerStats {
    /// Index of the newest block.
    pub height: u64,
    /// Hash of the newest block.
    pub latest_block_hash: Hash,
    /// Timestamp of the newest block.
    pub latest_timestamp: f64,
    /// Number of registered accounts.
    pub account_count: usize,
    /// Tokens held across all accounts.
    pub total_tokens: f64,
    /// Currency held across all accounts.
    pub total_balance: f64,
    /// Current market price.
    pub market_price: f64,
}

/// The chain manager: a hash-linked ledger over account balances.
///
/// `Ledger` is `Send + Sync`; share it between threads with `Arc<Ledger>`.
pub struct Ledger {
    /// Storage backend.
    storage: Storage,
    /// Configuration.
    config: LedgerConfig,
    /// Market price, shared with callers.
    oracle: Arc<PriceOracle>,
}

impl Ledger {
    /// Create a ledger over the given storage.
    pub fn new(storage: Storage, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let oracle = Arc::new(PriceOracle::new(config.oracle.clone()));
        Ok(Self {
            storage,
            config,
            oracle,
        })
    }

    /// Open a ledger stored at `path`.
    pub fn open<P: AsRef<Path>>(path: P, config: LedgerConfig) -> Result<Self> {
        Self::new(Storage::open(path)?, config)
    }

    /// Open an in-memory ledger (for testing).
    pub fn open_temporary(config: LedgerConfig) -> Result<Self> {
        Self::new(Storage::open_temporary()?, config)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Handle to the market price oracle.
    pub fn oracle(&self) -> Arc<PriceOracle> {
        Arc::clone(&self.oracle)
    }

    fn chain(&self) -> ChainStore<'_> {
        ChainStore::new(&self.storage)
    }

    fn accounts(&self) -> AccountStore<'_> {
        AccountStore::new(&self.storage)
    }

    // =========================================================================
    // Chain
    // =========================================================================

    /// Create the genesis block if the chain is empty.
    ///
    /// Returns `true` if this call created it. Safe to call any number of
    /// times, from any number of threads.
    pub fn initialize(&self) -> Result<bool> {
        let genesis = Block::genesis(Block::current_timestamp());
        let created = self.chain().init_genesis(&genesis)?;
        if created {
            info!(hash = %genesis.hash, "genesis block created");
        }
        Ok(created)
    }

    /// Append an entry to the chain and apply it to the accounts it touches.
    ///
    /// The block and its balance updates commit together or not at all. If
    /// another writer moves the tip first, the block is rebuilt on the new tip
    /// and retried, up to `max_append_retries` times. Production and transfer
    /// entries move the market price once committed.
    pub fn append(&self, entry: Entry) -> Result<Block> {
        entry.validate()?;

        let chain = self.chain();
        let attempts = self.config.max_append_retries;

        for attempt in 1..=attempts {
            let tip = match chain.get_tip()? {
                Some(tip) => tip,
                None => {
                    self.initialize()?;
                    chain.get_tip()?.ok_or_else(|| LedgerError::ChainIntegrity {
                        index: 0,
                        reason: "no tip after genesis initialization".into(),
                    })?
                }
            };

            let block = Block::new(
                tip.index + 1,
                tip.hash,
                entry.clone(),
                Block::current_timestamp(),
            );

            match chain.commit_block(&block, tip) {
                Ok(_) => {
                    info!(
                        index = block.index,
                        kind = block.payload.kind(),
                        hash = %block.hash,
                        "block appended"
                    );
                    self.observe_market(&block.payload);
                    return Ok(block);
                }
                Err(StorageError::Conflict { expected, found }) => {
                    warn!(attempt, ?expected, ?found, "chain tip moved, retrying append");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(LedgerError::ConcurrencyConflict { attempts })
    }

    fn observe_market(&self, entry: &Entry) {
        if let Some((volume, is_demand)) = market_pressure(entry) {
            self.oracle.update(volume, is_demand);
        }
    }

    /// Get the newest block.
    pub fn latest_block(&self) -> Result<Option<Block>> {
        Ok(self.chain().get_latest_block()?)
    }

    /// Get a block by index.
    pub fn get_block(&self, index: u64) -> Result<Option<Block>> {
        Ok(self.chain().get_block(index)?)
    }

    /// The last `limit` blocks, newest first.
    pub fn chain_tail(&self, limit: usize) -> Result<Vec<Block>> {
        Ok(self.chain().get_recent_blocks(limit)?)
    }

    /// The last `limit` blocks involving `username`, newest first.
    pub fn history(&self, username: &str, limit: usize) -> Result<Vec<Block>> {
        if !self.accounts().account_exists(username)? {
            return Err(LedgerError::NotFound(username.to_string()));
        }
        Ok(self.chain().get_history(username, limit)?)
    }

    /// Walk the whole chain and check every link and hash.
    ///
    /// Fails with [`LedgerError::ChainIntegrity`] at the first block whose
    /// index, parent link or content hash is wrong, or if the stored tip does
    /// not point at the last block.
    pub fn verify_chain(&self) -> Result<ChainReport> {
        let chain = self.chain();
        let mut previous: Option<Block> = None;
        let mut length = 0u64;

        for item in chain.blocks() {
            let block = item.map_err(|err| match err {
                StorageError::Json(e) => LedgerError::ChainIntegrity {
                    index: length,
                    reason: format!("undecodable block record: {e}"),
                },
                other => other.into(),
            })?;

            if block.index != length {
                return Err(integrity(
                    length,
                    format!("expected index {length}, found {}", block.index),
                ));
            }

            match &previous {
                None if !block.is_genesis() => {
                    return Err(integrity(0, "first block is not a genesis block"));
                }
                Some(parent) if block.prev_hash != parent.hash => {
                    return Err(integrity(
                        block.index,
                        format!("prev_hash does not match block {}", parent.index),
                    ));
                }
                _ => {}
            }

            if !block.verify_hash() {
                return Err(integrity(block.index, "stored hash does not match contents"));
            }

            length += 1;
            previous = Some(block);
        }

        let tip = chain.get_tip()?;
        let expected = previous.as_ref().map(ChainTip::of);
        if tip != expected {
            return Err(integrity(
                length.saturating_sub(1),
                format!("stored tip {tip:?} does not match last block {expected:?}"),
            ));
        }

        info!(length, "chain verified");
        Ok(ChainReport { length, tip })
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Register an account with the configured initial balance.
    pub fn register(&self, username: &str, role: Role) -> Result<Account> {
        if username.is_empty() {
            return Err(EntryError::EmptyUsername.into());
        }
        let account = Account::new(username, role, self.config.initial_balance);
        self.accounts().register(&account)?;
        info!(username, %role, "account registered");
        Ok(account)
    }

    /// Get an account by username.
    pub fn get_account(&self, username: &str) -> Result<Account> {
        Ok(self.accounts().get_account(username)?)
    }

    /// All accounts, ordered by username.
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.accounts().list_accounts()?)
    }

    // =========================================================================
    // Market operations
    // =========================================================================

    /// Record `energy` units produced by `username`, minting as many tokens.
    pub fn produce(&self, username: &str, energy: f64) -> Result<Block> {
        self.append(Entry::production(username, energy))
    }

    /// `buyer` buys `tokens` from `seller` at the current market price.
    pub fn buy(&self, buyer: &str, seller: &str, tokens: f64) -> Result<Block> {
        let price = self.oracle.current();
        self.append(Entry::transfer(seller, buyer, tokens, price))
    }

    /// Pay `amount` into `username`'s balance.
    pub fn deposit(&self, username: &str, amount: f64) -> Result<Block> {
        self.append(Entry::deposit(username, amount))
    }

    /// Pay `amount` out of `username`'s balance.
    pub fn withdraw(&self, username: &str, amount: f64) -> Result<Block> {
        self.append(Entry::withdrawal(username, amount))
    }

    pub fn price_current(&self) -> f64 {
        self.oracle.current()
    }

    pub fn price_history(&self) -> Vec<PricePoint> {
        self.oracle.history()
    }

    pub fn price_update(&self, volume: f64, is_demand: bool) -> f64 {
        self.oracle.update(volume, is_demand)
    }

    /// Rebuild market state by feeding every stored production and transfer
    /// through a fresh oracle, in chain order. Each price point carries the
    /// timestamp of the block that caused it.
    ///
    /// The live oracle is per process; this gives a process that did not see
    /// the trades (such as a one-shot CLI) the price they imply. The live
    /// oracle is updated after each commit, so two concurrent appends can
    /// reach it out of chain order. Near the floor or ceiling the clamp then
    /// makes the live price differ from the replayed one, which is the
    /// chain-ordered value.
    pub fn replay_market(&self) -> Result<PriceOracle> {
        let oracle = PriceOracle::new(self.config.oracle.clone());
        for item in self.chain().blocks() {
            let block = item?;
            if let Some((volume, is_demand)) = market_pressure(&block.payload) {
                oracle.update_at(volume, is_demand, block_time(block.timestamp));
            }
        }
        Ok(oracle)
    }

    /// Get ledger statistics.
    pub fn stats(&self) -> Result<LedgerStats> {
        let latest = self
            .latest_block()?
            .ok_or_else(|| integrity(0, "chain has no genesis block"))?;

        let (total_tokens, total_balance) = self.accounts().totals()?;

        Ok(LedgerStats {
            height: latest.index,
            latest_block_hash: latest.hash,
            latest_timestamp: latest.timestamp,
            account_count: self.storage.accounts().len(),
            total_tokens,
            total_balance,
            market_price: self.oracle.current(),
        })
    }
}

/// Volume and direction an entry pushes the market price in.
///
/// Production is supply, a transfer is demand.
fn market_pressure(entry: &Entry) -> Option<(f64, bool)> {
    match entry {
        Entry::Production { energy, .. } => Some((*energy, false)),
        Entry::Transfer { tokens, .. } => Some((*tokens, true)),
        Entry::Genesis | Entry::Deposit { .. } | Entry::Withdrawal { .. } => None,
    }
}

/// Block timestamps are float seconds since the Unix epoch.
fn block_time(timestamp: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis((timestamp * 1000.0) as i64).unwrap_or_else(Utc::now)
}

fn integrity(index: u64, reason: impl Into<String>) -> LedgerError {
    LedgerError::ChainIntegrity {
        index,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_ledger() -> Ledger {
        let ledger = Ledger::open_temporary(LedgerConfig::default()).unwrap();
        ledger.initialize().unwrap();
        ledger
    }

    #[test]
    fn test_ledger_init() {
        let ledger = setup_ledger();

        let genesis = ledger.latest_block().unwrap().unwrap();
        assert!(genesis.is_genesis());
        assert_eq!(ledger.stats().unwrap().height, 0);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let ledger = setup_ledger();
        assert!(!ledger.initialize().unwrap());
        assert!(!ledger.initialize().unwrap());
        assert_eq!(ledger.chain_tail(10).unwrap().len(), 1);
    }

    #[test]
    fn test_append_on_empty_store_creates_genesis() {
        let ledger = Ledger::open_temporary(LedgerConfig::default()).unwrap();
        ledger.register("alice", Role::Buyer).unwrap();

        let block = ledger.deposit("alice", 10.0).unwrap();
        assert_eq!(block.index, 1);

        let genesis = ledger.get_block(0).unwrap().unwrap();
        assert!(genesis.is_genesis());
        assert_eq!(block.prev_hash, genesis.hash);
    }

    #[test]
    fn test_append_rejects_genesis_entry() {
        let ledger = setup_ledger();
        assert!(matches!(
            ledger.append(Entry::Genesis),
            Err(LedgerError::InvalidEntry(EntryError::UnexpectedGenesis))
        ));
    }

    #[test]
    fn test_register_uses_initial_balance() {
        let mut config = LedgerConfig::default();
        config.initial_balance = 250.0;
        let ledger = Ledger::open_temporary(config).unwrap();

        let account = ledger.register("bob", Role::Buyer).unwrap();
        assert_eq!(account.balance, 250.0);
        assert_eq!(account.tokens, 0.0);
        assert_eq!(ledger.get_account("bob").unwrap(), account);

        assert!(matches!(
            ledger.register("bob", Role::Producer),
            Err(LedgerError::AccountExists(_))
        ));
    }

    #[test]
    fn test_unknown_account_is_not_found() {
        let ledger = setup_ledger();
        assert!(matches!(
            ledger.get_account("ghost"),
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            ledger.produce("ghost", 1.0),
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            ledger.history("ghost", 10),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn test_rejected_entry_moves_nothing() {
        let ledger = setup_ledger();
        ledger.register("alice", Role::Producer).unwrap();

        let result = ledger.withdraw("alice", 5000.0);
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));

        assert_eq!(ledger.latest_block().unwrap().unwrap().index, 0);
        assert_eq!(ledger.get_account("alice").unwrap().balance, 1000.0);
        assert_eq!(ledger.price_current(), 5.0);
    }

    #[test]
    fn test_stats() {
        let ledger = setup_ledger();
        ledger.register("alice", Role::Producer).unwrap();
        ledger.produce("alice", 10.0).unwrap();

        let stats = ledger.stats().unwrap();
        assert_eq!(stats.height, 1);
        assert_eq!(stats.account_count, 1);
        assert_eq!(stats.total_tokens, 10.0);
        assert_eq!(stats.total_balance, 1000.0);
        assert!((stats.market_price - 4.99).abs() < 1e-9);
    }

    #[test]
    fn test_replay_market_matches_live_price() {
        let ledger = setup_ledger();
        ledger.register("p", Role::Producer).unwrap();
        ledger.register("b", Role::Buyer).unwrap();
        ledger.produce("p", 40.0).unwrap();
        ledger.deposit("b", 10.0).unwrap();
        ledger.buy("b", "p", 12.0).unwrap();

        let replayed = ledger.replay_market().unwrap();
        assert!((replayed.current() - ledger.price_current()).abs() < 1e-12);
        assert_eq!(replayed.history().len(), ledger.price_history().len());

        // Replayed points carry the trade times, not the replay time
        let blocks = ledger.chain_tail(usize::MAX).unwrap();
        let buy = &blocks[0];
        let last = *replayed.history().last().unwrap();
        assert_eq!(
            last.time.timestamp_millis(),
            (buy.timestamp * 1000.0) as i64
        );
    }

    #[test]
    fn test_storage_errors_map_to_distinct_kinds() {
        let funds: LedgerError = StorageError::Apply(ApplyError::InsufficientFunds {
            username: "b".into(),
            required: 2.0,
            available: 1.0,
        })
        .into();
        assert!(matches!(funds, LedgerError::InsufficientFunds { .. }));

        let tokens: LedgerError = StorageError::Apply(ApplyError::InsufficientTokens {
            username: "a".into(),
            required: 2.0,
            available: 1.0,
        })
        .into();
        assert!(matches!(tokens, LedgerError::InsufficientTokens { .. }));

        let missing: LedgerError =
            StorageError::Apply(ApplyError::AccountNotFound("x".into())).into();
        assert!(matches!(missing, LedgerError::NotFound(_)));

        let overflow: LedgerError = StorageError::Apply(ApplyError::Overflow {
            username: "a".into(),
        })
        .into();
        assert!(matches!(overflow, LedgerError::Overflow { .. }));

        let store: LedgerError = StorageError::InvalidBlock("bad".into()).into();
        assert!(matches!(store, LedgerError::Store(_)));

        let messages: Vec<String> = [funds, tokens, missing, overflow, store]
            .iter()
            .map(|e| e.to_string())
            .collect();
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
