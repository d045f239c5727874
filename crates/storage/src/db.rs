//! sled database wrapper with serialization helpers.

use gridledger_core::ApplyError;
use sled::transaction::TransactionError;
use sled::{Db, Tree};
use std::path::Path;
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Account already exists: {0}")]
    AccountExists(String),

    #[error("Chain tip moved: expected block {expected:?}, found {found:?}")]
    Conflict {
        expected: Option<u64>,
        found: Option<u64>,
    },

    #[error("Entry rejected: {0}")]
    Apply(#[from] ApplyError),

    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("Invalid block: {0}")]
    InvalidBlock(String),
}

impl From<TransactionError<StorageError>> for StorageError {
    fn from(err: TransactionError<StorageError>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => StorageError::Database(e),
        }
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

const BLOCKS_TREE: &str = "blocks";
const ACCOUNTS_TREE: &str = "accounts";
const META_TREE: &str = "meta";

/// Wrapper around a sled database with one tree per record kind.
///
/// - `blocks`: big-endian block index → JSON block
/// - `accounts`: username → bincode account
/// - `meta`: chain metadata (the tip pointer)
pub struct Storage {
    db: Db,
    blocks: Tree,
    accounts: Tree,
    meta: Tree,
}

impl Storage {
    /// Open a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let blocks = db.open_tree(BLOCKS_TREE)?;
        let accounts = db.open_tree(ACCOUNTS_TREE)?;
        let meta = db.open_tree(META_TREE)?;
        Ok(Self {
            db,
            blocks,
            accounts,
            meta,
        })
    }

    /// Block records, ordered by index.
    pub fn blocks(&self) -> &Tree {
        &self.blocks
    }

    /// Account records, ordered by username.
    pub fn accounts(&self) -> &Tree {
        &self.accounts
    }

    /// Chain metadata.
    pub fn meta(&self) -> &Tree {
        &self.meta
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    // =========================================================================
    // Key Construction Helpers
    // =========================================================================

    /// Key for a block by index.
    /// Big-endian so that tree order equals chain order.
    pub fn block_key(index: u64) -> [u8; 8] {
        index.to_be_bytes()
    }

    /// Recover a block index from its key.
    pub fn block_index(key: &[u8]) -> Result<u64> {
        let bytes: [u8; 8] = key
            .try_into()
            .map_err(|_| StorageError::InvalidBlock(format!("malformed block key {:?}", key)))?;
        Ok(u64::from_be_bytes(bytes))
    }

    /// Key for an account.
    pub fn account_key(username: &str) -> &[u8] {
        username.as_bytes()
    }
}

// =========================================================================
// Codecs
// =========================================================================

/// Encode a record with bincode.
pub fn encode<V: serde::Serialize>(value: &V) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

/// Decode a bincode record.
pub fn decode<V: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<V> {
    Ok(bincode::deserialize(bytes)?)
}

/// Encode a record as JSON.
pub fn encode_json<V: serde::Serialize>(value: &V) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode a JSON record.
pub fn decode_json<V: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<V> {
    Ok(serde_json::from_slice(bytes)?)
}
