//! Block storage and chain tip management.

use crate::db::{decode, decode_json, encode, encode_json, Result, Storage, StorageError};
use gridledger_core::{apply, Accounts, Block, Hash};
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult};
use sled::Transactional;
use tracing::debug;

/// Key for the chain tip pointer in the `meta` tree.
const CHAIN_TIP_KEY: &[u8] = b"chain:tip";

/// Position of the newest block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    pub index: u64,
    pub hash: Hash,
}

impl ChainTip {
    pub fn of(block: &Block) -> Self {
        Self {
            index: block.index,
            hash: block.hash,
        }
    }
}

/// Manages block storage and the chain tip.
pub struct ChainStore<'a> {
    storage: &'a Storage,
}

impl<'a> ChainStore<'a> {
    /// Create a new ChainStore wrapping the given storage.
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get the current chain tip, `None` if the chain is empty.
    pub fn get_tip(&self) -> Result<Option<ChainTip>> {
        match self.storage.meta().get(CHAIN_TIP_KEY)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Check if the chain is initialized (has a genesis block).
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.get_tip()?.is_some())
    }

    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.storage.blocks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.blocks().is_empty()
    }

    /// Get a block by its index.
    pub fn get_block(&self, index: u64) -> Result<Option<Block>> {
        match self.storage.blocks().get(Storage::block_key(index))? {
            Some(bytes) => Ok(Some(decode_json(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get the newest block.
    pub fn get_latest_block(&self) -> Result<Option<Block>> {
        match self.get_tip()? {
            Some(tip) => self.get_block(tip.index),
            None => Ok(None),
        }
    }

    /// All blocks in chain order, oldest first.
    pub fn blocks(&self) -> impl Iterator<Item = Result<Block>> + '_ {
        self.storage.blocks().iter().map(|item| {
            let (_, bytes) = item?;
            decode_json::<Block>(&bytes)
        })
    }

    /// The last `count` blocks, most recent first.
    pub fn get_recent_blocks(&self, count: usize) -> Result<Vec<Block>> {
        self.storage
            .blocks()
            .iter()
            .rev()
            .take(count)
            .map(|item| {
                let (_, bytes) = item?;
                decode_json::<Block>(&bytes)
            })
            .collect()
    }

    /// Up to `count` blocks whose entry involves `username`, most recent first.
    pub fn get_history(&self, username: &str, count: usize) -> Result<Vec<Block>> {
        let mut history = Vec::new();
        for item in self.storage.blocks().iter().rev() {
            if history.len() >= count {
                break;
            }
            let (_, bytes) = item?;
            let block: Block = decode_json(&bytes)?;
            if block.payload.involves(username) {
                history.push(block);
            }
        }
        Ok(history)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Initialize the chain with a genesis block if it is empty.
    ///
    /// Returns `true` if this call stored the genesis block and `false` if the
    /// chain already had one. The emptiness check and the insert run in one
    /// transaction, so concurrent callers create exactly one genesis block.
    pub fn init_genesis(&self, genesis: &Block) -> Result<bool> {
        if !genesis.is_genesis() {
            return Err(StorageError::InvalidGenesis(format!(
                "block {} is not a genesis block",
                genesis.index
            )));
        }

        let record = encode_json(genesis)?;
        let tip = encode(&ChainTip::of(genesis))?;

        let created = (self.storage.blocks(), self.storage.meta()).transaction(
            |(blocks, meta)| -> ConflictableTransactionResult<bool, StorageError> {
                if meta.get(CHAIN_TIP_KEY)?.is_some() {
                    return Ok(false);
                }
                blocks.insert(&Storage::block_key(0)[..], record.clone())?;
                meta.insert(CHAIN_TIP_KEY, tip.clone())?;
                Ok(true)
            },
        )?;

        if created {
            debug!(hash = %genesis.hash, "stored genesis block");
        }
        Ok(created)
    }

    /// Commit `block` on top of `expected`, applying its entry to the
    /// accounts it touches.
    ///
    /// Everything happens in one transaction: re-reading the tip, running the
    /// balance applier, writing the accounts, inserting the block and moving
    /// the tip. If the tip is no longer `expected` the commit aborts with
    /// [`StorageError::Conflict`] and nothing is written. Applier failures
    /// abort with [`StorageError::Apply`].
    pub fn commit_block(&self, block: &Block, expected: ChainTip) -> Result<Accounts> {
        if block.index != expected.index + 1 || block.prev_hash != expected.hash {
            return Err(StorageError::InvalidBlock(format!(
                "block {} does not extend block {} ({})",
                block.index, expected.index, expected.hash
            )));
        }

        let record = encode_json(block)?;
        let tip = encode(&ChainTip::of(block))?;
        let usernames = block.payload.usernames();

        let updated = (
            self.storage.blocks(),
            self.storage.accounts(),
            self.storage.meta(),
        )
            .transaction(
                |(blocks, accounts, meta)| -> ConflictableTransactionResult<Accounts, StorageError> {
                    let current = match meta.get(CHAIN_TIP_KEY)? {
                        Some(bytes) => Some(abort_on(decode::<ChainTip>(&bytes))?),
                        None => None,
                    };
                    if current != Some(expected) {
                        return Err(ConflictableTransactionError::Abort(
                            StorageError::Conflict {
                                expected: Some(expected.index),
                                found: current.map(|t| t.index),
                            },
                        ));
                    }

                    let mut working = Accounts::new();
                    for username in &usernames {
                        if let Some(bytes) = accounts.get(Storage::account_key(username))? {
                            working.insert(username.to_string(), abort_on(decode(&bytes))?);
                        }
                    }

                    apply(&block.payload, &mut working)
                        .map_err(|e| ConflictableTransactionError::Abort(StorageError::from(e)))?;

                    for (username, account) in &working {
                        accounts.insert(Storage::account_key(username), abort_on(encode(account))?)?;
                    }
                    blocks.insert(&Storage::block_key(block.index)[..], record.clone())?;
                    meta.insert(CHAIN_TIP_KEY, tip.clone())?;
                    Ok(working)
                },
            )?;

        debug!(index = block.index, kind = block.payload.kind(), "committed block");
        Ok(updated)
    }
}

fn abort_on<T>(result: Result<T>) -> ConflictableTransactionResult<T, StorageError> {
    result.map_err(ConflictableTransactionError::Abort)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AccountStore;
    use gridledger_core::{Account, ApplyError, Entry, Role};

    const TS: f64 = 1_700_000_000.0;

    fn setup() -> Storage {
        Storage::open_temporary().unwrap()
    }

    fn with_genesis(storage: &Storage) -> Block {
        let genesis = Block::genesis(TS);
        ChainStore::new(storage).init_genesis(&genesis).unwrap();
        genesis
    }

    fn register(storage: &Storage, name: &str, tokens: f64, balance: f64) {
        let mut account = Account::new(name, Role::Buyer, balance);
        account.tokens = tokens;
        AccountStore::new(storage).register(&account).unwrap();
    }

    #[test]
    fn test_genesis_init() {
        let storage = setup();
        let chain = ChainStore::new(&storage);

        assert!(!chain.is_initialized().unwrap());
        assert!(chain.get_latest_block().unwrap().is_none());

        let genesis = Block::genesis(TS);
        assert!(chain.init_genesis(&genesis).unwrap());

        assert!(chain.is_initialized().unwrap());
        assert_eq!(chain.get_tip().unwrap(), Some(ChainTip::of(&genesis)));
        assert_eq!(chain.get_latest_block().unwrap(), Some(genesis));
    }

    #[test]
    fn test_genesis_double_init_is_noop() {
        let storage = setup();
        let chain = ChainStore::new(&storage);

        let first = Block::genesis(TS);
        assert!(chain.init_genesis(&first).unwrap());

        let second = Block::genesis(TS + 5.0);
        assert!(!chain.init_genesis(&second).unwrap());

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.get_block(0).unwrap(), Some(first));
    }

    #[test]
    fn test_non_genesis_as_genesis_fails() {
        let storage = setup();
        let chain = ChainStore::new(&storage);

        let block = Block::new(1, Hash::ZERO, Entry::deposit("a", 1.0), TS);
        let result = chain.init_genesis(&block);
        assert!(matches!(result, Err(StorageError::InvalidGenesis(_))));
        assert!(chain.is_empty());
    }

    #[test]
    fn test_commit_block_applies_entry() {
        let storage = setup();
        let genesis = with_genesis(&storage);
        register(&storage, "alice", 0.0, 0.0);

        let chain = ChainStore::new(&storage);
        let block = genesis.child(Entry::production("alice", 12.0), TS + 1.0);
        let updated = chain.commit_block(&block, ChainTip::of(&genesis)).unwrap();

        assert_eq!(updated["alice"].tokens, 12.0);
        assert_eq!(chain.get_tip().unwrap(), Some(ChainTip::of(&block)));
        assert_eq!(chain.get_block(1).unwrap(), Some(block));

        let alice = AccountStore::new(&storage).get_account("alice").unwrap();
        assert_eq!(alice.tokens, 12.0);
    }

    #[test]
    fn test_commit_stale_tip_conflicts() {
        let storage = setup();
        let genesis = with_genesis(&storage);
        register(&storage, "alice", 0.0, 0.0);

        let chain = ChainStore::new(&storage);
        let first = genesis.child(Entry::production("alice", 1.0), TS + 1.0);
        chain.commit_block(&first, ChainTip::of(&genesis)).unwrap();

        // Built against the old tip
        let stale = genesis.child(Entry::production("alice", 2.0), TS + 2.0);
        let result = chain.commit_block(&stale, ChainTip::of(&genesis));
        assert!(matches!(
            result,
            Err(StorageError::Conflict {
                expected: Some(0),
                found: Some(1)
            })
        ));

        assert_eq!(chain.len(), 2);
        let alice = AccountStore::new(&storage).get_account("alice").unwrap();
        assert_eq!(alice.tokens, 1.0);
    }

    #[test]
    fn test_commit_rejected_entry_writes_nothing() {
        let storage = setup();
        let genesis = with_genesis(&storage);
        register(&storage, "seller", 1.0, 0.0);
        register(&storage, "buyer", 0.0, 100.0);

        let chain = ChainStore::new(&storage);
        let block = genesis.child(Entry::transfer("seller", "buyer", 2.0, 5.0), TS + 1.0);
        let result = chain.commit_block(&block, ChainTip::of(&genesis));
        assert!(matches!(
            result,
            Err(StorageError::Apply(ApplyError::InsufficientTokens { .. }))
        ));

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.get_tip().unwrap(), Some(ChainTip::of(&genesis)));
        let accounts = AccountStore::new(&storage);
        assert_eq!(accounts.get_account("seller").unwrap().tokens, 1.0);
        assert_eq!(accounts.get_account("buyer").unwrap().balance, 100.0);
    }

    #[test]
    fn test_commit_unlinked_block_fails() {
        let storage = setup();
        let genesis = with_genesis(&storage);
        let chain = ChainStore::new(&storage);

        let wrong_height = Block::new(5, genesis.hash, Entry::deposit("a", 1.0), TS);
        assert!(matches!(
            chain.commit_block(&wrong_height, ChainTip::of(&genesis)),
            Err(StorageError::InvalidBlock(_))
        ));

        let wrong_parent = Block::new(1, Hash([0xFF; 32]), Entry::deposit("a", 1.0), TS);
        assert!(matches!(
            chain.commit_block(&wrong_parent, ChainTip::of(&genesis)),
            Err(StorageError::InvalidBlock(_))
        ));
    }

    #[test]
    fn test_recent_blocks_and_history() {
        let storage = setup();
        let genesis = with_genesis(&storage);
        register(&storage, "alice", 0.0, 0.0);
        register(&storage, "bob", 0.0, 0.0);

        let chain = ChainStore::new(&storage);
        let b1 = genesis.child(Entry::deposit("alice", 1.0), TS + 1.0);
        chain.commit_block(&b1, ChainTip::of(&genesis)).unwrap();
        let b2 = b1.child(Entry::deposit("bob", 2.0), TS + 2.0);
        chain.commit_block(&b2, ChainTip::of(&b1)).unwrap();
        let b3 = b2.child(Entry::deposit("alice", 3.0), TS + 3.0);
        chain.commit_block(&b3, ChainTip::of(&b2)).unwrap();

        let recent = chain.get_recent_blocks(2).unwrap();
        assert_eq!(
            recent.iter().map(|b| b.index).collect::<Vec<_>>(),
            vec![3, 2]
        );

        let history = chain.get_history("alice", 10).unwrap();
        assert_eq!(
            history.iter().map(|b| b.index).collect::<Vec<_>>(),
            vec![3, 1]
        );
        assert_eq!(chain.get_history("alice", 1).unwrap().len(), 1);

        let all: Vec<Block> = chain.blocks().collect::<Result<_>>().unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], genesis);
    }
}
