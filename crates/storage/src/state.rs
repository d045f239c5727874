//! Account state management.

use crate::db::{decode, encode, Result, Storage, StorageError};
use gridledger_core::Account;
use tracing::debug;

/// Manages account records.
///
/// Balances are only ever changed through [`crate::ChainStore::commit_block`];
/// this type covers registration and reads.
pub struct AccountStore<'a> {
    storage: &'a Storage,
}

impl<'a> AccountStore<'a> {
    /// Create a new AccountStore wrapping the given storage.
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Store a new account.
    ///
    /// Fails with [`StorageError::AccountExists`] if the username is taken.
    /// The check and the insert are a single compare-and-swap.
    pub fn register(&self, account: &Account) -> Result<()> {
        let key = Storage::account_key(&account.username);
        let value = encode(account)?;
        self.storage
            .accounts()
            .compare_and_swap(key, None as Option<&[u8]>, Some(value))?
            .map_err(|_| StorageError::AccountExists(account.username.clone()))?;
        debug!(username = %account.username, role = %account.role, "registered account");
        Ok(())
    }

    /// Get an account, `None` if it was never registered.
    pub fn find_account(&self, username: &str) -> Result<Option<Account>> {
        match self.storage.accounts().get(Storage::account_key(username))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get an account, returning error if not found.
    pub fn get_account(&self, username: &str) -> Result<Account> {
        self.find_account(username)?
            .ok_or_else(|| StorageError::NotFound(username.to_string()))
    }

    /// Check if an account exists.
    pub fn account_exists(&self, username: &str) -> Result<bool> {
        Ok(self
            .storage
            .accounts()
            .contains_key(Storage::account_key(username))?)
    }

    /// All accounts, ordered by username.
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        self.storage
            .accounts()
            .iter()
            .map(|item| {
                let (_, bytes) = item?;
                decode::<Account>(&bytes)
            })
            .collect()
    }

    /// Total tokens and total balance across all accounts.
    pub fn totals(&self) -> Result<(f64, f64)> {
        let mut tokens = 0.0;
        let mut balance = 0.0;
        for account in self.list_accounts()? {
            tokens += account.tokens;
            balance += account.balance;
        }
        Ok((tokens, balance))
    }
}
