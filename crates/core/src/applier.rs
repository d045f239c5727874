//! Balance applier: maps a ledger entry onto account state.
//!
//! [`apply`] is pure with respect to the store. The storage layer loads the
//! accounts an entry touches, runs `apply`, and writes the results back in
//! the same transaction that inserts the block. Any error leaves the working
//! set untouched, so aborting the transaction is always enough to roll back.

use crate::account::Account;
use crate::entry::Entry;
use std::collections::BTreeMap;
use thiserror::Error;

/// Working set of accounts, keyed by username.
pub type Accounts = BTreeMap<String, Account>;

/// Reasons an entry cannot be applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    #[error("account not found: {0}")]
    AccountNotFound(String),

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

    #[error("overflow: crediting {username} would leave a non-finite amount")]
    Overflow { username: String },
}

/// Apply `entry` to `accounts`.
///
/// Every check runs before the first mutation. Balances and token counts
/// never go below zero and never leave the finite range.
pub fn apply(entry: &Entry, accounts: &mut Accounts) -> Result<(), ApplyError> {
    match entry {
        Entry::Genesis => Ok(()),
        Entry::Production { username, energy } => {
            if !account(accounts, username)?.can_credit_tokens(*energy) {
                return Err(overflow(username));
            }
            account_mut(accounts, username)?.credit_tokens(*energy);
            Ok(())
        }
        Entry::Deposit { username, amount } => {
            if !account(accounts, username)?.can_credit(*amount) {
                return Err(overflow(username));
            }
            account_mut(accounts, username)?.credit(*amount);
            Ok(())
        }
        Entry::Withdrawal { username, amount } => {
            let account = account_mut(accounts, username)?;
            if !account.debit(*amount) {
                return Err(ApplyError::InsufficientFunds {
                    username: username.clone(),
                    required: *amount,
                    available: account.balance,
                });
            }
            Ok(())
        }
        Entry::Transfer {
            sender,
            recipient,
            tokens,
            price,
        } => {
            let total = tokens * price;

            let seller = account(accounts, sender)?;
            if !seller.has_tokens(*tokens) {
                return Err(ApplyError::InsufficientTokens {
                    username: sender.clone(),
                    required: *tokens,
                    available: seller.tokens,
                });
            }
            if !total.is_finite() || !seller.can_credit(total) {
                return Err(overflow(sender));
            }
            let buyer = account(accounts, recipient)?;
            if !buyer.has_balance(total) {
                return Err(ApplyError::InsufficientFunds {
                    username: recipient.clone(),
                    required: total,
                    available: buyer.balance,
                });
            }
            if !buyer.can_credit_tokens(*tokens) {
                return Err(overflow(recipient));
            }

            let seller = account_mut(accounts, sender)?;
            seller.debit_tokens(*tokens);
            seller.credit(total);

            let buyer = account_mut(accounts, recipient)?;
            buyer.credit_tokens(*tokens);
            buyer.debit(total);
            Ok(())
        }
    }
}

fn overflow(username: &str) -> ApplyError {
    ApplyError::Overflow {
        username: username.to_string(),
    }
}

fn account<'a>(accounts: &'a Accounts, username: &str) -> Result<&'a Account, ApplyError> {
    accounts
        .get(username)
        .ok_or_else(|| ApplyError::AccountNotFound(username.to_string()))
}

fn account_mut<'a>(
    accounts: &'a mut Accounts,
    username: &str,
) -> Result<&'a mut Account, ApplyError> {
    accounts
        .get_mut(username)
        .ok_or_else(|| ApplyError::AccountNotFound(username.to_string()))
}
