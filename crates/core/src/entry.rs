//! Ledger entries: the semantic payload carried by each block.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when an entry is malformed before it reaches the chain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntryError {
    #[error("{field} must be a positive finite number, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("sender and recipient are the same account: {0}")]
    SelfTransfer(String),

    #[error("genesis entries can only be created by chain initialization")]
    UnexpectedGenesis,

    #[error("username must not be empty")]
    EmptyUsername,
}

/// A state-changing event recorded in a block.
///
/// Encoded as JSON tagged by `"type"`, e.g.
/// `{"type":"production","username":"alice","energy":15.0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entry {
    /// Marker payload of block 0.
    Genesis,
    /// A producer minted `energy` tokens.
    Production { username: String, energy: f64 },
    /// `sender` sold `tokens` to `recipient` at `price` per token.
    Transfer {
        sender: String,
        recipient: String,
        tokens: f64,
        price: f64,
    },
    /// Currency paid into an account.
    Deposit { username: String, amount: f64 },
    /// Currency paid out of an account.
    Withdrawal { username: String, amount: f64 },
}

impl Entry {
    pub fn production(username: impl Into<String>, energy: f64) -> Self {
        Entry::Production {
            username: username.into(),
            energy,
        }
    }

    pub fn transfer(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        tokens: f64,
        price: f64,
    ) -> Self {
        Entry::Transfer {
            sender: sender.into(),
            recipient: recipient.into(),
            tokens,
            price,
        }
    }

    pub fn deposit(username: impl Into<String>, amount: f64) -> Self {
        Entry::Deposit {
            username: username.into(),
            amount,
        }
    }

    pub fn withdrawal(username: impl Into<String>, amount: f64) -> Self {
        Entry::Withdrawal {
            username: username.into(),
            amount,
        }
    }

    /// Short lowercase name of the entry type, matching its JSON tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Entry::Genesis => "genesis",
            Entry::Production { .. } => "production",
            Entry::Transfer { .. } => "transfer",
            Entry::Deposit { .. } => "deposit",
            Entry::Withdrawal { .. } => "withdrawal",
        }
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self, Entry::Genesis)
    }

    /// Accounts this entry touches, sender first for transfers.
    pub fn usernames(&self) -> Vec<&str> {
        match self {
            Entry::Genesis => Vec::new(),
            Entry::Production { username, .. }
            | Entry::Deposit { username, .. }
            | Entry::Withdrawal { username, .. } => vec![username.as_str()],
            Entry::Transfer {
                sender, recipient, ..
            } => vec![sender.as_str(), recipient.as_str()],
        }
    }

    /// Whether `username` is a party to this entry.
    pub fn involves(&self, username: &str) -> bool {
        self.usernames().contains(&username)
    }

    /// Check the entry is well formed for appending by a caller.
    ///
    /// Quantities must be finite and strictly positive.
    pub fn validate(&self) -> Result<(), EntryError> {
        match self {
            Entry::Genesis => Err(EntryError::UnexpectedGenesis),
            Entry::Production { username, energy } => {
                check_username(username)?;
                check_positive("energy", *energy)
            }
            Entry::Transfer {
                sender,
                recipient,
                tokens,
                price,
            } => {
                check_username(sender)?;
                check_username(recipient)?;
                if sender == recipient {
                    return Err(EntryError::SelfTransfer(sender.clone()));
                }
                check_positive("tokens", *tokens)?;
                check_positive("price", *price)
            }
            Entry::Deposit { username, amount } | Entry::Withdrawal { username, amount } => {
                check_username(username)?;
                check_positive("amount", *amount)
            }
        }
    }

    /// Canonical JSON encoding used as hash input.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).expect("entry serialization should not fail")
    }
}

fn check_username(username: &str) -> Result<(), EntryError> {
    if username.is_empty() {
        return Err(EntryError::EmptyUsername);
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), EntryError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EntryError::NonPositive { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_tagging() {
        let entry = Entry::production("alice", 15.0);
        assert_eq!(
            entry.canonical_json(),
            r#"{"type":"production","username":"alice","energy":15.0}"#
        );

        assert_eq!(Entry::Genesis.canonical_json(), r#"{"type":"genesis"}"#);

        let parsed: Entry =
            serde_json::from_str(r#"{"type":"deposit","username":"bob","amount":100.0}"#)
                .unwrap();
        assert_eq!(parsed, Entry::deposit("bob", 100.0));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let parsed: Result<Entry, _> =
            serde_json::from_str(r#"{"type":"mint","username":"bob","amount":1.0}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_usernames_and_involves() {
        let transfer = Entry::transfer("alice", "bob", 4.0, 5.0);
        assert_eq!(transfer.usernames(), vec!["alice", "bob"]);
        assert!(transfer.involves("alice"));
        assert!(transfer.involves("bob"));
        assert!(!transfer.involves("carol"));

        assert!(Entry::Genesis.usernames().is_empty());
        assert!(Entry::deposit("carol", 1.0).involves("carol"));
    }

    #[test]
    fn test_validate_quantities() {
        assert!(Entry::production("alice", 1.0).validate().is_ok());
        assert!(matches!(
            Entry::production("alice", 0.0).validate(),
            Err(EntryError::NonPositive { field: "energy", .. })
        ));
        assert!(matches!(
            Entry::deposit("alice", -5.0).validate(),
            Err(EntryError::NonPositive { field: "amount", .. })
        ));
        assert!(matches!(
            Entry::transfer("a", "b", 1.0, f64::NAN).validate(),
            Err(EntryError::NonPositive { field: "price", .. })
        ));
        assert!(matches!(
            Entry::withdrawal("a", f64::INFINITY).validate(),
            Err(EntryError::NonPositive { .. })
        ));
    }

    #[test]
    fn test_validate_parties() {
        assert_eq!(
            Entry::transfer("alice", "alice", 1.0, 1.0).validate(),
            Err(EntryError::SelfTransfer("alice".into()))
        );
        assert_eq!(
            Entry::deposit("", 1.0).validate(),
            Err(EntryError::EmptyUsername)
        );
        assert_eq!(
            Entry::Genesis.validate(),
            Err(EntryError::UnexpectedGenesis)
        );
    }

    #[test]
    fn test_kind_matches_tag() {
        for entry in [
            Entry::Genesis,
            Entry::production("a", 1.0),
            Entry::transfer("a", "b", 1.0, 1.0),
            Entry::deposit("a", 1.0),
            Entry::withdrawal("a", 1.0),
        ] {
            let value: serde_json::Value = serde_json::from_str(&entry.canonical_json()).unwrap();
            assert_eq!(value["type"], entry.kind());
        }
    }
}
