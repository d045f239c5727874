//! Account state representation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an account does in the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Generates energy and sells tokens.
    Producer,
    /// Deposits funds and buys tokens.
    Buyer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Producer => write!(f, "producer"),
            Role::Buyer => write!(f, "buyer"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "producer" => Ok(Role::Producer),
            "buyer" => Ok(Role::Buyer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A holder of energy tokens and currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account key.
    pub username: String,
    /// Energy tokens held. Never negative.
    pub tokens: f64,
    /// Currency balance. Never negative.
    pub balance: f64,
    /// Market role.
    pub role: Role,
}

impl Account {
    /// Create a freshly registered account with no tokens.
    pub fn new(username: impl Into<String>, role: Role, balance: f64) -> Self {
        Self {
            username: username.into(),
            tokens: 0.0,
            balance,
            role,
        }
    }

    /// Add currency to the account.
    pub fn credit(&mut self, amount: f64) {
        self.balance += amount;
    }

    /// Subtract currency from the account.
    /// Returns true if successful, false if insufficient balance.
    pub fn debit(&mut self, amount: f64) -> bool {
        if self.balance >= amount {
            self.balance -= amount;
            true
        } else {
            false
        }
    }

    /// Add tokens to the account.
    pub fn credit_tokens(&mut self, amount: f64) {
        self.tokens += amount;
    }

    /// Subtract tokens from the account.
    /// Returns true if successful, false if insufficient tokens.
    pub fn debit_tokens(&mut self, amount: f64) -> bool {
        if self.tokens >= amount {
            self.tokens -= amount;
            true
        } else {
            false
        }
    }

    /// Check if the account has sufficient balance.
    pub fn has_balance(&self, amount: f64) -> bool {
        self.balance >= amount
    }

    /// Check if the account holds enough tokens.
    pub fn has_tokens(&self, amount: f64) -> bool {
        self.tokens >= amount
    }

    /// Whether crediting `amount` keeps the balance finite.
    pub fn can_credit(&self, amount: f64) -> bool {
        (self.balance + amount).is_finite()
    }

    /// Whether crediting `amount` tokens keeps the token count finite.
    pub fn can_credit_tokens(&self, amount: f64) -> bool {
        (self.tokens + amount).is_finite()
    }
}
