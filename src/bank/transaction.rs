//! Transaction module for the immutable records making up an account's history.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bank::Money;

/// Enum representing the type of transaction.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Interest,
}

/// Whether a transaction added money to the account or took it away.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

/// Represents one ledger event on a single account.
///
/// Transactions are only created as a byproduct of a successful account operation and are
/// never mutated afterwards; there are no setters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// The type of transaction (e.g., Deposit, Withdrawal, etc.)
    #[serde(rename = "type")]
    tx_type: TransactionType,

    /// Which way the money moved relative to the owning account.
    direction: Direction,

    /// The amount involved, always positive.
    amount: Money,

    /// Human readable description, naming the counterparty for transfers.
    description: String,

    /// When the transaction was recorded.
    timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Records a new transaction stamped with the current time.
    pub(crate) fn record(
        tx_type: TransactionType,
        direction: Direction,
        amount: Money,
        description: String,
    ) -> Self {
        Transaction {
            tx_type,
            direction,
            amount,
            description,
            timestamp: Utc::now(),
        }
    }

    /// Rebuilds a transaction previously read back from storage.
    pub fn restore(
        tx_type: TransactionType,
        direction: Direction,
        amount: Money,
        description: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Transaction {
            tx_type,
            direction,
            amount,
            description,
            timestamp,
        }
    }

    /// Gets the type of the transaction.
    pub fn get_type(&self) -> TransactionType {
        self.tx_type
    }

    pub fn get_direction(&self) -> Direction {
        self.direction
    }

    /// Gets the amount of the transaction.
    pub fn get_amount(&self) -> Money {
        self.amount
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }

    pub fn get_timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The effect this transaction had on its account's balance.
    pub fn signed_amount(&self) -> Money {
        match self.direction {
            Direction::Credit => self.amount,
            Direction::Debit => self.amount.negated(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_amount() {
        let credit = Transaction::record(
            TransactionType::Transfer,
            Direction::Credit,
            Money::from_cents(2_000),
            "Transfer from Ada".to_string(),
        );
        let debit = Transaction::record(
            TransactionType::Transfer,
            Direction::Debit,
            Money::from_cents(2_000),
            "Transfer to Grace".to_string(),
        );
        assert_eq!(credit.signed_amount(), Money::from_cents(2_000));
        assert_eq!(debit.signed_amount(), Money::from_cents(-2_000));
    }

    #[test]
    fn test_restore_keeps_fields() {
        let original = Transaction::record(
            TransactionType::Interest,
            Direction::Credit,
            Money::from_cents(2_500),
            "Interest of $25.00".to_string(),
        );
        let restored = Transaction::restore(
            original.get_type(),
            original.get_direction(),
            original.get_amount(),
            original.get_description().to_string(),
            original.get_timestamp(),
        );
        assert_eq!(original, restored);
    }
}
