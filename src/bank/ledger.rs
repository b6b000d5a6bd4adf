//! Ledger facade coordinating a transfer between two loaded accounts and its persistence.
use thiserror::Error;

use crate::bank::{Account, AccountId, AccountStore, LedgerError, Money, StoreError, TargetError};

/// Summary of an applied transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: Money,
    pub source_balance: Money,
    pub destination_balance: Money,
}

/// Errors from the transfer-then-persist sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The transfer was refused; neither account changed.
    #[error(transparent)]
    Rejected(#[from] LedgerError),
    /// The transfer was applied in memory but the store does not reflect it. Both accounts
    /// must be persisted again, never just one.
    #[error("Transfer from {source_id} to {destination_id} applied but not persisted: {cause}")]
    Unpersisted {
        source_id: AccountId,
        destination_id: AccountId,
        cause: StoreError,
    },
}

/// Stateless coordinator for moves between two accounts.
pub struct Ledger;

impl Ledger {
    /// Executes a transfer with exclusive access to both accounts.
    ///
    /// A missing destination, a non-positive amount, the same account on both sides or a
    /// policy refusal all leave both accounts untouched.
    pub fn transfer(
        source: &mut Account,
        destination: Option<&mut Account>,
        amount: Money,
    ) -> Result<TransferReceipt, LedgerError> {
        let amount = amount.ensure_positive()?;
        let destination = destination.ok_or(LedgerError::InvalidTarget(TargetError::Missing))?;
        source.transfer_to(destination, amount)?;
        Ok(TransferReceipt {
            source: source.get_id(),
            destination: destination.get_id(),
            amount,
            source_balance: source.get_balance(),
            destination_balance: destination.get_balance(),
        })
    }

    /// Writes both sides of a transfer back to the store.
    pub fn persist_pair<S: AccountStore + ?Sized>(
        store: &mut S,
        source: &Account,
        destination: &Account,
    ) -> Result<(), StoreError> {
        store.update(source)?;
        store.update(destination)
    }

    /// Transfers, then persists both accounts.
    ///
    /// If persistence fails the in-memory accounts keep the transfer and the caller owns
    /// reconciliation: retry [`Ledger::persist_pair`] with both accounts, or discard both.
    pub fn transfer_and_persist<S: AccountStore + ?Sized>(
        store: &mut S,
        source: &mut Account,
        destination: Option<&mut Account>,
        amount: Money,
    ) -> Result<TransferReceipt, TransferError> {
        let amount = amount.ensure_positive()?;
        let destination = destination.ok_or(LedgerError::InvalidTarget(TargetError::Missing))?;
        let receipt = Self::transfer(source, Some(&mut *destination), amount)?;
        Self::persist_pair(store, source, destination).map_err(|cause| {
            TransferError::Unpersisted {
                source_id: receipt.source,
                destination_id: receipt.destination,
                cause,
            }
        })?;
        Ok(receipt)
    }
}
