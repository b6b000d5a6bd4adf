//! Errors reported by the ledger core.
use thiserror::Error;

use crate::bank::{AuthFailure, Money, NameError, PolicyBreach};

/// Reason a transfer destination was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetError {
    #[error("destination account does not exist")]
    Missing,
    #[error("cannot transfer to the same account")]
    SameAccount,
}

/// Errors that can occur while operating on accounts.
///
/// Every variant is a normal, recoverable business outcome reported to the immediate
/// caller; nothing here is retried by the core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid amount {0}: amount must be positive")]
    InvalidAmount(Money),
    #[error("Policy violation: {0}")]
    PolicyViolation(PolicyBreach),
    #[error("Invalid transfer target: {0}")]
    InvalidTarget(TargetError),
    #[error("Invalid customer name: {0}")]
    InvalidName(NameError),
    #[error("Authorization failure: {0}")]
    AuthorizationFailure(AuthFailure),
    #[error("Invalid PIN: must be 4 to 6 digits")]
    InvalidPin,
    #[error("Amount out of range: the resulting balance cannot be represented")]
    Overflow,
    #[error("Ledger inconsistent: stored balance {stored}, replayed balance {replayed}")]
    Inconsistent { stored: Money, replayed: Money },
}

impl From<PolicyBreach> for LedgerError {
    fn from(value: PolicyBreach) -> Self {
        LedgerError::PolicyViolation(value)
    }
}

impl From<AuthFailure> for LedgerError {
    fn from(value: AuthFailure) -> Self {
        LedgerError::AuthorizationFailure(value)
    }
}

impl From<NameError> for LedgerError {
    fn from(value: NameError) -> Self {
        LedgerError::InvalidName(value)
    }
}
