//! Ledger core for a teaching bank: account balances, account-type withdrawal policy,
//! an append-only transaction history and all-or-nothing money movement.
pub mod bank;
