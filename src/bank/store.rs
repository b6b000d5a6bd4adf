//! Storage contract for accounts and an in-memory adapter implementing it.
use std::collections::HashMap;

use thiserror::Error;

use crate::bank::{Account, AccountId};

/// Errors reported by a storage adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Account {0} not found")]
    NotFound(AccountId),
    #[error("Account {0} already exists")]
    AlreadyExists(AccountId),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// What the ledger core consumes from durable storage.
///
/// Adapters receive fully formed accounts and must round-trip every field, history
/// included.
pub trait AccountStore {
    fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Stores a new account. Fails if the ID is already taken.
    fn save(&mut self, account: &Account) -> Result<(), StoreError>;

    /// Replaces an existing account. Fails if the ID is unknown.
    fn update(&mut self, account: &Account) -> Result<(), StoreError>;
}

/// Keeps accounts in a map, keyed by account ID.
#[derive(Default)]
pub struct MemoryStore {
    accounts: HashMap<AccountId, Account>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves all accounts in the store.
    pub fn get_all_accounts(&self) -> &HashMap<AccountId, Account> {
        &self.accounts
    }
}

impl AccountStore for MemoryStore {
    fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).cloned())
    }

    fn save(&mut self, account: &Account) -> Result<(), StoreError> {
        let id = account.get_id();
        if self.accounts.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        self.accounts.insert(id, account.clone());
        Ok(())
    }

    fn update(&mut self, account: &Account) -> Result<(), StoreError> {
        match self.accounts.get_mut(&account.get_id()) {
            Some(stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(account.get_id())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::bank::{Account, AccountPolicy, AccountStore, MemoryStore, Money, StoreError};

    #[test]
    fn test_save_find_update() {
        let mut store = MemoryStore::new();
        let mut account =
            Account::open("Ada Lovelace", AccountPolicy::Checking, Money::ZERO, None).unwrap();
        store.save(&account).unwrap();
        assert_eq!(
            store.save(&account),
            Err(StoreError::AlreadyExists(account.get_id()))
        );

        account.deposit(Money::from_cents(500)).unwrap();
        store.update(&account).unwrap();
        let found = store.find_by_id(account.get_id()).unwrap().unwrap();
        assert_eq!(found, account);
        assert_eq!(store.get_all_accounts().len(), 1);
    }

    #[test]
    fn test_update_unknown() {
        let mut store = MemoryStore::new();
        let account =
            Account::open("Ada Lovelace", AccountPolicy::Checking, Money::ZERO, None).unwrap();
        assert_eq!(
            store.update(&account),
            Err(StoreError::NotFound(account.get_id()))
        );
        assert_eq!(store.find_by_id(account.get_id()), Ok(None));
    }
}
