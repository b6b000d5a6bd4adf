//! Account management and money movement for a banking system.
//!
//! Every mutating operation validates all of its preconditions before touching a single
//! field, so a failed operation leaves the account exactly as it was.
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bank::{
    AccountId, AccountPolicy, Direction, LedgerError, Money, PinHash, PolicyBreach, TargetError,
    Transaction, TransactionType,
};

/// Longest customer name accepted, counted after trimming.
pub const MAX_NAME_LENGTH: usize = 100;

/// Reason a customer name was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("name cannot be empty")]
    Empty,
    #[error("name too long ({0} characters, max 100)")]
    TooLong(usize),
    #[error("name can only contain letters, spaces, hyphens and apostrophes")]
    IllegalCharacters,
}

/// Validates a customer name and returns its trimmed form.
pub fn validate_customer_name(name: &str) -> Result<String, NameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }
    let length = trimmed.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(NameError::TooLong(length));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c == ' ' || c == '-' || c == '\'')
    {
        return Err(NameError::IllegalCharacters);
    }
    Ok(trimmed.to_string())
}

/// Every field of an account, as handed to and received from a storage adapter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: AccountId,
    pub customer_name: String,
    pub balance: Money,
    pub date_created: NaiveDate,
    pub policy: AccountPolicy,
    pub pin_hash: Option<PinHash>,
    pub locked: bool,
    pub history: Vec<Transaction>,
}

/// Represents a bank account for a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// The unique identifier for the account, fixed for its whole lifetime.
    id: AccountId,

    /// The validated, trimmed name of the account holder.
    customer_name: String,

    /// The current balance.
    balance: Money,

    /// The day the account was opened.
    date_created: NaiveDate,

    /// The rules for this type of account.
    policy: AccountPolicy,

    /// The stored PIN credential, if PIN protection is configured.
    pin_hash: Option<PinHash>,

    /// Indicates whether the account is locked.
    locked: bool,

    /// Append-only history, in chronological order.
    history: Vec<Transaction>,
}

impl Account {
    /// Opens a new account with a fresh ID and today's date.
    ///
    /// The initial deposit may be zero but must cover the policy's minimum balance. A
    /// positive initial deposit is recorded as the account's first transaction.
    pub fn open(
        customer_name: &str,
        policy: AccountPolicy,
        initial_deposit: Money,
        pin_hash: Option<PinHash>,
    ) -> Result<Self, LedgerError> {
        let customer_name = validate_customer_name(customer_name)?;
        if initial_deposit < Money::ZERO {
            return Err(LedgerError::InvalidAmount(initial_deposit));
        }
        let minimum = policy.minimum_balance();
        if initial_deposit < minimum {
            return Err(LedgerError::PolicyViolation(
                PolicyBreach::BelowMinimumBalance {
                    remaining: initial_deposit,
                    minimum,
                },
            ));
        }

        let mut account = Account {
            id: AccountId::new(),
            customer_name,
            balance: Money::ZERO,
            date_created: Local::now().date_naive(),
            policy,
            pin_hash,
            locked: false,
            history: Vec::new(),
        };
        if initial_deposit.is_positive() {
            account.post(
                initial_deposit,
                TransactionType::Deposit,
                Direction::Credit,
                initial_deposit,
                format!("Initial deposit of ${initial_deposit}"),
            );
        }
        Ok(account)
    }

    /// Rehydrates an account from storage, re-validating the customer name.
    pub fn restore(record: AccountRecord) -> Result<Self, LedgerError> {
        let customer_name = validate_customer_name(&record.customer_name)?;
        Ok(Account {
            id: record.id,
            customer_name,
            balance: record.balance,
            date_created: record.date_created,
            policy: record.policy,
            pin_hash: record.pin_hash,
            locked: record.locked,
            history: record.history,
        })
    }

    /// Produces the full record a storage adapter has to persist.
    pub fn to_record(&self) -> AccountRecord {
        AccountRecord {
            id: self.id,
            customer_name: self.customer_name.clone(),
            balance: self.balance,
            date_created: self.date_created,
            policy: self.policy,
            pin_hash: self.pin_hash.clone(),
            locked: self.locked,
            history: self.history.clone(),
        }
    }

    pub fn get_id(&self) -> AccountId {
        self.id
    }

    pub fn get_customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn get_balance(&self) -> Money {
        self.balance
    }

    pub fn get_date_created(&self) -> NaiveDate {
        self.date_created
    }

    pub fn get_policy(&self) -> AccountPolicy {
        self.policy
    }

    pub fn get_pin_hash(&self) -> Option<&PinHash> {
        self.pin_hash.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn get_history(&self) -> &[Transaction] {
        &self.history
    }

    fn credited(&self, amount: Money) -> Result<Money, LedgerError> {
        self.balance.checked_add(amount).ok_or(LedgerError::Overflow)
    }

    /// Sets the new balance and appends the matching entry. Callers compute `balance` and
    /// check every precondition first.
    fn post(
        &mut self,
        balance: Money,
        tx_type: TransactionType,
        direction: Direction,
        amount: Money,
        description: String,
    ) {
        self.balance = balance;
        self.history.push(Transaction::record(
            tx_type,
            direction,
            amount,
            description,
        ));
    }

    /// Deposits the specified amount into the account.
    /// Returns an error if the amount is not positive or the new balance would overflow.
    pub fn deposit(&mut self, amount: Money) -> Result<Money, LedgerError> {
        let amount = amount.ensure_positive()?;
        let balance = self.credited(amount)?;
        self.post(
            balance,
            TransactionType::Deposit,
            Direction::Credit,
            amount,
            format!("Deposit of ${amount}"),
        );
        Ok(self.balance)
    }

    /// Withdraws the specified amount from the account.
    /// Returns an error if the amount is not positive or the account's policy refuses the
    /// withdrawal.
    pub fn withdraw(&mut self, amount: Money) -> Result<Money, LedgerError> {
        let amount = amount.ensure_positive()?;
        self.policy.check_withdrawal(self.balance, amount)?;
        let balance = self.balance.checked_sub(amount).ok_or(LedgerError::Overflow)?;
        self.post(
            balance,
            TransactionType::Withdrawal,
            Direction::Debit,
            amount,
            format!("Withdrawal of ${amount}"),
        );
        Ok(self.balance)
    }

    /// Moves `amount` from this account to `destination` as one unit: both balances change
    /// and each history gains one Transfer entry naming the counterparty, or nothing changes.
    pub fn transfer_to(
        &mut self,
        destination: &mut Account,
        amount: Money,
    ) -> Result<(), LedgerError> {
        let amount = amount.ensure_positive()?;
        if destination.id == self.id {
            return Err(LedgerError::InvalidTarget(TargetError::SameAccount));
        }
        self.policy.check_withdrawal(self.balance, amount)?;
        let source_balance = self.balance.checked_sub(amount).ok_or(LedgerError::Overflow)?;
        let destination_balance = destination.credited(amount)?;

        let outgoing = format!("Transfer to {}", destination.customer_name);
        let incoming = format!("Transfer from {}", self.customer_name);
        self.post(
            source_balance,
            TransactionType::Transfer,
            Direction::Debit,
            amount,
            outgoing,
        );
        destination.post(
            destination_balance,
            TransactionType::Transfer,
            Direction::Credit,
            amount,
            incoming,
        );
        Ok(())
    }

    /// Credits one application of the policy's interest rate and returns the interest.
    ///
    /// Interest that rounds to zero (always the case for checking accounts) changes nothing
    /// and records no transaction.
    pub fn apply_interest(&mut self) -> Result<Money, LedgerError> {
        let interest = self
            .balance
            .apply_rate(self.policy.interest_rate())
            .ok_or(LedgerError::Overflow)?;
        if interest.is_positive() {
            let balance = self.credited(interest)?;
            self.post(
                balance,
                TransactionType::Interest,
                Direction::Credit,
                interest,
                format!("Interest of ${interest}"),
            );
        }
        Ok(interest)
    }

    /// Replaces the customer name after validating it. No transaction is recorded.
    pub fn set_customer_name(&mut self, customer_name: &str) -> Result<(), LedgerError> {
        self.customer_name = validate_customer_name(customer_name)?;
        Ok(())
    }

    /// Replaces the stored credential. The caller must already have passed the
    /// authorization gate; the account itself never checks a PIN.
    pub fn set_pin_hash(&mut self, pin_hash: PinHash) {
        self.pin_hash = Some(pin_hash);
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Replays the history from zero and checks it reproduces the stored balance.
    pub fn verify_history(&self) -> Result<(), LedgerError> {
        let replayed = self
            .history
            .iter()
            .try_fold(Money::ZERO, |balance, tx| balance.checked_add(tx.signed_amount()))
            .ok_or(LedgerError::Overflow)?;
        if replayed == self.balance {
            Ok(())
        } else {
            Err(LedgerError::Inconsistent {
                stored: self.balance,
                replayed,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::bank::{
        Account, AccountPolicy, Direction, LedgerError, Money, NameError, PinHash, PolicyBreach,
        TargetError, TransactionType, validate_customer_name,
    };

    fn savings(cents: i64) -> Account {
        Account::open("Ada Lovelace", AccountPolicy::Savings, Money::from_cents(cents), None)
            .unwrap()
    }

    fn checking(cents: i64) -> Account {
        Account::open("Grace Hopper", AccountPolicy::Checking, Money::from_cents(cents), None)
            .unwrap()
    }

    #[test]
    fn test_open_records_initial_deposit() {
        let account = savings(50_000);
        assert_eq!(account.get_balance(), Money::from_cents(50_000));
        assert_eq!(account.get_history().len(), 1);
        assert_eq!(account.get_history()[0].get_type(), TransactionType::Deposit);
        assert_eq!(
            account.get_history()[0].get_description(),
            "Initial deposit of $500.00"
        );
        assert!(!account.is_locked());
    }

    #[test]
    fn test_open_with_zero_balance() {
        let account = checking(0);
        assert_eq!(account.get_balance(), Money::ZERO);
        assert!(account.get_history().is_empty());
    }

    #[test]
    fn test_open_below_minimum() {
        let result = Account::open(
            "Ada Lovelace",
            AccountPolicy::Savings,
            Money::from_cents(9_999),
            None,
        );
        assert!(matches!(
            result,
            Err(LedgerError::PolicyViolation(
                PolicyBreach::BelowMinimumBalance { .. }
            ))
        ));
    }

    #[test]
    fn test_open_negative_deposit() {
        let result = Account::open(
            "Ada Lovelace",
            AccountPolicy::Checking,
            Money::from_cents(-1),
            None,
        );
        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
    }

    #[test]
    fn test_open_trims_name() {
        let name = "  Jean-Luc O'Neil ";
        let account = Account::open(name, AccountPolicy::Checking, Money::ZERO, None).unwrap();
        assert_eq!(account.get_customer_name(), "Jean-Luc O'Neil");
    }

    #[test]
    fn test_name_validation() {
        assert_eq!(validate_customer_name("   "), Err(NameError::Empty));
        assert_eq!(
            validate_customer_name(&"a".repeat(101)),
            Err(NameError::TooLong(101))
        );
        assert!(validate_customer_name(&"a".repeat(100)).is_ok());
        assert_eq!(
            validate_customer_name("R2-D2"),
            Err(NameError::IllegalCharacters)
        );
        assert_eq!(
            validate_customer_name("Zoë"),
            Err(NameError::IllegalCharacters)
        );
    }

    #[test]
    fn test_deposit() {
        let mut account = checking(0);
        assert_eq!(
            account.deposit(Money::from_cents(1_000)).unwrap(),
            Money::from_cents(1_000)
        );
        let tx = account.get_history().last().unwrap();
        assert_eq!(tx.get_type(), TransactionType::Deposit);
        assert_eq!(tx.get_direction(), Direction::Credit);
        assert_eq!(tx.get_description(), "Deposit of $10.00");
    }

    #[test]
    fn test_deposit_non_positive() {
        let mut account = checking(1_000);
        let before = account.clone();
        assert!(matches!(
            account.deposit(Money::ZERO),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            account.deposit(Money::from_cents(-100)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert_eq!(account, before);
    }

    #[test]
    fn test_withdrawal() {
        let mut account = checking(2_000);
        assert_eq!(
            account.withdraw(Money::from_cents(1_000)).unwrap(),
            Money::from_cents(1_000)
        );
        let tx = account.get_history().last().unwrap();
        assert_eq!(tx.get_type(), TransactionType::Withdrawal);
        assert_eq!(tx.get_direction(), Direction::Debit);
        assert_eq!(tx.get_amount(), Money::from_cents(1_000));
    }

    #[test]
    fn test_withdrawal_insufficient_funds() {
        let mut account = checking(500);
        let before = account.clone();
        assert!(matches!(
            account.withdraw(Money::from_cents(1_000)),
            Err(LedgerError::PolicyViolation(
                PolicyBreach::InsufficientFunds { .. }
            ))
        ));
        assert_eq!(account, before);
    }

    #[test]
    fn test_withdrawal_below_minimum_balance() {
        let mut account = savings(50_000);
        let before = account.clone();
        assert!(matches!(
            account.withdraw(Money::from_cents(45_000)),
            Err(LedgerError::PolicyViolation(
                PolicyBreach::BelowMinimumBalance { .. }
            ))
        ));
        assert_eq!(account.get_balance(), Money::from_cents(50_000));
        assert_eq!(account, before);
    }

    #[test]
    fn test_withdrawal_down_to_minimum() {
        let mut account = savings(50_000);
        account.withdraw(Money::from_cents(40_000)).unwrap();
        assert_eq!(account.get_balance(), Money::from_cents(10_000));
    }

    #[test]
    fn test_transfer() {
        let mut source = savings(50_000);
        let mut destination = checking(20_000);
        source
            .transfer_to(&mut destination, Money::from_cents(20_000))
            .unwrap();
        assert_eq!(source.get_balance(), Money::from_cents(30_000));
        assert_eq!(destination.get_balance(), Money::from_cents(40_000));

        let out = source.get_history().last().unwrap();
        assert_eq!(out.get_type(), TransactionType::Transfer);
        assert_eq!(out.get_direction(), Direction::Debit);
        assert_eq!(out.get_description(), "Transfer to Grace Hopper");
        let incoming = destination.get_history().last().unwrap();
        assert_eq!(incoming.get_direction(), Direction::Credit);
        assert_eq!(incoming.get_description(), "Transfer from Ada Lovelace");
        assert_eq!(source.get_history().len(), 2);
        assert_eq!(destination.get_history().len(), 2);
    }

    #[test]
    fn test_transfer_to_same_account() {
        let mut source = savings(50_000);
        let mut copy = source.clone();
        let before = source.clone();
        assert_eq!(
            source.transfer_to(&mut copy, Money::from_cents(1_000)),
            Err(LedgerError::InvalidTarget(TargetError::SameAccount))
        );
        assert_eq!(source, before);
        assert_eq!(copy, before);
    }

    #[test]
    fn test_transfer_rejected_leaves_both_unchanged() {
        let mut source = savings(50_000);
        let mut destination = checking(20_000);
        let (source_before, destination_before) = (source.clone(), destination.clone());

        assert!(source
            .transfer_to(&mut destination, Money::ZERO)
            .is_err());
        assert!(source
            .transfer_to(&mut destination, Money::from_cents(40_001))
            .is_err());
        assert_eq!(source, source_before);
        assert_eq!(destination, destination_before);
    }

    #[test]
    fn test_deposit_overflow_leaves_account_unchanged() {
        let mut account = checking(50_000);
        let huge: Money = "50000000000000000000000000000".parse().unwrap();
        account.deposit(huge).unwrap();
        let before = account.clone();
        assert_eq!(account.deposit(huge), Err(LedgerError::Overflow));
        assert_eq!(account, before);
        assert!(account.verify_history().is_ok());
    }

    #[test]
    fn test_transfer_overflow_leaves_both_unchanged() {
        let huge: Money = "50000000000000000000000000000".parse().unwrap();
        let mut source = checking(0);
        source.deposit(huge).unwrap();
        let mut destination = savings(50_000);
        destination.deposit(huge).unwrap();
        let (source_before, destination_before) = (source.clone(), destination.clone());

        assert_eq!(
            source.transfer_to(&mut destination, huge),
            Err(LedgerError::Overflow)
        );
        assert_eq!(source, source_before);
        assert_eq!(destination, destination_before);
    }

    #[test]
    fn test_savings_interest() {
        let mut account = savings(100_000);
        assert_eq!(account.apply_interest(), Ok(Money::from_cents(2_500)));
        assert_eq!(account.get_balance(), Money::from_cents(102_500));
        let tx = account.get_history().last().unwrap();
        assert_eq!(tx.get_type(), TransactionType::Interest);
        assert_eq!(tx.get_description(), "Interest of $25.00");
    }

    #[test]
    fn test_checking_interest_records_nothing() {
        let mut account = checking(100_000);
        assert_eq!(account.apply_interest(), Ok(Money::ZERO));
        assert_eq!(account.get_balance(), Money::from_cents(100_000));
        assert_eq!(account.get_history().len(), 1);
    }

    #[test]
    fn test_rename() {
        let mut account = checking(0);
        account.set_customer_name("Grace Brewster Hopper").unwrap();
        assert_eq!(account.get_customer_name(), "Grace Brewster Hopper");
        assert!(matches!(
            account.set_customer_name("Grace #1"),
            Err(LedgerError::InvalidName(NameError::IllegalCharacters))
        ));
        assert_eq!(account.get_customer_name(), "Grace Brewster Hopper");
        assert!(account.get_history().is_empty());
    }

    #[test]
    fn test_pin_and_lock_are_plain_writes() {
        let mut account = checking(0);
        account.set_pin_hash(PinHash::from_stored("$2b$10$stored".to_string()));
        account.set_locked(true);
        assert_eq!(account.get_pin_hash().unwrap().as_str(), "$2b$10$stored");
        assert!(account.is_locked());
        assert!(account.get_history().is_empty());
    }

    #[test]
    fn test_record_round_trip_and_replay() {
        let mut source = savings(50_000);
        let mut destination = checking(20_000);
        source.deposit(Money::from_cents(12_345)).unwrap();
        source.withdraw(Money::from_cents(2_345)).unwrap();
        source
            .transfer_to(&mut destination, Money::from_cents(20_000))
            .unwrap();
        source.apply_interest().unwrap();

        let json = serde_json::to_string(&source.to_record()).unwrap();
        let record = serde_json::from_str(&json).unwrap();
        let restored = Account::restore(record).unwrap();
        assert_eq!(restored, source);
        assert!(restored.verify_history().is_ok());
        assert!(destination.verify_history().is_ok());
    }

    #[test]
    fn test_replay_detects_tampering() {
        let mut record = savings(50_000).to_record();
        record.balance = Money::from_cents(90_000);
        let account = Account::restore(record).unwrap();
        assert_eq!(
            account.verify_history(),
            Err(LedgerError::Inconsistent {
                stored: Money::from_cents(90_000),
                replayed: Money::from_cents(50_000),
            })
        );
    }

    #[test]
    fn test_restore_rejects_bad_name() {
        let mut record = checking(0).to_record();
        record.customer_name = String::new();
        assert!(matches!(
            Account::restore(record),
            Err(LedgerError::InvalidName(NameError::Empty))
        ));
    }
}
