//! Per-account-type rules: minimum balance, withdrawal eligibility and interest rate.
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bank::{Money, Rate};

/// Why a withdrawal (or the debit leg of a transfer) was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyBreach {
    #[error("insufficient funds: balance {balance}, requested {amount}")]
    InsufficientFunds { balance: Money, amount: Money },
    #[error("withdrawal would leave {remaining}, below the minimum balance of {minimum}")]
    BelowMinimumBalance { remaining: Money, minimum: Money },
}

/// Enum representing the type of an account and the rules that come with it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccountPolicy {
    Savings,
    Checking,
}

impl AccountPolicy {
    /// The lowest balance the account may be left with after a debit.
    pub fn minimum_balance(self) -> Money {
        match self {
            AccountPolicy::Savings => Money::from_cents(10_000),
            AccountPolicy::Checking => Money::ZERO,
        }
    }

    pub fn interest_rate(self) -> Rate {
        match self {
            AccountPolicy::Savings => Rate::new(Decimal::new(25, 3)),
            AccountPolicy::Checking => Rate::ZERO,
        }
    }

    /// Checks whether `amount` may be debited from `balance`, reporting the cause on refusal.
    ///
    /// This is the one gate used by both withdrawals and the debit leg of transfers.
    pub fn check_withdrawal(self, balance: Money, amount: Money) -> Result<(), PolicyBreach> {
        let remaining = match balance.checked_sub(amount) {
            Some(remaining) if remaining >= Money::ZERO => remaining,
            _ => return Err(PolicyBreach::InsufficientFunds { balance, amount }),
        };
        let minimum = self.minimum_balance();
        if remaining < minimum {
            return Err(PolicyBreach::BelowMinimumBalance { remaining, minimum });
        }
        Ok(())
    }

    pub fn can_withdraw(self, balance: Money, amount: Money) -> bool {
        self.check_withdrawal(balance, amount).is_ok()
    }

    pub fn name(self) -> &'static str {
        match self {
            AccountPolicy::Savings => "savings",
            AccountPolicy::Checking => "checking",
        }
    }
}

impl fmt::Display for AccountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
