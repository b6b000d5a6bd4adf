//! Authorization gate: PIN credential checks and role permissions around account operations.
//!
//! The gate is advisory. Account methods never ask for a PIN themselves; callers run the
//! gate first whenever they act on behalf of an end user.
use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bank::{Account, AccountId, LedgerError, UserId};

/// Cost factor used when hashing new PINs and passwords.
pub const DEFAULT_HASH_COST: u32 = 10;

const PIN_MIN_DIGITS: usize = 4;
const PIN_MAX_DIGITS: usize = 6;

/// Why the gate refused a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("insufficient permissions: requires {required}, have {actual}")]
    InsufficientRole { required: Role, actual: Role },
    #[error("no access to account {0}")]
    NotOwner(AccountId),
    #[error("account {0} is locked")]
    AccountLocked(AccountId),
    #[error("invalid credentials")]
    InvalidCredential,
    #[error("user account is disabled")]
    InactiveUser,
    #[error("credential could not be hashed")]
    HashingFailed,
}

/// User roles, ordered from least to most privileged.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Teller,
    Manager,
    Admin,
}

impl Role {
    /// Holds iff this role ranks at least as high as `required`.
    pub fn has_permission(self, required: Role) -> bool {
        self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Customer => "customer",
            Role::Teller => "teller",
            Role::Manager => "manager",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// An opaque one-way hash of a PIN or password, as kept by storage.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct PinHash(String);

impl PinHash {
    /// Wraps a hash read back from storage.
    pub fn from_stored(hash: String) -> Self {
        PinHash(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PinHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PinHash(..)")
    }
}

/// Credential adapter: one-way adaptive hashing and verification.
pub trait PinHasher {
    fn hash(&self, plaintext: &str) -> Result<PinHash, LedgerError>;

    /// Verifies `plaintext` against `hash`. Any verification error counts as a mismatch.
    fn verify(&self, plaintext: &str, hash: &PinHash) -> bool;
}

/// bcrypt-backed [`PinHasher`].
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        BcryptHasher { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_COST)
    }
}

impl PinHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<PinHash, LedgerError> {
        bcrypt::hash(plaintext, self.cost)
            .map(PinHash)
            .map_err(|_| AuthFailure::HashingFailed.into())
    }

    fn verify(&self, plaintext: &str, hash: &PinHash) -> bool {
        bcrypt::verify(plaintext, &hash.0).unwrap_or(false)
    }
}

/// Checks a PIN is 4 to 6 ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), LedgerError> {
    let digits = pin.len();
    let numeric = pin.chars().all(|c| c.is_ascii_digit());
    if (PIN_MIN_DIGITS..=PIN_MAX_DIGITS).contains(&digits) && numeric {
        Ok(())
    } else {
        Err(LedgerError::InvalidPin)
    }
}

/// A person allowed to log in, customer or staff.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: PinHash,
    pub full_name: String,
    pub role: Role,
    pub active: bool,
}

impl User {
    pub fn is_staff(&self) -> bool {
        self.role.has_permission(Role::Teller)
    }
}

/// Who is asking: passed explicitly with every request instead of living in a global session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    user_id: UserId,
    role: Role,
    /// Accounts the requester owns, as looked up from storage at login.
    owned_accounts: HashSet<AccountId>,
}

impl AuthContext {
    pub fn new(
        user_id: UserId,
        role: Role,
        owned_accounts: impl IntoIterator<Item = AccountId>,
    ) -> Self {
        AuthContext {
            user_id,
            role,
            owned_accounts: owned_accounts.into_iter().collect(),
        }
    }

    pub fn get_user_id(&self) -> UserId {
        self.user_id
    }

    pub fn get_role(&self) -> Role {
        self.role
    }

    pub fn has_permission(&self, required: Role) -> bool {
        self.role.has_permission(required)
    }

    pub fn is_staff(&self) -> bool {
        self.has_permission(Role::Teller)
    }

    /// Staff may access every account, customers only the ones they own.
    pub fn can_access(&self, account: AccountId) -> bool {
        self.is_staff() || self.owned_accounts.contains(&account)
    }

    /// Records ownership of an account opened during this session.
    pub fn grant(&mut self, account: AccountId) {
        self.owned_accounts.insert(account);
    }
}

/// The credential and role checks run before mutating an account.
pub struct Gate;

impl Gate {
    /// Verifies a PIN against a stored hash, failing closed when either is missing.
    pub fn verify_credential<H: PinHasher + ?Sized>(
        hasher: &H,
        pin: Option<&str>,
        hash: Option<&PinHash>,
    ) -> Result<(), LedgerError> {
        match (pin, hash) {
            (Some(pin), Some(hash)) if hasher.verify(pin, hash) => Ok(()),
            _ => Err(AuthFailure::InvalidCredential.into()),
        }
    }

    pub fn require_permission(context: &AuthContext, required: Role) -> Result<(), LedgerError> {
        if context.has_permission(required) {
            Ok(())
        } else {
            Err(AuthFailure::InsufficientRole {
                required,
                actual: context.get_role(),
            }
            .into())
        }
    }

    pub fn require_access(context: &AuthContext, account: AccountId) -> Result<(), LedgerError> {
        if context.can_access(account) {
            Ok(())
        } else {
            Err(AuthFailure::NotOwner(account).into())
        }
    }

    pub fn require_unlocked(account: &Account) -> Result<(), LedgerError> {
        if account.is_locked() {
            Err(AuthFailure::AccountLocked(account.get_id()).into())
        } else {
            Ok(())
        }
    }

    /// Role, ownership and lock checks for a mutating operation on `account`.
    pub fn authorize(
        context: &AuthContext,
        account: &Account,
        required: Role,
    ) -> Result<(), LedgerError> {
        Self::require_permission(context, required)?;
        Self::require_access(context, account.get_id())?;
        Self::require_unlocked(account)
    }

    /// PIN check for accounts with PIN protection configured; a no-op otherwise.
    pub fn verify_account_pin<H: PinHasher + ?Sized>(
        hasher: &H,
        account: &Account,
        pin: Option<&str>,
    ) -> Result<(), LedgerError> {
        match account.get_pin_hash() {
            Some(hash) => Self::verify_credential(hasher, pin, Some(hash)),
            None => Ok(()),
        }
    }

    /// Sets or replaces an account's PIN.
    ///
    /// Replacing an existing PIN requires the current one; the very first PIN can be set
    /// without. Nothing changes unless every check passes.
    pub fn change_pin<H: PinHasher + ?Sized>(
        hasher: &H,
        context: &AuthContext,
        account: &mut Account,
        current: Option<&str>,
        new_pin: &str,
    ) -> Result<(), LedgerError> {
        Self::authorize(context, account, Role::Customer)?;
        Self::verify_account_pin(hasher, account, current)?;
        validate_pin(new_pin)?;
        let hash = hasher.hash(new_pin)?;
        account.set_pin_hash(hash);
        Ok(())
    }

    /// Checks a user's password and builds the context for their requests.
    pub fn login<H: PinHasher + ?Sized>(
        hasher: &H,
        user: &User,
        password: &str,
        owned_accounts: impl IntoIterator<Item = AccountId>,
    ) -> Result<AuthContext, LedgerError> {
        if !user.active {
            return Err(AuthFailure::InactiveUser.into());
        }
        Self::verify_credential(hasher, Some(password), Some(&user.password_hash))?;
        Ok(AuthContext::new(user.id, user.role, owned_accounts))
    }
}
