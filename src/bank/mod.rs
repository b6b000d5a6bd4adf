//! Banking module: accounts, policies, transactions, authorization and state management.
mod account;
mod auth;
mod error;
mod ledger;
mod policy;
mod state;
mod store;
mod transaction;
mod types;

pub use account::*;
pub use auth::*;
pub use error::*;
pub use ledger::*;
pub use policy::*;
pub use state::*;
pub use store::*;
pub use transaction::*;
pub use types::*;
