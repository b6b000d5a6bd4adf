//! The `State` module serializes every account mutation through a single-writer task.
//!
//! All requests for all accounts go through one mailbox, so no two operations ever
//! interleave on the same balance and a transfer holds both accounts without lock ordering.
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::bank::{
    Account, AccountId, AccountPolicy, AccountStore, AuthContext, Gate, Ledger, LedgerError,
    Money, PinHasher, Role, StoreError, TransferError, TransferReceipt, validate_pin,
};

/// Errors returned to a requester of the state task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error("Ledger service is no longer running")]
    Closed,
}

/// An operation to run against the accounts.
#[derive(Debug, Clone)]
pub enum Command {
    Open {
        customer_name: String,
        policy: AccountPolicy,
        initial_deposit: Money,
        pin: Option<String>,
    },
    Deposit {
        account: AccountId,
        amount: Money,
    },
    Withdraw {
        account: AccountId,
        amount: Money,
    },
    Transfer {
        source: AccountId,
        destination: AccountId,
        amount: Money,
    },
    ApplyInterest {
        account: AccountId,
    },
    Rename {
        account: AccountId,
        customer_name: String,
    },
    SetLocked {
        account: AccountId,
        locked: bool,
    },
    ChangePin {
        account: AccountId,
        current: Option<String>,
        new_pin: String,
    },
}

impl Command {
    /// Short name used in logs; PINs carried by some commands are never logged.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Open { .. } => "open",
            Command::Deposit { .. } => "deposit",
            Command::Withdraw { .. } => "withdraw",
            Command::Transfer { .. } => "transfer",
            Command::ApplyInterest { .. } => "apply_interest",
            Command::Rename { .. } => "rename",
            Command::SetLocked { .. } => "set_locked",
            Command::ChangePin { .. } => "change_pin",
        }
    }
}

/// Result of a successfully applied command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Opened(AccountId),
    Balance(Money),
    Transferred(TransferReceipt),
    Interest(Money),
    Updated,
}

/// A command together with who is asking for it.
#[derive(Debug)]
pub struct Request {
    pub context: AuthContext,
    /// PIN supplied by the end user, checked for withdrawals and transfers on
    /// PIN-protected accounts.
    pub pin: Option<String>,
    pub command: Command,
    pub reply: Option<oneshot::Sender<Result<Outcome, ServiceError>>>,
}

/// Cloneable sender side of the state task.
#[derive(Clone)]
pub struct Handle {
    sender: mpsc::Sender<Request>,
}

impl Handle {
    pub fn new(sender: mpsc::Sender<Request>) -> Self {
        Handle { sender }
    }

    /// Sends a command and waits for its outcome.
    pub async fn execute(
        &self,
        context: AuthContext,
        pin: Option<String>,
        command: Command,
    ) -> Result<Outcome, ServiceError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Request {
                context,
                pin,
                command,
                reply: Some(reply),
            })
            .await
            .map_err(|_| ServiceError::Closed)?;
        response.await.map_err(|_| ServiceError::Closed)?
    }
}

/// Represents the state of the banking system: the account store and the mailbox feeding it.
pub struct State<S, H> {
    /// Where accounts are loaded from and written back to.
    store: S,
    /// Credential adapter for PIN checks.
    hasher: H,
    /// A channel receiver for processing incoming requests.
    receiver: mpsc::Receiver<Request>,
}

impl<S: AccountStore, H: PinHasher> State<S, H> {
    /// Creates a new instance of `State` over the given store.
    pub fn new(store: S, hasher: H, receiver: mpsc::Receiver<Request>) -> Self {
        State {
            store,
            hasher,
            receiver,
        }
    }

    pub fn get_store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn load(&self, id: AccountId) -> Result<Account, ServiceError> {
        self.store
            .find_by_id(id)?
            .ok_or(ServiceError::Store(StoreError::NotFound(id)))
    }

    /// Processes a request against a private copy of the affected accounts, writing them
    /// back only once the operation has succeeded.
    fn process_request(&mut self, request: &Request) -> Result<Outcome, ServiceError> {
        let context = &request.context;
        let pin = request.pin.as_deref();
        match &request.command {
            Command::Open {
                customer_name,
                policy,
                initial_deposit,
                pin: new_pin,
            } => {
                Gate::require_permission(context, Role::Teller)?;
                let pin_hash = match new_pin {
                    Some(new_pin) => {
                        validate_pin(new_pin)?;
                        Some(self.hasher.hash(new_pin)?)
                    }
                    None => None,
                };
                let account = Account::open(customer_name, *policy, *initial_deposit, pin_hash)?;
                self.store.save(&account)?;
                info!(account = %account.get_id(), policy = %policy, "Opened account");
                Ok(Outcome::Opened(account.get_id()))
            }
            Command::Deposit { account, amount } => {
                let mut account = self.load(*account)?;
                Gate::authorize(context, &account, Role::Customer)?;
                let balance = account.deposit(*amount)?;
                self.store.update(&account)?;
                Ok(Outcome::Balance(balance))
            }
            Command::Withdraw { account, amount } => {
                let mut account = self.load(*account)?;
                Gate::authorize(context, &account, Role::Customer)?;
                Gate::verify_account_pin(&self.hasher, &account, pin)?;
                let balance = account.withdraw(*amount)?;
                self.store.update(&account)?;
                Ok(Outcome::Balance(balance))
            }
            Command::Transfer {
                source,
                destination,
                amount,
            } => {
                let mut source = self.load(*source)?;
                let mut destination = self.store.find_by_id(*destination)?;
                Gate::authorize(context, &source, Role::Customer)?;
                Gate::verify_account_pin(&self.hasher, &source, pin)?;
                if let Some(destination) = &destination {
                    Gate::require_unlocked(destination)?;
                }
                let receipt = Ledger::transfer_and_persist(
                    &mut self.store,
                    &mut source,
                    destination.as_mut(),
                    *amount,
                )?;
                Ok(Outcome::Transferred(receipt))
            }
            Command::ApplyInterest { account } => {
                let mut account = self.load(*account)?;
                Gate::authorize(context, &account, Role::Manager)?;
                let interest = account.apply_interest()?;
                self.store.update(&account)?;
                Ok(Outcome::Interest(interest))
            }
            Command::Rename {
                account,
                customer_name,
            } => {
                let mut account = self.load(*account)?;
                Gate::authorize(context, &account, Role::Teller)?;
                account.set_customer_name(customer_name)?;
                self.store.update(&account)?;
                Ok(Outcome::Updated)
            }
            Command::SetLocked { account, locked } => {
                let mut account = self.load(*account)?;
                Gate::require_permission(context, Role::Manager)?;
                account.set_locked(*locked);
                self.store.update(&account)?;
                info!(account = %account.get_id(), locked, "Changed lock state");
                Ok(Outcome::Updated)
            }
            Command::ChangePin {
                account,
                current,
                new_pin,
            } => {
                let mut account = self.load(*account)?;
                Gate::change_pin(
                    &self.hasher,
                    context,
                    &mut account,
                    current.as_deref(),
                    new_pin,
                )?;
                self.store.update(&account)?;
                Ok(Outcome::Updated)
            }
        }
    }

    /// Applies one request and sends its outcome back, if anyone is still waiting.
    fn handle_request(&mut self, mut request: Request) {
        let command = request.command.name();
        let result = self.process_request(&request);
        match &result {
            Ok(outcome) => debug!(command, ?outcome, "Applied command"),
            Err(e) => warn!(command, "Error processing command: {e}"),
        }
        if let Some(reply) = request.reply.take() {
            // requester may have given up waiting
            let _ = reply.send(result);
        }
    }

    /// Runs the state management loop, processing requests from the receiver until every
    /// sender is dropped.
    ///
    /// PIN checks hash with bcrypt, which is CPU-bound; on a shared runtime prefer
    /// [`State::run_blocking`] so they never stall the worker threads.
    pub async fn run(&mut self) {
        info!("Ledger service started");
        while let Some(request) = self.receiver.recv().await {
            self.handle_request(request);
        }
        info!("Ledger service stopped");
    }

    /// Same loop as [`State::run`] for a dedicated thread, e.g. under
    /// `tokio::task::spawn_blocking`. Must not be called from async code.
    pub fn run_blocking(&mut self) {
        info!("Ledger service started");
        while let Some(request) = self.receiver.blocking_recv() {
            self.handle_request(request);
        }
        info!("Ledger service stopped");
    }
}
