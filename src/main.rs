use std::{collections::HashMap, io, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledger::bank::{
    self, AccountId, AccountPolicy, AccountStore, AuthContext, BcryptHasher, Command, Handle,
    MemoryStore, Money, Outcome, Role, UserId,
};

/// The default size of the channel feeding the ledger service.
const CHANNEL_SIZE: usize = 100;

/// Replays a CSV file of banking commands through the ledger and prints the resulting accounts.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CSV file with columns type,client,to,amount,name,kind
    input: PathBuf,

    /// Mailbox bound of the ledger service
    #[arg(long, default_value_t = CHANNEL_SIZE)]
    channel_size: usize,

    /// Write the account summary here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum RowType {
    Open,
    Deposit,
    Withdraw,
    Transfer,
    Interest,
}

/// One input line. Clients are small numbers local to the file, mapped to account IDs as
/// accounts get opened.
#[derive(Deserialize, Debug)]
struct Row {
    #[serde(rename = "type")]
    row_type: RowType,
    client: u16,
    to: Option<u16>,
    amount: Option<Money>,
    name: Option<String>,
    kind: Option<AccountPolicy>,
}

/// One output line per account.
#[derive(Serialize)]
struct AccountSummary<'a> {
    id: AccountId,
    customer: &'a str,
    kind: AccountPolicy,
    balance: Money,
    locked: bool,
    transactions: usize,
}

fn lookup(clients: &HashMap<u16, AccountId>, client: u16) -> Result<AccountId> {
    clients
        .get(&client)
        .copied()
        .with_context(|| format!("client {client} has no open account"))
}

fn to_command(row: Row, clients: &HashMap<u16, AccountId>) -> Result<Command> {
    let amount = || {
        row.amount
            .with_context(|| format!("{:?} row needs an amount", row.row_type))
    };
    let command = match row.row_type {
        RowType::Open => Command::Open {
            customer_name: row.name.clone().context("open row needs a name")?,
            policy: row.kind.context("open row needs a kind")?,
            initial_deposit: row.amount.unwrap_or(Money::ZERO),
            pin: None,
        },
        RowType::Deposit => Command::Deposit {
            account: lookup(clients, row.client)?,
            amount: amount()?,
        },
        RowType::Withdraw => Command::Withdraw {
            account: lookup(clients, row.client)?,
            amount: amount()?,
        },
        RowType::Transfer => Command::Transfer {
            source: lookup(clients, row.client)?,
            destination: lookup(clients, row.to.context("transfer row needs a destination")?)?,
            amount: amount()?,
        },
        RowType::Interest => Command::ApplyInterest {
            account: lookup(clients, row.client)?,
        },
    };
    Ok(command)
}

/// Writes one summary line per opened account, in the order they were opened.
fn write_summary<W: io::Write>(
    writer: W,
    store: &MemoryStore,
    opened: &[AccountId],
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for &id in opened {
        let Some(account) = store.find_by_id(id)? else {
            continue;
        };
        if let Err(err) = account.verify_history() {
            error!(account = %id, "{err}");
        }
        writer.serialize(AccountSummary {
            id,
            customer: account.get_customer_name(),
            kind: account.get_policy(),
            balance: account.get_balance(),
            locked: account.is_locked(),
            transactions: account.get_history().len(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let (sender, receiver) = mpsc::channel(cli.channel_size);
    let mut state = bank::State::new(MemoryStore::new(), BcryptHasher::default(), receiver);

    // bcrypt is CPU-bound, so the service gets a blocking thread of its own.
    let service = tokio::task::spawn_blocking(move || {
        state.run_blocking();
        state.into_store()
    });
    let handle = Handle::new(sender);

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_path(&cli.input)
        .with_context(|| format!("Failed to read CSV file {}", cli.input.display()))?;

    // The batch runs as a single administrator acting on every account.
    let operator = AuthContext::new(UserId::new(), Role::Admin, []);
    let mut clients: HashMap<u16, AccountId> = HashMap::new();
    let mut opened: Vec<AccountId> = Vec::new();

    for (line, row) in reader.deserialize::<Row>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!(line, "Skipping malformed row: {err}");
                continue;
            }
        };
        let client = row.client;
        let command = match to_command(row, &clients) {
            Ok(command) => command,
            Err(err) => {
                warn!(line, "Skipping row: {err:#}");
                continue;
            }
        };
        match handle.execute(operator.clone(), None, command).await {
            Ok(Outcome::Opened(id)) => {
                opened.push(id);
                if clients.insert(client, id).is_some() {
                    warn!(line, client, "Client reopened; later rows use the new account");
                }
            }
            Ok(_) => {}
            Err(err) => error!(line, client, "Command failed: {err}"),
        }
    }

    drop(handle); // Close the sender to signal no more commands will be sent
    let store = service
        .await
        .context("Failed to join the ledger service task")?;
    info!(accounts = store.get_all_accounts().len(), "Batch complete");

    let output: Box<dyn io::Write> = match &cli.output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    write_summary(output, &store, &opened)
}
