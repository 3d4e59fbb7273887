use clap::Parser;
use merch_ledger::application::ledger::Ledger;
use merch_ledger::config::{DEFAULT_INITIAL_BALANCE, LedgerConfig};
use merch_ledger::domain::account::UserId;
use merch_ledger::domain::ports::StorageHandle;
use merch_ledger::error::{Entity, LedgerError, Result as LedgerResult};
use merch_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use merch_ledger::interfaces::csv::command_reader::{CommandReader, LedgerCommand};
use merch_ledger::interfaces::json::report_writer::ReportWriter;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file (`op, user, target, amount`)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Coins granted to every newly registered user
    #[arg(long, default_value_t = DEFAULT_INITIAL_BALANCE)]
    initial_balance: u64,

    /// Per-operation deadline in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl Cli {
    fn config(&self) -> LedgerConfig {
        let config = LedgerConfig::default().with_initial_balance(self.initial_balance);
        match self.timeout_ms {
            Some(ms) => config.with_operation_timeout(Duration::from_millis(ms)),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .try_init()
    {
        eprintln!("tracing init failed: {e}");
    }

    let cli = Cli::parse();
    let ledger = Ledger::new(open_storage(&cli)?, cli.config());

    // Process commands
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                if let Err(e) = execute(&ledger, command).await {
                    warn!(error = %e, retryable = e.is_retryable(), "Error processing command");
                }
            }
            Err(e) => {
                warn!(error = %e, "Error reading command");
            }
        }
    }

    // Output final state
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    for user in ledger.users().await.into_diagnostic()? {
        let info = ledger.user_info(user.id).await.into_diagnostic()?;
        writer
            .write_report(&user.username, &info)
            .into_diagnostic()?;
    }
    writer.flush().into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_storage(cli: &Cli) -> Result<StorageHandle> {
    use merch_ledger::infrastructure::rocksdb::RocksDBStore;

    if let Some(db_path) = &cli.db_path {
        // Use persistent storage (RocksDB)
        let store = RocksDBStore::open(db_path).into_diagnostic()?;
        return Ok(Arc::new(store));
    }
    Ok(Arc::new(InMemoryLedgerStore::new()))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_storage(cli: &Cli) -> Result<StorageHandle> {
    if cli.db_path.is_some() {
        warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Arc::new(InMemoryLedgerStore::new()))
}

/// Resolves the acting user's identity and runs one command.
async fn execute(ledger: &Ledger, command: LedgerCommand) -> LedgerResult<()> {
    match command {
        LedgerCommand::Register { user } => {
            ledger.register(&user, "").await?;
        }
        LedgerCommand::Send { user, to, amount } => {
            let sender = resolve(ledger, &user).await?;
            ledger.send_coins(sender, &to, amount).await?;
        }
        LedgerCommand::Buy { user, item } => {
            let buyer = resolve(ledger, &user).await?;
            ledger.buy_item(buyer, item).await?;
        }
    }
    Ok(())
}

async fn resolve(ledger: &Ledger, username: &str) -> LedgerResult<UserId> {
    ledger
        .find_user(username)
        .await?
        .map(|user| user.id)
        .ok_or(LedgerError::NotFound(Entity::User))
}
