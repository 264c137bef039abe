//! crewkit command line: ledger operations and the HTTP control endpoint.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crew_ledger::{db_path, Ledger, TransactionFilter};
use crew_mcp::McpConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crewkit", about = "Crewkit orchestration utilities", version)]
struct Cli {
    /// Base storage directory for per-project state.
    #[arg(long, global = true, env = "CREW_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// Project name; state lives under `<storage_dir>/<project>`.
    #[arg(long, global = true, default_value = "default")]
    project: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a transaction to the project's ledger.
    TxnAdd {
        /// Account id.
        #[arg(long)]
        account: String,
        /// Transaction amount (positive credit, negative debit).
        #[arg(long)]
        amount: f64,
        /// Transaction kind tag.
        #[arg(long = "type", default_value = "credit")]
        kind: String,
        /// Optional description.
        #[arg(long)]
        description: Option<String>,
    },
    /// List transactions, most recent first.
    TxnList {
        /// Restrict to one account.
        #[arg(long)]
        account: Option<String>,
        /// Maximum rows to print.
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },
    /// Print the balance of an account.
    TxnBalance {
        /// Account id.
        #[arg(long)]
        account: String,
    },
    /// Start the HTTP control endpoint (blocks until Ctrl-C).
    Serve {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on.
        #[arg(long, default_value_t = 8008)]
        port: u16,
    },
}

fn project_storage(cli: &Cli) -> anyhow::Result<PathBuf> {
    let base = match &cli.storage_dir {
        Some(dir) => dir.clone(),
        None => {
            let home = std::env::var_os("HOME").context("HOME not set; pass --storage-dir")?;
            PathBuf::from(home).join(".local/share/crewkit")
        }
    };
    let path = base.join(&cli.project);
    std::fs::create_dir_all(&path)
        .with_context(|| format!("cannot create storage dir {}", path.display()))?;
    Ok(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let storage = project_storage(&cli)?;
    let ledger_path = db_path(&storage);

    match &cli.command {
        Command::TxnAdd { account, amount, kind, description } => {
            let ledger = Ledger::open(&ledger_path).await?;
            let id = ledger.record(account, *amount, kind, description.as_deref()).await?;
            println!("ok: inserted id={id} db={}", ledger_path.display());
        }
        Command::TxnList { account, limit } => {
            let ledger = Ledger::open(&ledger_path).await?;
            let filter = TransactionFilter {
                account_id: account.clone(),
                since: None,
                limit: *limit,
            };
            for txn in ledger.transactions(&filter).await? {
                println!("{}", serde_json::to_string(&txn)?);
            }
        }
        Command::TxnBalance { account } => {
            let ledger = Ledger::open(&ledger_path).await?;
            let balance = ledger.balance(account).await?;
            println!("balance: {balance}");
        }
        Command::Serve { host, port } => {
            let ledger = Ledger::open(&ledger_path).await?;
            let config = McpConfig { host: host.clone(), port: *port, enable_cors: true };
            let handle = crew_mcp::serve(&config, ledger).await?;
            println!("Control endpoint on {} (CTRL-C to stop)", handle.addr());
            tokio::signal::ctrl_c().await?;
            handle.shutdown().await;
        }
    }
    Ok(())
}
