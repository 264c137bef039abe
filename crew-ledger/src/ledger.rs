//! The transactions table and its operations.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{LedgerError, Result};

/// Default database file name under a storage directory.
pub const DEFAULT_DB_FILENAME: &str = "long_term_memory_storage.db";

/// Resolve the ledger database path for a storage directory.
pub fn db_path(storage_dir: impl AsRef<Path>) -> PathBuf {
    storage_dir.as_ref().join(DEFAULT_DB_FILENAME)
}

/// One recorded transaction. Positive amounts are credits, negative debits.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Transaction {
    /// Auto-incremented row id.
    pub id: i64,
    /// The account this transaction belongs to.
    pub account_id: String,
    /// Signed amount.
    pub amount: f64,
    /// Free-form kind tag (conventionally `credit` or `debit`).
    /// Serialized as `type` on the wire.
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// RFC 3339 UTC timestamp with `Z` suffix.
    pub timestamp: String,
}

/// Filter for listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Restrict to one account.
    pub account_id: Option<String>,
    /// Only transactions with `timestamp >= since` (lexicographic on RFC 3339).
    pub since: Option<String>,
    /// Maximum number of rows returned.
    pub limit: i64,
}

impl TransactionFilter {
    /// Filter for one account with the default limit of 100.
    pub fn for_account(account_id: impl Into<String>) -> Self {
        Self { account_id: Some(account_id.into()), since: None, limit: 100 }
    }
}

/// A SQLite-backed transaction ledger.
///
/// Cloning is cheap; all clones share one connection pool. The driver
/// serializes concurrent writers internally; the ledger adds no locking of
/// its own.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Open (creating if missing) the ledger database at `path` and ensure
    /// the schema exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LedgerError::Prepare {
                    path: path.display().to_string(),
                    source: e,
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;

        let ledger = Self { pool };
        ledger.init().await?;
        debug!(path = %path.display(), "opened ledger database");
        Ok(ledger)
    }

    /// Open an in-memory ledger, for tests and ephemeral use.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;
        let ledger = Self { pool };
        ledger.init().await?;
        Ok(ledger)
    }

    /// Create the transactions table and account index if absent.
    async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id TEXT NOT NULL,
                amount REAL NOT NULL,
                kind TEXT NOT NULL,
                description TEXT,
                timestamp TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_account ON transactions(account_id)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert a transaction stamped with the current UTC time.
    ///
    /// Returns the inserted row id.
    pub async fn record(
        &self,
        account_id: &str,
        amount: f64,
        kind: &str,
        description: Option<&str>,
    ) -> Result<i64> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.record_at(account_id, amount, kind, description, &timestamp).await
    }

    /// Insert a transaction with an explicit timestamp (RFC 3339, UTC).
    pub async fn record_at(
        &self,
        account_id: &str,
        amount: f64,
        kind: &str,
        description: Option<&str>,
        timestamp: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO transactions (account_id, amount, kind, description, timestamp)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(account_id)
        .bind(amount)
        .bind(kind)
        .bind(description)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(account_id, amount, kind, id, "recorded transaction");
        Ok(id)
    }

    /// List transactions matching the filter, most recent first.
    pub async fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let mut sql = String::from(
            "SELECT id, account_id, amount, kind, description, timestamp FROM transactions",
        );
        let mut clauses: Vec<&str> = Vec::new();
        if filter.account_id.is_some() {
            clauses.push("account_id = ?");
        }
        if filter.since.is_some() {
            clauses.push("timestamp >= ?");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY timestamp DESC LIMIT ?");

        let mut query = sqlx::query_as::<_, Transaction>(&sql);
        if let Some(account_id) = &filter.account_id {
            query = query.bind(account_id);
        }
        if let Some(since) = &filter.since {
            query = query.bind(since);
        }
        query = query.bind(if filter.limit > 0 { filter.limit } else { 100 });

        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Sum of all amounts for an account; 0.0 when no rows exist.
    pub async fn balance(&self, account_id: &str) -> Result<f64> {
        let balance: Option<f64> =
            sqlx::query_scalar("SELECT SUM(amount) FROM transactions WHERE account_id = ?")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(balance.unwrap_or(0.0))
    }
}
