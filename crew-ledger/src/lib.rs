//! Embedded transaction ledger for crewkit.
//!
//! A single-table SQLite store recording credits and debits per account,
//! with filtered listing and balance aggregation. Consumed by the HTTP
//! control endpoint and the CLI.

pub mod error;
pub mod ledger;

pub use error::{LedgerError, Result};
pub use ledger::{db_path, Ledger, Transaction, TransactionFilter, DEFAULT_DB_FILENAME};
