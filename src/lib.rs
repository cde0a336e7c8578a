//! Cashbook is a small personal bookkeeping app: the user creates named
//! cashbooks, records "cash in" and "cash out" transactions against them, and
//! views running totals per cashbook and across the whole database.
//!
//! This library implements the persistence and aggregation core on top of a
//! local SQLite database. The [Ledger] service is the public face of the
//! crate: it owns the database connection and exposes every operation the
//! presentation layer needs as an async call returning plain records. The
//! `cashbook` binary is a thin command line client of that service.

#![warn(missing_docs)]

pub mod cashbook;
mod database_id;
pub mod db;
mod ledger;
pub mod summary;
pub mod transaction;

pub use cashbook::{Cashbook, CashbookName};
pub use database_id::{CashbookId, TransactionId};
pub use db::initialize;
pub use ledger::Ledger;
pub use summary::IncomeSpent;
pub use transaction::{Transaction, TransactionBuilder, TransactionKind};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The database could not be opened or the schema could not be created.
    ///
    /// This error is fatal to the session: no other operation may be issued
    /// against a store that failed to initialise.
    #[error("could not initialise the database: {0}")]
    Initialization(String),

    /// An empty string was used to create or rename a cashbook.
    #[error("Cashbook name cannot be empty")]
    EmptyCashbookName,

    /// A transaction was given a zero, negative, or non-finite amount.
    ///
    /// Transactions record money that actually moved, so the amount must be
    /// strictly positive; the direction is carried by [TransactionKind].
    #[error("transaction amounts must be greater than zero, got {0}")]
    InvalidAmount(f64),

    /// A string other than "cash in" or "cash out" was used as a transaction
    /// type tag.
    #[error("\"{0}\" is not a valid transaction type")]
    InvalidTransactionKind(String),

    /// The cashbook ID used to create a transaction did not match a cashbook
    /// in the database.
    #[error("the cashbook with ID {0} does not exist")]
    CashbookNotFound(CashbookId),

    /// Tried to rename a cashbook that does not exist.
    #[error("tried to rename a cashbook that is not in the database")]
    UpdateMissingCashbook,

    /// Tried to delete a cashbook that does not exist.
    #[error("tried to delete a cashbook that is not in the database")]
    DeleteMissingCashbook,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The blocking database task was cancelled or panicked before producing
    /// a result.
    #[error("the database task did not run to completion: {0}")]
    BackgroundTask(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
