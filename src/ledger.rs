//! The ledger operations service: the async API the presentation layer calls.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;
use tokio::task;

use crate::{
    Error,
    cashbook::{self, Cashbook, CashbookName},
    database_id::CashbookId,
    db::initialize,
    summary::{self, IncomeSpent},
    transaction::{self, Transaction, TransactionBuilder},
};

/// The ledger operations service.
///
/// Owns the SQLite connection and exposes every operation the presentation
/// layer needs as an async call over plain records. The connection is pooled
/// behind a mutex; each operation runs the SQLite work on the blocking thread
/// pool so async callers suspend instead of tying up a worker thread.
///
/// Operations issued sequentially observe each other's effects: a read that
/// starts after a write completes sees that write.
#[derive(Debug, Clone)]
pub struct Ledger {
    db_connection: Arc<Mutex<Connection>>,
}

impl Ledger {
    /// Wrap an open database connection, creating the schema if needed.
    ///
    /// # Errors
    /// Returns an [Error::Initialization] if the schema cannot be created.
    /// The connection must not be used after a failure.
    pub fn new(connection: Connection) -> Result<Self, Error> {
        initialize(&connection).map_err(|error| Error::Initialization(error.to_string()))?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Open the database file at `path`, creating the file and the schema if
    /// needed.
    ///
    /// # Errors
    /// Returns an [Error::Initialization] if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let connection =
            Connection::open(path).map_err(|error| Error::Initialization(error.to_string()))?;

        Self::new(connection)
    }

    /// Open a fresh in-memory database.
    ///
    /// # Errors
    /// Returns an [Error::Initialization] if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, Error> {
        let connection = Connection::open_in_memory()
            .map_err(|error| Error::Initialization(error.to_string()))?;

        Self::new(connection)
    }

    /// Run `operation` against the shared connection on the blocking thread
    /// pool.
    async fn with_connection<T, F>(&self, operation: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, Error> + Send + 'static,
    {
        let db_connection = Arc::clone(&self.db_connection);

        task::spawn_blocking(move || {
            let connection = db_connection.lock().map_err(|_| Error::DatabaseLockError)?;

            operation(&connection)
        })
        .await
        .map_err(|error| Error::BackgroundTask(error.to_string()))?
    }

    /// Create a cashbook named `name` with zeroed totals.
    ///
    /// # Errors
    /// Returns an [Error::EmptyCashbookName] before any storage I/O if `name`
    /// is empty or whitespace.
    pub async fn create_cashbook(&self, name: &str) -> Result<Cashbook, Error> {
        let name = CashbookName::new(name)?;

        self.with_connection(move |connection| cashbook::create_cashbook(name, connection))
            .await
    }

    /// List every cashbook, most recently created first, using the cached
    /// totals columns.
    pub async fn list_cashbooks(&self) -> Result<Vec<Cashbook>, Error> {
        self.with_connection(cashbook::get_all_cashbooks).await
    }

    /// List every cashbook, most recently created first, with totals summed
    /// live from the transaction log instead of the cached columns.
    pub async fn list_cashbooks_with_balances(&self) -> Result<Vec<Cashbook>, Error> {
        self.with_connection(summary::get_cashbooks_with_balances)
            .await
    }

    /// Rename the cashbook `id` to `new_name`. The cashbook's totals are not
    /// affected.
    ///
    /// # Errors
    /// Returns an:
    /// - [Error::EmptyCashbookName] before any storage I/O if `new_name` is
    ///   empty or whitespace,
    /// - [Error::UpdateMissingCashbook] if `id` does not refer to a cashbook.
    pub async fn rename_cashbook(&self, id: CashbookId, new_name: &str) -> Result<(), Error> {
        let new_name = CashbookName::new(new_name)?;

        self.with_connection(move |connection| {
            cashbook::rename_cashbook(id, new_name, connection)
        })
        .await
    }

    /// Delete the cashbook `id` together with every transaction it owns.
    ///
    /// # Errors
    /// Returns an [Error::DeleteMissingCashbook] if `id` does not refer to a
    /// cashbook.
    pub async fn delete_cashbook(&self, id: CashbookId) -> Result<(), Error> {
        self.with_connection(move |connection| cashbook::delete_cashbook(id, connection))
            .await
    }

    /// List the transactions belonging to `cashbook_id`, most recent first.
    ///
    /// Returns an empty vector when the cashbook has no transactions or does
    /// not exist.
    pub async fn list_transactions(
        &self,
        cashbook_id: CashbookId,
    ) -> Result<Vec<Transaction>, Error> {
        self.with_connection(move |connection| {
            transaction::get_transactions_for_cashbook(cashbook_id, connection)
        })
        .await
    }

    /// Record a transaction and refresh the owning cashbook's cached totals.
    ///
    /// The insert and the totals update are one atomic unit: once this call
    /// resolves, both are visible to subsequent reads; if it fails, neither
    /// is.
    ///
    /// # Errors
    /// Returns an:
    /// - [Error::InvalidAmount] before any storage I/O if the amount is not
    ///   strictly positive,
    /// - [Error::CashbookNotFound] if the builder's cashbook does not exist.
    pub async fn create_transaction(
        &self,
        builder: TransactionBuilder,
    ) -> Result<Transaction, Error> {
        self.with_connection(move |connection| {
            transaction::create_transaction(builder, connection)
        })
        .await
    }

    /// Sum income and spending across every cashbook, computed live from the
    /// transaction log.
    pub async fn total_income_and_spent(&self) -> Result<IncomeSpent, Error> {
        self.with_connection(summary::get_total_income_and_spent)
            .await
    }

    /// Drop and recreate both tables, erasing every cashbook and transaction.
    ///
    /// The store remains usable afterwards.
    pub async fn reset(&self) -> Result<(), Error> {
        self.with_connection(|connection| {
            connection
                .execute_batch("DROP TABLE IF EXISTS transactions; DROP TABLE IF EXISTS cashbooks;")
                .map_err(Error::from)?;

            tracing::debug!("dropped all tables, recreating schema");

            initialize(connection).map_err(|error| Error::Initialization(error.to_string()))
        })
        .await
    }
}
