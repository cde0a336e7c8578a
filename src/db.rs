//! Database schema creation for the application.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{cashbook::create_cashbook_table, transaction::create_transaction_table};

/// Create the application's tables if they do not already exist.
///
/// Safe to call on every start; existing tables and rows are left untouched.
/// Must be called before any other database operation in a fresh process.
///
/// # Errors
/// Returns an error if the storage medium cannot be written or the schema
/// cannot be created. The store must not be used after a failure.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    // Foreign key enforcement is per connection and is a no-op inside a
    // transaction, so it has to be set first.
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_cashbook_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
