//! Database operations for cashbooks.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    cashbook::{Cashbook, CashbookName},
    database_id::CashbookId,
};

/// Create a cashbook with zeroed totals and return it with its generated ID.
pub fn create_cashbook(name: CashbookName, connection: &Connection) -> Result<Cashbook, Error> {
    let cashbook = connection
        .prepare(
            "INSERT INTO cashbooks (name, totalIn, totalOut, netBalance)
             VALUES (?1, 0, 0, 0)
             RETURNING id, name, totalIn, totalOut, netBalance",
        )?
        .query_row((name.as_ref(),), map_cashbook_row)?;

    Ok(cashbook)
}

/// Retrieve a single cashbook by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a cashbook,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_cashbook(id: CashbookId, connection: &Connection) -> Result<Cashbook, Error> {
    connection
        .prepare("SELECT id, name, totalIn, totalOut, netBalance FROM cashbooks WHERE id = :id")?
        .query_row(&[(":id", &id)], map_cashbook_row)
        .map_err(|error| error.into())
}

/// Retrieve every cashbook, most recently created first.
///
/// Totals come from the cached columns. Use
/// [crate::summary::get_cashbooks_with_balances] when the listing must be
/// derived from the transaction log instead.
pub fn get_all_cashbooks(connection: &Connection) -> Result<Vec<Cashbook>, Error> {
    connection
        .prepare("SELECT id, name, totalIn, totalOut, netBalance FROM cashbooks ORDER BY id DESC")?
        .query_map([], map_cashbook_row)?
        .map(|maybe_cashbook| maybe_cashbook.map_err(|error| error.into()))
        .collect()
}

/// Rename a cashbook. The totals columns are left untouched.
///
/// # Errors
/// This function will return an [Error::UpdateMissingCashbook] if `id` does
/// not refer to a cashbook.
pub fn rename_cashbook(
    id: CashbookId,
    new_name: CashbookName,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE cashbooks SET name = ?1 WHERE id = ?2",
        (new_name.as_ref(), id),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCashbook);
    }

    Ok(())
}

/// Delete a cashbook and every transaction it owns.
///
/// The child rows are deleted explicitly, before the cashbook itself, inside
/// a single database transaction: either everything is removed or nothing is,
/// and the delete does not depend on the storage engine's cascade support.
///
/// # Errors
/// This function will return an [Error::DeleteMissingCashbook] if `id` does
/// not refer to a cashbook. No rows are removed in that case.
pub fn delete_cashbook(id: CashbookId, connection: &Connection) -> Result<(), Error> {
    let tx = connection.unchecked_transaction()?;

    tx.execute("DELETE FROM transactions WHERE cashbook_id = ?1", [id])?;
    let rows_affected = tx.execute("DELETE FROM cashbooks WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCashbook);
    }

    tx.commit()?;

    Ok(())
}

/// Initialize the cashbook table.
pub fn create_cashbook_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS cashbooks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                totalIn REAL DEFAULT 0,
                totalOut REAL DEFAULT 0,
                netBalance REAL DEFAULT 0
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('cashbooks', 0)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [Cashbook].
pub fn map_cashbook_row(row: &Row) -> Result<Cashbook, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let total_in = row.get(2)?;
    let total_out = row.get(3)?;
    let net_balance = row.get(4)?;

    Ok(Cashbook {
        id,
        name: CashbookName::new_unchecked(&raw_name),
        total_in,
        total_out,
        net_balance,
    })
}
