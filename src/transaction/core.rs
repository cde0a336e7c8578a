//! Defines the core data models and database queries for transactions.
//!
//! Transactions are append-only: they are created, listed, and removed only
//! as a side effect of deleting their owning cashbook. Every insert refreshes
//! the owning cashbook's cached totals from the full transaction log, so the
//! cache is rebuilt from the source of truth rather than incremented.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::{
    Error,
    database_id::{CashbookId, TransactionId},
};

// ============================================================================
// MODELS
// ============================================================================

/// The polarity of a transaction: money paid into or out of a cashbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Money received into the cashbook.
    #[serde(rename = "cash in")]
    CashIn,
    /// Money spent out of the cashbook.
    #[serde(rename = "cash out")]
    CashOut,
}

impl TransactionKind {
    /// The tag stored in the `type` column for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::CashIn => "cash in",
            TransactionKind::CashOut => "cash out",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash in" => Ok(TransactionKind::CashIn),
            "cash out" => Ok(TransactionKind::CashOut),
            other => Err(Error::InvalidTransactionKind(other.to_string())),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

/// A single money movement recorded against a cashbook.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The ID of the cashbook this transaction belongs to.
    pub cashbook_id: CashbookId,
    /// A text description of what the transaction was for. May be empty.
    pub description: String,
    /// Whether money moved into or out of the cashbook.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// How much money moved. Always greater than zero.
    pub amount: f64,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        cashbook_id: CashbookId,
        kind: TransactionKind,
        amount: f64,
    ) -> TransactionBuilder {
        TransactionBuilder {
            cashbook_id,
            kind,
            amount,
            description: String::new(),
            date: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// The description defaults to an empty string and the date defaults to the
/// moment of insertion. Pass the finished builder to [create_transaction].
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBuilder {
    /// The cashbook the transaction will belong to.
    pub cashbook_id: CashbookId,
    /// Whether money moved into or out of the cashbook.
    pub kind: TransactionKind,
    /// How much money moved. Must be greater than zero; the direction is
    /// carried by `kind`, not by the sign.
    pub amount: f64,
    /// A text description of what the transaction was for.
    pub description: String,
    /// When the transaction happened. `None` means "now".
    pub date: Option<OffsetDateTime>,
}

impl TransactionBuilder {
    /// Set the description for the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Set the date for the transaction.
    pub fn date(mut self, date: OffsetDateTime) -> Self {
        self.date = Some(date);
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction and refresh its cashbook's cached totals.
///
/// The insert and the totals update happen in a single database transaction,
/// so a reader never observes the new row without the updated totals or the
/// updated totals without the row. The totals are recomputed from the full
/// transaction log for the cashbook, which also repairs any drift left behind
/// by earlier failures.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is zero, negative, or not finite
///   (rejected before any storage I/O),
/// - [Error::CashbookNotFound] if `cashbook_id` does not refer to a cashbook,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if !builder.amount.is_finite() || builder.amount <= 0.0 {
        return Err(Error::InvalidAmount(builder.amount));
    }

    let cashbook_id = builder.cashbook_id;
    let date = builder
        .date
        .unwrap_or_else(OffsetDateTime::now_utc)
        .to_offset(UtcOffset::UTC);

    let tx = connection.unchecked_transaction()?;

    let transaction = tx
        .prepare(
            "INSERT INTO transactions (cashbook_id, description, type, amount, date)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, cashbook_id, description, type, amount, date",
        )?
        .query_row(
            (
                cashbook_id,
                &builder.description,
                builder.kind,
                builder.amount,
                date,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::CashbookNotFound(cashbook_id),
            error => error.into(),
        })?;

    recompute_cashbook_totals(cashbook_id, &tx)?;

    tx.commit()?;

    Ok(transaction)
}

/// Retrieve every transaction belonging to `cashbook_id`, most recent first.
///
/// Returns an empty vector, not an error, when the cashbook has no
/// transactions or does not exist.
pub fn get_transactions_for_cashbook(
    cashbook_id: CashbookId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, cashbook_id, description, type, amount, date FROM transactions
             WHERE cashbook_id = :cashbook_id
             ORDER BY date DESC, id DESC",
        )?
        .query_map(&[(":cashbook_id", &cashbook_id)], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Overwrite a cashbook's cached totals with sums derived from its
/// transaction log.
///
/// Runs inside the caller's database transaction when one is active on the
/// connection.
fn recompute_cashbook_totals(
    cashbook_id: CashbookId,
    connection: &Connection,
) -> Result<(), Error> {
    let (total_in, total_out): (f64, f64) = connection
        .prepare(
            "SELECT
                COALESCE(SUM(CASE WHEN type = 'cash in' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN type = 'cash out' THEN amount ELSE 0 END), 0)
             FROM transactions
             WHERE cashbook_id = :cashbook_id",
        )?
        .query_row(&[(":cashbook_id", &cashbook_id)], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;

    connection.execute(
        "UPDATE cashbooks SET totalIn = ?1, totalOut = ?2, netBalance = ?3 WHERE id = ?4",
        (total_in, total_out, total_in - total_out, cashbook_id),
    )?;

    Ok(())
}

/// Initialize the transaction table and its listing index.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cashbook_id INTEGER NOT NULL,
                description TEXT,
                type TEXT CHECK(type IN ('cash in','cash out')) NOT NULL,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                FOREIGN KEY(cashbook_id) REFERENCES cashbooks(id) ON DELETE CASCADE
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transactions', 0)",
        (),
    )?;

    // Index used by the per-cashbook listing and the totals recompute.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_cashbook_date
         ON transactions(cashbook_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [Transaction].
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let cashbook_id = row.get(1)?;
    let description: Option<String> = row.get(2)?;
    let kind = row.get(3)?;
    let amount = row.get(4)?;
    let date = row.get(5)?;

    Ok(Transaction {
        id,
        cashbook_id,
        description: description.unwrap_or_default(),
        kind,
        amount,
        date,
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error,
        cashbook::{Cashbook, CashbookName, create_cashbook, get_cashbook},
        db::initialize,
        transaction::{
            Transaction, TransactionKind, create_transaction, get_transactions_for_cashbook,
        },
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    fn create_test_cashbook(connection: &Connection) -> Cashbook {
        create_cashbook(CashbookName::new_unchecked("Wallet"), connection)
            .expect("Could not create test cashbook")
    }

    #[test]
    fn create_succeeds() {
        let connection = get_test_connection();
        let cashbook = create_test_cashbook(&connection);
        let date = datetime!(2024-08-07 12:00 UTC);

        let result = create_transaction(
            Transaction::build(cashbook.id, TransactionKind::CashIn, 12.3)
                .description("Pocket money")
                .date(date),
            &connection,
        );

        let transaction = result.expect("Could not create transaction");
        assert!(transaction.id > 0);
        assert_eq!(transaction.cashbook_id, cashbook.id);
        assert_eq!(transaction.description, "Pocket money");
        assert_eq!(transaction.kind, TransactionKind::CashIn);
        assert_eq!(transaction.amount, 12.3);
        assert_eq!(transaction.date, date);
    }

    #[test]
    fn create_updates_cached_totals_after_every_insert() {
        let connection = get_test_connection();
        let cashbook = create_test_cashbook(&connection);
        let date = datetime!(2024-08-07 12:00 UTC);

        create_transaction(
            Transaction::build(cashbook.id, TransactionKind::CashIn, 1000.0).date(date),
            &connection,
        )
        .unwrap();

        let after_first = get_cashbook(cashbook.id, &connection).unwrap();
        assert_eq!(after_first.total_in, 1000.0);
        assert_eq!(after_first.total_out, 0.0);
        assert_eq!(after_first.net_balance, 1000.0);

        create_transaction(
            Transaction::build(cashbook.id, TransactionKind::CashOut, 300.0).date(date),
            &connection,
        )
        .unwrap();

        let after_second = get_cashbook(cashbook.id, &connection).unwrap();
        assert_eq!(after_second.total_in, 1000.0);
        assert_eq!(after_second.total_out, 300.0);
        assert_eq!(after_second.net_balance, 700.0);
    }

    #[test]
    fn create_repairs_drifted_totals_from_the_log() {
        let connection = get_test_connection();
        let cashbook = create_test_cashbook(&connection);
        let date = datetime!(2024-08-07 12:00 UTC);
        create_transaction(
            Transaction::build(cashbook.id, TransactionKind::CashIn, 100.0).date(date),
            &connection,
        )
        .unwrap();

        // Corrupt the cache out-of-band.
        connection
            .execute(
                "UPDATE cashbooks SET totalIn = 9999.0, totalOut = 1.0, netBalance = -1.0
                 WHERE id = ?1",
                [cashbook.id],
            )
            .unwrap();

        create_transaction(
            Transaction::build(cashbook.id, TransactionKind::CashIn, 50.0).date(date),
            &connection,
        )
        .unwrap();

        let repaired = get_cashbook(cashbook.id, &connection).unwrap();
        assert_eq!(repaired.total_in, 150.0);
        assert_eq!(repaired.total_out, 0.0);
        assert_eq!(repaired.net_balance, 150.0);
    }

    #[test]
    fn create_fails_on_zero_amount() {
        let connection = get_test_connection();
        let cashbook = create_test_cashbook(&connection);

        let result = create_transaction(
            Transaction::build(cashbook.id, TransactionKind::CashIn, 0.0),
            &connection,
        );

        assert_eq!(result, Err(Error::InvalidAmount(0.0)));
    }

    #[test]
    fn create_fails_on_negative_amount() {
        let connection = get_test_connection();
        let cashbook = create_test_cashbook(&connection);

        let result = create_transaction(
            Transaction::build(cashbook.id, TransactionKind::CashOut, -5.0),
            &connection,
        );

        assert_eq!(result, Err(Error::InvalidAmount(-5.0)));
        let transactions = get_transactions_for_cashbook(cashbook.id, &connection).unwrap();
        assert_eq!(transactions, vec![]);
    }

    #[test]
    fn create_fails_on_non_finite_amount() {
        let connection = get_test_connection();
        let cashbook = create_test_cashbook(&connection);

        let result = create_transaction(
            Transaction::build(cashbook.id, TransactionKind::CashIn, f64::NAN),
            &connection,
        );

        assert!(matches!(result, Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn create_fails_on_invalid_cashbook_id() {
        let connection = get_test_connection();
        let cashbook = create_test_cashbook(&connection);
        let missing_id = cashbook.id + 42;

        let result = create_transaction(
            Transaction::build(missing_id, TransactionKind::CashIn, 12.3),
            &connection,
        );

        assert_eq!(result, Err(Error::CashbookNotFound(missing_id)));
        let transactions = get_transactions_for_cashbook(missing_id, &connection).unwrap();
        assert_eq!(transactions, vec![]);
    }

    #[test]
    fn get_transactions_returns_most_recent_date_first() {
        let connection = get_test_connection();
        let cashbook = create_test_cashbook(&connection);

        let oldest = create_transaction(
            Transaction::build(cashbook.id, TransactionKind::CashIn, 1.0)
                .date(datetime!(2024-01-01 09:00 UTC)),
            &connection,
        )
        .unwrap();
        let newest = create_transaction(
            Transaction::build(cashbook.id, TransactionKind::CashOut, 2.0)
                .date(datetime!(2024-03-01 09:00 UTC)),
            &connection,
        )
        .unwrap();
        let middle = create_transaction(
            Transaction::build(cashbook.id, TransactionKind::CashIn, 3.0)
                .date(datetime!(2024-02-01 09:00 UTC)),
            &connection,
        )
        .unwrap();

        let transactions = get_transactions_for_cashbook(cashbook.id, &connection).unwrap();

        assert_eq!(transactions, vec![newest, middle, oldest]);
    }

    #[test]
    fn get_transactions_only_returns_rows_for_the_requested_cashbook() {
        let connection = get_test_connection();
        let cashbook = create_test_cashbook(&connection);
        let other = create_cashbook(CashbookName::new_unchecked("Other"), &connection).unwrap();
        let date = datetime!(2024-08-07 12:00 UTC);

        let wanted = create_transaction(
            Transaction::build(cashbook.id, TransactionKind::CashIn, 10.0).date(date),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build(other.id, TransactionKind::CashIn, 20.0).date(date),
            &connection,
        )
        .unwrap();

        let transactions = get_transactions_for_cashbook(cashbook.id, &connection).unwrap();

        assert_eq!(transactions, vec![wanted]);
    }

    #[test]
    fn get_transactions_returns_empty_for_unknown_cashbook() {
        let connection = get_test_connection();

        let transactions = get_transactions_for_cashbook(999999, &connection).unwrap();

        assert_eq!(transactions, vec![]);
    }
}
