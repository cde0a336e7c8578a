//! Live balance aggregation over the transaction log.
//!
//! The cashbook table carries cached totals that are refreshed on every
//! transaction insert. The queries in this module ignore that cache and
//! derive their figures directly from the transactions table, so they stay
//! correct even when the cache has drifted.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    cashbook::{Cashbook, CashbookName},
};

/// Aggregate income and spending across every cashbook.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeSpent {
    /// Sum of every "cash in" amount in the database.
    pub total_income: f64,
    /// Sum of every "cash out" amount in the database.
    pub total_spent: f64,
}

/// Retrieve every cashbook with totals summed live from the transaction log,
/// most recently created first.
///
/// Cashbooks without transactions are included with zeroed totals.
pub fn get_cashbooks_with_balances(connection: &Connection) -> Result<Vec<Cashbook>, Error> {
    connection
        .prepare(
            "SELECT c.id, c.name,
                COALESCE(SUM(CASE WHEN t.type = 'cash in' THEN t.amount ELSE 0 END), 0) AS totalIn,
                COALESCE(SUM(CASE WHEN t.type = 'cash out' THEN t.amount ELSE 0 END), 0) AS totalOut
             FROM cashbooks AS c
             LEFT JOIN transactions AS t ON c.id = t.cashbook_id
             GROUP BY c.id
             ORDER BY c.id DESC",
        )?
        .query_map([], |row| {
            let raw_name: String = row.get(1)?;
            let total_in: f64 = row.get(2)?;
            let total_out: f64 = row.get(3)?;

            Ok(Cashbook {
                id: row.get(0)?,
                name: CashbookName::new_unchecked(&raw_name),
                total_in,
                total_out,
                net_balance: total_in - total_out,
            })
        })?
        .map(|maybe_cashbook| maybe_cashbook.map_err(|error| error.into()))
        .collect()
}

/// Sum every "cash in" and "cash out" amount across the whole database.
///
/// Computed live from the transaction log; returns zeros when there are no
/// transactions.
pub fn get_total_income_and_spent(connection: &Connection) -> Result<IncomeSpent, Error> {
    connection
        .prepare(
            "SELECT
                COALESCE(SUM(CASE WHEN type = 'cash in' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN type = 'cash out' THEN amount ELSE 0 END), 0)
             FROM transactions",
        )?
        .query_row([], |row| {
            Ok(IncomeSpent {
                total_income: row.get(0)?,
                total_spent: row.get(1)?,
            })
        })
        .map_err(|error| error.into())
}

#[cfg(test)]
mod summary_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        cashbook::{Cashbook, CashbookName, create_cashbook},
        db::initialize,
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    use super::{get_cashbooks_with_balances, get_total_income_and_spent};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    fn create_test_cashbook(name: &str, connection: &Connection) -> Cashbook {
        create_cashbook(CashbookName::new_unchecked(name), connection)
            .expect("Could not create test cashbook")
    }

    fn add_transaction(
        cashbook_id: i64,
        kind: TransactionKind,
        amount: f64,
        connection: &Connection,
    ) {
        create_transaction(
            Transaction::build(cashbook_id, kind, amount).date(datetime!(2024-08-07 12:00 UTC)),
            connection,
        )
        .expect("Could not create test transaction");
    }

    #[test]
    fn balances_are_summed_per_cashbook() {
        let connection = get_test_connection();
        let groceries = create_test_cashbook("Groceries", &connection);
        let rent = create_test_cashbook("Rent", &connection);
        add_transaction(groceries.id, TransactionKind::CashIn, 500.0, &connection);
        add_transaction(rent.id, TransactionKind::CashIn, 1000.0, &connection);
        add_transaction(rent.id, TransactionKind::CashOut, 300.0, &connection);

        let cashbooks = get_cashbooks_with_balances(&connection).unwrap();

        assert_eq!(cashbooks.len(), 2);
        // Most recently created first.
        assert_eq!(cashbooks[0].id, rent.id);
        assert_eq!(cashbooks[0].total_in, 1000.0);
        assert_eq!(cashbooks[0].total_out, 300.0);
        assert_eq!(cashbooks[0].net_balance, 700.0);
        assert_eq!(cashbooks[1].id, groceries.id);
        assert_eq!(cashbooks[1].total_in, 500.0);
        assert_eq!(cashbooks[1].total_out, 0.0);
        assert_eq!(cashbooks[1].net_balance, 500.0);
    }

    #[test]
    fn cashbook_without_transactions_has_zeroed_balances() {
        let connection = get_test_connection();
        let empty = create_test_cashbook("Empty", &connection);

        let cashbooks = get_cashbooks_with_balances(&connection).unwrap();

        assert_eq!(cashbooks.len(), 1);
        assert_eq!(cashbooks[0].id, empty.id);
        assert_eq!(cashbooks[0].total_in, 0.0);
        assert_eq!(cashbooks[0].total_out, 0.0);
        assert_eq!(cashbooks[0].net_balance, 0.0);
    }

    #[test]
    fn balances_ignore_drifted_cache_columns() {
        let connection = get_test_connection();
        let cashbook = create_test_cashbook("Wallet", &connection);
        add_transaction(cashbook.id, TransactionKind::CashIn, 100.0, &connection);
        connection
            .execute(
                "UPDATE cashbooks SET totalIn = 12345.0, netBalance = 12345.0 WHERE id = ?1",
                [cashbook.id],
            )
            .unwrap();

        let cashbooks = get_cashbooks_with_balances(&connection).unwrap();

        assert_eq!(cashbooks[0].total_in, 100.0);
        assert_eq!(cashbooks[0].net_balance, 100.0);
    }

    #[test]
    fn income_and_spent_sum_over_every_cashbook() {
        let connection = get_test_connection();
        let first = create_test_cashbook("First", &connection);
        let second = create_test_cashbook("Second", &connection);
        add_transaction(first.id, TransactionKind::CashIn, 500.0, &connection);
        add_transaction(first.id, TransactionKind::CashOut, 120.0, &connection);
        add_transaction(second.id, TransactionKind::CashIn, 250.0, &connection);
        add_transaction(second.id, TransactionKind::CashOut, 30.0, &connection);

        let totals = get_total_income_and_spent(&connection).unwrap();

        assert_eq!(totals.total_income, 750.0);
        assert_eq!(totals.total_spent, 150.0);
    }

    #[test]
    fn income_and_spent_match_the_per_cashbook_totals() {
        let connection = get_test_connection();
        let first = create_test_cashbook("First", &connection);
        let second = create_test_cashbook("Second", &connection);
        add_transaction(first.id, TransactionKind::CashIn, 42.0, &connection);
        add_transaction(second.id, TransactionKind::CashOut, 7.0, &connection);
        add_transaction(second.id, TransactionKind::CashIn, 11.0, &connection);

        let totals = get_total_income_and_spent(&connection).unwrap();
        let cashbooks = get_cashbooks_with_balances(&connection).unwrap();

        let income: f64 = cashbooks.iter().map(|cashbook| cashbook.total_in).sum();
        let spent: f64 = cashbooks.iter().map(|cashbook| cashbook.total_out).sum();
        assert_eq!(totals.total_income, income);
        assert_eq!(totals.total_spent, spent);
    }

    #[test]
    fn income_and_spent_are_zero_for_an_empty_database() {
        let connection = get_test_connection();

        let totals = get_total_income_and_spent(&connection).unwrap();

        assert_eq!(totals.total_income, 0.0);
        assert_eq!(totals.total_spent, 0.0);
    }
}
