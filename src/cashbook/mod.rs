//! Cashbook management: the named ledgers that group transactions.

mod db;
mod domain;

pub use db::{
    create_cashbook, create_cashbook_table, delete_cashbook, get_all_cashbooks, get_cashbook,
    map_cashbook_row, rename_cashbook,
};
pub use domain::{Cashbook, CashbookName};
