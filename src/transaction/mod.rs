//! Transaction management: the append-only money movements in each cashbook.

mod core;

pub use core::{
    Transaction, TransactionBuilder, TransactionKind, create_transaction,
    create_transaction_table, get_transactions_for_cashbook, map_transaction_row,
};
