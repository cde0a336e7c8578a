//! Database ID type definitions.

/// Alias for the integer type used for cashbook row IDs.
pub type CashbookId = i64;

/// Alias for the integer type used for transaction row IDs.
pub type TransactionId = i64;
