//! Core cashbook domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, database_id::CashbookId};

/// A validated, non-empty cashbook name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CashbookName(String);

impl CashbookName {
    /// Create a cashbook name.
    ///
    /// Leading and trailing whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCashbookName] if `name` is an
    /// empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCashbookName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a cashbook name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// if the non-empty invariant is violated it will cause incorrect
    /// behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CashbookName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CashbookName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CashbookName::new(s)
    }
}

impl Display for CashbookName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named ledger that groups transactions and carries cached totals.
///
/// The totals columns are refreshed from the transaction log on every insert
/// (see [crate::transaction::create_transaction]); the live listing in
/// [crate::summary] recomputes them from the log instead of trusting the
/// cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cashbook {
    /// The ID of the cashbook.
    pub id: CashbookId,
    /// The user-chosen name. Not necessarily unique.
    pub name: CashbookName,
    /// Cached sum of the cashbook's "cash in" amounts.
    pub total_in: f64,
    /// Cached sum of the cashbook's "cash out" amounts.
    pub total_out: f64,
    /// Cached `total_in - total_out`.
    pub net_balance: f64,
}
