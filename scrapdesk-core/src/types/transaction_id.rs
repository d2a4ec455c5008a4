//! Transaction identifier type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Stable identifier of a transaction record in the backing store.
///
/// Wraps a `String` to prevent mixing transaction ids with other string
/// values. The id identifies the underlying record, not an individual
/// change notification: several notifications may refer to the same
/// transaction.
///
/// # Examples
///
/// ```
/// use scrapdesk_core::types::TransactionId;
///
/// let id = TransactionId::new("tx-1042").unwrap();
/// assert_eq!(id.as_str(), "tx-1042");
/// assert!(TransactionId::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Creates a new `TransactionId`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyTransactionId` if the id is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::EmptyTransactionId);
        }
        Ok(Self(id))
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_new() {
        let id = TransactionId::new("tx-1").unwrap();
        assert_eq!(id.as_str(), "tx-1");
    }

    #[test]
    fn test_transaction_id_rejects_empty() {
        let result = TransactionId::new("");
        assert!(matches!(result, Err(ValidationError::EmptyTransactionId)));
    }

    #[test]
    fn test_transaction_id_display() {
        let id = TransactionId::new("tx-42").unwrap();
        assert_eq!(format!("{id}"), "tx-42");
    }

    #[test]
    fn test_transaction_id_serde_roundtrip() {
        let id = TransactionId::new("tx-9").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"tx-9\"");
        let parsed: TransactionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
