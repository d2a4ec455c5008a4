//! Transaction event types delivered by the change feed.
//!
//! This module defines the canonical event shape the engine works with
//! after the feed boundary has normalized the transport payload, plus the
//! identity type for queued notifications.

use std::fmt;

use serde::{Deserialize, Serialize};

use scrapdesk_core::types::{Amount, Timestamp, TransactionId};

/// Kind of change observed on a transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A new transaction record was created.
    Insert,
    /// An existing transaction record was modified.
    Update,
    /// A transaction record was removed.
    Delete,
}

impl EventKind {
    /// Returns the kind as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable snapshot of a transaction change.
///
/// Produced once at the feed boundary and never mutated by the engine.
/// The descriptive fields (`material`, `supplier_ref`, `payment_method`)
/// are opaque to the classification and queueing logic; they exist for
/// display and for the payment-bearing check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    /// Identifier of the underlying transaction record.
    pub id: TransactionId,
    /// Kind of change.
    pub kind: EventKind,
    /// Monetary magnitude of the transaction. Non-negative.
    pub amount: Amount,
    /// Whether the transaction came from a walk-in supplier.
    #[serde(default)]
    pub is_walk_in: bool,
    /// Material being bought or sold, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    /// Reference to the supplier record, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_ref: Option<String>,
    /// Payment method, when the transaction moves money.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

impl TransactionEvent {
    /// Creates a new transaction event.
    #[must_use]
    pub fn new(id: TransactionId, kind: EventKind, amount: Amount) -> Self {
        Self {
            id,
            kind,
            amount,
            is_walk_in: false,
            material: None,
            supplier_ref: None,
            payment_method: None,
        }
    }

    /// Marks the transaction as coming from a walk-in supplier.
    #[must_use]
    pub fn with_walk_in(mut self, is_walk_in: bool) -> Self {
        self.is_walk_in = is_walk_in;
        self
    }

    /// Sets the material.
    #[must_use]
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    /// Sets the supplier reference.
    #[must_use]
    pub fn with_supplier_ref(mut self, supplier_ref: impl Into<String>) -> Self {
        self.supplier_ref = Some(supplier_ref.into());
        self
    }

    /// Sets the payment method.
    #[must_use]
    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = Some(payment_method.into());
        self
    }

    /// Returns true if this transaction moves money to or from a party
    /// and therefore carries a payment obligation.
    #[must_use]
    pub fn is_payment_bearing(&self) -> bool {
        self.payment_method.is_some()
    }
}

/// Unique identity of a queued notification.
///
/// Two genuinely distinct change events on the same transaction must not
/// collide, even when the wall clock is coarse. The identity is therefore
/// a composed value with defined equality rather than a concatenated
/// string: transaction id, event kind, enqueue timestamp, and a per-queue
/// sequence number that breaks clock ties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId {
    transaction: TransactionId,
    kind: EventKind,
    enqueued_at: Timestamp,
    sequence: u64,
}

impl NotificationId {
    /// Creates a new `NotificationId`.
    #[must_use]
    pub fn new(
        transaction: TransactionId,
        kind: EventKind,
        enqueued_at: Timestamp,
        sequence: u64,
    ) -> Self {
        Self {
            transaction,
            kind,
            enqueued_at,
            sequence,
        }
    }

    /// Returns the underlying transaction id.
    #[must_use]
    pub fn transaction(&self) -> &TransactionId {
        &self.transaction
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns the enqueue timestamp.
    #[must_use]
    pub const fn enqueued_at(&self) -> Timestamp {
        self.enqueued_at
    }

    /// Returns the per-queue sequence number.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.transaction, self.kind, self.enqueued_at, self.sequence
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx(id: &str) -> TransactionId {
        TransactionId::new(id).unwrap()
    }

    #[test]
    fn test_event_builder() {
        let event = TransactionEvent::new(
            tx("tx-1"),
            EventKind::Insert,
            Amount::new(dec!(120000)).unwrap(),
        )
        .with_walk_in(true)
        .with_material("copper")
        .with_supplier_ref("sup-7")
        .with_payment_method("cash");

        assert!(event.is_walk_in);
        assert_eq!(event.material.as_deref(), Some("copper"));
        assert_eq!(event.supplier_ref.as_deref(), Some("sup-7"));
        assert!(event.is_payment_bearing());
    }

    #[test]
    fn test_event_without_payment_method_is_not_payment_bearing() {
        let event = TransactionEvent::new(tx("tx-1"), EventKind::Delete, Amount::ZERO);
        assert!(!event.is_payment_bearing());
    }

    #[test]
    fn test_notification_id_sequence_breaks_clock_ties() {
        let at = Timestamp::new(1_000).unwrap();
        let a = NotificationId::new(tx("tx-1"), EventKind::Insert, at, 1);
        let b = NotificationId::new(tx("tx-1"), EventKind::Insert, at, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_notification_id_equality() {
        let at = Timestamp::new(1_000).unwrap();
        let a = NotificationId::new(tx("tx-1"), EventKind::Update, at, 5);
        let b = NotificationId::new(tx("tx-1"), EventKind::Update, at, 5);
        assert_eq!(a, b);
    }

    #[test]
    fn test_notification_id_display() {
        let id = NotificationId::new(
            tx("tx-1"),
            EventKind::Insert,
            Timestamp::new(1_000).unwrap(),
            3,
        );
        assert_eq!(format!("{id}"), "tx-1:insert:1000:3");
    }

    #[test]
    fn test_event_kind_serde() {
        let json = serde_json::to_string(&EventKind::Insert).unwrap();
        assert_eq!(json, "\"insert\"");
        let parsed: EventKind = serde_json::from_str("\"delete\"").unwrap();
        assert_eq!(parsed, EventKind::Delete);
    }

    #[test]
    fn test_event_serde_roundtrip() {
        let event = TransactionEvent::new(
            tx("tx-2"),
            EventKind::Update,
            Amount::new(dec!(60000)).unwrap(),
        )
        .with_material("aluminium");

        let json = serde_json::to_string(&event).unwrap();
        let parsed: TransactionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }
}
