//! Change-feed boundary.
//!
//! The hosted backend pushes raw change payloads carrying the record
//! state before and/or after the change. This module is the single place
//! that branches on that transport shape: [`ChangeEvent::normalize`]
//! produces the one canonical [`TransactionEvent`] the rest of the
//! engine works with. Everything upstream of `normalize` is an external
//! collaborator reached through the [`ChangeFeed`] trait.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use scrapdesk_core::types::{Amount, TransactionId};

use crate::event::{EventKind, TransactionEvent};

/// Feed boundary error types.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FeedError {
    /// The change payload carried neither a before nor an after record.
    #[error("change event has no resolvable payload (kind: {kind})")]
    MissingPayload {
        /// Kind of the malformed change.
        kind: EventKind,
    },

    /// The record payload failed validation.
    #[error("invalid transaction record: {reason}")]
    InvalidRecord {
        /// What was wrong with the record.
        reason: String,
    },

    /// The payload could not be deserialized.
    #[error("malformed change payload: {reason}")]
    MalformedPayload {
        /// Deserialization failure detail.
        reason: String,
    },

    /// The feed refused the subscription.
    #[error("subscription failed ({channel}): {reason}")]
    SubscriptionFailed {
        /// Channel name.
        channel: String,
        /// Failure reason.
        reason: String,
    },
}

/// Unique identifier for a feed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new `SubscriptionId`.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the ID as a u64.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw transaction record shape as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Record identifier.
    pub id: String,
    /// Monetary amount.
    pub amount: Decimal,
    /// Walk-in supplier flag.
    #[serde(default)]
    pub is_walk_in: bool,
    /// Material being traded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    /// Supplier record reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_ref: Option<String>,
    /// Payment method, when money moved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Relative photo path in the asset bucket, if a photo was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_path: Option<String>,
}

impl TransactionRecord {
    /// Converts the raw record into a canonical event of the given kind.
    pub fn into_event(self, kind: EventKind) -> Result<TransactionEvent, FeedError> {
        let id = TransactionId::new(self.id).map_err(|e| FeedError::InvalidRecord {
            reason: e.to_string(),
        })?;
        let amount = Amount::new(self.amount).map_err(|e| FeedError::InvalidRecord {
            reason: e.to_string(),
        })?;

        let mut event = TransactionEvent::new(id, kind, amount).with_walk_in(self.is_walk_in);
        if let Some(material) = self.material {
            event = event.with_material(material);
        }
        if let Some(supplier_ref) = self.supplier_ref {
            event = event.with_supplier_ref(supplier_ref);
        }
        if let Some(payment_method) = self.payment_method {
            event = event.with_payment_method(payment_method);
        }
        Ok(event)
    }
}

/// Raw change notification as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Kind of change.
    pub kind: EventKind,
    /// Record state before the change, when the backend provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<TransactionRecord>,
    /// Record state after the change, when the backend provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<TransactionRecord>,
}

impl ChangeEvent {
    /// Parses a change event from a raw JSON payload.
    pub fn from_json(payload: &str) -> Result<Self, FeedError> {
        serde_json::from_str(payload).map_err(|e| FeedError::MalformedPayload {
            reason: e.to_string(),
        })
    }

    /// Normalizes the transport payload into the canonical event shape.
    ///
    /// Prefers `after` and falls back to `before` (deletes only carry
    /// the pre-image). A payload with neither is malformed and yields
    /// `FeedError::MissingPayload`; callers drop and log it.
    pub fn normalize(self) -> Result<TransactionEvent, FeedError> {
        let kind = self.kind;
        let record = self
            .after
            .or(self.before)
            .ok_or(FeedError::MissingPayload { kind })?;
        record.into_event(kind)
    }
}

/// Message delivered on a feed subscription.
#[derive(Debug, Clone)]
pub enum FeedMessage {
    /// A change notification.
    Change(ChangeEvent),
    /// Feed connectivity changed. Carried passively to the session; the
    /// feed collaborator owns reconnection.
    Connectivity(bool),
}

/// An active feed subscription.
#[derive(Debug)]
pub struct FeedSubscription {
    /// Subscription identifier for later unsubscribe.
    pub id: SubscriptionId,
    /// Stream of feed messages.
    pub receiver: mpsc::Receiver<FeedMessage>,
}

/// External change-feed collaborator.
///
/// The engine only ever subscribes to a named channel for a table and
/// releases the subscription on session end; delivery semantics are
/// at-least-once and unordered.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Subscribes to change events for a table.
    ///
    /// `event_filter` follows the backend convention, with `"*"` meaning
    /// all event kinds.
    async fn subscribe(
        &self,
        channel: &str,
        table: &str,
        event_filter: &str,
    ) -> Result<FeedSubscription, FeedError>;

    /// Releases a subscription. Idempotent: unsubscribing an unknown or
    /// already-released id succeeds.
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), FeedError>;
}

/// In-process change feed.
///
/// Delivers pushed messages to every live subscription. Used by tests
/// and demos in place of the hosted backend.
pub struct InMemoryChangeFeed {
    senders: RwLock<HashMap<SubscriptionId, mpsc::Sender<FeedMessage>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl InMemoryChangeFeed {
    /// Creates a feed with the given per-subscription buffer size.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer,
        }
    }

    /// Pushes a message to all live subscriptions.
    pub async fn emit(&self, message: FeedMessage) {
        // Collect senders to avoid holding the lock across await.
        let senders: Vec<_> = self.senders.read().values().cloned().collect();
        for sender in senders {
            if let Err(e) = sender.send(message.clone()).await {
                warn!(error = %e, "failed to deliver feed message");
            }
        }
    }

    /// Pushes a change event to all live subscriptions.
    pub async fn emit_change(&self, change: ChangeEvent) {
        self.emit(FeedMessage::Change(change)).await;
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.senders.read().len()
    }
}

impl Default for InMemoryChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl ChangeFeed for InMemoryChangeFeed {
    async fn subscribe(
        &self,
        channel: &str,
        table: &str,
        event_filter: &str,
    ) -> Result<FeedSubscription, FeedError> {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.buffer);
        self.senders.write().insert(id, sender);

        info!(
            subscription_id = %id,
            channel,
            table,
            event_filter,
            "feed subscription opened"
        );
        Ok(FeedSubscription { id, receiver })
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), FeedError> {
        if self.senders.write().remove(&id).is_some() {
            info!(subscription_id = %id, "feed subscription released");
        } else {
            debug!(subscription_id = %id, "unsubscribe for unknown subscription ignored");
        }
        Ok(())
    }
}
