//! Priority-ordered notification queue and derived statistics.
//!
//! The queue owns every pending notification for one operator session.
//! It is kept sorted by `(priority desc, enqueued_at asc)`; the sort is
//! recomputed on insert and never on removal, so removal preserves the
//! relative order of the remaining entries. The sort is stable, so equal
//! keys keep their original insertion order and the visible ordering
//! never jitters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use scrapdesk_core::types::Timestamp;

use crate::classifier::{ClassifierConfig, EventClassifier, Priority};
use crate::dedup::DedupPolicy;
use crate::event::{EventKind, NotificationId, TransactionEvent};

/// A transaction event wrapped with engine-assigned queue metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedNotification {
    /// Unique identity of this enqueue.
    pub id: NotificationId,
    /// The underlying change event.
    pub event: TransactionEvent,
    /// Assigned priority tier.
    pub priority: Priority,
    /// When the engine enqueued the event.
    pub enqueued_at: Timestamp,
    /// Whether an operator completed the acknowledgment workflow for
    /// this notification. Set at most once.
    pub processed: bool,
}

impl QueuedNotification {
    /// Returns true if dismissal of this notification is gated on an
    /// explicit operator acknowledgment.
    ///
    /// Only new payment-bearing transactions are gated: those represent
    /// cash changing hands in the yard, and losing track of one means
    /// losing track of an unpaid supplier obligation.
    #[must_use]
    pub fn requires_acknowledgment(&self) -> bool {
        self.event.kind == EventKind::Insert && self.event.is_payment_bearing()
    }
}

/// Counts derived from the current queue contents.
///
/// Always recomputed from scratch after a mutation, never patched
/// incrementally, so the counts cannot drift from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Total queued notifications.
    pub total: usize,
    /// Notifications at High priority.
    pub high: usize,
    /// Notifications at Medium priority.
    pub medium: usize,
    /// Notifications at Low priority.
    pub low: usize,
    /// Notifications marked processed but not yet removed.
    pub processed: usize,
}

impl QueueStats {
    /// Notifications that were closed without being processed; surfaced
    /// by the UI as a warning badge.
    #[must_use]
    pub const fn unhandled(&self) -> usize {
        self.total - self.processed
    }
}

/// Result of an insert attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The event was enqueued.
    Inserted {
        /// Identity assigned to the new notification.
        id: NotificationId,
        /// True when this insert took the queue from empty to non-empty,
        /// which tells an idle workflow to start displaying the head.
        became_active: bool,
    },
    /// A near-duplicate was already queued; the queue is unchanged.
    DuplicateSkipped,
}

/// The ordered collection of pending notifications for one session.
#[derive(Debug)]
pub struct NotificationQueue {
    items: Vec<QueuedNotification>,
    classifier: EventClassifier,
    dedup: DedupPolicy,
    next_sequence: u64,
}

impl NotificationQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new(classifier: ClassifierConfig, dedup: DedupPolicy) -> Self {
        Self {
            items: Vec::new(),
            classifier: EventClassifier::new(classifier),
            dedup,
            next_sequence: 0,
        }
    }

    /// Classifies and enqueues a change event.
    ///
    /// Near-duplicates within the dedup window are skipped without any
    /// state change; the skip is logged for diagnostics but is not an
    /// error. Otherwise the event is wrapped, inserted, and the whole
    /// queue re-sorted by `(priority desc, enqueued_at asc)`.
    pub fn insert(&mut self, event: TransactionEvent, now: Timestamp) -> InsertOutcome {
        if self.dedup.is_duplicate(&self.items, &event, now) {
            debug!(
                transaction = %event.id,
                kind = %event.kind,
                "duplicate change skipped"
            );
            return InsertOutcome::DuplicateSkipped;
        }

        let became_active = self.items.is_empty();
        let priority = self.classifier.classify(&event);
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let id = NotificationId::new(event.id.clone(), event.kind, now, sequence);
        self.items.push(QueuedNotification {
            id: id.clone(),
            event,
            priority,
            enqueued_at: now,
            processed: false,
        });

        // Vec::sort_by is stable; ties keep insertion order.
        self.items
            .sort_by(|a, b| b.priority.cmp(&a.priority).then(a.enqueued_at.cmp(&b.enqueued_at)));

        debug!(
            notification = %id,
            priority = %priority,
            queue_len = self.items.len(),
            "notification enqueued"
        );

        InsertOutcome::Inserted { id, became_active }
    }

    /// Removes and returns the first notification.
    ///
    /// Calling this on an empty queue is a caller logic error; it asserts
    /// in debug builds and returns `None` in release builds.
    pub fn pop_front(&mut self) -> Option<QueuedNotification> {
        debug_assert!(!self.items.is_empty(), "pop_front called on empty queue");
        if self.items.is_empty() {
            return None;
        }
        Some(self.items.remove(0))
    }

    /// Removes the notification with the given id, wherever it sits.
    ///
    /// Returns `None` if no such notification is queued.
    pub fn remove(&mut self, id: &NotificationId) -> Option<QueuedNotification> {
        let index = self.items.iter().position(|n| &n.id == id)?;
        Some(self.items.remove(index))
    }

    /// Marks the matching notification as processed.
    ///
    /// Returns false when the notification is no longer queued. That
    /// happens when acknowledgment races a pop in the UI flow and is
    /// tolerated as a no-op, not an error.
    pub fn mark_processed(&mut self, id: &NotificationId) -> bool {
        match self.items.iter_mut().find(|n| &n.id == id) {
            Some(notification) => {
                notification.processed = true;
                true
            }
            None => false,
        }
    }

    /// Empties the queue unconditionally.
    pub fn clear_all(&mut self) {
        let cleared = self.items.len();
        self.items.clear();
        debug!(cleared, "queue cleared");
    }

    /// Removes all notifications with priority strictly below the given
    /// tier. Returns the number removed.
    pub fn clear_below(&mut self, floor: Priority) -> usize {
        let before = self.items.len();
        self.items.retain(|n| n.priority >= floor);
        let removed = before - self.items.len();
        if removed > 0 {
            debug!(removed, floor = %floor, "cleared below priority");
        }
        removed
    }

    /// Returns the first notification without removing it.
    #[must_use]
    pub fn front(&self) -> Option<&QueuedNotification> {
        self.items.first()
    }

    /// Returns the notification with the given id, if still queued.
    #[must_use]
    pub fn get(&self, id: &NotificationId) -> Option<&QueuedNotification> {
        self.items.iter().find(|n| &n.id == id)
    }

    /// Returns true if a notification with the given id is queued.
    #[must_use]
    pub fn contains(&self, id: &NotificationId) -> bool {
        self.get(id).is_some()
    }

    /// Returns true if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of queued notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns a consistent snapshot of the full ordered queue.
    #[must_use]
    pub fn snapshot(&self) -> Vec<QueuedNotification> {
        self.items.clone()
    }

    /// Returns the ordered contents as a slice.
    #[must_use]
    pub fn items(&self) -> &[QueuedNotification] {
        &self.items
    }

    /// Computes statistics from the current contents.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            total: self.items.len(),
            ..QueueStats::default()
        };
        for notification in &self.items {
            match notification.priority {
                Priority::High => stats.high += 1,
                Priority::Medium => stats.medium += 1,
                Priority::Low => stats.low += 1,
            }
            if notification.processed {
                stats.processed += 1;
            }
        }
        stats
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(ClassifierConfig::default(), DedupPolicy::default())
    }
}
