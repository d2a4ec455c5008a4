//! Snapshot cursor for paging through buffered notifications.
//!
//! Next/Previous page through the notifications that were buffered when
//! the cursor was last anchored, so a burst of inserts re-sorting the
//! live queue does not yank the operator's position around. The cursor
//! re-anchors to the live head whenever the notification under it is
//! removed.

use serde::{Deserialize, Serialize};

use crate::event::NotificationId;
use crate::queue::NotificationQueue;

/// Cursor position report for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigatorPosition {
    /// Zero-based index within the snapshot.
    pub index: usize,
    /// Number of notifications in the snapshot.
    pub len: usize,
    /// Whether `previous()` would move.
    pub has_previous: bool,
    /// Whether `next()` would move.
    pub has_next: bool,
}

/// Cursor over a snapshot of the queue.
#[derive(Debug, Default)]
pub struct SessionNavigator {
    snapshot: Vec<NotificationId>,
    cursor: usize,
}

impl SessionNavigator {
    /// Creates an empty navigator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-anchors the cursor to the head of the live queue, taking a
    /// fresh snapshot of its current order.
    pub fn reanchor(&mut self, queue: &NotificationQueue) {
        self.snapshot = queue.items().iter().map(|n| n.id.clone()).collect();
        self.cursor = 0;
    }

    /// Moves the cursor forward. A no-op at the end of the snapshot.
    pub fn next(&mut self) {
        if self.cursor + 1 < self.snapshot.len() {
            self.cursor += 1;
        }
    }

    /// Moves the cursor backward. A no-op at the start of the snapshot.
    pub fn previous(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    /// Returns the notification id under the cursor, if any.
    #[must_use]
    pub fn current(&self) -> Option<&NotificationId> {
        self.snapshot.get(self.cursor)
    }

    /// Returns the cursor position and bounds.
    #[must_use]
    pub fn position(&self) -> NavigatorPosition {
        NavigatorPosition {
            index: self.cursor,
            len: self.snapshot.len(),
            has_previous: self.cursor > 0,
            has_next: self.cursor + 1 < self.snapshot.len(),
        }
    }

    /// Returns true when the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use scrapdesk_core::types::{Amount, Timestamp, TransactionId};

    use crate::event::{EventKind, TransactionEvent};

    fn queue_of(n: usize) -> NotificationQueue {
        let mut queue = NotificationQueue::default();
        for i in 0..n {
            let event = TransactionEvent::new(
                TransactionId::new(format!("tx-{i}")).unwrap(),
                EventKind::Insert,
                Amount::new(dec!(100)).unwrap(),
            );
            queue.insert(event, Timestamp::new(1_000 + (i as i64) * 2_000).unwrap());
        }
        queue
    }

    #[test]
    fn test_empty_navigator() {
        let nav = SessionNavigator::new();
        assert!(nav.is_empty());
        assert!(nav.current().is_none());
        let pos = nav.position();
        assert!(!pos.has_next);
        assert!(!pos.has_previous);
    }

    #[test]
    fn test_next_previous_bounds_checked() {
        let queue = queue_of(3);
        let mut nav = SessionNavigator::new();
        nav.reanchor(&queue);

        // Backward at the start is a no-op.
        nav.previous();
        assert_eq!(nav.position().index, 0);

        nav.next();
        nav.next();
        assert_eq!(nav.position().index, 2);

        // Forward at the end is a no-op.
        nav.next();
        assert_eq!(nav.position().index, 2);
        assert!(!nav.position().has_next);
        assert!(nav.position().has_previous);
    }

    #[test]
    fn test_snapshot_unmoved_by_later_inserts() {
        let mut queue = queue_of(2);
        let mut nav = SessionNavigator::new();
        nav.reanchor(&queue);
        nav.next();
        let under_cursor = nav.current().unwrap().clone();

        // A concurrent insert re-sorts the live queue but the cursor
        // stays on its snapshot.
        let event = TransactionEvent::new(
            TransactionId::new("tx-new").unwrap(),
            EventKind::Insert,
            Amount::new(dec!(100)).unwrap(),
        );
        queue.insert(event, Timestamp::new(500).unwrap());

        assert_eq!(nav.current(), Some(&under_cursor));
        assert_eq!(nav.position().len, 2);
    }

    #[test]
    fn test_reanchor_resets_to_head() {
        let mut queue = queue_of(3);
        let mut nav = SessionNavigator::new();
        nav.reanchor(&queue);
        nav.next();
        nav.next();

        queue.pop_front();
        nav.reanchor(&queue);

        assert_eq!(nav.position().index, 0);
        assert_eq!(nav.position().len, 2);
        assert_eq!(nav.current(), Some(&queue.items()[0].id));
    }
}
