//! Duplicate collapse for redelivered change events.
//!
//! The upstream feed guarantees at-least-once delivery, so a transport
//! retry can hand the engine the same change notification twice within
//! the same burst. A short time window collapses those redeliveries
//! without swallowing a legitimately fast sequence of distinct edits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use scrapdesk_core::types::Timestamp;

use crate::event::TransactionEvent;
use crate::queue::QueuedNotification;

/// Deduplication policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupPolicy {
    /// Window within which a repeated (transaction id, kind) pair is
    /// treated as a redelivery of the same change.
    #[serde(default = "default_window", with = "humantime_serde")]
    pub window: Duration,
}

fn default_window() -> Duration {
    Duration::from_millis(1000)
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self {
            window: default_window(),
        }
    }
}

impl DedupPolicy {
    /// Creates a policy with the given window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Decides whether a candidate event is a near-duplicate of a
    /// notification already queued.
    ///
    /// A candidate is a duplicate when the queue holds a notification
    /// with the same transaction id, the same event kind, and an enqueue
    /// time strictly within the window of the candidate's. Edits to the
    /// same transaction spaced at or beyond the window apart are distinct
    /// events and both kept.
    #[must_use]
    pub fn is_duplicate(
        &self,
        queued: &[QueuedNotification],
        candidate: &TransactionEvent,
        enqueued_at: Timestamp,
    ) -> bool {
        queued.iter().any(|existing| {
            existing.event.id == candidate.id
                && existing.event.kind == candidate.kind
                && existing.enqueued_at.abs_diff(enqueued_at) < self.window
        })
    }
}
