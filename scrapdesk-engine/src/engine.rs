//! The notification engine state container.
//!
//! [`NotificationEngine`] owns the queue, the acknowledgment workflow,
//! and the navigator for one operator session, and applies every
//! mutation as one transition over that combined state. Readers always
//! observe stats, workflow state, and cursor computed from the same
//! version of the queue.
//!
//! The engine is deliberately free of rendering and transport concerns:
//! the session layer feeds it normalized inputs and relays its outputs.

use serde::{Deserialize, Serialize};
use tracing::warn;

use scrapdesk_core::types::Timestamp;

use crate::classifier::{ClassifierConfig, Priority};
use crate::dedup::DedupPolicy;
use crate::event::{NotificationId, TransactionEvent};
use crate::feed::ChangeEvent;
use crate::navigator::{NavigatorPosition, SessionNavigator};
use crate::queue::{InsertOutcome, NotificationQueue, QueueStats, QueuedNotification};
use crate::workflow::{
    AckState, AcknowledgmentWorkflow, CompleteOutcome, SkipConfirmation, SkipOutcome,
};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Priority classification thresholds.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Duplicate-collapse policy.
    #[serde(default)]
    pub dedup: DedupPolicy,
}

/// Result of feeding one change event through the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The event was classified and enqueued. The session schedules a
    /// debounced aggregate refresh on this outcome.
    Accepted {
        /// Identity of the new notification.
        id: NotificationId,
        /// True when the queue went empty to non-empty.
        became_active: bool,
    },
    /// A near-duplicate was collapsed; no state change.
    Duplicate,
    /// The payload had no resolvable record; dropped and logged.
    Malformed,
}

/// Combined queue + workflow + navigator state for one session.
#[derive(Debug)]
pub struct NotificationEngine {
    queue: NotificationQueue,
    workflow: AcknowledgmentWorkflow,
    navigator: SessionNavigator,
}

impl NotificationEngine {
    /// Creates an idle engine.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            queue: NotificationQueue::new(config.classifier, config.dedup),
            workflow: AcknowledgmentWorkflow::new(),
            navigator: SessionNavigator::new(),
        }
    }

    /// Feeds a raw change event through normalization and the queue.
    pub fn handle_change(&mut self, change: ChangeEvent, now: Timestamp) -> ChangeOutcome {
        match change.normalize() {
            Ok(event) => self.enqueue(event, now),
            Err(e) => {
                warn!(error = %e, "malformed change event dropped");
                ChangeOutcome::Malformed
            }
        }
    }

    /// Enqueues an already-normalized event.
    ///
    /// Exposed for tests and for hosts that construct events directly;
    /// the normal path is [`Self::handle_change`].
    pub fn enqueue(&mut self, event: TransactionEvent, now: Timestamp) -> ChangeOutcome {
        match self.queue.insert(event, now) {
            InsertOutcome::Inserted { id, became_active } => {
                if became_active && self.workflow.state() == AckState::Idle {
                    self.workflow.present_head(&self.queue);
                    self.navigator.reanchor(&self.queue);
                }
                ChangeOutcome::Accepted { id, became_active }
            }
            InsertOutcome::DuplicateSkipped => ChangeOutcome::Duplicate,
        }
    }

    /// Opens the modal on the current head, if any. Used by the UI to
    /// re-inspect the queue after skips left unhandled notifications.
    pub fn present_head(&mut self) -> bool {
        let presented = self.workflow.present_head(&self.queue);
        if presented {
            self.navigator.reanchor(&self.queue);
        }
        presented
    }

    /// Records the operator ticking the acknowledgment confirmation.
    pub fn acknowledge(&mut self) -> bool {
        self.workflow.acknowledge()
    }

    /// Completes the displayed notification.
    pub fn complete(&mut self) -> CompleteOutcome {
        let outcome = self.workflow.complete(&mut self.queue);
        if matches!(outcome, CompleteOutcome::Completed(_)) {
            self.navigator.reanchor(&self.queue);
        }
        outcome
    }

    /// Skips the displayed notification, consulting the confirmation
    /// collaborator when the acknowledgment gate applies.
    pub async fn skip(&mut self, confirmation: &dyn SkipConfirmation) -> SkipOutcome {
        let outcome = self.workflow.skip(confirmation).await;
        if matches!(outcome, SkipOutcome::Skipped(_)) {
            self.navigator.reanchor(&self.queue);
        }
        outcome
    }

    /// Returns the displayed notification that still needs an operator
    /// confirmation before it may be skipped.
    #[must_use]
    pub fn skip_requirement(&self) -> Option<QueuedNotification> {
        self.workflow.skip_requirement().cloned()
    }

    /// Applies a skip whose confirmation was resolved outside the engine
    /// lock. A stale id (the queue moved on meanwhile) is a no-op.
    pub fn apply_skip(&mut self, id: &NotificationId) -> SkipOutcome {
        let outcome = self.workflow.close_skipped(id);
        if matches!(outcome, SkipOutcome::Skipped(_)) {
            self.navigator.reanchor(&self.queue);
        }
        outcome
    }

    /// Empties the queue and closes any open modal.
    pub fn clear_all(&mut self) {
        self.queue.clear_all();
        self.workflow.abandon();
        self.navigator.reanchor(&self.queue);
    }

    /// Removes all notifications strictly below the given priority.
    /// Returns the number removed.
    pub fn clear_below(&mut self, floor: Priority) -> usize {
        let removed = self.queue.clear_below(floor);
        if removed > 0 {
            self.sync_after_removal();
        }
        removed
    }

    /// Moves the navigator cursor forward.
    pub fn next(&mut self) -> NavigatorPosition {
        self.navigator.next();
        self.navigator.position()
    }

    /// Moves the navigator cursor backward.
    pub fn previous(&mut self) -> NavigatorPosition {
        self.navigator.previous();
        self.navigator.position()
    }

    /// Returns the notification under the navigator cursor, if it is
    /// still queued.
    #[must_use]
    pub fn at_cursor(&self) -> Option<QueuedNotification> {
        let id = self.navigator.current()?;
        self.queue.get(id).cloned()
    }

    /// Returns the navigator position and bounds.
    #[must_use]
    pub fn navigator_position(&self) -> NavigatorPosition {
        self.navigator.position()
    }

    /// Returns the currently displayed notification, if any.
    #[must_use]
    pub fn displayed(&self) -> Option<QueuedNotification> {
        self.workflow.displayed().cloned()
    }

    /// Returns the queue head without removing it.
    #[must_use]
    pub fn head(&self) -> Option<QueuedNotification> {
        self.queue.front().cloned()
    }

    /// Returns the observable workflow state.
    #[must_use]
    pub fn workflow_state(&self) -> AckState {
        self.workflow.state()
    }

    /// Returns a consistent snapshot of the full ordered queue.
    #[must_use]
    pub fn queue_snapshot(&self) -> Vec<QueuedNotification> {
        self.queue.snapshot()
    }

    /// Returns statistics derived from the current queue contents.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Returns true when no notifications are queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.workflow.state() == AckState::Idle
    }

    // Removals may have pulled the displayed notification out from under
    // the modal; drop the modal instead of letting it act on a ghost.
    fn sync_after_removal(&mut self) {
        if let Some(displayed) = self.workflow.displayed() {
            if !self.queue.contains(&displayed.id) {
                self.workflow.abandon();
            }
        }
        self.navigator.reanchor(&self.queue);
    }
}

impl Default for NotificationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use scrapdesk_core::types::{Amount, TransactionId};

    use crate::event::EventKind;
    use crate::feed::TransactionRecord;
    use crate::workflow::CallbackConfirmation;

    fn event(id: &str, kind: EventKind, amount: Decimal) -> TransactionEvent {
        TransactionEvent::new(
            TransactionId::new(id).unwrap(),
            kind,
            Amount::new(amount).unwrap(),
        )
    }

    fn payment_insert(id: &str, amount: Decimal) -> TransactionEvent {
        event(id, EventKind::Insert, amount).with_payment_method("cash")
    }

    fn ts(millis: i64) -> Timestamp {
        Timestamp::new(millis).unwrap()
    }

    #[test]
    fn test_first_insert_opens_modal() {
        let mut engine = NotificationEngine::default();
        let outcome = engine.enqueue(payment_insert("tx1", dec!(120000)), ts(1_000));

        assert!(matches!(
            outcome,
            ChangeOutcome::Accepted {
                became_active: true,
                ..
            }
        ));
        assert_eq!(engine.workflow_state(), AckState::AwaitingDecision);
        assert_eq!(engine.displayed().unwrap().event.id.as_str(), "tx1");
    }

    #[test]
    fn test_complete_scenario_tx1() {
        let mut engine = NotificationEngine::default();
        engine.enqueue(payment_insert("tx1", dec!(120000)), ts(1_000));

        let stats = engine.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.high, 1);
        assert_eq!(stats.medium, 0);
        assert_eq!(stats.low, 0);
        assert_eq!(stats.processed, 0);
        assert!(!engine.queue_snapshot()[0].processed);

        assert!(engine.acknowledge());
        let outcome = engine.complete();
        assert!(matches!(outcome, CompleteOutcome::Completed(_)));

        // The processed item is removed, not kept.
        assert_eq!(engine.stats(), QueueStats::default());
        assert!(engine.is_idle());
    }

    #[test]
    fn test_malformed_change_dropped() {
        let mut engine = NotificationEngine::default();
        let change = ChangeEvent {
            kind: EventKind::Insert,
            before: None,
            after: None,
        };

        assert_eq!(engine.handle_change(change, ts(1_000)), ChangeOutcome::Malformed);
        assert!(engine.is_idle());
    }

    #[test]
    fn test_handle_change_normalizes_and_enqueues() {
        let mut engine = NotificationEngine::default();
        let change = ChangeEvent {
            kind: EventKind::Update,
            before: None,
            after: Some(TransactionRecord {
                id: "tx-7".to_string(),
                amount: dec!(75000),
                is_walk_in: false,
                material: None,
                supplier_ref: None,
                payment_method: None,
                photo_path: None,
            }),
        };

        let outcome = engine.handle_change(change, ts(1_000));
        assert!(matches!(outcome, ChangeOutcome::Accepted { .. }));
        assert_eq!(engine.stats().medium, 1);
    }

    #[test]
    fn test_duplicate_outcome() {
        let mut engine = NotificationEngine::default();
        engine.enqueue(event("tx2", EventKind::Update, dec!(60000)), ts(10_000));
        let outcome = engine.enqueue(event("tx2", EventKind::Update, dec!(60000)), ts(10_200));

        assert_eq!(outcome, ChangeOutcome::Duplicate);
        assert_eq!(engine.stats().total, 1);
    }

    #[test]
    fn test_burst_insert_does_not_steal_modal() {
        let mut engine = NotificationEngine::default();
        engine.enqueue(event("tx-med", EventKind::Update, dec!(60000)), ts(1_000));
        assert_eq!(engine.displayed().unwrap().event.id.as_str(), "tx-med");

        // A higher-priority insert re-sorts the queue but the open modal
        // keeps showing what the operator is looking at.
        engine.enqueue(payment_insert("tx-high", dec!(120000)), ts(2_000));
        assert_eq!(engine.displayed().unwrap().event.id.as_str(), "tx-med");
        assert_eq!(engine.head().unwrap().event.id.as_str(), "tx-high");

        // Completing the displayed one removes it, not the new head.
        let outcome = engine.complete();
        assert!(matches!(outcome, CompleteOutcome::Completed(_)));
        assert_eq!(engine.stats().total, 1);
        assert_eq!(engine.displayed().unwrap().event.id.as_str(), "tx-high");
    }

    #[tokio::test]
    async fn test_skip_leaves_unhandled() {
        let mut engine = NotificationEngine::default();
        engine.enqueue(payment_insert("tx1", dec!(120000)), ts(1_000));

        let accept = CallbackConfirmation::new(|_| true);
        let outcome = engine.skip(&accept).await;
        assert!(matches!(outcome, SkipOutcome::Skipped(_)));

        assert_eq!(engine.workflow_state(), AckState::Idle);
        assert_eq!(engine.stats().unhandled(), 1);

        // The unhandled item resurfaces on the next queue inspection.
        assert!(engine.present_head());
        assert_eq!(engine.displayed().unwrap().event.id.as_str(), "tx1");
    }

    #[test]
    fn test_apply_skip_with_stale_id_is_noop() {
        let mut engine = NotificationEngine::default();
        engine.enqueue(payment_insert("tx1", dec!(120000)), ts(1_000));
        engine.enqueue(event("tx2", EventKind::Delete, dec!(1)), ts(2_000));

        let stale = engine.queue_snapshot()[1].id.clone();
        assert_eq!(engine.apply_skip(&stale), SkipOutcome::NothingDisplayed);
        assert_eq!(engine.workflow_state(), AckState::AwaitingDecision);
    }

    #[test]
    fn test_clear_all_closes_modal() {
        let mut engine = NotificationEngine::default();
        engine.enqueue(payment_insert("tx1", dec!(120000)), ts(1_000));
        engine.enqueue(event("tx2", EventKind::Delete, dec!(1)), ts(2_000));

        engine.clear_all();
        assert!(engine.is_idle());
        assert_eq!(engine.stats(), QueueStats::default());
    }

    #[test]
    fn test_clear_below_keeps_modal_when_displayed_survives() {
        let mut engine = NotificationEngine::default();
        engine.enqueue(payment_insert("tx1", dec!(120000)), ts(1_000));
        engine.enqueue(event("tx2", EventKind::Delete, dec!(1)), ts(2_000));

        let removed = engine.clear_below(Priority::Medium);
        assert_eq!(removed, 1);
        assert_eq!(engine.workflow_state(), AckState::AwaitingDecision);
        assert_eq!(engine.displayed().unwrap().event.id.as_str(), "tx1");
    }

    #[test]
    fn test_clear_below_closes_modal_when_displayed_removed() {
        let mut engine = NotificationEngine::default();
        engine.enqueue(event("tx-low", EventKind::Delete, dec!(1)), ts(1_000));
        assert_eq!(engine.workflow_state(), AckState::AwaitingDecision);

        engine.clear_below(Priority::Medium);
        assert_eq!(engine.workflow_state(), AckState::Idle);
    }

    #[test]
    fn test_navigation_over_buffered_queue() {
        let mut engine = NotificationEngine::default();
        engine.enqueue(payment_insert("tx1", dec!(120000)), ts(1_000));
        engine.enqueue(event("tx2", EventKind::Update, dec!(60000)), ts(2_000));
        engine.enqueue(event("tx3", EventKind::Delete, dec!(1)), ts(3_000));

        // The cursor anchored when the modal opened on the first insert;
        // re-present to snapshot the grown queue.
        engine.present_head();
        assert_eq!(engine.navigator_position().len, 3);

        let pos = engine.next();
        assert_eq!(pos.index, 1);
        assert_eq!(engine.at_cursor().unwrap().event.id.as_str(), "tx2");

        let pos = engine.previous();
        assert_eq!(pos.index, 0);
        assert!(!pos.has_previous);
    }

    #[test]
    fn test_cursor_reanchors_after_complete() {
        let mut engine = NotificationEngine::default();
        engine.enqueue(payment_insert("tx1", dec!(120000)), ts(1_000));
        engine.enqueue(event("tx2", EventKind::Delete, dec!(1)), ts(2_000));
        engine.present_head();
        engine.next();

        engine.acknowledge();
        engine.complete();

        let pos = engine.navigator_position();
        assert_eq!(pos.index, 0);
        assert_eq!(pos.len, 1);
        assert_eq!(engine.at_cursor().unwrap().event.id.as_str(), "tx2");
    }

    #[test]
    fn test_engine_config_serde_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.dedup.window, Duration::from_millis(1000));
    }
}
