//! Acknowledgment workflow state machine.
//!
//! One notification is displayed at a time. How it may be dismissed
//! depends on the event: new payment-bearing transactions are gated on an
//! explicit operator confirmation that the real-world action (cash paid
//! to the supplier) happened; everything else closes freely.
//!
//! The machine is driven by discrete operator actions and never performs
//! I/O itself; the one asynchronous edge, skipping an unacknowledged
//! payment, calls out to an injected [`SkipConfirmation`] collaborator.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::event::NotificationId;
use crate::queue::{NotificationQueue, QueuedNotification};

/// Observable state of the acknowledgment workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckState {
    /// No notification is displayed.
    Idle,
    /// A notification is shown; the operator has not confirmed yet.
    AwaitingDecision,
    /// The operator ticked the confirmation on a gated notification.
    ReadyToComplete,
    /// A completion transition is in progress.
    Completing,
    /// Terminal state for the displayed notification instance. The
    /// workflow moves straight on to the next head (or `Idle`) when a
    /// notification closes, so observers only ever see this state in a
    /// serialized transition record, never from [`AcknowledgmentWorkflow::state`].
    Closed,
}

impl AckState {
    /// Returns the state as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingDecision => "awaiting_decision",
            Self::ReadyToComplete => "ready_to_complete",
            Self::Completing => "completing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for AckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operator-facing confirmation capability for skipping an
/// unacknowledged payment notification.
///
/// Resolving to `true` allows the skip; `false` leaves the workflow
/// untouched. Implementations typically show an "are you sure you want
/// to skip an unacknowledged payment?" prompt.
#[async_trait]
pub trait SkipConfirmation: Send + Sync {
    /// Asks the operator to confirm the skip.
    async fn confirm_skip(&self, notification: &QueuedNotification) -> bool;
}

/// Confirmation backed by a synchronous callback. Useful for tests and
/// for hosts whose dialog machinery is not async.
pub struct CallbackConfirmation {
    callback: Box<dyn Fn(&QueuedNotification) -> bool + Send + Sync>,
}

impl CallbackConfirmation {
    /// Creates a new callback confirmation.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&QueuedNotification) -> bool + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl SkipConfirmation for CallbackConfirmation {
    async fn confirm_skip(&self, notification: &QueuedNotification) -> bool {
        (self.callback)(notification)
    }
}

/// Result of a completion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// The notification was processed and removed from the queue.
    Completed(NotificationId),
    /// The completion was not allowed; state is unchanged. This happens
    /// when nothing is displayed or when a gated notification has not
    /// been acknowledged yet.
    Rejected,
}

/// Result of a skip attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipOutcome {
    /// The modal closed; the notification stays queued with
    /// `processed = false` and resurfaces in the unhandled count.
    Skipped(NotificationId),
    /// The operator declined the confirmation; state is unchanged.
    Declined,
    /// Nothing was displayed.
    NothingDisplayed,
}

#[derive(Debug, Clone)]
struct ActiveAcknowledgment {
    notification: QueuedNotification,
    state: AckState,
    acknowledged: bool,
}

/// Per-notification state machine gating how a displayed notification
/// may be dismissed.
#[derive(Debug, Default)]
pub struct AcknowledgmentWorkflow {
    active: Option<ActiveAcknowledgment>,
}

impl AcknowledgmentWorkflow {
    /// Creates an idle workflow.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the observable state.
    #[must_use]
    pub fn state(&self) -> AckState {
        self.active.as_ref().map_or(AckState::Idle, |a| a.state)
    }

    /// Returns the currently displayed notification, if any.
    #[must_use]
    pub fn displayed(&self) -> Option<&QueuedNotification> {
        self.active.as_ref().map(|a| &a.notification)
    }

    /// Returns true if the displayed notification has been acknowledged.
    #[must_use]
    pub fn acknowledged(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.acknowledged)
    }

    /// Starts displaying the queue head.
    ///
    /// With an empty queue this resets to `Idle` instead of failing;
    /// a missing head is an ignorable condition, never fatal to the
    /// session. Returns true when a notification is now displayed.
    pub fn present_head(&mut self, queue: &NotificationQueue) -> bool {
        match queue.front() {
            Some(head) => {
                debug!(notification = %head.id, "presenting notification");
                self.active = Some(ActiveAcknowledgment {
                    notification: head.clone(),
                    state: AckState::AwaitingDecision,
                    acknowledged: false,
                });
                true
            }
            None => {
                self.active = None;
                false
            }
        }
    }

    /// Records the operator ticking the confirmation checkbox.
    ///
    /// Only meaningful for gated notifications in `AwaitingDecision`;
    /// everything else is a no-op. Returns true when the state advanced
    /// to `ReadyToComplete`.
    pub fn acknowledge(&mut self) -> bool {
        let Some(active) = &mut self.active else {
            return false;
        };
        if active.state != AckState::AwaitingDecision
            || !active.notification.requires_acknowledgment()
        {
            return false;
        }
        active.acknowledged = true;
        active.state = AckState::ReadyToComplete;
        debug!(notification = %active.notification.id, "acknowledgment ticked");
        true
    }

    /// Completes the displayed notification.
    ///
    /// Gated notifications must be in `ReadyToComplete`; ungated ones
    /// complete straight from `AwaitingDecision`. On success the
    /// notification is marked processed, removed from the queue, and the
    /// workflow re-enters `AwaitingDecision` with the new head or `Idle`
    /// when the queue drained.
    pub fn complete(&mut self, queue: &mut NotificationQueue) -> CompleteOutcome {
        let Some(active) = &mut self.active else {
            return CompleteOutcome::Rejected;
        };

        let gated = active.notification.requires_acknowledgment();
        let allowed = if gated {
            active.state == AckState::ReadyToComplete
        } else {
            active.state == AckState::AwaitingDecision
        };
        if !allowed {
            warn!(
                notification = %active.notification.id,
                state = %active.state,
                "completion attempted before acknowledgment"
            );
            return CompleteOutcome::Rejected;
        }

        active.state = AckState::Completing;
        let id = active.notification.id.clone();

        // The displayed entry may no longer be the head if a burst insert
        // re-sorted the queue under the open modal, so remove by id. It
        // may even be gone entirely (bulk clear); tolerated as a no-op.
        queue.mark_processed(&id);
        queue.remove(&id);
        self.active = None;

        info!(notification = %id, "notification completed");

        if !queue.is_empty() {
            self.present_head(queue);
        }
        CompleteOutcome::Completed(id)
    }

    /// Returns the displayed notification when skipping it requires an
    /// operator confirmation (gated and not acknowledged).
    #[must_use]
    pub fn skip_requirement(&self) -> Option<&QueuedNotification> {
        let active = self.active.as_ref()?;
        if active.notification.requires_acknowledgment() && !active.acknowledged {
            Some(&active.notification)
        } else {
            None
        }
    }

    /// Closes the displayed notification without processing it, provided
    /// the displayed id still matches.
    ///
    /// The notification stays in the queue with `processed = false` so it
    /// resurfaces as unhandled. The workflow goes `Idle`; it does not
    /// immediately re-present the head, which would re-show the item the
    /// operator just skipped.
    pub fn close_skipped(&mut self, id: &NotificationId) -> SkipOutcome {
        match &self.active {
            Some(active) if &active.notification.id == id => {
                info!(notification = %id, "notification skipped without processing");
                self.active = None;
                SkipOutcome::Skipped(id.clone())
            }
            _ => SkipOutcome::NothingDisplayed,
        }
    }

    /// Skips the displayed notification, asking for confirmation when
    /// the acknowledgment gate applies.
    pub async fn skip(&mut self, confirmation: &dyn SkipConfirmation) -> SkipOutcome {
        let Some(active) = &self.active else {
            return SkipOutcome::NothingDisplayed;
        };
        let id = active.notification.id.clone();

        if active.notification.requires_acknowledgment() && !active.acknowledged {
            let accepted = confirmation.confirm_skip(&active.notification).await;
            if !accepted {
                debug!(notification = %id, "skip declined by operator");
                return SkipOutcome::Declined;
            }
        }
        self.close_skipped(&id)
    }

    /// Drops the displayed notification without closing it through the
    /// state machine. Used when the notification was removed underneath
    /// the modal (bulk clear, session teardown).
    pub fn abandon(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(notification = %active.notification.id, "displayed notification abandoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use scrapdesk_core::types::{Amount, Timestamp, TransactionId};

    use crate::event::{EventKind, TransactionEvent};
    use crate::queue::InsertOutcome;

    fn payment_insert(id: &str) -> TransactionEvent {
        TransactionEvent::new(
            TransactionId::new(id).unwrap(),
            EventKind::Insert,
            Amount::new(dec!(120000)).unwrap(),
        )
        .with_payment_method("cash")
    }

    fn delete_event(id: &str) -> TransactionEvent {
        TransactionEvent::new(
            TransactionId::new(id).unwrap(),
            EventKind::Delete,
            Amount::ZERO,
        )
    }

    fn ts(millis: i64) -> Timestamp {
        Timestamp::new(millis).unwrap()
    }

    fn queue_with(events: Vec<TransactionEvent>) -> NotificationQueue {
        let mut queue = NotificationQueue::default();
        for (i, event) in events.into_iter().enumerate() {
            let outcome = queue.insert(event, ts(1_000 + (i as i64) * 2_000));
            assert!(matches!(outcome, InsertOutcome::Inserted { .. }));
        }
        queue
    }

    #[test]
    fn test_idle_until_presented() {
        let workflow = AcknowledgmentWorkflow::new();
        assert_eq!(workflow.state(), AckState::Idle);
        assert!(workflow.displayed().is_none());
    }

    #[test]
    fn test_present_head_on_empty_queue_stays_idle() {
        let queue = NotificationQueue::default();
        let mut workflow = AcknowledgmentWorkflow::new();
        assert!(!workflow.present_head(&queue));
        assert_eq!(workflow.state(), AckState::Idle);
    }

    #[test]
    fn test_gate_rejects_complete_before_acknowledge() {
        let mut queue = queue_with(vec![payment_insert("tx-1")]);
        let mut workflow = AcknowledgmentWorkflow::new();
        workflow.present_head(&queue);

        assert_eq!(workflow.complete(&mut queue), CompleteOutcome::Rejected);
        assert_eq!(workflow.state(), AckState::AwaitingDecision);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_acknowledge_then_complete_removes_processed() {
        let mut queue = queue_with(vec![payment_insert("tx-1")]);
        let mut workflow = AcknowledgmentWorkflow::new();
        workflow.present_head(&queue);

        assert!(workflow.acknowledge());
        assert_eq!(workflow.state(), AckState::ReadyToComplete);

        let outcome = workflow.complete(&mut queue);
        assert!(matches!(outcome, CompleteOutcome::Completed(_)));
        assert!(queue.is_empty());
        assert_eq!(workflow.state(), AckState::Idle);
    }

    #[test]
    fn test_complete_advances_to_next_head() {
        let mut queue = queue_with(vec![payment_insert("tx-1"), delete_event("tx-2")]);
        let mut workflow = AcknowledgmentWorkflow::new();
        workflow.present_head(&queue);

        workflow.acknowledge();
        workflow.complete(&mut queue);

        assert_eq!(workflow.state(), AckState::AwaitingDecision);
        assert_eq!(
            workflow.displayed().unwrap().event.id.as_str(),
            "tx-2"
        );
    }

    #[test]
    fn test_ungated_completes_without_acknowledge() {
        let mut queue = queue_with(vec![delete_event("tx-1")]);
        let mut workflow = AcknowledgmentWorkflow::new();
        workflow.present_head(&queue);

        // Ticking has no effect on an ungated notification.
        assert!(!workflow.acknowledge());
        assert_eq!(workflow.state(), AckState::AwaitingDecision);

        let outcome = workflow.complete(&mut queue);
        assert!(matches!(outcome, CompleteOutcome::Completed(_)));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_skip_gated_declined_keeps_state() {
        let queue = queue_with(vec![payment_insert("tx-1")]);
        let mut workflow = AcknowledgmentWorkflow::new();
        workflow.present_head(&queue);

        let decline = CallbackConfirmation::new(|_| false);
        assert_eq!(workflow.skip(&decline).await, SkipOutcome::Declined);
        assert_eq!(workflow.state(), AckState::AwaitingDecision);
        assert_eq!(queue.len(), 1);
        assert!(!queue.front().unwrap().processed);
    }

    #[tokio::test]
    async fn test_skip_gated_accepted_leaves_item_queued() {
        let queue = queue_with(vec![payment_insert("tx-1")]);
        let mut workflow = AcknowledgmentWorkflow::new();
        workflow.present_head(&queue);

        let accept = CallbackConfirmation::new(|_| true);
        let outcome = workflow.skip(&accept).await;
        assert!(matches!(outcome, SkipOutcome::Skipped(_)));
        assert_eq!(workflow.state(), AckState::Idle);

        // The item stays queued and unprocessed.
        assert_eq!(queue.len(), 1);
        assert!(!queue.front().unwrap().processed);
        assert_eq!(queue.stats().unhandled(), 1);
    }

    #[tokio::test]
    async fn test_skip_ungated_closes_without_confirmation() {
        let queue = queue_with(vec![delete_event("tx-1")]);
        let mut workflow = AcknowledgmentWorkflow::new();
        workflow.present_head(&queue);

        // The confirmation collaborator must not be consulted.
        let explode = CallbackConfirmation::new(|_| panic!("confirmation must not run"));
        let outcome = workflow.skip(&explode).await;
        assert!(matches!(outcome, SkipOutcome::Skipped(_)));
    }

    #[tokio::test]
    async fn test_skip_after_acknowledge_needs_no_confirmation() {
        let queue = queue_with(vec![payment_insert("tx-1")]);
        let mut workflow = AcknowledgmentWorkflow::new();
        workflow.present_head(&queue);
        workflow.acknowledge();

        let explode = CallbackConfirmation::new(|_| panic!("confirmation must not run"));
        let outcome = workflow.skip(&explode).await;
        assert!(matches!(outcome, SkipOutcome::Skipped(_)));
    }

    #[test]
    fn test_skip_requirement_only_for_unacknowledged_gated() {
        let queue = queue_with(vec![payment_insert("tx-1")]);
        let mut workflow = AcknowledgmentWorkflow::new();

        assert!(workflow.skip_requirement().is_none());

        workflow.present_head(&queue);
        assert!(workflow.skip_requirement().is_some());

        workflow.acknowledge();
        assert!(workflow.skip_requirement().is_none());
    }

    #[test]
    fn test_close_skipped_stale_id_is_noop() {
        let queue = queue_with(vec![payment_insert("tx-1"), delete_event("tx-2")]);
        let mut workflow = AcknowledgmentWorkflow::new();
        workflow.present_head(&queue);

        let stale = queue.items()[1].id.clone();
        assert_eq!(workflow.close_skipped(&stale), SkipOutcome::NothingDisplayed);
        assert_eq!(workflow.state(), AckState::AwaitingDecision);
    }

    #[test]
    fn test_abandon_resets_to_idle() {
        let queue = queue_with(vec![payment_insert("tx-1")]);
        let mut workflow = AcknowledgmentWorkflow::new();
        workflow.present_head(&queue);

        workflow.abandon();
        assert_eq!(workflow.state(), AckState::Idle);
    }
}
