//! Dashboard session lifecycle.
//!
//! A [`NotificationSession`] ties one engine instance to a live change
//! feed: it subscribes on start, runs a worker that folds feed messages
//! into the engine, debounces aggregate refreshes, and releases the
//! subscription on close. UI-facing reads and operator actions are
//! delegated to the engine under a single lock, so every caller observes
//! queue, stats, and workflow state from the same version.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use scrapdesk_core::types::Timestamp;

use crate::classifier::Priority;
use crate::engine::{ChangeOutcome, EngineConfig, NotificationEngine};
use crate::feed::{ChangeFeed, FeedError, FeedMessage, SubscriptionId};
use crate::navigator::NavigatorPosition;
use crate::queue::{QueueStats, QueuedNotification};
use crate::workflow::{AckState, CompleteOutcome, SkipConfirmation, SkipOutcome};

/// External dashboard-aggregate recomputation collaborator.
///
/// Invoked at most once per debounce window no matter how many
/// notifications arrived within it.
#[async_trait]
pub trait AggregateRefresh: Send + Sync {
    /// Recomputes the dashboard aggregates.
    async fn refresh_aggregates(&self);
}

fn default_channel() -> String {
    "transaction-changes".to_string()
}

fn default_table() -> String {
    "transactions".to_string()
}

fn default_event_filter() -> String {
    "*".to_string()
}

fn default_refresh_debounce() -> Duration {
    Duration::from_secs(1)
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Feed channel to subscribe on.
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Table whose changes drive the session.
    #[serde(default = "default_table")]
    pub table: String,

    /// Event filter, with `"*"` meaning all event kinds.
    #[serde(default = "default_event_filter")]
    pub event_filter: String,

    /// Quiet period before a burst of accepted notifications triggers
    /// one aggregate refresh.
    #[serde(with = "humantime_serde", default = "default_refresh_debounce")]
    pub refresh_debounce: Duration,

    /// Engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            table: default_table(),
            event_filter: default_event_filter(),
            refresh_debounce: default_refresh_debounce(),
            engine: EngineConfig::default(),
        }
    }
}

/// A running dashboard session.
pub struct NotificationSession {
    engine: Arc<RwLock<NotificationEngine>>,
    feed: Arc<dyn ChangeFeed>,
    refresh: Arc<dyn AggregateRefresh>,
    subscription_id: SubscriptionId,
    connected: Arc<AtomicBool>,
    stop: oneshot::Sender<()>,
    worker: JoinHandle<()>,
}

impl NotificationSession {
    /// Subscribes to the change feed and starts the session worker.
    pub async fn start(
        config: SessionConfig,
        feed: Arc<dyn ChangeFeed>,
        refresh: Arc<dyn AggregateRefresh>,
    ) -> Result<Self, FeedError> {
        let subscription = feed
            .subscribe(&config.channel, &config.table, &config.event_filter)
            .await?;
        let subscription_id = subscription.id;

        let engine = Arc::new(RwLock::new(NotificationEngine::new(config.engine.clone())));
        let connected = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = oneshot::channel();

        let worker = tokio::spawn(run_worker(
            Arc::clone(&engine),
            subscription.receiver,
            Arc::clone(&refresh),
            Arc::clone(&connected),
            config.refresh_debounce,
            stop_rx,
        ));

        info!(subscription_id = %subscription_id, channel = %config.channel, "session started");

        Ok(Self {
            engine,
            feed,
            refresh,
            subscription_id,
            connected,
            stop: stop_tx,
            worker,
        })
    }

    /// Stops the worker and releases the feed subscription.
    pub async fn close(self) -> Result<(), FeedError> {
        // The worker may already have exited (feed closed); a failed send
        // is fine.
        let _ = self.stop.send(());
        if let Err(e) = self.worker.await {
            warn!(error = %e, "session worker terminated abnormally");
        }
        info!(subscription_id = %self.subscription_id, "session closed");
        self.feed.unsubscribe(self.subscription_id).await
    }

    /// Returns the feed subscription id.
    #[must_use]
    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Returns the last known feed connectivity.
    ///
    /// Purely informational; the feed collaborator owns reconnection and
    /// the session keeps serving its buffered state while offline.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Returns the currently displayed notification, if any.
    #[must_use]
    pub fn displayed(&self) -> Option<QueuedNotification> {
        self.engine.read().displayed()
    }

    /// Returns the observable workflow state.
    #[must_use]
    pub fn workflow_state(&self) -> AckState {
        self.engine.read().workflow_state()
    }

    /// Returns statistics derived from the current queue contents.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.engine.read().stats()
    }

    /// Returns a consistent snapshot of the full ordered queue.
    #[must_use]
    pub fn queue_snapshot(&self) -> Vec<QueuedNotification> {
        self.engine.read().queue_snapshot()
    }

    /// Opens the modal on the current head, if any.
    pub fn present_head(&self) -> bool {
        self.engine.write().present_head()
    }

    /// Records the operator ticking the acknowledgment confirmation.
    pub fn acknowledge(&self) -> bool {
        self.engine.write().acknowledge()
    }

    /// Completes the displayed notification.
    pub fn complete(&self) -> CompleteOutcome {
        self.engine.write().complete()
    }

    /// Skips the displayed notification, consulting the confirmation
    /// collaborator when the acknowledgment gate applies.
    ///
    /// The confirmation is awaited without holding the engine lock; the
    /// skip is then re-validated against the displayed id, so a queue
    /// that moved on while the operator deliberated yields
    /// [`SkipOutcome::NothingDisplayed`] instead of closing the wrong
    /// notification.
    pub async fn skip(&self, confirmation: &dyn SkipConfirmation) -> SkipOutcome {
        let (id, gate) = {
            let engine = self.engine.read();
            let Some(displayed) = engine.displayed() else {
                return SkipOutcome::NothingDisplayed;
            };
            (displayed.id, engine.skip_requirement())
        };

        if let Some(notification) = gate {
            if !confirmation.confirm_skip(&notification).await {
                debug!(notification = %id, "skip declined by operator");
                return SkipOutcome::Declined;
            }
        }
        self.engine.write().apply_skip(&id)
    }

    /// Empties the queue and closes any open modal.
    pub fn clear_all(&self) {
        self.engine.write().clear_all();
    }

    /// Removes all notifications strictly below the given priority.
    pub fn clear_below(&self, floor: Priority) -> usize {
        self.engine.write().clear_below(floor)
    }

    /// Moves the navigator cursor forward.
    pub fn next(&self) -> NavigatorPosition {
        self.engine.write().next()
    }

    /// Moves the navigator cursor backward.
    pub fn previous(&self) -> NavigatorPosition {
        self.engine.write().previous()
    }

    /// Returns the notification under the navigator cursor.
    #[must_use]
    pub fn at_cursor(&self) -> Option<QueuedNotification> {
        self.engine.read().at_cursor()
    }

    /// Returns the navigator position and bounds.
    #[must_use]
    pub fn navigator_position(&self) -> NavigatorPosition {
        self.engine.read().navigator_position()
    }

    /// Triggers an aggregate refresh immediately, outside the debounce
    /// window. Used by pull-to-refresh style UI affordances.
    pub async fn refresh_now(&self) {
        self.refresh.refresh_aggregates().await;
    }
}

async fn run_worker(
    engine: Arc<RwLock<NotificationEngine>>,
    mut receiver: mpsc::Receiver<FeedMessage>,
    refresh: Arc<dyn AggregateRefresh>,
    connected: Arc<AtomicBool>,
    debounce: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut refresh_deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = &mut stop => {
                // Session teardown cancels a pending refresh outright; no
                // callbacks may fire into a torn-down session.
                refresh_deadline = None;
                debug!("session worker stopping");
                break;
            }

            message = receiver.recv() => match message {
                Some(FeedMessage::Change(change)) => {
                    let outcome = engine.write().handle_change(change, Timestamp::now());
                    // One armed deadline covers the whole burst; later
                    // accepts within the window do not push it out.
                    if matches!(outcome, ChangeOutcome::Accepted { .. })
                        && refresh_deadline.is_none()
                    {
                        refresh_deadline = Some(Instant::now() + debounce);
                    }
                }
                Some(FeedMessage::Connectivity(up)) => {
                    if up {
                        info!("change feed connectivity restored");
                    } else {
                        warn!("change feed connectivity lost");
                    }
                    connected.store(up, Ordering::Relaxed);
                }
                None => {
                    warn!("change feed closed, session worker exiting");
                    connected.store(false, Ordering::Relaxed);
                    break;
                }
            },

            () = async {
                match refresh_deadline {
                    Some(deadline) => time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            } => {
                refresh_deadline = None;
                debug!("debounced aggregate refresh firing");
                refresh.refresh_aggregates().await;
            }
        }
    }

    // Reached with a pending deadline only when the feed closed under a
    // still-live session; flush the refresh the burst earned.
    if refresh_deadline.is_some() {
        refresh.refresh_aggregates().await;
    }
}
