//! # Scrapdesk Engine
//!
//! Realtime transaction notification engine for the Scrapdesk scrap-metal
//! operations dashboard.
//!
//! The backing store pushes an unordered, possibly-bursty, possibly
//! re-delivered stream of change events for money-moving transactions.
//! This crate turns that stream into an ordered, deduplicated,
//! priority-ranked queue and drives the operator-facing acknowledgment
//! workflow over it.
//!
//! This crate provides:
//! - Priority classification of change events by kind and amount
//! - Windowed duplicate collapse for feed redeliveries
//! - The priority notification queue with derived statistics
//! - The acknowledgment state machine gating how notifications close
//! - A snapshot cursor for paging through buffered notifications
//! - The change-feed and asset-resolution boundaries
//! - Session wiring: subscription lifecycle, connectivity, debounced
//!   aggregate refresh
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ Change feed │
//! └──────┬──────┘
//!        │ ChangeEvent
//!        ▼
//! ┌─────────────────────────────┐
//! │ NotificationEngine          │
//! │  ┌────────────┐             │
//! │  │ normalize  │             │
//! │  └─────┬──────┘             │
//! │  ┌─────▼──────┐ ┌─────────┐ │
//! │  │ classifier │ │  dedup  │ │
//! │  └─────┬──────┘ └────┬────┘ │
//! │  ┌─────▼─────────────▼────┐ │
//! │  │    priority queue      │ │
//! │  └─────┬──────────────────┘ │
//! │  ┌─────▼──────────────────┐ │
//! │  │ acknowledgment workflow│ │
//! │  └────────────────────────┘ │
//! └─────────────────────────────┘
//!        │ head / stats / cursor
//!        ▼
//!   operator UI
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![cfg_attr(test, allow(clippy::indexing_slicing))]

pub mod assets;
pub mod classifier;
pub mod dedup;
pub mod engine;
pub mod event;
pub mod feed;
pub mod navigator;
pub mod queue;
pub mod session;
pub mod workflow;

pub use assets::{AssetResolver, ResolvedAsset, StaticAssetResolver};
pub use classifier::{ClassifierConfig, EventClassifier, Priority};
pub use dedup::DedupPolicy;
pub use engine::{ChangeOutcome, EngineConfig, NotificationEngine};
pub use event::{EventKind, NotificationId, TransactionEvent};
pub use feed::{
    ChangeEvent, ChangeFeed, FeedError, FeedMessage, FeedSubscription, InMemoryChangeFeed,
    SubscriptionId, TransactionRecord,
};
pub use navigator::{NavigatorPosition, SessionNavigator};
pub use queue::{InsertOutcome, NotificationQueue, QueueStats, QueuedNotification};
pub use session::{AggregateRefresh, NotificationSession, SessionConfig};
pub use workflow::{
    AckState, AcknowledgmentWorkflow, CallbackConfirmation, CompleteOutcome, SkipConfirmation,
    SkipOutcome,
};
