//! Priority classification for incoming transaction events.
//!
//! Every change event is assigned a priority tier before it enters the
//! queue. Classification is a total, pure function of the event kind and
//! its monetary magnitude.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use scrapdesk_core::types::Amount;

use crate::event::{EventKind, TransactionEvent};

/// Priority tier of a queued notification.
///
/// Tiers are totally ordered: `Low < Medium < High`. The queue sorts by
/// descending priority.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Informational; no operator action expected.
    Low,
    /// Worth attention soon.
    Medium,
    /// An operator must act on this.
    High,
}

impl Priority {
    /// Returns the priority as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifier configuration.
///
/// The amount thresholds are expressed in the deployment's currency unit
/// and are configuration, not constants. Defaults: updates above 100 000
/// are High, above 50 000 Medium, otherwise Low.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Updates with an amount strictly above this threshold are High.
    #[serde(default = "default_high_amount_threshold")]
    pub high_amount_threshold: Amount,
    /// Updates with an amount strictly above this threshold (and at or
    /// below the high threshold) are Medium.
    #[serde(default = "default_medium_amount_threshold")]
    pub medium_amount_threshold: Amount,
}

fn default_high_amount_threshold() -> Amount {
    Amount::new_unchecked(Decimal::from(100_000))
}

fn default_medium_amount_threshold() -> Amount {
    Amount::new_unchecked(Decimal::from(50_000))
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            high_amount_threshold: default_high_amount_threshold(),
            medium_amount_threshold: default_medium_amount_threshold(),
        }
    }
}

/// Assigns a priority tier to incoming change events.
#[derive(Debug, Clone, Default)]
pub struct EventClassifier {
    config: ClassifierConfig,
}

impl EventClassifier {
    /// Creates a new classifier with the given configuration.
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classifies a change event.
    ///
    /// - `Insert` is always High: a new money-moving transaction requires
    ///   operator action.
    /// - `Delete` is always Low: informational only.
    /// - `Update` is tiered by amount against the configured thresholds.
    #[must_use]
    pub fn classify(&self, event: &TransactionEvent) -> Priority {
        match event.kind {
            EventKind::Insert => Priority::High,
            EventKind::Delete => Priority::Low,
            EventKind::Update => {
                if event.amount > self.config.high_amount_threshold {
                    Priority::High
                } else if event.amount > self.config.medium_amount_threshold {
                    Priority::Medium
                } else {
                    Priority::Low
                }
            }
        }
    }
}
