//! # Scrapdesk Core
//!
//! Core types for the Scrapdesk scrap-metal operations dashboard.
//!
//! This crate provides:
//! - `NewType` wrappers for the primitives the notification engine moves
//!   around (`Amount`, `Timestamp`, `TransactionId`)
//! - Validation errors for constructing those types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

/// Core type definitions and `NewType` wrappers
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::types::*;
}
