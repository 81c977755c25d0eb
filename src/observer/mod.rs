//! Observation of events as a turn produces them.
//!
//! This module provides the [`EventObserver`] trait for watching every
//! event the turn driver emits, plus the outcome of each turn. Observers
//! see events before the consumer of the stream does and cannot alter
//! them.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use libmaya::protocol::GameEvent;
//! use libmaya::EventObserver;
//!
//! #[derive(Default)]
//! struct CodeCounter(AtomicUsize);
//!
//! impl EventObserver for CodeCounter {
//!     fn on_event(&self, event: &GameEvent) {
//!         if event.as_code().is_some() {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//! }
//! ```

mod observer;

pub use observer::{EventObserver, LogLevel, LoggingObserver};
