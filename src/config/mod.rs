//! Configuration for generation turns and sessions.
//!
//! This module provides:
//!
//! - [`TurnConfig`] and [`TurnConfigBuilder`] for tuning the parser and driver
//! - [`SessionId`], a newtype over session identifiers
//! - [`InstructionVariant`], the instruction set chosen for a request
//!
//! # Example
//!
//! ```
//! use libmaya::config::{SessionId, TurnConfig};
//!
//! let config = TurnConfig::builder()
//!     .asset_generations_per_session(2)
//!     .build()
//!     .unwrap();
//! let session = SessionId::generate();
//! # let _ = (config, session);
//! ```

pub mod builder;
pub mod options;

pub use builder::{TurnConfig, TurnConfigBuilder, DEFAULT_ASSET_GENERATIONS, DEFAULT_CHANNEL_CAPACITY};
pub use options::{InstructionVariant, SessionId};
