//! Turn configuration and builder.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use libmaya::config::TurnConfig;
//!
//! let config = TurnConfig::builder()
//!     .section_threshold(120)
//!     .timeout(Duration::from_secs(90))
//!     .emit_status(false)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.section_threshold(), 120);
//! ```

use std::time::Duration;

use crate::stream::DEFAULT_SECTION_THRESHOLD;
use crate::{Error, Result};

/// Default capacity of the per-turn event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Default number of asset generations allowed per session.
pub const DEFAULT_ASSET_GENERATIONS: u32 = 1;

/// Configuration for generation turns.
///
/// Use [`TurnConfig::builder()`] to create a new configuration.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    pub(crate) section_threshold: usize,
    pub(crate) channel_capacity: usize,
    pub(crate) timeout: Option<Duration>,
    pub(crate) emit_status: bool,
    pub(crate) asset_generations_per_session: u32,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            section_threshold: DEFAULT_SECTION_THRESHOLD,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            timeout: None,
            emit_status: true,
            asset_generations_per_session: DEFAULT_ASSET_GENERATIONS,
        }
    }
}

impl TurnConfig {
    /// Create a new builder for TurnConfig.
    pub fn builder() -> TurnConfigBuilder {
        TurnConfigBuilder::default()
    }

    /// Growth in characters that triggers a batched features/suggestions event.
    pub fn section_threshold(&self) -> usize {
        self.section_threshold
    }

    /// Capacity of the bounded event channel.
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Get the timeout if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether the driver emits `thinking`/`generating` status events.
    pub fn emit_status(&self) -> bool {
        self.emit_status
    }

    /// Asset generations each session may run.
    pub fn asset_generations_per_session(&self) -> u32 {
        self.asset_generations_per_session
    }
}

/// Builder for [`TurnConfig`].
///
/// Values are validated when [`build()`](TurnConfigBuilder::build) is called.
#[derive(Debug, Clone, Default)]
pub struct TurnConfigBuilder {
    config: TurnConfig,
}

impl TurnConfigBuilder {
    // -------------------------------------------------------------------------
    // Parsing
    // -------------------------------------------------------------------------

    /// Set the batching threshold for features and suggestions.
    pub fn section_threshold(mut self, chars: usize) -> Self {
        self.config.section_threshold = chars;
        self
    }

    // -------------------------------------------------------------------------
    // Streaming
    // -------------------------------------------------------------------------

    /// Set the capacity of the event channel between driver and consumer.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Fail a turn when the upstream source stays silent this long.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.config.timeout = Some(duration);
        self
    }

    /// Emit lifecycle status events (default: true).
    pub fn emit_status(mut self, emit: bool) -> Self {
        self.config.emit_status = emit;
        self
    }

    // -------------------------------------------------------------------------
    // Sessions
    // -------------------------------------------------------------------------

    /// Set how many asset generations each session may run.
    pub fn asset_generations_per_session(mut self, limit: u32) -> Self {
        self.config.asset_generations_per_session = limit;
        self
    }

    // -------------------------------------------------------------------------
    // Build
    // -------------------------------------------------------------------------

    /// Build the configuration.
    ///
    /// This validates:
    /// - The section threshold is positive
    /// - The channel capacity is positive
    /// - The timeout, if set, is non-zero
    pub fn build(self) -> Result<TurnConfig> {
        if self.config.section_threshold == 0 {
            return Err(Error::InvalidConfig(
                "section_threshold must be positive".into(),
            ));
        }

        if self.config.channel_capacity == 0 {
            return Err(Error::InvalidConfig(
                "channel_capacity must be positive".into(),
            ));
        }

        if self.config.timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidConfig("timeout must be non-zero".into()));
        }

        Ok(self.config)
    }
}
