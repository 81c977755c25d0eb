//! Per-session allowance for asset generation.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Counts asset generations against a fixed limit.
///
/// Each session owns one, so one user's usage never affects another's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetQuota {
    limit: u32,
    used: u32,
}

impl AssetQuota {
    /// Create a quota allowing `limit` generations.
    pub fn new(limit: u32) -> Self {
        Self { limit, used: 0 }
    }

    /// Consume one generation, or fail if none remain.
    pub fn try_acquire(&mut self) -> Result<()> {
        if self.used >= self.limit {
            return Err(Error::QuotaExceeded {
                used: self.used,
                limit: self.limit,
            });
        }
        self.used += 1;
        Ok(())
    }

    /// Give back a generation that was acquired but never ran.
    pub fn release(&mut self) {
        self.used = self.used.saturating_sub(1);
    }

    /// Generations still available.
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    /// Generations consumed so far.
    pub fn used(&self) -> u32 {
        self.used
    }

    /// Total generations allowed.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Whether no generations remain.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}
