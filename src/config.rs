//! Engine configuration.
//!
//! Venue assumptions live here as named options, not constants buried in
//! the evaluation code. Invalid combinations fail loudly before any
//! computation starts; data-level defects never do.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Gap between trading close and settlement observed on Kalshi 15-minute
/// BTC markets. `secs_left` counts down to settlement, so trading stops
/// while the countdown still reads this many seconds.
pub const DEFAULT_CLOSE_OFFSET_SECS: i64 = 294;

/// Default acceptance window around a target `secs_left` when picking an
/// entry tick from an irregularly sampled timeline.
pub const DEFAULT_TICK_TOLERANCE_SECS: i64 = 30;

/// Default minimum trade count for a grid cell to appear in rankings.
pub const DEFAULT_MIN_SAMPLE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds still on the settlement countdown when trading closes.
    pub close_offset_secs: i64,
    /// Maximum distance (seconds) between a target time and the accepted
    /// entry tick.
    pub tick_tolerance_secs: i64,
    /// Cells with fewer trades than this are excluded from "best" rankings
    /// but still reported.
    pub min_sample_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            close_offset_secs: DEFAULT_CLOSE_OFFSET_SECS,
            tick_tolerance_secs: DEFAULT_TICK_TOLERANCE_SECS,
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
        }
    }
}

impl EngineConfig {
    /// Reject caller mistakes before any market is touched.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.close_offset_secs > 0,
            "close_offset_secs must be positive, got {}",
            self.close_offset_secs
        );
        ensure!(
            self.tick_tolerance_secs >= 0,
            "tick_tolerance_secs must be non-negative, got {}",
            self.tick_tolerance_secs
        );
        Ok(())
    }

    /// Countdown value corresponding to `secs_before_close` seconds before
    /// trading close.
    pub fn target_secs_left(&self, secs_before_close: i64) -> i64 {
        self.close_offset_secs + secs_before_close
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_close_offset_rejected() {
        let cfg = EngineConfig {
            close_offset_secs: 0,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let cfg = EngineConfig {
            tick_tolerance_secs: -1,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_target_secs_left() {
        let cfg = EngineConfig::default();
        // 7 minutes before close on the reference venue.
        assert_eq!(cfg.target_secs_left(7 * 60), 714);
    }
}
