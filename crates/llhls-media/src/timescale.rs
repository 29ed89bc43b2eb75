//! Tick-rate conversion.
//!
//! Packet times arrive in the tick rate of whatever produced them. Box fields
//! are written in the track's own timescale, so every timestamp passes through
//! a [`TimeConverter`] first.

use crate::{Error, Result};
use std::time::Duration;

/// Rescales timestamps from a source tick rate to a track timescale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeConverter {
    source: u32,
    target: u32,
}

impl TimeConverter {
    /// Create a converter from `source` ticks per second to `target` ticks per second.
    pub fn new(source: u32, target: u32) -> Result<Self> {
        if source == 0 {
            return Err(Error::InvalidTimescale(source));
        }
        if target == 0 {
            return Err(Error::InvalidTimescale(target));
        }
        Ok(Self { source, target })
    }

    /// Source ticks per second.
    pub fn source(&self) -> u32 {
        self.source
    }

    /// Target ticks per second.
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Convert an absolute time into target ticks.
    ///
    /// Rounds down, so `t1 <= t2` always gives `to_scale(t1) <= to_scale(t2)`
    /// and durations derived from consecutive times are never negative.
    pub fn to_scale(&self, t: u64) -> u64 {
        let scaled = t as u128 * self.target as u128 / self.source as u128;
        scaled.min(u64::MAX as u128) as u64
    }

    /// Convert a signed offset into target ticks.
    ///
    /// Rounds toward zero so that `relative(-x) == -relative(x)`. Results
    /// outside the 32-bit range of a run entry saturate.
    pub fn relative(&self, offset: i64) -> i32 {
        let scaled = offset as i128 * self.target as i128 / self.source as i128;
        scaled.clamp(i32::MIN as i128, i32::MAX as i128) as i32
    }
}

/// Convert a tick count in `timescale` into a wall-clock duration.
pub fn ticks_to_duration(ticks: u64, timescale: u32) -> Duration {
    if timescale == 0 {
        return Duration::ZERO;
    }
    let nanos = ticks as u128 * 1_000_000_000 / timescale as u128;
    Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
}
