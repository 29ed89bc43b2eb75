//! Error types for llhls-media.

use std::io;
use thiserror::Error;

/// Result type for llhls-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for llhls-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from a backing store or an output sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The segment's backing store has been released.
    #[error("Segment storage has been released")]
    Released,

    /// A part was appended to a segment that is already final.
    #[error("Segment is finalized")]
    Finalized,

    /// A read extends past the committed bytes of a segment.
    #[error("Read out of range: {len} bytes at offset {offset} (size: {size})")]
    OutOfRange { offset: u64, len: u64, size: u64 },

    /// A timescale of zero ticks per second.
    #[error("Invalid timescale: {0}")]
    InvalidTimescale(u32),

    /// A packet was addressed to a track the fragmenter does not have.
    #[error("Unknown track index: {0}")]
    UnknownTrack(usize),

    /// Fragment payload does not fit the 32-bit data offset and mdat size fields.
    #[error("Fragment too large: {0} bytes")]
    FragmentTooLarge(u64),

    /// A sample duration does not fit the 32-bit `trun` field.
    #[error("Sample duration too large: {0} ticks")]
    SampleDurationTooLarge(u64),

    /// A sample size does not fit the 32-bit `trun` field.
    #[error("Sample too large: {0} bytes")]
    SampleTooLarge(u64),
}

impl Error {
    /// Returns true if the error means the segment can no longer be read.
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Released)
    }
}
