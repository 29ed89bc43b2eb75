//! Llhls-Media: fragmented MP4 packaging and live LL-HLS segments
//!
//! This crate turns timestamped access units into CMAF-style `moof`/`mdat`
//! fragments and collects them into HLS segments that can be read while they
//! are still being written.
//!
//! # Modules
//!
//! - `timescale` - Tick-rate conversion for decode and composition times
//! - `fmp4` - Movie fragment boxes, per-track fragmenters, fragment writer
//! - `segment` - Live segments, their backing stores and file names
//!
//! # Architecture
//!
//! Packets for each track are buffered by a [`TrackFragmenter`] until a
//! successor arrives, which fixes the duration of the buffered samples. The
//! [`MovieFragmenter`] cuts one fragment per track, serializes a single moof
//! box with the data offsets already filled in, and appends the payloads in
//! an mdat. Each resulting [`RawFragment`] becomes an LL-HLS part of the live
//! [`Segment`]:
//!
//! 1. Part bytes are committed to the segment's anonymous backing file
//! 2. Part metadata is published under the segment lock
//! 3. Readers use the published part lengths to address the backing file
//! 4. Finalize drops the in-memory copies; Release closes the file

pub mod error;
pub mod fmp4;
pub mod segment;
pub mod timescale;

pub use error::{Error, Result};
pub use fmp4::{
    write_fragment, Fragment, MovieFragmenter, Packet, RawFragment, TrackFragmenter, TrackKind,
};
pub use segment::{parse_name, part_name, segment_name, Segment, SegmentName};
pub use timescale::TimeConverter;
