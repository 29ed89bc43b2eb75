//! Fragmented MP4 (fMP4) packaging.
//!
//! This module turns packets into CMAF-style movie fragments:
//! - Box model for `moof`/`traf`/`tfhd`/`tfdt`/`trun`
//! - Per-track fragmenters with sample default compression
//! - The `moof` + `mdat` writer and the multi-track fragmenter on top of it

pub mod boxes;
mod fragmenter;
mod movie;
mod writer;

pub use fragmenter::{Fragment, Packet, TrackFragmenter, TrackKind};
pub use movie::{MovieFragmenter, RawFragment};
pub use writer::write_fragment;
