//! Live LL-HLS streaming.
//!
//! [`Publisher`] turns a packet stream into parts, segments and a media
//! playlist. [`SyntheticSource`] feeds it a deterministic test stream.

mod publisher;
mod synth;

pub use publisher::Publisher;
pub use synth::{tracks, SyntheticSource, AUDIO_TRACK_ID, VIDEO_TRACK_ID};
