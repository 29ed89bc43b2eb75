//! Multi-track fragmenter producing complete fragments ready for a segment.

use super::fragmenter::{Packet, TrackFragmenter, TrackKind};
use super::writer::write_fragment;
use crate::timescale::ticks_to_duration;
use crate::{Error, Result};
use bytes::Bytes;
use std::time::Duration;

/// A serialized `moof` + `mdat` pair, one LL-HLS part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFragment {
    /// The fragment bytes.
    pub bytes: Bytes,
    /// Duration of the primary track's samples.
    pub duration: Duration,
    /// Whether the primary track starts with a sync sample.
    pub independent: bool,
}

impl RawFragment {
    pub fn new(bytes: impl Into<Bytes>, duration: Duration, independent: bool) -> Self {
        Self {
            bytes: bytes.into(),
            duration,
            independent,
        }
    }

    /// Length of the fragment in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Cuts fragments across all tracks of a stream.
///
/// The primary track is the first video track, or the first track if there
/// is no video. Its samples decide the duration and independence of each
/// fragment.
#[derive(Debug)]
pub struct MovieFragmenter {
    tracks: Vec<TrackFragmenter>,
    primary: usize,
    sequence_number: u32,
}

impl MovieFragmenter {
    /// Create a fragmenter whose first fragment gets `first_sequence_number`.
    pub fn new(tracks: Vec<TrackFragmenter>, first_sequence_number: u32) -> Self {
        let primary = tracks
            .iter()
            .position(|t| t.kind() == TrackKind::Video)
            .unwrap_or(0);
        Self {
            tracks,
            primary,
            sequence_number: first_sequence_number,
        }
    }

    pub fn tracks(&self) -> &[TrackFragmenter] {
        &self.tracks
    }

    /// The track that drives part boundaries.
    pub fn primary(&self) -> Option<&TrackFragmenter> {
        self.tracks.get(self.primary)
    }

    /// Index of the primary track.
    pub fn primary_index(&self) -> usize {
        self.primary
    }

    /// Sequence number the next fragment will carry.
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    /// Buffer a packet for the track at `track`.
    pub fn write_packet(&mut self, track: usize, packet: Packet) -> Result<()> {
        self.tracks
            .get_mut(track)
            .ok_or(Error::UnknownTrack(track))?
            .write_packet(packet);
        Ok(())
    }

    /// Cut a fragment from every track that has samples ready.
    ///
    /// Returns `None` if no track can produce a fragment yet. A track that
    /// fails to cut aborts the whole fragment.
    pub fn fragment(&mut self) -> Result<Option<RawFragment>> {
        let mut fragments = Vec::with_capacity(self.tracks.len());
        let mut timing = None;
        for (i, track) in self.tracks.iter_mut().enumerate() {
            let Some(fragment) = track.make_fragment()? else {
                continue;
            };
            let duration = ticks_to_duration(fragment.duration(), track.timescale());
            if i == self.primary {
                timing = Some((duration, fragment.is_independent()));
            } else if timing.is_none() && fragments.is_empty() {
                // primary has nothing ready; fall back to the first track cut
                timing = Some((duration, false));
            }
            fragments.push(fragment);
        }
        if fragments.is_empty() {
            return Ok(None);
        }
        let (duration, independent) = timing.unwrap_or((Duration::ZERO, false));

        let mut buf = Vec::new();
        write_fragment(&mut buf, fragments, self.sequence_number)?;
        tracing::debug!(
            sequence_number = self.sequence_number,
            bytes = buf.len(),
            duration_ms = duration.as_millis() as u64,
            independent,
            "fragment written"
        );
        self.sequence_number = self.sequence_number.wrapping_add(1);

        Ok(Some(RawFragment::new(buf, duration, independent)))
    }
}
