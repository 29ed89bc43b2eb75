//! Per-track packet buffering and track fragment assembly.

use super::boxes::{
    RunEntry, TrackFragment, TrackFragmentHeader, TrackRun, SAMPLE_NON_KEYFRAME,
    SAMPLE_NO_DEPENDENCIES, TFHD_DEFAULT_BASE_IS_MOOF, TFHD_DEFAULT_DURATION, TFHD_DEFAULT_FLAGS,
    TFHD_DEFAULT_SIZE, TRUN_DATA_OFFSET, TRUN_FIRST_SAMPLE_FLAGS, TRUN_SAMPLE_CTS,
    TRUN_SAMPLE_DURATION, TRUN_SAMPLE_FLAGS, TRUN_SAMPLE_SIZE,
};
use crate::timescale::{ticks_to_duration, TimeConverter};
use crate::{Error, Result};
use bytes::Bytes;
use std::time::Duration;

/// Media type of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    /// Flags for a sample that is not marked as a sync sample.
    ///
    /// Most video samples in a GOP reference another frame, while audio
    /// frames decode on their own.
    fn default_sample_flags(self) -> u32 {
        match self {
            Self::Video => SAMPLE_NON_KEYFRAME,
            Self::Audio => SAMPLE_NO_DEPENDENCIES,
        }
    }
}

/// One access unit handed to a fragmenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Decode timestamp in the fragmenter's source ticks.
    pub time: u64,
    /// Presentation minus decode time, in source ticks.
    pub composition_offset: i64,
    /// Encoded access unit.
    pub data: Bytes,
    /// Whether this is a sync sample (keyframe).
    pub is_sync: bool,
}

impl Packet {
    pub fn new(time: u64, data: impl Into<Bytes>, is_sync: bool) -> Self {
        Self {
            time,
            composition_offset: 0,
            data: data.into(),
            is_sync,
        }
    }

    pub fn with_composition_offset(mut self, offset: i64) -> Self {
        self.composition_offset = offset;
        self
    }
}

/// A track fragment together with the packets it describes.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub track: TrackFragment,
    pub packets: Vec<Packet>,
}

impl Fragment {
    /// Total payload bytes of the fragment.
    pub fn data_len(&self) -> usize {
        self.packets.iter().map(|p| p.data.len()).sum()
    }

    /// Sum of the sample durations, in the track timescale.
    pub fn duration(&self) -> u64 {
        self.track
            .run
            .entries
            .iter()
            .map(|e| e.duration as u64)
            .sum()
    }

    /// Whether the fragment starts with a sync sample.
    pub fn is_independent(&self) -> bool {
        self.packets.first().is_some_and(|p| p.is_sync)
    }
}

/// Candidate header default for one sample field, folded across a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldDefault<T> {
    Unset,
    Uniform(T),
    Varies,
}

impl<T: Copy + PartialEq> FieldDefault<T> {
    fn fold(self, value: T) -> Self {
        match self {
            Self::Unset => Self::Uniform(value),
            Self::Uniform(v) if v == value => self,
            _ => Self::Varies,
        }
    }

    fn uniform(self) -> Option<T> {
        match self {
            Self::Uniform(v) => Some(v),
            _ => None,
        }
    }
}

/// Buffers packets for one track and turns them into track fragments.
///
/// The duration of a sample is the distance to the next sample's decode time,
/// so the most recent packet always stays buffered until its successor
/// arrives.
#[derive(Debug)]
pub struct TrackFragmenter {
    track_id: u32,
    kind: TrackKind,
    converter: TimeConverter,
    pending: Vec<Packet>,
}

impl TrackFragmenter {
    /// Create a fragmenter for packets timed in `source_timescale` ticks,
    /// written out in `timescale` ticks.
    pub fn new(track_id: u32, kind: TrackKind, source_timescale: u32, timescale: u32) -> Result<Self> {
        Ok(Self {
            track_id,
            kind,
            converter: TimeConverter::new(source_timescale, timescale)?,
            pending: Vec::new(),
        })
    }

    pub fn track_id(&self) -> u32 {
        self.track_id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Output timescale (ticks per second).
    pub fn timescale(&self) -> u32 {
        self.converter.target()
    }

    /// Tick rate of incoming packet times.
    pub fn source_timescale(&self) -> u32 {
        self.converter.source()
    }

    /// Number of buffered packets, including the lookahead packet.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Duration that a fragment cut now would cover.
    pub fn pending_duration(&self) -> Duration {
        match (self.pending.first(), self.pending.last()) {
            (Some(first), Some(last)) => {
                let start = self.converter.to_scale(first.time);
                let end = self.converter.to_scale(last.time);
                ticks_to_duration(end.saturating_sub(start), self.timescale())
            }
            _ => Duration::ZERO,
        }
    }

    /// Buffer a packet. Packets must arrive in decode order.
    pub fn write_packet(&mut self, packet: Packet) {
        if let Some(last) = self.pending.last() {
            if packet.time < last.time {
                tracing::warn!(
                    track_id = self.track_id,
                    time = packet.time,
                    previous = last.time,
                    "packet decode time went backwards"
                );
            }
        }
        self.pending.push(packet);
    }

    /// Cut a fragment from every buffered packet except the last one.
    ///
    /// Returns `None` until at least two packets are buffered. A sample whose
    /// duration or size does not fit the 32-bit `trun` fields is an error, and
    /// the buffered packets are left untouched.
    pub fn make_fragment(&mut self) -> Result<Option<Fragment>> {
        if self.pending.len() < 2 {
            return Ok(None);
        }
        let entry_count = self.pending.len() - 1;
        let start_dts = self.converter.to_scale(self.pending[0].time);
        let default_flags = self.kind.default_sample_flags();

        let mut run = TrackRun {
            flags: TRUN_DATA_OFFSET,
            entries: Vec::with_capacity(entry_count),
            ..Default::default()
        };
        let mut cur_dts = start_dts;
        for (i, packet) in self.pending[..entry_count].iter().enumerate() {
            let next_dts = self.converter.to_scale(self.pending[i + 1].time);
            let mut entry = RunEntry {
                duration: sample_field(
                    next_dts.saturating_sub(cur_dts),
                    Error::SampleDurationTooLarge,
                )?,
                size: sample_field(packet.data.len() as u64, Error::SampleTooLarge)?,
                flags: if packet.is_sync {
                    SAMPLE_NO_DEPENDENCIES
                } else {
                    default_flags
                },
                composition_offset: 0,
            };
            if packet.composition_offset != 0 {
                run.flags |= TRUN_SAMPLE_CTS;
                entry.composition_offset = self.converter.relative(packet.composition_offset);
                if entry.composition_offset < 0 {
                    // negative offsets need the signed run version
                    run.version = 1;
                }
            }
            run.entries.push(entry);
            cur_dts = next_dts;
        }

        let mut header = TrackFragmentHeader {
            flags: TFHD_DEFAULT_BASE_IS_MOOF,
            track_id: self.track_id,
            ..Default::default()
        };
        apply_defaults(&mut header, &mut run);

        let track = TrackFragment {
            header,
            decode_time: start_dts,
            run,
        };
        let lookahead = self.pending.split_off(entry_count);
        let packets = std::mem::replace(&mut self.pending, lookahead);

        tracing::trace!(
            track_id = self.track_id,
            samples = entry_count,
            decode_time = start_dts,
            "track fragment ready"
        );
        Ok(Some(Fragment { track, packets }))
    }
}

/// Move fields that are identical for every sample into the track fragment
/// header, and mark the rest as per-sample fields of the run.
fn apply_defaults(header: &mut TrackFragmentHeader, run: &mut TrackRun) {
    let entries = &run.entries;
    let duration = entries
        .iter()
        .fold(FieldDefault::Unset, |d, e| d.fold(e.duration));
    let size = entries
        .iter()
        .fold(FieldDefault::Unset, |d, e| d.fold(e.size));
    // The first sample can carry its own flags, so the shared default is taken
    // from the second sample.
    let flags = match entries.get(1) {
        Some(second) => entries[2..]
            .iter()
            .fold(FieldDefault::Uniform(second.flags), |d, e| d.fold(e.flags)),
        None => entries
            .iter()
            .fold(FieldDefault::Unset, |d, e| d.fold(e.flags)),
    };
    let first_flags = entries.first().map(|e| e.flags);

    match size.uniform() {
        Some(size) => {
            header.flags |= TFHD_DEFAULT_SIZE;
            header.default_size = size;
        }
        None => run.flags |= TRUN_SAMPLE_SIZE,
    }
    match duration.uniform() {
        Some(duration) => {
            header.flags |= TFHD_DEFAULT_DURATION;
            header.default_duration = duration;
        }
        None => run.flags |= TRUN_SAMPLE_DURATION,
    }
    match flags.uniform() {
        Some(flags) => {
            header.flags |= TFHD_DEFAULT_FLAGS;
            header.default_flags = flags;
            if let Some(first) = first_flags.filter(|&f| f != flags) {
                run.flags |= TRUN_FIRST_SAMPLE_FLAGS;
                run.first_sample_flags = first;
            }
        }
        None => run.flags |= TRUN_SAMPLE_FLAGS,
    }
}

fn sample_field(value: u64, err: fn(u64) -> Error) -> Result<u32> {
    u32::try_from(value).map_err(|_| err(value))
}
