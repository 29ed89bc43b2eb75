//! Live HLS segments.
//!
//! A [`Segment`] collects the parts of one HLS segment while the producer is
//! still appending to it, and serves them to any number of concurrent
//! readers. Part bytes are committed to the backing store before the part is
//! published, so a reader that sees `parts() == k` can always read the first
//! `k` parts from the store.

mod name;
mod store;

pub use name::{format_base36, parse_name, part_name, segment_name, SegmentName, EXTENSION};
pub use store::{BackingStore, MemoryStore, TempFileStore};

use crate::fmp4::RawFragment;
use crate::{Error, Result};
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::{Mutex, RwLock};
use std::fmt::{self, Write};
use std::path::Path;
use std::time::Duration;

/// Published metadata of one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartInfo {
    /// Index of the part within the segment.
    pub index: u32,
    /// Offset of the part's first byte in the segment.
    pub offset: u64,
    /// Length in bytes.
    pub length: u64,
    pub duration: Duration,
    /// Whether the part starts with a sync sample.
    pub independent: bool,
}

#[derive(Debug)]
struct Part {
    length: u64,
    duration: Duration,
    independent: bool,
    /// In-memory copy, dropped when the segment is finalized.
    bytes: Option<Bytes>,
}

#[derive(Debug, Default)]
struct SegmentState {
    parts: Vec<Part>,
    size: u64,
    finalized: bool,
    duration: Duration,
}

impl SegmentState {
    fn part_info(&self, index: usize) -> Option<PartInfo> {
        let part = self.parts.get(index)?;
        let offset = self.parts[..index].iter().map(|p| p.length).sum();
        Some(PartInfo {
            index: index as u32,
            offset,
            length: part.length,
            duration: part.duration,
            independent: part.independent,
        })
    }
}

/// A single HLS segment that is written to in parts.
///
/// One producer appends and finalizes; any number of readers may query and
/// read it concurrently.
#[derive(Debug)]
pub struct Segment {
    id: u64,
    base_name: String,
    start: Duration,
    discontinuous: bool,
    program_time: Option<String>,
    state: Mutex<SegmentState>,
    // Lock order: store, then state.
    store: RwLock<Option<Box<dyn BackingStore>>>,
}

impl Segment {
    /// Create a new segment builder.
    pub fn builder(id: u64) -> SegmentBuilder {
        SegmentBuilder::new(id)
    }

    /// Unique identifier of this segment.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Base-36 name used in file names.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Stream-relative start time.
    pub fn start(&self) -> Duration {
        self.start
    }

    /// Whether the segment follows a change in stream parameters.
    pub fn discontinuous(&self) -> bool {
        self.discontinuous
    }

    /// Formatted program date-time, if one was set.
    pub fn program_time(&self) -> Option<&str> {
        self.program_time.as_deref()
    }

    /// Duration of the segment once finalized, zero before.
    pub fn duration(&self) -> Duration {
        self.state.lock().duration
    }

    /// Whether the segment is complete.
    pub fn is_final(&self) -> bool {
        self.state.lock().finalized
    }

    /// Number of parts currently published.
    pub fn parts(&self) -> usize {
        self.state.lock().parts.len()
    }

    /// Total bytes currently published.
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    /// Whether the backing storage has been released.
    pub fn is_released(&self) -> bool {
        self.store.read().is_none()
    }

    /// Metadata of part `index`.
    pub fn part_info(&self, index: usize) -> Option<PartInfo> {
        self.state.lock().part_info(index)
    }

    /// Metadata of every published part.
    pub fn part_infos(&self) -> Vec<PartInfo> {
        let state = self.state.lock();
        let mut offset = 0;
        state
            .parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                let info = PartInfo {
                    index: i as u32,
                    offset,
                    length: part.length,
                    duration: part.duration,
                    independent: part.independent,
                };
                offset += part.length;
                info
            })
            .collect()
    }

    /// Append a complete fragment as the next part.
    ///
    /// The bytes are committed to the backing store before the part becomes
    /// visible to readers. On error nothing is published.
    pub fn append(&self, fragment: &RawFragment) -> Result<()> {
        if self.state.lock().finalized {
            return Err(Error::Finalized);
        }
        let store = self.store.read();
        let store = store.as_ref().ok_or(Error::Released)?;
        let offset = store.append(&fragment.bytes)?;

        let mut state = self.state.lock();
        if state.finalized {
            return Err(Error::Finalized);
        }
        debug_assert_eq!(offset, state.size);
        let length = fragment.len() as u64;
        state.parts.push(Part {
            length,
            duration: fragment.duration,
            independent: fragment.independent,
            bytes: Some(fragment.bytes.clone()),
        });
        state.size += length;
        tracing::trace!(
            segment = %self.base_name,
            part = state.parts.len() - 1,
            offset,
            length,
            "part appended"
        );
        Ok(())
    }

    /// Mark the segment complete. No more parts can be appended.
    ///
    /// The duration is the distance to `next_segment_start` when that lies
    /// after this segment's start. In-memory part copies are dropped; parts
    /// are served from the backing store from now on.
    pub fn finalize(&self, next_segment_start: Duration) {
        let mut state = self.state.lock();
        state.finalized = true;
        if next_segment_start > self.start {
            state.duration = next_segment_start - self.start;
        }
        for part in &mut state.parts {
            part.bytes = None;
        }
        tracing::debug!(
            segment = %self.base_name,
            parts = state.parts.len(),
            size = state.size,
            duration_ms = state.duration.as_millis() as u64,
            "segment finalized"
        );
    }

    /// Release the backing storage. Later reads fail with [`Error::Released`].
    pub fn release(&self) {
        let mut store = self.store.write();
        let mut state = self.state.lock();
        state.size = 0;
        for part in &mut state.parts {
            part.bytes = None;
        }
        if store.take().is_some() {
            tracing::debug!(segment = %self.base_name, "segment released");
        }
    }

    /// Read `buf.len()` published bytes starting at `offset`.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let store = self.store.read();
        let store = store.as_ref().ok_or(Error::Released)?;
        let size = self.state.lock().size;
        let len = buf.len() as u64;
        if offset.checked_add(len).map_or(true, |end| end > size) {
            return Err(Error::OutOfRange { offset, len, size });
        }
        store.read_at(offset, buf)?;
        Ok(())
    }

    /// Bytes of part `index`.
    ///
    /// Live parts come from memory, finalized ones from the backing store.
    pub fn read_part(&self, index: usize) -> Result<Bytes> {
        let store = self.store.read();
        let store = store.as_ref().ok_or(Error::Released)?;
        let info = {
            let state = self.state.lock();
            if let Some(bytes) = state.parts.get(index).and_then(|p| p.bytes.clone()) {
                return Ok(bytes);
            }
            state.part_info(index).ok_or(Error::OutOfRange {
                offset: state.size,
                len: 0,
                size: state.size,
            })?
        };
        let mut buf = vec![0u8; info.length as usize];
        store.read_at(info.offset, &mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// All published bytes of the segment.
    pub fn read_all(&self) -> Result<Bytes> {
        let size = self.size();
        let mut buf = vec![0u8; size as usize];
        self.read_at(0, &mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// Write the playlist lines describing this segment.
    ///
    /// Part lines are written only if `include_parts` is set, and the
    /// segment line only once the segment is final.
    pub fn format<W: Write + ?Sized>(&self, out: &mut W, include_parts: bool) -> fmt::Result {
        let state = self.state.lock();
        if let Some(program_time) = &self.program_time {
            writeln!(out, "#EXT-X-PROGRAM-DATE-TIME:{}", program_time)?;
        }
        if self.discontinuous {
            writeln!(out, "#EXT-X-DISCONTINUITY")?;
        }
        if include_parts {
            for (i, part) in state.parts.iter().enumerate() {
                let independent = if part.independent {
                    "INDEPENDENT=YES,"
                } else {
                    ""
                };
                writeln!(
                    out,
                    "#EXT-X-PART:DURATION={:.6},{}URI=\"{}.{}.{}\"",
                    part.duration.as_secs_f64(),
                    independent,
                    self.base_name,
                    i,
                    EXTENSION
                )?;
            }
        }
        if state.finalized {
            writeln!(out, "#EXTINF:{:.0},", state.duration.as_secs_f64())?;
            writeln!(out, "{}.{}", self.base_name, EXTENSION)?;
        }
        Ok(())
    }
}

/// Builder for creating segments.
#[derive(Debug, Clone)]
pub struct SegmentBuilder {
    id: u64,
    start: Duration,
    discontinuous: bool,
    program_time: Option<DateTime<Utc>>,
}

impl SegmentBuilder {
    /// Create a new builder.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            start: Duration::ZERO,
            discontinuous: false,
            program_time: None,
        }
    }

    /// Set the stream-relative start time.
    pub fn start(mut self, start: Duration) -> Self {
        self.start = start;
        self
    }

    /// Mark the segment as following a discontinuity.
    pub fn discontinuous(mut self, discontinuous: bool) -> Self {
        self.discontinuous = discontinuous;
        self
    }

    /// Set the wall-clock time of the segment's first sample.
    pub fn program_time(mut self, time: DateTime<Utc>) -> Self {
        self.program_time = Some(time);
        self
    }

    /// Create the segment with an anonymous temporary file in `work_dir`.
    pub fn create_in(self, work_dir: impl AsRef<Path>) -> Result<Segment> {
        let store = TempFileStore::new_in(work_dir)?;
        Ok(self.with_store(Box::new(store)))
    }

    /// Create the segment on top of an existing store.
    pub fn with_store(self, store: Box<dyn BackingStore>) -> Segment {
        let base_name = format_base36(self.id);
        tracing::debug!(
            segment = %base_name,
            start_ms = self.start.as_millis() as u64,
            discontinuous = self.discontinuous,
            "segment created"
        );
        Segment {
            id: self.id,
            base_name,
            start: self.start,
            discontinuous: self.discontinuous,
            program_time: self.program_time.map(format_program_time),
            state: Mutex::new(SegmentState::default()),
            store: RwLock::new(Some(store)),
        }
    }
}

/// RFC 3339 in UTC with up to millisecond precision and trailing zeros of
/// the fraction dropped.
fn format_program_time(time: DateTime<Utc>) -> String {
    let formatted = time.to_rfc3339_opts(SecondsFormat::Millis, true);
    match formatted.rsplit_once('.') {
        Some((seconds, fraction)) => {
            let digits = fraction.trim_end_matches('Z').trim_end_matches('0');
            if digits.is_empty() {
                format!("{}Z", seconds)
            } else {
                format!("{}.{}Z", seconds, digits)
            }
        }
        None => formatted,
    }
}
