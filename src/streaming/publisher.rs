//! Live LL-HLS publisher.
//!
//! Feeds packets through the movie fragmenter, appends each fragment as a part
//! of the live segment, rotates segments on keyframes, and renders the media
//! playlist for the current window.

use crate::config::SegmenterConfig;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use llhls_media::segment::{parse_name, Segment};
use llhls_media::timescale::ticks_to_duration;
use llhls_media::{MovieFragmenter, Packet, TrackFragmenter};
use std::collections::VecDeque;
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Segments that keep their part lines in the playlist, counted from the end.
const PART_SEGMENTS: usize = 2;

/// Cuts a live stream into LL-HLS parts and segments.
pub struct Publisher {
    work_dir: PathBuf,
    segment_duration: Duration,
    part_duration: Duration,
    window: usize,
    fragmenter: MovieFragmenter,
    /// Finalized segments in the window followed by the live segment.
    segments: VecDeque<Arc<Segment>>,
    next_id: u64,
    program_start: Option<DateTime<Utc>>,
    discontinuity: bool,
    last_time: Duration,
    finished: bool,
}

impl Publisher {
    /// Create a publisher for the given tracks.
    ///
    /// `program_start` is the wall-clock time of stream time zero; when set,
    /// every segment carries a program date-time.
    pub fn new(
        config: &SegmenterConfig,
        tracks: Vec<TrackFragmenter>,
        program_start: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            work_dir: config.work_dir(),
            segment_duration: Duration::from_millis(config.segment_duration_ms),
            part_duration: Duration::from_millis(config.part_duration_ms),
            window: config.window,
            fragmenter: MovieFragmenter::new(tracks, config.first_sequence_number),
            segments: VecDeque::new(),
            next_id: config.first_segment_id,
            program_start,
            discontinuity: false,
            last_time: Duration::ZERO,
            finished: false,
        }
    }

    /// Retained segments, oldest first. The last one may still be live.
    pub fn segments(&self) -> impl Iterator<Item = &Arc<Segment>> {
        self.segments.iter()
    }

    /// The segment currently being written.
    pub fn live_segment(&self) -> Option<&Arc<Segment>> {
        self.segments.back().filter(|s| !s.is_final())
    }

    /// Mark the next segment as following a discontinuity.
    pub fn mark_discontinuity(&mut self) {
        self.discontinuity = true;
    }

    /// Feed one packet for the track at index `track`.
    pub fn write_packet(&mut self, track: usize, packet: Packet) -> anyhow::Result<()> {
        if self.finished {
            anyhow::bail!("Publisher is finished");
        }
        if track != self.fragmenter.primary_index() {
            self.fragmenter.write_packet(track, packet)?;
            return Ok(());
        }

        let source_timescale = self
            .fragmenter
            .primary()
            .map(|t| t.source_timescale())
            .unwrap_or(1);
        let time = ticks_to_duration(packet.time, source_timescale);
        let is_sync = packet.is_sync;
        self.last_time = time;
        self.fragmenter.write_packet(track, packet)?;

        let Some(live) = self.live_segment().cloned() else {
            // the first segment opens on the first primary packet
            self.open_segment(time)?;
            return Ok(());
        };
        if is_sync && time.saturating_sub(live.start()) >= self.segment_duration {
            // the keyframe stays pending and starts the next segment
            self.flush_part()?;
            live.finalize(time);
            self.open_segment(time)?;
            self.trim_window();
            return Ok(());
        }
        let pending = self
            .fragmenter
            .primary()
            .map(|t| t.pending_duration())
            .unwrap_or_default();
        if pending >= self.part_duration {
            self.flush_part()?;
        }
        Ok(())
    }

    /// Flush what can be flushed and finalize the live segment.
    ///
    /// The last packet of each track has no successor, so it is dropped.
    pub fn finish(&mut self) -> anyhow::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.flush_part()?;
        if let Some(live) = self.live_segment().cloned() {
            live.finalize(self.last_time);
        }
        self.finished = true;
        self.trim_window();
        Ok(())
    }

    fn flush_part(&mut self) -> anyhow::Result<()> {
        let Some(live) = self.live_segment().cloned() else {
            return Ok(());
        };
        if let Some(fragment) = self.fragmenter.fragment()? {
            live.append(&fragment)?;
        }
        Ok(())
    }

    fn open_segment(&mut self, start: Duration) -> anyhow::Result<()> {
        let mut builder = Segment::builder(self.next_id)
            .start(start)
            .discontinuous(std::mem::take(&mut self.discontinuity));
        if let Some(program_start) = self.program_start {
            if let Ok(offset) = chrono::Duration::from_std(start) {
                builder = builder.program_time(program_start + offset);
            }
        }
        let segment = builder.create_in(&self.work_dir)?;
        tracing::info!(
            segment = %segment.base_name(),
            start_ms = start.as_millis() as u64,
            "opened segment"
        );
        self.segments.push_back(Arc::new(segment));
        self.next_id += 1;
        Ok(())
    }

    /// Release finalized segments that fell out of the window.
    fn trim_window(&mut self) {
        let finalized = self.segments.iter().filter(|s| s.is_final()).count();
        for _ in self.window..finalized {
            if let Some(old) = self.segments.pop_front() {
                old.release();
            }
        }
    }

    /// Render the media playlist for the retained segments.
    pub fn playlist(&self) -> String {
        let mut out = String::new();
        // writing to a String cannot fail
        let _ = self.write_playlist(&mut out);
        out
    }

    fn write_playlist(&self, out: &mut String) -> std::fmt::Result {
        let longest = self
            .segments
            .iter()
            .map(|s| s.duration())
            .max()
            .unwrap_or_default()
            .max(self.segment_duration);
        let media_sequence = self.segments.front().map(|s| s.id()).unwrap_or(self.next_id);

        writeln!(out, "#EXTM3U")?;
        writeln!(out, "#EXT-X-VERSION:9")?;
        writeln!(out, "#EXT-X-TARGETDURATION:{}", longest.as_secs_f64().ceil() as u64)?;
        writeln!(
            out,
            "#EXT-X-PART-INF:PART-TARGET={:.3}",
            self.part_duration.as_secs_f64()
        )?;
        writeln!(out, "#EXT-X-MEDIA-SEQUENCE:{}", media_sequence)?;

        let with_parts = self.segments.len().saturating_sub(PART_SEGMENTS);
        for (i, segment) in self.segments.iter().enumerate() {
            segment.format(out, !self.finished && i >= with_parts)?;
        }
        if self.finished {
            writeln!(out, "#EXT-X-ENDLIST")?;
        }
        Ok(())
    }

    /// Resolve a segment or part file name to its bytes.
    ///
    /// Returns `None` for unknown names, parts not yet published, and
    /// segments that are still live.
    pub fn lookup(&self, name: &str) -> llhls_media::Result<Option<Bytes>> {
        let Some(name) = parse_name(name) else {
            return Ok(None);
        };
        let Some(segment) = self.segments.iter().find(|s| s.id() == name.id) else {
            return Ok(None);
        };
        match name.part {
            Some(part) if (part as usize) < segment.parts() => {
                segment.read_part(part as usize).map(Some)
            }
            Some(_) => Ok(None),
            None if segment.is_final() => segment.read_all().map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llhls_media::TrackKind;

    fn config(dir: &std::path::Path) -> SegmenterConfig {
        SegmenterConfig {
            work_dir: Some(dir.to_path_buf()),
            segment_duration_ms: 2000,
            part_duration_ms: 500,
            window: 2,
            ..Default::default()
        }
    }

    fn video_publisher(dir: &std::path::Path) -> Publisher {
        let video = TrackFragmenter::new(1, TrackKind::Video, 1000, 90000).unwrap();
        Publisher::new(&config(dir), vec![video], None)
    }

    /// 10 fps, keyframe every second, times in milliseconds.
    fn feed(publisher: &mut Publisher, frames: u64) {
        for i in 0..frames {
            let packet = Packet::new(i * 100, vec![i as u8; 100], i % 10 == 0);
            publisher.write_packet(0, packet).unwrap();
        }
    }

    #[test]
    fn test_parts_and_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let mut publisher = video_publisher(dir.path());
        feed(&mut publisher, 21);

        let segments: Vec<_> = publisher.segments().cloned().collect();
        assert_eq!(segments.len(), 2);
        assert!(segments[0].is_final());
        assert_eq!(segments[0].duration(), Duration::from_secs(2));
        assert_eq!(segments[0].parts(), 4);
        assert!(!segments[1].is_final());
        assert_eq!(segments[1].start(), Duration::from_secs(2));

        let infos = segments[0].part_infos();
        assert!(infos[0].independent);
        assert!(infos.iter().all(|p| p.duration == Duration::from_millis(500)));
    }

    #[test]
    fn test_window_releases_old_segments() {
        let dir = tempfile::tempdir().unwrap();
        let mut publisher = video_publisher(dir.path());
        feed(&mut publisher, 61);

        let first = publisher.segments().next().cloned().unwrap();
        assert_eq!(first.id(), 2);
        // window of 2 finalized plus the live one
        assert_eq!(publisher.segments().count(), 3);
        assert!(publisher.lookup("1.m4s").unwrap().is_none());
    }

    #[test]
    fn test_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let mut publisher = video_publisher(dir.path());
        feed(&mut publisher, 23);

        let playlist = publisher.playlist();
        assert!(playlist.starts_with("#EXTM3U\n#EXT-X-VERSION:9\n#EXT-X-TARGETDURATION:2\n"));
        assert!(playlist.contains("#EXT-X-PART-INF:PART-TARGET=0.500\n"));
        assert!(playlist.contains("#EXT-X-MEDIA-SEQUENCE:1\n"));
        assert!(playlist.contains("#EXTINF:2,\n1.m4s\n"));
        assert!(playlist.contains("URI=\"1.0.m4s\""));
        assert!(!playlist.contains("2.m4s\n"));
        assert!(!playlist.contains("#EXT-X-ENDLIST"));

        publisher.finish().unwrap();
        let playlist = publisher.playlist();
        assert!(playlist.contains("#EXTINF:0,\n2.m4s\n"));
        assert!(!playlist.contains("#EXT-X-PART:"));
        assert!(playlist.ends_with("#EXT-X-ENDLIST\n"));
    }

    #[test]
    fn test_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let mut publisher = video_publisher(dir.path());
        feed(&mut publisher, 21);

        let whole = publisher.lookup("1.m4s").unwrap().unwrap();
        let parts: Vec<Bytes> = (0..4)
            .map(|i| publisher.lookup(&format!("1.{}.m4s", i)).unwrap().unwrap())
            .collect();
        assert_eq!(whole, parts.concat());
        assert_eq!(&whole[4..8], b"moof");

        // live segment has no whole-segment file yet
        assert!(publisher.lookup("2.m4s").unwrap().is_none());
        assert!(publisher.lookup("1.9.m4s").unwrap().is_none());
        assert!(publisher.lookup("index.m3u8").unwrap().is_none());
    }

    #[test]
    fn test_discontinuity_and_program_time() {
        let dir = tempfile::tempdir().unwrap();
        let video = TrackFragmenter::new(1, TrackKind::Video, 1000, 90000).unwrap();
        let start = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut publisher = Publisher::new(&config(dir.path()), vec![video], Some(start));
        publisher.mark_discontinuity();
        feed(&mut publisher, 21);

        let segments: Vec<_> = publisher.segments().cloned().collect();
        assert!(segments[0].discontinuous());
        assert!(!segments[1].discontinuous());
        assert_eq!(segments[1].program_time(), Some("2025-01-01T00:00:02Z"));
    }

    #[test]
    fn test_write_after_finish() {
        let dir = tempfile::tempdir().unwrap();
        let mut publisher = video_publisher(dir.path());
        feed(&mut publisher, 3);
        publisher.finish().unwrap();
        assert!(publisher
            .write_packet(0, Packet::new(1000, vec![0], true))
            .is_err());
    }
}
