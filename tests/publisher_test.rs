//! Integration tests for the live publisher fed by the synthetic source.

use llhls::config::{SegmenterConfig, SynthConfig};
use llhls::streaming::{tracks, Publisher, SyntheticSource};
use std::time::Duration;

fn segmenter(dir: &std::path::Path) -> SegmenterConfig {
    SegmenterConfig {
        work_dir: Some(dir.to_path_buf()),
        segment_duration_ms: 2000,
        part_duration_ms: 400,
        window: 4,
        first_segment_id: 36,
        ..Default::default()
    }
}

fn synth() -> SynthConfig {
    SynthConfig {
        fps: 25,
        keyframe_interval: 50,
        frame_size: 32,
        ..Default::default()
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn run(dir: &std::path::Path, seconds: u64) -> Publisher {
    let mut publisher = Publisher::new(&segmenter(dir), tracks(&synth()).unwrap(), None);
    for (track, packet) in SyntheticSource::new(synth(), seconds) {
        publisher.write_packet(track, packet).unwrap();
    }
    publisher
}

#[test]
fn live_stream_segments_on_keyframes() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = run(dir.path(), 7);

    let segments: Vec<_> = publisher.segments().cloned().collect();
    assert_eq!(segments.len(), 4);
    assert_eq!(segments[0].base_name(), "10");
    for (i, segment) in segments[..3].iter().enumerate() {
        assert!(segment.is_final());
        assert_eq!(segment.start(), Duration::from_secs(2 * i as u64));
        assert_eq!(segment.duration(), Duration::from_secs(2));
        assert_eq!(segment.parts(), 5);
        // only the first part of each segment starts on a keyframe
        let independent: Vec<bool> = segment.part_infos().iter().map(|p| p.independent).collect();
        assert_eq!(independent, vec![true, false, false, false, false]);
    }
    assert!(publisher.live_segment().is_some());
}

#[test]
fn parts_carry_both_tracks() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = run(dir.path(), 3);

    let part = publisher.lookup("10.0.m4s").unwrap().unwrap();
    assert_eq!(&part[4..8], b"moof");
    let moof_size = read_u32(&part, 0) as usize;

    let mut trafs = 0;
    let mut pos = 8;
    while pos < moof_size {
        if &part[pos + 4..pos + 8] == b"traf" {
            trafs += 1;
        }
        pos += read_u32(&part, pos) as usize;
    }
    assert_eq!(trafs, 2);
    assert_eq!(&part[moof_size + 4..moof_size + 8], b"mdat");
    assert_eq!(read_u32(&part, moof_size) as usize, part.len() - moof_size);
}

#[test]
fn playlist_lists_parts_for_recent_segments() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = run(dir.path(), 7);
    let playlist = publisher.playlist();

    assert!(playlist.contains("#EXT-X-MEDIA-SEQUENCE:36\n"));
    assert!(playlist.contains("#EXT-X-PART-INF:PART-TARGET=0.400\n"));
    // older segments only get their EXTINF line
    assert!(!playlist.contains("URI=\"10.0.m4s\""));
    assert!(playlist.contains("#EXTINF:2,\n10.m4s\n"));
    assert!(playlist.contains("URI=\"12.0.m4s\""));
    assert!(playlist.contains("URI=\"13.0.m4s\""));
}

#[test]
fn finished_stream_is_served_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut publisher = run(dir.path(), 4);
    publisher.finish().unwrap();

    let segment = publisher.lookup("11.m4s").unwrap().unwrap();
    let parts: Vec<_> = (0..5)
        .map(|i| publisher.lookup(&format!("11.{}.m4s", i)).unwrap().unwrap())
        .collect();
    assert_eq!(segment, parts.concat());

    assert!(publisher.playlist().ends_with("#EXT-X-ENDLIST\n"));
    // backing files are anonymous
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
