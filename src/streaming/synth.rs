//! Synthetic test source.
//!
//! Produces a deterministic stream of fake video frames and, optionally,
//! audio frames, interleaved in presentation order.

use crate::config::SynthConfig;
use llhls_media::{Packet, TrackFragmenter, TrackKind};

/// Samples per synthetic audio frame, as in AAC.
pub const AUDIO_FRAME_SAMPLES: u64 = 1024;
const AUDIO_FRAME_SIZE: usize = 256;

pub const VIDEO_TRACK_ID: u32 = 1;
pub const AUDIO_TRACK_ID: u32 = 2;

/// Build the track fragmenters matching [`SyntheticSource`] track indexes.
pub fn tracks(config: &SynthConfig) -> llhls_media::Result<Vec<TrackFragmenter>> {
    let mut tracks = vec![TrackFragmenter::new(
        VIDEO_TRACK_ID,
        TrackKind::Video,
        config.video_timescale,
        config.video_timescale,
    )?];
    if config.audio {
        tracks.push(TrackFragmenter::new(
            AUDIO_TRACK_ID,
            TrackKind::Audio,
            config.audio_sample_rate,
            config.audio_sample_rate,
        )?);
    }
    Ok(tracks)
}

/// Iterator over `(track index, packet)` pairs.
///
/// Video is track 0, audio track 1.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    config: SynthConfig,
    video_frames: u64,
    audio_frames: u64,
    next_video: u64,
    next_audio: u64,
}

impl SyntheticSource {
    /// A source producing `seconds` of media.
    pub fn new(config: SynthConfig, seconds: u64) -> Self {
        let video_frames = seconds * config.fps as u64;
        let audio_frames = if config.audio {
            (seconds * config.audio_sample_rate as u64).div_ceil(AUDIO_FRAME_SAMPLES)
        } else {
            0
        };
        Self {
            config,
            video_frames,
            audio_frames,
            next_video: 0,
            next_audio: 0,
        }
    }

    fn video_packet(&mut self) -> Packet {
        let index = self.next_video;
        self.next_video += 1;
        let time = index * self.config.video_timescale as u64 / self.config.fps as u64;
        let is_sync = index % self.config.keyframe_interval as u64 == 0;
        let size = if is_sync {
            self.config.frame_size * 4
        } else {
            self.config.frame_size
        };
        Packet::new(time, payload(index, size), is_sync)
    }

    fn audio_packet(&mut self) -> Packet {
        let index = self.next_audio;
        self.next_audio += 1;
        Packet::new(
            index * AUDIO_FRAME_SAMPLES,
            payload(index, AUDIO_FRAME_SIZE),
            true,
        )
    }

    /// Whether the next video frame comes before the next audio frame.
    fn video_first(&self) -> bool {
        // next_video / fps <= next_audio * 1024 / rate
        let video = self.next_video as u128 * self.config.audio_sample_rate as u128;
        let audio =
            self.next_audio as u128 * AUDIO_FRAME_SAMPLES as u128 * self.config.fps as u128;
        video <= audio
    }
}

impl Iterator for SyntheticSource {
    type Item = (usize, Packet);

    fn next(&mut self) -> Option<Self::Item> {
        let video_left = self.next_video < self.video_frames;
        let audio_left = self.next_audio < self.audio_frames;
        match (video_left, audio_left) {
            (true, true) if self.video_first() => Some((0, self.video_packet())),
            (true, false) => Some((0, self.video_packet())),
            (_, true) => Some((1, self.audio_packet())),
            (false, false) => None,
        }
    }
}

fn payload(index: u64, size: usize) -> Vec<u8> {
    (0..size)
        .map(|k| (index as usize).wrapping_mul(31).wrapping_add(k) as u8)
        .collect()
}
