use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    #[serde(default)]
    pub synth: SynthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SegmenterConfig {
    /// Directory for the anonymous segment backing files (default: OS temp dir)
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Target segment duration in milliseconds
    #[serde(default = "default_segment_duration")]
    pub segment_duration_ms: u64,

    /// Target LL-HLS part duration in milliseconds
    #[serde(default = "default_part_duration")]
    pub part_duration_ms: u64,

    /// Number of finalized segments kept in the playlist
    #[serde(default = "default_window")]
    pub window: usize,

    #[serde(default = "default_first_id")]
    pub first_segment_id: u64,

    #[serde(default = "default_first_sequence")]
    pub first_sequence_number: u32,

    /// Tag segments with EXT-X-PROGRAM-DATE-TIME
    #[serde(default)]
    pub program_date_time: bool,
}

fn default_segment_duration() -> u64 {
    6000
}
fn default_part_duration() -> u64 {
    1000
}
fn default_window() -> usize {
    6
}
fn default_first_id() -> u64 {
    1
}
fn default_first_sequence() -> u32 {
    1
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            segment_duration_ms: default_segment_duration(),
            part_duration_ms: default_part_duration(),
            window: default_window(),
            first_segment_id: default_first_id(),
            first_sequence_number: default_first_sequence(),
            program_date_time: false,
        }
    }
}

impl SegmenterConfig {
    /// Work directory, falling back to the OS temp dir.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SynthConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Frames between keyframes
    #[serde(default = "default_keyframe_interval")]
    pub keyframe_interval: u32,

    #[serde(default = "default_video_timescale")]
    pub video_timescale: u32,

    /// Average video frame size in bytes
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,

    #[serde(default = "default_audio")]
    pub audio: bool,

    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate: u32,
}

fn default_fps() -> u32 {
    30
}
fn default_keyframe_interval() -> u32 {
    60
}
fn default_video_timescale() -> u32 {
    90000
}
fn default_frame_size() -> usize {
    2048
}
fn default_audio() -> bool {
    true
}
fn default_audio_sample_rate() -> u32 {
    48000
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            keyframe_interval: default_keyframe_interval(),
            video_timescale: default_video_timescale(),
            frame_size: default_frame_size(),
            audio: default_audio(),
            audio_sample_rate: default_audio_sample_rate(),
        }
    }
}
