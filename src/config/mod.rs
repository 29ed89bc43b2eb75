mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./llhls.toml", "/etc/llhls/config.toml"];

    for path_str in default_paths {
        let path = Path::new(path_str);
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let seg = &config.segmenter;
    if seg.segment_duration_ms == 0 {
        anyhow::bail!("Segment duration cannot be 0");
    }
    if seg.part_duration_ms == 0 {
        anyhow::bail!("Part duration cannot be 0");
    }
    if seg.part_duration_ms > seg.segment_duration_ms {
        anyhow::bail!(
            "Part duration ({} ms) exceeds segment duration ({} ms)",
            seg.part_duration_ms,
            seg.segment_duration_ms
        );
    }
    if seg.window == 0 {
        anyhow::bail!("Playlist window cannot be 0");
    }
    if let Some(dir) = &seg.work_dir {
        if !dir.is_dir() {
            tracing::warn!("Work directory does not exist: {:?}", dir);
        }
    }

    let synth = &config.synth;
    if synth.fps == 0 || synth.video_timescale == 0 {
        anyhow::bail!("Synthetic video needs a non-zero frame rate and timescale");
    }
    if synth.keyframe_interval == 0 {
        anyhow::bail!("Keyframe interval cannot be 0");
    }
    if synth.audio && synth.audio_sample_rate == 0 {
        anyhow::bail!("Audio sample rate cannot be 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        validate_config(&config).unwrap();
        assert_eq!(config.segmenter.segment_duration_ms, 6000);
        assert_eq!(config.segmenter.part_duration_ms, 1000);
        assert_eq!(config.segmenter.window, 6);
        assert_eq!(config.synth.fps, 30);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[segmenter]\nsegment_duration_ms = 4000\npart_duration_ms = 500\n\n[synth]\naudio = false"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.segmenter.segment_duration_ms, 4000);
        assert_eq!(config.segmenter.part_duration_ms, 500);
        assert_eq!(config.segmenter.window, 6);
        assert!(!config.synth.audio);
        assert_eq!(config.synth.keyframe_interval, 60);
    }

    #[test]
    fn test_part_longer_than_segment_rejected() {
        let mut config = Config::default();
        config.segmenter.part_duration_ms = 7000;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("exceeds segment duration"));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = Config::default();
        config.segmenter.window = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[segmenter\nwindow = ").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
