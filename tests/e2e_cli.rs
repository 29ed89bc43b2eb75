//! CLI end-to-end tests
//!
//! Tests for the llhls command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the llhls binary
#[allow(deprecated)]
fn llhls_cmd() -> Command {
    Command::cargo_bin("llhls").unwrap()
}

/// Config with short segments so a few seconds produce several of them
fn write_config(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("llhls.toml");
    fs::write(
        &path,
        format!(
            r#"
[segmenter]
work_dir = {:?}
segment_duration_ms = 2000
part_duration_ms = 500
window = 3

[synth]
fps = 25
keyframe_interval = 50
frame_size = 64
"#,
            dir
        ),
    )
    .unwrap();
    path
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = llhls_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = llhls_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("llhls"))
        .stdout(predicate::str::contains("synth"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = llhls_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("llhls "));
}

#[test]
fn test_cli_parse_name() {
    let mut cmd = llhls_cmd();
    cmd.args(["parse-name", "3k.2.m4s"])
        .assert()
        .success()
        .stdout(predicate::str::contains("segment: 128"))
        .stdout(predicate::str::contains("part: 2"));

    let mut cmd = llhls_cmd();
    cmd.args(["parse-name", "3k.m4s"])
        .assert()
        .success()
        .stdout(predicate::str::contains("part: -"));
}

#[test]
fn test_cli_parse_name_rejects_garbage() {
    let mut cmd = llhls_cmd();
    cmd.args(["parse-name", "index.m3u8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a segment or part name"));
}

#[test]
fn test_cli_validate_config() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path());

    let mut cmd = llhls_cmd();
    cmd.arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Part duration: 500 ms"));
}

#[test]
fn test_cli_validate_invalid_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(
        &path,
        "[segmenter]\nsegment_duration_ms = 1000\npart_duration_ms = 2000\n",
    )
    .unwrap();

    let mut cmd = llhls_cmd();
    cmd.arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds segment duration"));
}

#[test]
fn test_cli_synth_prints_playlist() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path());

    let mut cmd = llhls_cmd();
    cmd.arg("--config")
        .arg(&config)
        .args(["synth", "--seconds", "5"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("#EXTM3U\n"))
        .stdout(predicate::str::contains("#EXT-X-TARGETDURATION:2"))
        .stdout(predicate::str::contains("#EXTINF:2,\n1.m4s"))
        .stdout(predicate::str::ends_with("#EXT-X-ENDLIST\n"));
}

#[test]
fn test_cli_synth_writes_files() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path());
    let out = dir.path().join("out");

    let mut cmd = llhls_cmd();
    cmd.arg("--config")
        .arg(&config)
        .args(["synth", "--seconds", "9", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 5 segments"));

    let playlist = fs::read_to_string(out.join("index.m3u8")).unwrap();
    // window of 3 drops the first two segments
    assert!(playlist.contains("#EXT-X-MEDIA-SEQUENCE:3\n"));
    assert!(!playlist.contains("\n1.m4s\n"));

    // every segment stays on disk, equal to its parts back to back
    for id in 1..=5u64 {
        let whole = fs::read(out.join(format!("{}.m4s", id))).unwrap();
        assert_eq!(&whole[4..8], b"moof");
        let mut joined = Vec::new();
        let mut part = 0;
        while let Ok(bytes) = fs::read(out.join(format!("{}.{}.m4s", id, part))) {
            joined.extend_from_slice(&bytes);
            part += 1;
        }
        assert!(part > 0);
        assert_eq!(whole, joined);
    }
}
