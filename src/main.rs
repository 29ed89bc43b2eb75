mod cli;

use llhls::{
    config,
    streaming::{self, Publisher, SyntheticSource},
};
use llhls_media::segment::{parse_name, part_name, segment_name};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "llhls=trace,llhls_media=trace".to_string()
        } else {
            "llhls=info,llhls_media=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Synth { seconds, out } => synth(seconds, out.as_deref(), cli.config.as_deref()),
        Commands::ParseName { name } => describe_name(&name),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("llhls {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn synth(seconds: u64, out: Option<&Path>, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    config::validate_config(&config)?;

    if let Some(dir) = out {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    }

    let tracks = streaming::tracks(&config.synth)?;
    let program_start = config
        .segmenter
        .program_date_time
        .then(chrono::Utc::now);
    let mut publisher = Publisher::new(&config.segmenter, tracks, program_start);

    tracing::info!(seconds, "Packaging synthetic stream");

    let mut exported = None;
    for (track, packet) in SyntheticSource::new(config.synth.clone(), seconds) {
        publisher.write_packet(track, packet)?;
        if let Some(dir) = out {
            exported = export_finalized(&publisher, dir, exported)?;
        }
    }
    publisher.finish()?;

    let playlist = publisher.playlist();
    match out {
        Some(dir) => {
            exported = export_finalized(&publisher, dir, exported)?;
            let path = dir.join("index.m3u8");
            std::fs::write(&path, &playlist)
                .with_context(|| format!("Failed to write playlist: {:?}", path))?;
            let count = exported.map_or(0, |last| last + 1 - config.segmenter.first_segment_id);
            println!("Wrote {} segments to {:?}", count, dir);
        }
        None => print!("{}", playlist),
    }

    Ok(())
}

/// Write segment and part files for finalized segments newer than `last`.
///
/// Returns the id of the newest exported segment.
fn export_finalized(publisher: &Publisher, dir: &Path, last: Option<u64>) -> Result<Option<u64>> {
    let mut last = last;
    for segment in publisher.segments().filter(|s| s.is_final()) {
        if last.is_some_and(|id| segment.id() <= id) {
            continue;
        }
        write_file(dir, &segment_name(segment.id()), &segment.read_all()?)?;
        for part in 0..segment.parts() {
            let name = part_name(segment.id(), part as u32);
            write_file(dir, &name, &segment.read_part(part)?)?;
        }
        tracing::debug!(segment = %segment.base_name(), "exported segment");
        last = Some(segment.id());
    }
    Ok(last)
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {:?}", path))
}

fn describe_name(name: &str) -> Result<()> {
    let parsed =
        parse_name(name).with_context(|| format!("Not a segment or part name: {}", name))?;
    println!("segment: {}", parsed.id);
    match parsed.part {
        Some(part) => println!("part: {}", part),
        None => println!("part: -"),
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_segmenter(&config.segmenter);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            print_segmenter(&config.segmenter);
        }
    }

    Ok(())
}

fn print_segmenter(seg: &config::SegmenterConfig) {
    println!("  Segment duration: {} ms", seg.segment_duration_ms);
    println!("  Part duration: {} ms", seg.part_duration_ms);
    println!("  Window: {} segments", seg.window);
    println!("  Work dir: {:?}", seg.work_dir());
}
