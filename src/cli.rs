use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "llhls")]
#[command(author, version, about = "Low-latency HLS fragmenter and segmenter")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Package a synthetic stream into LL-HLS segments
    Synth {
        /// Seconds of media to generate
        #[arg(short, long, default_value = "10")]
        seconds: u64,

        /// Directory to write the playlist, segments and parts to
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Decode a segment or part file name
    ParseName {
        /// File name such as `3k.m4s` or `3k.2.m4s`
        name: String,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
