// reelfit-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use reelfit_core::{Orientation, Resolution};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Reelfit: fit video clips into one bounded-length reel",
    long_about = "Probes clips, shares a duration budget between them, compresses each clip \
                  with ffmpeg and concatenates the results."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE", env = "REELFIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging on the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for run log files (no log file when omitted)
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Parent directory for run-scoped scratch files
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory where deliverables are written
    #[arg(short, long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Application id used to mint content:// URIs
    #[arg(long, global = true, value_name = "ID")]
    pub app_id: Option<String>,

    /// Maximum number of concurrent ffmpeg processes
    #[arg(short, long, global = true, value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-invocation ffmpeg timeout in seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// ffmpeg binary to run
    #[arg(long, global = true, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe binary to run
    #[arg(long, global = true, value_name = "PATH")]
    pub ffprobe: Option<PathBuf>,

    /// Output box, e.g. 1280x720, hd or fhd
    #[arg(long, global = true, value_name = "WxH")]
    pub resolution: Option<Resolution>,

    /// Force the output orientation (horizontal or vertical)
    #[arg(long, global = true, value_name = "ORIENTATION")]
    pub orientation: Option<Orientation>,

    /// Sample long clips as evenly spaced sections instead of cutting the tail
    #[arg(long, global = true)]
    pub split: bool,

    /// Never scale above the best source resolution
    #[arg(long, global = true)]
    pub avoid_upscale: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prints duration, orientation and resolution of clips
    Probe(ProbeArgs),
    /// Shows how a duration budget would be shared between clips
    Allocate(AllocateArgs),
    /// Compresses one clip, capped at a maximum duration
    Compress(CompressArgs),
    /// Compresses several clips independently
    Batch(BatchArgs),
    /// Compresses clips to fit a budget and joins them into one reel
    Concat(ConcatArgs),
}

impl Commands {
    /// Commands printing JSON need stdout for themselves.
    pub fn wants_json(&self) -> bool {
        match self {
            Commands::Probe(args) => args.json,
            Commands::Allocate(args) => args.json,
            Commands::Batch(args) => args.json,
            Commands::Compress(_) | Commands::Concat(_) => false,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Clips to inspect
    #[arg(required = true, value_name = "CLIP")]
    pub clips: Vec<PathBuf>,

    /// Print JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct AllocateArgs {
    /// Clips to probe for their durations
    #[arg(value_name = "CLIP", required_unless_present = "durations", conflicts_with = "durations")]
    pub clips: Vec<PathBuf>,

    /// Comma-separated durations in seconds, instead of probing clips
    #[arg(long, value_delimiter = ',', value_name = "SECONDS")]
    pub durations: Option<Vec<f64>>,

    /// Total budget in seconds (configured default when omitted)
    #[arg(short, long, value_name = "SECONDS")]
    pub max_duration: Option<f64>,

    /// Print JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CompressArgs {
    /// Clip to compress
    #[arg(value_name = "CLIP")]
    pub clip: PathBuf,

    /// Keep at most this many seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub max_duration: Option<f64>,

    /// Extra clockwise rotation in degrees (multiple of 90)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true, value_name = "DEGREES")]
    pub rotate: i32,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Clips to compress
    #[arg(required = true, value_name = "CLIP")]
    pub clips: Vec<PathBuf>,

    /// Keep at most this many seconds of each clip
    #[arg(short, long, value_name = "SECONDS")]
    pub max_duration: Option<f64>,

    /// Print JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConcatArgs {
    /// Clips to join, in order
    #[arg(required = true, value_name = "CLIP")]
    pub clips: Vec<PathBuf>,

    /// Total budget in seconds (configured default when omitted)
    #[arg(short, long, value_name = "SECONDS")]
    pub max_duration: Option<f64>,

    /// Background track looped under the reel
    #[arg(long, value_name = "FILE")]
    pub audio: Option<PathBuf>,

    /// Level of the clips' own audio in percent
    #[arg(long, value_name = "PERCENT")]
    pub clip_volume: Option<u32>,

    /// Level of the background track in percent
    #[arg(long, value_name = "PERCENT")]
    pub track_volume: Option<u32>,

    /// Per-clip rotation as INDEX=DEGREES (1-based), repeatable
    #[arg(long = "rotate", value_name = "INDEX=DEGREES", value_parser = parse_rotation)]
    pub rotations: Vec<(usize, i32)>,
}

/// Parses `INDEX=DEGREES` with a 1-based index.
pub fn parse_rotation(raw: &str) -> Result<(usize, i32), String> {
    let (index, degrees) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=DEGREES, got '{raw}'"))?;
    let index: usize = index
        .trim()
        .parse()
        .map_err(|e| format!("invalid clip index '{index}': {e}"))?;
    if index == 0 {
        return Err("clip indices start at 1".to_string());
    }
    let degrees: i32 = degrees
        .trim()
        .parse()
        .map_err(|e| format!("invalid rotation '{degrees}': {e}"))?;
    Ok((index, degrees))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_concat_with_audio_and_rotations() {
        let cli = Cli::parse_from([
            "reelfit", "concat", "a.mp4", "b.mov", "--audio", "song.m4a", "--rotate", "2=90",
            "--max-duration", "45", "--jobs", "3",
        ]);

        assert_eq!(cli.global.jobs, Some(3));
        match cli.command {
            Commands::Concat(args) => {
                assert_eq!(args.clips, vec![PathBuf::from("a.mp4"), PathBuf::from("b.mov")]);
                assert_eq!(args.audio, Some(PathBuf::from("song.m4a")));
                assert_eq!(args.rotations, vec![(2, 90)]);
                assert_eq!(args.max_duration, Some(45.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parse_allocate_durations() {
        let cli = Cli::parse_from(["reelfit", "allocate", "--durations", "40,10,5", "-m", "30"]);
        match cli.command {
            Commands::Allocate(args) => {
                assert_eq!(args.durations, Some(vec![40.0, 10.0, 5.0]));
                assert!(args.clips.is_empty());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = Cli::parse_from([
            "reelfit", "compress", "clip.mp4", "--resolution", "fhd", "--orientation", "vertical", "-v",
        ]);
        assert!(cli.global.verbose);
        assert_eq!(cli.global.resolution, Some(Resolution::FHD));
        assert_eq!(cli.global.orientation, Some(Orientation::Vertical));
    }

    #[test]
    fn rotation_spec_is_validated() {
        assert_eq!(parse_rotation("1=-90"), Ok((1, -90)));
        assert!(parse_rotation("0=90").is_err());
        assert!(parse_rotation("90").is_err());
    }
}
