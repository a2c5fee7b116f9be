//! Core library for fitting a set of video clips into one bounded-length
//! compilation using ffmpeg and ffprobe.
//!
//! The crate probes clips, shares a total duration budget fairly between
//! them, plans and runs one ffmpeg compression per clip on a bounded worker
//! pool, and concatenates the results in input order.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use reelfit_core::{CancellationToken, ClipRequest, CoreConfigBuilder, Pipeline};
//! use std::path::PathBuf;
//!
//! let config = CoreConfigBuilder::new()
//!     .output_dir(PathBuf::from("/path/to/output"))
//!     .max_total_duration(60.0)
//!     .build()
//!     .unwrap();
//!
//! let clips = vec![
//!     ClipRequest::new("intro", "/path/to/intro.mp4"),
//!     ClipRequest::new("party", "/path/to/party.mov").with_rotation(90),
//! ];
//!
//! let pipeline = Pipeline::from_config(config);
//! let result = pipeline
//!     .compress_and_concat(&clips, None, None, &CancellationToken::new())
//!     .unwrap();
//! println!("{result:?}");
//! ```

pub mod allocation;
pub mod config;
pub mod error;
pub mod external;
pub mod media;
pub mod output;
pub mod pipeline;
pub mod planning;
pub mod progress;
pub mod utils;
pub mod workspace;

// Re-exports for public API
pub use allocation::{AllocationResult, allocate, allocate_durations, allocate_single};
pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{CoreError, CoreResult};
pub use external::{
    CancellationToken, EngineCommand, ExecutionHandle, ExecutionResult, ProcessExecutor,
    check_dependency,
};
pub use media::{ClipInput, FfprobeProber, MediaProber, Orientation, ProbeData, probe_clip};
pub use output::{OutputLocator, VideoOutput};
pub use pipeline::{BatchReport, ClipOutcome, ClipRequest, Pipeline, PipelineEvent, PipelineStage};
pub use planning::{CompressionPlan, ConcatPlan, Resolution, plan_compression};
pub use progress::ExecutionProgress;
pub use utils::{format_bytes, format_duration, format_seconds};
