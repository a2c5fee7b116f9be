// ============================================================================
// reelfit-cli/src/commands/mod.rs
// ============================================================================
//
// COMMAND IMPLEMENTATIONS
//
// Each subcommand lives in its own module. Commands that run ffmpeg go
// through `run_pipeline`, which runs the work on a scoped worker thread while
// the calling thread turns pipeline events into progress bars and log lines.

pub mod allocate;
pub mod batch;
pub mod compress;
pub mod concat;
pub mod probe;

use crate::error::CliResult;
use crate::progress::ProgressView;
use crate::terminal::{print_error, print_interrupted, print_status, print_success};

use log::{debug, warn};
use reelfit_core::{
    CancellationToken, CoreConfig, CoreError, ExecutionResult, Pipeline, PipelineEvent, check_dependency,
    format_bytes,
};
use reelfit_core::pipeline::ClipRequest;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::thread;

/// How a command ended, mapped to the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
    Cancelled,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::Failed => 1,
            Outcome::Cancelled => 130,
        }
    }

    /// Failed wins over cancelled, cancelled over success.
    pub fn combine(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Outcome::Failed, _) | (_, Outcome::Failed) => Outcome::Failed,
            (Outcome::Cancelled, _) | (_, Outcome::Cancelled) => Outcome::Cancelled,
            _ => Outcome::Success,
        }
    }
}

impl From<&ExecutionResult> for Outcome {
    fn from(result: &ExecutionResult) -> Self {
        match result {
            ExecutionResult::Success(_) => Outcome::Success,
            ExecutionResult::Error { .. } => Outcome::Failed,
            ExecutionResult::Cancelled => Outcome::Cancelled,
        }
    }
}

/// Clip id derived from the file stem, made unique within one invocation.
fn clip_id(path: &Path, index: usize, taken: &mut HashSet<String>) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("clip{}", index + 1));
    let mut id = stem.clone();
    let mut n = 2;
    while !taken.insert(id.clone()) {
        id = format!("{stem}-{n}");
        n += 1;
    }
    id
}

/// Builds one request per path, in order.
pub fn clip_requests(paths: &[PathBuf]) -> Vec<ClipRequest> {
    let mut taken = HashSet::new();
    paths
        .iter()
        .enumerate()
        .map(|(index, path)| ClipRequest::new(clip_id(path, index, &mut taken), path.clone()))
        .collect()
}

/// Fails early when ffmpeg or ffprobe cannot be started.
pub fn check_tools(config: &CoreConfig) -> CliResult<()> {
    check_dependency(&config.ffprobe_path)?;
    check_dependency(&config.ffmpeg_path)?;
    Ok(())
}

/// Prints the terminal state of one run and maps it to an [`Outcome`].
pub fn report_result(label: &str, result: &ExecutionResult) -> Outcome {
    match result.clone().into_result() {
        Ok(output) => {
            print_success(&format!("{label} finished"));
            print_status("Output", &output.path.display().to_string(), true);
            print_status("URI", &output.uri, false);
            print_status("Size", &format_bytes(output.size_bytes), false);
        }
        Err(CoreError::EngineCancelled) => print_interrupted(&format!("{label} cancelled")),
        Err(e) => print_error(&format!("{label} failed"), &e.to_string()),
    }
    Outcome::from(result)
}

fn log_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::ClipDropped { id, reason } => warn!("Skipping clip '{id}': {reason}"),
        PipelineEvent::Allocated { id, input_duration, target_duration } => {
            debug!("Clip '{id}': keeping {target_duration:.2}s of {input_duration:.2}s")
        }
        PipelineEvent::Stage { stage } => debug!("Stage: {stage:?}"),
        PipelineEvent::Clip { .. } | PipelineEvent::Progress(_) => {}
    }
}

/// Runs `work` against a pipeline built from `config`, showing live progress.
pub fn run_pipeline<T, F>(config: CoreConfig, work: F) -> CliResult<T>
where
    T: Send,
    F: FnOnce(&Pipeline, &CancellationToken) -> CliResult<T> + Send,
{
    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let pipeline = Pipeline::from_config(config).with_events(events_tx);
    let cancel = CancellationToken::new();
    let mut view = ProgressView::new();

    thread::scope(|scope| {
        let worker = scope.spawn(move || work(&pipeline, &cancel));

        // Ends once the worker drops the pipeline and with it the sender.
        for event in events_rx.iter() {
            log_event(&event);
            view.handle(&event);
        }
        view.finish();

        worker
            .join()
            .map_err(|_| CoreError::OperationFailed("pipeline worker panicked".to_string()))?
    })
}
