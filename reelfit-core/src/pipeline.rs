// ============================================================================
// reelfit-core/src/pipeline.rs
// ============================================================================
//
// PIPELINE: probe -> allocate -> compress in parallel -> concatenate
//
// The orchestrator owns a run from a list of input clips to one deliverable.
// Probing is sequential; compression fans out over a bounded rayon pool; the
// concatenation starts only once every compression task is terminal and
// always lists the intermediates in input order.
//
// KEY COMPONENTS:
// - Pipeline: configured orchestrator (prober, spawner, optional event sink)
// - PipelineEvent: stage and per-clip state changes plus engine progress
// - compress_and_concat / compress_single / compress_many
// - BatchReport: per-clip results of an independent batch

use crate::allocation::{allocate_single, allocate_with_cap};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::executor::{CancellationToken, ExecutionResult, ProcessExecutor};
use crate::external::ffmpeg_builder::{EngineCommand, build_compression, build_concat};
use crate::external::ffmpeg_executor::{FfmpegSpawner, SidecarSpawner};
use crate::media::{ClipInput, FfprobeProber, MediaProber, probe_clip};
use crate::planning::{
    AudioOverlay, CompressionPlan, ConcatPlan, PlannerSettings, capped_target_resolution,
    majority_orientation, plan_compression,
};
use crate::progress::ExecutionProgress;
use crate::workspace::RunWorkspace;

use crossbeam_channel::Sender;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

/// Identifier used for the concatenation step's engine run.
pub const CONCAT_TASK_ID: &str = "concat";

/// One clip as requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipRequest {
    pub id: String,
    pub path: PathBuf,
    /// Extra rotation chosen by the user, in degrees.
    pub user_rotation_degrees: i32,
}

impl ClipRequest {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            user_rotation_degrees: 0,
        }
    }

    #[must_use]
    pub fn with_rotation(mut self, degrees: i32) -> Self {
        self.user_rotation_degrees = degrees;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Probing,
    Allocating,
    Compressing,
    Concatenating,
    Done,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipState {
    Pending,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl From<&ExecutionResult> for ClipState {
    fn from(result: &ExecutionResult) -> Self {
        match result {
            ExecutionResult::Success(_) => ClipState::Done,
            ExecutionResult::Error { .. } => ClipState::Failed,
            ExecutionResult::Cancelled => ClipState::Cancelled,
        }
    }
}

/// Observable state changes of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Stage { stage: PipelineStage },
    ClipDropped { id: String, reason: String },
    Allocated { id: String, input_duration: f64, target_duration: f64 },
    Clip { id: String, state: ClipState },
    Progress(ExecutionProgress),
}

/// Result of one clip in an independent batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipOutcome {
    pub id: String,
    pub result: ExecutionResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<ClipOutcome>,
}

impl BatchReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(|r| matches!(r, ExecutionResult::Success(_)))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r, ExecutionResult::Error { .. }))
    }

    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.count(|r| matches!(r, ExecutionResult::Cancelled))
    }

    fn count(&self, predicate: impl Fn(&ExecutionResult) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.result)).count()
    }
}

/// Reduces per-clip results: the first error in input order wins, then any
/// cancellation. `None` means every clip succeeded.
#[must_use]
pub fn aggregate_results<'a>(
    results: impl IntoIterator<Item = (&'a str, &'a ExecutionResult)>,
) -> Option<ExecutionResult> {
    let mut cancelled = false;
    for (id, result) in results {
        match result {
            ExecutionResult::Error { message } => {
                return Some(ExecutionResult::Error {
                    message: format!("clip '{id}': {message}"),
                });
            }
            ExecutionResult::Cancelled => cancelled = true,
            ExecutionResult::Success(_) => {}
        }
    }
    cancelled.then_some(ExecutionResult::Cancelled)
}

/// Orchestrates probing, allocation, compression and concatenation.
pub struct Pipeline {
    config: CoreConfig,
    prober: Arc<dyn MediaProber>,
    spawner: Arc<dyn FfmpegSpawner>,
    events: Option<Sender<PipelineEvent>>,
}

impl Pipeline {
    pub fn new(config: CoreConfig, prober: Arc<dyn MediaProber>, spawner: Arc<dyn FfmpegSpawner>) -> Self {
        Self {
            config,
            prober,
            spawner,
            events: None,
        }
    }

    /// Pipeline backed by the configured ffprobe and ffmpeg binaries.
    pub fn from_config(config: CoreConfig) -> Self {
        let prober = Arc::new(FfprobeProber::new(config.ffprobe_path.clone()));
        let spawner = Arc::new(SidecarSpawner::new(config.ffmpeg_path.clone()));
        Self::new(config, prober, spawner)
    }

    #[must_use]
    pub fn with_events(mut self, events: Sender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Compresses every clip to fit `max_total_duration` (the configured
    /// budget when `None`) and joins them into one deliverable.
    ///
    /// Fatal setup problems (no usable clip, unwritable directories) are
    /// returned as `Err`; engine outcomes come back as an [`ExecutionResult`].
    pub fn compress_and_concat(
        &self,
        requests: &[ClipRequest],
        max_total_duration: Option<f64>,
        audio_track: Option<PathBuf>,
        cancel: &CancellationToken,
    ) -> CoreResult<ExecutionResult> {
        let budget = max_total_duration.unwrap_or(self.config.max_total_duration);
        info!("Starting compilation of {} clips within {:.1}s", requests.len(), budget);

        self.emit_stage(PipelineStage::Probing);
        let clips = self.probe_all(requests);
        if clips.is_empty() {
            self.emit_stage(PipelineStage::Failed);
            return Err(CoreError::PlanningInvariant("no input clip could be probed".to_string()));
        }
        if cancel.is_cancelled() {
            return Ok(self.finish(ExecutionResult::Cancelled));
        }

        self.emit_stage(PipelineStage::Allocating);
        let allocations = allocate_with_cap(&clips, budget, self.config.allocation_iteration_cap)?;
        if allocations.is_empty() {
            self.emit_stage(PipelineStage::Failed);
            return Err(CoreError::PlanningInvariant(
                "no input clip has a usable duration".to_string(),
            ));
        }
        for clip in &clips {
            if !allocations.iter().any(|a| a.clip.id == clip.id) {
                self.emit(PipelineEvent::ClipDropped {
                    id: clip.id.clone(),
                    reason: format!("unusable duration {}", clip.duration_seconds),
                });
            }
        }
        for allocation in &allocations {
            self.emit(PipelineEvent::Allocated {
                id: allocation.clip.id.clone(),
                input_duration: allocation.input_duration,
                target_duration: allocation.target_duration,
            });
        }

        let kept: Vec<ClipInput> = allocations.iter().map(|a| a.clip.clone()).collect();
        let orientation = self
            .config
            .target_orientation
            .unwrap_or_else(|| majority_orientation(&kept));
        let settings = self.planner_settings(&kept);
        info!("Compilation output: {} {}", settings.target_resolution, orientation);

        let workspace = RunWorkspace::create(&self.config.cache_dir, &self.config.output_dir)?;
        let executor = self.executor(&workspace);

        let plans = allocations
            .iter()
            .enumerate()
            .map(|(position, allocation)| {
                plan_compression(
                    &allocation.clip,
                    workspace.compressed_path(position, &allocation.clip.id),
                    Some(orientation),
                    Some(allocation.target_duration),
                    &settings,
                )
            })
            .collect::<CoreResult<Vec<CompressionPlan>>>()?;

        self.emit_stage(PipelineStage::Compressing);
        let results = self.run_plans(&executor, &plans, cancel)?;

        let aggregated = aggregate_results(
            plans.iter().map(|p| p.clip_id.as_str()).zip(results.iter()),
        );
        if let Some(outcome) = aggregated {
            return Ok(self.finish(outcome));
        }
        if cancel.is_cancelled() {
            return Ok(self.finish(ExecutionResult::Cancelled));
        }

        self.emit_stage(PipelineStage::Concatenating);
        let inputs: Vec<PathBuf> = results
            .iter()
            .filter_map(|r| r.output().map(|o| o.path.clone()))
            .collect();
        let overlay = audio_track.map(|track_path| AudioOverlay {
            track_path,
            clip_volume_percent: self.config.clip_volume_percent,
            track_volume_percent: self.config.track_volume_percent,
        });
        let concat_plan = ConcatPlan::new(
            &inputs,
            overlay,
            workspace.concat_list_path(),
            workspace.deliverable_path("reel"),
        )?;
        let command = build_concat(&concat_plan)?;
        let expected: f64 = allocations.iter().map(|a| a.target_duration).sum();
        let result = self.run_with_progress(&executor, CONCAT_TASK_ID, &command, cancel, Some(expected));

        Ok(self.finish(result))
    }

    /// Compresses one clip on its own, capped at `max_duration`.
    pub fn compress_single(
        &self,
        request: &ClipRequest,
        max_duration: Option<f64>,
        cancel: &CancellationToken,
    ) -> CoreResult<ExecutionResult> {
        self.emit_stage(PipelineStage::Probing);
        let clip = probe_clip(self.prober.as_ref(), request.id.clone(), &request.path, request.user_rotation_degrees)?;
        let target = single_target(&clip, max_duration.unwrap_or(self.config.max_total_duration));

        let workspace = RunWorkspace::create(&self.config.cache_dir, &self.config.output_dir)?;
        let executor = self.executor(&workspace);
        let settings = self.planner_settings(std::slice::from_ref(&clip));
        let plan = plan_compression(
            &clip,
            workspace.deliverable_path(&clip.id),
            self.config.target_orientation,
            target,
            &settings,
        )?;

        self.emit_stage(PipelineStage::Compressing);
        let result = self.run_plan(&executor, &plan, cancel);
        Ok(self.finish(result))
    }

    /// Compresses each clip independently; nothing is concatenated.
    ///
    /// A clip that cannot be probed or planned is reported as `Error`
    /// without affecting the others.
    pub fn compress_many(
        &self,
        requests: &[ClipRequest],
        max_duration: Option<f64>,
        cancel: &CancellationToken,
    ) -> CoreResult<BatchReport> {
        let cap = max_duration.unwrap_or(self.config.max_total_duration);
        let workspace = RunWorkspace::create(&self.config.cache_dir, &self.config.output_dir)?;
        let executor = self.executor(&workspace);

        self.emit_stage(PipelineStage::Probing);
        let planned: Vec<Result<CompressionPlan, String>> = requests
            .iter()
            .map(|request| {
                let clip = probe_clip(
                    self.prober.as_ref(),
                    request.id.clone(),
                    &request.path,
                    request.user_rotation_degrees,
                )?;
                let settings = self.planner_settings(std::slice::from_ref(&clip));
                plan_compression(
                    &clip,
                    workspace.deliverable_path(&clip.id),
                    self.config.target_orientation,
                    single_target(&clip, cap),
                    &settings,
                )
            })
            .map(|planned| planned.map_err(|e| e.to_string()))
            .collect();

        self.emit_stage(PipelineStage::Compressing);
        let pool = self.thread_pool()?;
        let results: Vec<ExecutionResult> = pool.install(|| {
            planned
                .par_iter()
                .map(|planned| match planned {
                    Ok(plan) => self.run_plan(&executor, plan, cancel),
                    Err(message) => ExecutionResult::Error { message: message.clone() },
                })
                .collect()
        });

        let report = BatchReport {
            outcomes: requests
                .iter()
                .zip(results)
                .map(|(request, result)| ClipOutcome {
                    id: request.id.clone(),
                    result,
                })
                .collect(),
        };
        info!(
            "Batch finished: {} succeeded, {} failed, {} cancelled",
            report.succeeded(),
            report.failed(),
            report.cancelled()
        );
        self.emit_stage(PipelineStage::Done);
        Ok(report)
    }

    fn probe_all(&self, requests: &[ClipRequest]) -> Vec<ClipInput> {
        requests
            .iter()
            .filter_map(|request| {
                match probe_clip(
                    self.prober.as_ref(),
                    request.id.clone(),
                    &request.path,
                    request.user_rotation_degrees,
                ) {
                    Ok(clip) => Some(clip),
                    Err(e) => {
                        warn!("Dropping clip '{}': {}", request.id, e);
                        self.emit(PipelineEvent::ClipDropped {
                            id: request.id.clone(),
                            reason: e.to_string(),
                        });
                        None
                    }
                }
            })
            .collect()
    }

    fn planner_settings(&self, clips: &[ClipInput]) -> PlannerSettings {
        let mut settings = PlannerSettings::from(&self.config);
        if self.config.avoid_upscale {
            settings.target_resolution = capped_target_resolution(settings.target_resolution, clips);
        }
        settings
    }

    fn executor(&self, workspace: &RunWorkspace) -> ProcessExecutor {
        ProcessExecutor::new(Arc::clone(&self.spawner), workspace.locator(self.config.app_id.clone()))
            .with_poll_interval(self.config.poll_interval())
            .with_timeout(self.config.engine_timeout())
    }

    fn thread_pool(&self) -> CoreResult<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_parallel_jobs.max(1))
            .build()
            .map_err(|e| CoreError::OperationFailed(format!("Failed to initialize thread pool: {e}")))
    }

    /// Runs every plan on the pool; results keep plan order.
    ///
    /// The first plan that ends in `Error` or `Cancelled` aborts the run:
    /// engines already running may finish, but plans not yet started are
    /// skipped and reported as `Cancelled`.
    fn run_plans(
        &self,
        executor: &ProcessExecutor,
        plans: &[CompressionPlan],
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<ExecutionResult>> {
        for plan in plans {
            self.emit(PipelineEvent::Clip {
                id: plan.clip_id.clone(),
                state: ClipState::Pending,
            });
        }
        let pool = self.thread_pool()?;
        debug!("Compressing {} clips on {} workers", plans.len(), pool.current_num_threads());
        let abort = CancellationToken::new();
        Ok(pool.install(|| {
            plans
                .par_iter()
                .map(|plan| {
                    if abort.is_cancelled() {
                        debug!("[{}] skipped after an earlier clip stopped the run", plan.clip_id);
                        self.emit(PipelineEvent::Clip {
                            id: plan.clip_id.clone(),
                            state: ClipState::Cancelled,
                        });
                        return ExecutionResult::Cancelled;
                    }
                    let result = self.run_plan(executor, plan, cancel);
                    if !result.is_success() {
                        abort.cancel();
                    }
                    result
                })
                .collect()
        }))
    }

    fn run_plan(&self, executor: &ProcessExecutor, plan: &CompressionPlan, cancel: &CancellationToken) -> ExecutionResult {
        self.emit(PipelineEvent::Clip {
            id: plan.clip_id.clone(),
            state: ClipState::Running,
        });
        let command = build_compression(plan);
        let result = self.run_with_progress(executor, &plan.clip_id, &command, cancel, planned_duration(plan));
        self.emit(PipelineEvent::Clip {
            id: plan.clip_id.clone(),
            state: ClipState::from(&result),
        });
        result
    }

    fn run_with_progress(
        &self,
        executor: &ProcessExecutor,
        id: &str,
        command: &EngineCommand,
        cancel: &CancellationToken,
        expected_duration: Option<f64>,
    ) -> ExecutionResult {
        let Some(events) = &self.events else {
            return executor.run_sync(id, command, cancel, expected_duration, None);
        };

        let (progress_tx, progress_rx) = crossbeam_channel::unbounded();
        thread::scope(|scope| {
            scope.spawn(move || {
                for update in progress_rx {
                    let _ = events.send(PipelineEvent::Progress(update));
                }
            });
            let result = executor.run_sync(id, command, cancel, expected_duration, Some(&progress_tx));
            // Closes the channel so the forwarder exits before the scope joins it.
            drop(progress_tx);
            result
        })
    }

    fn finish(&self, result: ExecutionResult) -> ExecutionResult {
        let stage = match &result {
            ExecutionResult::Success(output) => {
                info!("Run finished: {} ({} bytes)", output.path.display(), output.size_bytes);
                PipelineStage::Done
            }
            ExecutionResult::Error { message } => {
                warn!("Run failed: {message}");
                PipelineStage::Failed
            }
            ExecutionResult::Cancelled => {
                info!("Run cancelled");
                PipelineStage::Cancelled
            }
        };
        self.emit_stage(stage);
        result
    }

    fn emit_stage(&self, stage: PipelineStage) {
        debug!("Pipeline stage: {stage:?}");
        self.emit(PipelineEvent::Stage { stage });
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

/// Time cap for a clip compressed on its own. A clip of unknown length is
/// still cut at `cap`.
fn single_target(clip: &ClipInput, cap: f64) -> Option<f64> {
    let target = allocate_single(Some(clip.duration_seconds), cap);
    if target.is_none() {
        warn!("Clip '{}' has no known duration; capping it at {cap:.1}s", clip.id);
    }
    Some(target.unwrap_or(cap))
}

/// Seconds of output a plan is expected to produce, when known.
fn planned_duration(plan: &CompressionPlan) -> Option<f64> {
    plan.splitting
        .as_ref()
        .map(|split| split.total_duration())
        .or(plan.target_duration)
}
