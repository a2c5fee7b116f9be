// ============================================================================
// reelfit-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// KEY COMPONENTS:
// - FfmpegProcess: Trait representing an active FFmpeg process
// - FfmpegSpawner: Trait for creating new FFmpeg processes
// - SidecarSpawner: Concrete implementation using ffmpeg-sidecar
//
// Processes are driven from worker threads, so both traits are object-safe
// and `Send`. The event stream is taken out of the process so one thread can
// drain it while another decides whether to kill the child.

use crate::error::{CoreResult, command_failed_error, command_start_error, command_wait_error};
use crate::external::ffmpeg_builder::EngineCommand;

use ffmpeg_sidecar::child::FfmpegChild as SidecarChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Boxed stream of ffmpeg events.
pub type FfmpegEvents = Box<dyn Iterator<Item = FfmpegEvent> + Send>;

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess: Send {
    /// Takes the event stream. The stream ends when ffmpeg closes stderr.
    fn take_events(&mut self) -> CoreResult<FfmpegEvents>;

    /// Terminates the process.
    fn kill(&mut self) -> CoreResult<()>;

    /// Waits for the command to complete and returns its exit status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;
}

/// Trait representing something that can spawn an FfmpegProcess.
pub trait FfmpegSpawner: Send + Sync {
    fn spawn(&self, command: &EngineCommand) -> CoreResult<Box<dyn FfmpegProcess>>;
}

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `FfmpegProcess`.
pub struct SidecarProcess(SidecarChild);

impl FfmpegProcess for SidecarProcess {
    fn take_events(&mut self) -> CoreResult<FfmpegEvents> {
        let iterator = self.0.iter().map_err(|e| {
            log::error!("Failed to get ffmpeg event iterator: {}", e);
            command_failed_error("ffmpeg (sidecar - get iter)", ExitStatus::default(), e.to_string())
        })?;
        Ok(Box::new(iterator))
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.0
            .kill()
            .map_err(|e| command_wait_error("ffmpeg (sidecar - kill)", e))
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0
            .wait()
            .map_err(|e| command_wait_error("ffmpeg (sidecar)", e))
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone)]
pub struct SidecarSpawner {
    ffmpeg_path: PathBuf,
}

impl Default for SidecarSpawner {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl SidecarSpawner {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl FfmpegSpawner for SidecarSpawner {
    fn spawn(&self, command: &EngineCommand) -> CoreResult<Box<dyn FfmpegProcess>> {
        let mut cmd = FfmpegCommand::new_with_path(&self.ffmpeg_path);
        cmd.args(command.args());
        log::debug!("Spawning: {}", command);
        let child = cmd
            .spawn()
            .map_err(|e| command_start_error(self.ffmpeg_path.to_string_lossy(), e))?;
        Ok(Box::new(SidecarProcess(child)))
    }
}
