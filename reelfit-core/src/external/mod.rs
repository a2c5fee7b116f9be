// ============================================================================
// reelfit-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: everything that touches the ffmpeg binary
//
// KEY COMPONENTS:
// - ffmpeg_builder: EngineCommand and the compression/concat argument builders
// - ffmpeg_executor: FfmpegProcess / FfmpegSpawner traits over ffmpeg-sidecar
// - executor: ProcessExecutor with cancellation, timeout and tri-state results
// - mocks: test doubles for the spawner and the prober
// - check_dependency: verifies a tool is installed before a run

use crate::error::{CoreError, CoreResult};

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

pub mod executor;
pub mod ffmpeg_builder;
pub mod ffmpeg_executor;

#[cfg(all(unix, any(test, feature = "test-mocks")))]
pub mod mocks;

pub use executor::{
    CancellationToken, ENGINE_CANCEL_EXIT_CODE, ExecutionHandle, ExecutionResult, ProcessExecutor,
};
pub use ffmpeg_builder::{
    EngineCommand, EngineCommandBuilder, build_compression, build_concat, concat_list_contents,
};
pub use ffmpeg_executor::{FfmpegEvents, FfmpegProcess, FfmpegSpawner, SidecarProcess, SidecarSpawner};

/// Checks that an external command exists by running it with `-version`.
pub fn check_dependency(cmd: &Path) -> CoreResult<()> {
    let result = Command::new(cmd)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {}", cmd.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{}' not found.", cmd.display());
            Err(CoreError::DependencyNotFound(cmd.display().to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{}': {}", cmd.display(), e);
            Err(CoreError::CommandStart(cmd.display().to_string(), e))
        }
    }
}
