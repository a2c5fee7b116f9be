// ============================================================================
// reelfit-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error types for the reelfit core library
//
// KEY COMPONENTS:
// - CoreError: every failure the library can report
// - CoreResult: result alias used throughout the crate
// - Helper constructors for subprocess failures

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors produced by the reelfit core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A clip could not be inspected. The pipeline drops the clip and carries on.
    #[error("Failed to probe '{}': {message}", path.display())]
    ProbeFailure { path: PathBuf, message: String },

    /// Invalid inputs detected before any engine invocation.
    #[error("Planning error: {0}")]
    PlanningInvariant(String),

    /// The engine ran and failed; the message carries its diagnostics verbatim.
    #[error("Engine failure: {0}")]
    EngineFailure(String),

    #[error("Engine run was cancelled")]
    EngineCancelled,

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, io::Error),

    #[error("Failed waiting for command '{0}': {1}")]
    CommandWait(String, io::Error),

    #[error("Command '{0}' failed with status {1}: {2}")]
    CommandFailed(String, ExitStatus, String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Required external tool '{0}' was not found")]
    DependencyNotFound(String),

    #[error("{0}")]
    OperationFailed(String),
}

/// Result type used across reelfit-core.
pub type CoreResult<T> = Result<T, CoreError>;

/// Builds a `CommandStart` error for a process that could not be spawned.
pub fn command_start_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

/// Builds a `CommandWait` error for a process whose exit could not be collected.
pub fn command_wait_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandWait(cmd.into(), err)
}

/// Builds a `CommandFailed` error from a non-zero exit and its stderr.
pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed(cmd.into(), status, stderr.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_failure_names_the_path() {
        let err = CoreError::ProbeFailure {
            path: PathBuf::from("/clips/a.mp4"),
            message: "no video stream".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to probe '/clips/a.mp4': no video stream");
    }

    #[test]
    fn io_errors_convert() {
        let err: CoreError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
