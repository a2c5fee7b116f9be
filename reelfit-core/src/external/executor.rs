// ============================================================================
// reelfit-core/src/external/executor.rs
// ============================================================================
//
// PROCESS EXECUTOR: one engine invocation, one terminal result
//
// Runs an EngineCommand through an FfmpegSpawner and maps the outcome to an
// ExecutionResult. While the engine runs, a reader thread forwards its events
// over a channel; the driving loop wakes at least every poll interval to
// check the cancellation token and the timeout, and kills the child when
// either fires.
//
// KEY COMPONENTS:
// - CancellationToken: shared flag observed by every in-flight invocation
// - ExecutionResult: Success / Error / Cancelled
// - ProcessExecutor::run_sync and ::run_async
// - ExecutionHandle: progress receiver, result receiver, cancel()

use crate::error::{CoreError, CoreResult};
use crate::external::ffmpeg_builder::EngineCommand;
use crate::external::ffmpeg_executor::FfmpegSpawner;
use crate::output::{OutputLocator, VideoOutput};
use crate::progress::{ExecutionProgress, FfmpegProgressHandler};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// ffmpeg's exit code when interrupted (SIGINT / `q`).
pub const ENGINE_CANCEL_EXIT_CODE: i32 = 255;

/// Cooperative cancellation flag shared across threads.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Terminal outcome of one engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionResult {
    Success(VideoOutput),
    Error { message: String },
    Cancelled,
}

impl ExecutionResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success(_))
    }

    #[must_use]
    pub fn output(&self) -> Option<&VideoOutput> {
        match self {
            ExecutionResult::Success(output) => Some(output),
            _ => None,
        }
    }

    /// Converts into a `Result` for callers that propagate with `?`.
    /// Errors become [`CoreError::EngineFailure`], cancellation
    /// [`CoreError::EngineCancelled`].
    pub fn into_result(self) -> CoreResult<VideoOutput> {
        match self {
            ExecutionResult::Success(output) => Ok(output),
            ExecutionResult::Error { message } => Err(CoreError::EngineFailure(message)),
            ExecutionResult::Cancelled => Err(CoreError::EngineCancelled),
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        ExecutionResult::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Cancelled,
    TimedOut,
}

/// Runs engine commands and classifies their outcome.
#[derive(Clone)]
pub struct ProcessExecutor {
    spawner: Arc<dyn FfmpegSpawner>,
    locator: OutputLocator,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(spawner: Arc<dyn FfmpegSpawner>, locator: OutputLocator) -> Self {
        Self {
            spawner,
            locator,
            poll_interval: Duration::from_millis(crate::config::DEFAULT_POLL_INTERVAL_MS),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Kills runs exceeding `timeout`; they report `Error`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn locator(&self) -> &OutputLocator {
        &self.locator
    }

    /// Runs `command` to completion on the calling thread.
    ///
    /// `expected_duration` (seconds of output) turns progress into a
    /// percentage. Progress updates go to `progress` when given.
    pub fn run_sync(
        &self,
        id: &str,
        command: &EngineCommand,
        cancel: &CancellationToken,
        expected_duration: Option<f64>,
        progress: Option<&Sender<ExecutionProgress>>,
    ) -> ExecutionResult {
        if cancel.is_cancelled() {
            debug!("[{id}] cancelled before start");
            return ExecutionResult::Cancelled;
        }

        debug!("[{id}] running: {command}");
        let mut process = match self.spawner.spawn(command) {
            Ok(process) => process,
            Err(e) => return ExecutionResult::error(e.to_string()),
        };

        let events = match process.take_events() {
            Ok(events) => events,
            Err(e) => {
                let _ = process.kill();
                let _ = process.wait();
                return ExecutionResult::error(e.to_string());
            }
        };

        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let reader = thread::spawn(move || {
            for event in events {
                if event_tx.send(event).is_err() {
                    break;
                }
            }
        });

        let mut handler = FfmpegProgressHandler::new(id, expected_duration);
        let started = Instant::now();
        let mut stop: Option<StopReason> = None;

        loop {
            match event_rx.recv_timeout(self.poll_interval) {
                Ok(event) => {
                    if let (Some(update), Some(tx)) = (handler.handle_event(event), progress) {
                        // A dropped receiver only means nobody is watching.
                        let _ = tx.send(update);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if stop.is_none() {
                if cancel.is_cancelled() {
                    stop = Some(StopReason::Cancelled);
                } else if self.timeout.is_some_and(|t| started.elapsed() >= t) {
                    stop = Some(StopReason::TimedOut);
                }
                if let Some(reason) = stop {
                    info!("[{id}] stopping engine: {reason:?}");
                    if let Err(e) = process.kill() {
                        warn!("[{id}] failed to kill engine: {e}");
                    }
                }
            }
        }

        if reader.join().is_err() {
            warn!("[{id}] event reader thread panicked");
        }
        let status = process.wait();

        match stop {
            Some(StopReason::Cancelled) => return ExecutionResult::Cancelled,
            Some(StopReason::TimedOut) => {
                let limit = self.timeout.unwrap_or_default();
                return ExecutionResult::error(format!("engine timed out after {limit:?}"));
            }
            None => {}
        }

        let status = match status {
            Ok(status) => status,
            Err(e) => return ExecutionResult::error(e.to_string()),
        };

        if status.success() {
            return self.collect_output(id, command);
        }

        if status.code() == Some(ENGINE_CANCEL_EXIT_CODE) || cancel.is_cancelled() {
            return ExecutionResult::Cancelled;
        }

        let tail = handler.error_tail();
        let message = if tail.is_empty() {
            format!("ffmpeg exited with {status}")
        } else {
            format!("ffmpeg exited with {status}: {tail}")
        };
        warn!("[{id}] {message}");
        ExecutionResult::Error { message }
    }

    /// Starts `command` on a background thread.
    pub fn run_async(
        &self,
        id: &str,
        command: EngineCommand,
        cancel: CancellationToken,
        expected_duration: Option<f64>,
    ) -> ExecutionHandle {
        let (progress_tx, progress_rx) = crossbeam_channel::unbounded();
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        let executor = self.clone();
        let thread_id = id.to_string();
        let thread_cancel = cancel.clone();

        let worker = thread::spawn(move || {
            let result = executor.run_sync(
                &thread_id,
                &command,
                &thread_cancel,
                expected_duration,
                Some(&progress_tx),
            );
            let _ = result_tx.send(result);
        });

        ExecutionHandle {
            id: id.to_string(),
            progress: progress_rx,
            result: result_rx,
            cancel,
            worker: Some(worker),
        }
    }

    fn collect_output(&self, id: &str, command: &EngineCommand) -> ExecutionResult {
        let path = command.output_path();
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {
                let output = self.locator.locate(id, path, meta.len());
                debug!("[{id}] produced {} ({} bytes)", path.display(), meta.len());
                ExecutionResult::Success(output)
            }
            Ok(_) => ExecutionResult::error(format!(
                "engine reported success but {} is empty",
                path.display()
            )),
            Err(e) => ExecutionResult::error(format!(
                "engine reported success but {} is missing: {e}",
                path.display()
            )),
        }
    }
}

/// Handle to an engine invocation running in the background.
pub struct ExecutionHandle {
    id: String,
    progress: Receiver<ExecutionProgress>,
    result: Receiver<ExecutionResult>,
    cancel: CancellationToken,
    worker: Option<thread::JoinHandle<()>>,
}

impl ExecutionHandle {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Progress updates; the channel closes once the run is terminal.
    #[must_use]
    pub fn progress(&self) -> &Receiver<ExecutionProgress> {
        &self.progress
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Non-blocking check for the terminal result.
    pub fn try_result(&mut self) -> Option<ExecutionResult> {
        match self.result.try_recv() {
            Ok(result) => {
                self.join_worker();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.lost()),
        }
    }

    /// Blocks until the terminal result is available.
    pub fn wait(mut self) -> ExecutionResult {
        let result = self.result.recv().unwrap_or_else(|_| self.lost());
        self.join_worker();
        result
    }

    fn lost(&self) -> ExecutionResult {
        ExecutionResult::error(format!("execution worker for '{}' exited without a result", self.id))
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("[{}] execution worker panicked", self.id);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::external::ffmpeg_builder::EngineCommandBuilder;
    use crate::external::mocks::MockFfmpegSpawner;
    use ffmpeg_sidecar::event::{FfmpegEvent, FfmpegProgress};
    use std::path::Path;
    use tempfile::tempdir;

    fn command(output: &Path) -> EngineCommand {
        EngineCommandBuilder::new()
            .input(Path::new("/clips/a.mp4"))
            .output(output)
    }

    fn executor(spawner: &MockFfmpegSpawner) -> ProcessExecutor {
        ProcessExecutor::new(Arc::new(spawner.clone()), OutputLocator::new(None))
            .with_poll_interval(Duration::from_millis(5))
    }

    fn progress_at(time: &str) -> FfmpegEvent {
        FfmpegEvent::Progress(FfmpegProgress {
            frame: 60,
            fps: 30.0,
            q: 0.0,
            size_kb: 512,
            time: time.to_string(),
            bitrate_kbps: 1500.0,
            speed: 1.5,
            raw_log_message: String::new(),
        })
    }

    #[test]
    fn success_reports_output_and_progress() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("a.mp4");
        let spawner = MockFfmpegSpawner::new();
        spawner.add_success_expectation("a.mp4", vec![progress_at("00:00:05.00")], true);

        let (tx, rx) = crossbeam_channel::unbounded();
        let result = executor(&spawner).run_sync("a", &command(&out), &CancellationToken::new(), Some(10.0), Some(&tx));

        let output = result.output().expect("success");
        assert_eq!(output.path, out);
        assert!(output.size_bytes > 0);
        assert!(output.uri.starts_with("file:///"));
        assert_eq!(rx.try_recv().unwrap().percent, Some(50.0));
        assert_eq!(spawner.get_received_calls().len(), 1);
    }

    #[test]
    fn failure_carries_error_tail() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("a.mp4");
        let spawner = MockFfmpegSpawner::new();
        spawner.add_exit_error_expectation(
            "a.mp4",
            vec![FfmpegEvent::Error("Invalid data found when processing input".to_string())],
            1,
        );

        match executor(&spawner).run_sync("a", &command(&out), &CancellationToken::new(), None, None) {
            ExecutionResult::Error { message } => {
                assert!(message.contains("Invalid data found"), "{message}");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn interrupted_exit_code_is_cancelled() {
        let dir = tempdir().unwrap();
        let spawner = MockFfmpegSpawner::new();
        spawner.add_exit_error_expectation("a.mp4", Vec::new(), ENGINE_CANCEL_EXIT_CODE);

        let result = executor(&spawner).run_sync(
            "a",
            &command(&dir.path().join("a.mp4")),
            &CancellationToken::new(),
            None,
            None,
        );
        assert_eq!(result, ExecutionResult::Cancelled);
    }

    #[test]
    fn success_without_output_file_is_error() {
        let dir = tempdir().unwrap();
        let spawner = MockFfmpegSpawner::new();
        spawner.add_success_expectation("a.mp4", Vec::new(), false);

        let result = executor(&spawner).run_sync(
            "a",
            &command(&dir.path().join("a.mp4")),
            &CancellationToken::new(),
            None,
            None,
        );
        assert!(matches!(result, ExecutionResult::Error { .. }));
    }

    #[test]
    fn spawn_failure_is_error() {
        let dir = tempdir().unwrap();
        let spawner = MockFfmpegSpawner::new();
        spawner.add_spawn_error_expectation("a.mp4", "no such binary");

        let result = executor(&spawner).run_sync(
            "a",
            &command(&dir.path().join("a.mp4")),
            &CancellationToken::new(),
            None,
            None,
        );
        match result {
            ExecutionResult::Error { message } => assert!(message.contains("no such binary")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn token_set_before_start_never_spawns() {
        let dir = tempdir().unwrap();
        let spawner = MockFfmpegSpawner::new();
        let token = CancellationToken::new();
        token.cancel();

        let result = executor(&spawner).run_sync("a", &command(&dir.path().join("a.mp4")), &token, None, None);
        assert_eq!(result, ExecutionResult::Cancelled);
        assert!(spawner.get_received_calls().is_empty());
    }

    #[test]
    fn cancelling_a_running_handle_kills_it() {
        let dir = tempdir().unwrap();
        let spawner = MockFfmpegSpawner::new();
        spawner.add_hanging_expectation("a.mp4", vec![progress_at("00:00:01.00")]);

        let handle = executor(&spawner).run_async(
            "a",
            command(&dir.path().join("a.mp4")),
            CancellationToken::new(),
            Some(4.0),
        );
        assert_eq!(handle.id(), "a");
        let first = handle
            .progress()
            .recv_timeout(Duration::from_secs(5))
            .expect("progress before cancel");
        assert_eq!(first.percent, Some(25.0));

        handle.cancel();
        assert_eq!(handle.wait(), ExecutionResult::Cancelled);
    }

    #[test]
    fn timeout_is_error() {
        let dir = tempdir().unwrap();
        let spawner = MockFfmpegSpawner::new();
        spawner.add_hanging_expectation("a.mp4", Vec::new());

        let result = executor(&spawner)
            .with_timeout(Some(Duration::from_millis(30)))
            .run_sync("a", &command(&dir.path().join("a.mp4")), &CancellationToken::new(), None, None);
        match result {
            ExecutionResult::Error { message } => assert!(message.contains("timed out after 30ms"), "{message}"),
            other => panic!("expected timeout error, got {other:?}"),
        }
    }

    #[test]
    fn results_convert_to_core_errors() {
        let output = OutputLocator::new(None).locate("a", Path::new("/out/a.mp4"), 3);
        assert_eq!(ExecutionResult::Success(output.clone()).into_result().unwrap(), output);
        assert!(matches!(
            ExecutionResult::error("exit status 1").into_result(),
            Err(CoreError::EngineFailure(message)) if message == "exit status 1"
        ));
        assert!(matches!(ExecutionResult::Cancelled.into_result(), Err(CoreError::EngineCancelled)));
    }

    #[test]
    fn try_result_eventually_yields() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("a.mp4");
        let spawner = MockFfmpegSpawner::new();
        spawner.add_success_expectation("a.mp4", Vec::new(), true);

        let mut handle = executor(&spawner).run_async("a", command(&out), CancellationToken::new(), None);
        let deadline = Instant::now() + Duration::from_secs(5);
        let result = loop {
            if let Some(result) = handle.try_result() {
                break result;
            }
            assert!(Instant::now() < deadline, "no result in time");
            thread::sleep(Duration::from_millis(5));
        };
        assert!(result.is_success());
    }
}
