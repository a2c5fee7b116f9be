// reelfit-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// Compiled for unit tests and for downstream tests via the "test-mocks" feature.

use crate::error::{CoreError, CoreResult};
use crate::external::ffmpeg_builder::EngineCommand;
use crate::external::ffmpeg_executor::{FfmpegEvents, FfmpegProcess, FfmpegSpawner};
use crate::media::{MediaProber, ProbeData};

use crossbeam_channel::{Receiver, Sender};
use ffmpeg_sidecar::event::FfmpegEvent;
use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Exit status for a normal exit with `code`.
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    ExitStatus::from_raw(code << 8)
}

/// Exit code reported by a killed mock process.
const ENGINE_KILLED_EXIT_CODE: i32 = 137;

/// Mock implementation of FfmpegProcess.
pub struct MockFfmpegProcess {
    events: Vec<FfmpegEvent>,
    exit_status: ExitStatus,
    /// Keeps the event stream open until `kill` drops it.
    hold_open: Option<Sender<FfmpegEvent>>,
    pending: Option<Receiver<FfmpegEvent>>,
    /// Time the event stream stays open after the last event.
    delay: Option<Duration>,
    kills: Arc<AtomicUsize>,
}

impl MockFfmpegProcess {
    pub fn new(events: Vec<FfmpegEvent>, exit_code: i32) -> Self {
        Self {
            events,
            exit_status: exit_status(exit_code),
            hold_open: None,
            pending: None,
            delay: None,
            kills: Arc::default(),
        }
    }

    /// A process that emits `events`, keeps running for `delay`, then exits
    /// with `exit_code`.
    pub fn delayed(events: Vec<FfmpegEvent>, exit_code: i32, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(events, exit_code)
        }
    }

    /// Counts calls to `kill` in `kills`.
    #[must_use]
    pub fn with_kill_counter(mut self, kills: Arc<AtomicUsize>) -> Self {
        self.kills = kills;
        self
    }

    /// A process that emits `events` and then runs until killed.
    pub fn running_until_killed(events: Vec<FfmpegEvent>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            hold_open: Some(tx),
            pending: Some(rx),
            ..Self::new(events, ENGINE_KILLED_EXIT_CODE)
        }
    }
}

impl FfmpegProcess for MockFfmpegProcess {
    fn take_events(&mut self) -> CoreResult<FfmpegEvents> {
        let events = std::mem::take(&mut self.events).into_iter();
        if let Some(rx) = self.pending.take() {
            return Ok(Box::new(events.chain(std::iter::from_fn(move || rx.recv().ok()))));
        }
        match self.delay.take() {
            Some(delay) => Ok(Box::new(events.chain(std::iter::from_fn(move || {
                std::thread::sleep(delay);
                None
            })))),
            None => Ok(Box::new(events)),
        }
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.hold_open = None;
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(self.exit_status)
    }
}

/// How long a mock process runs once its events are emitted.
enum MockRun {
    Exits,
    Delayed(Duration),
    UntilKilled,
}

enum MockOutcome {
    Process {
        events: Vec<FfmpegEvent>,
        exit_code: i32,
        run: MockRun,
    },
    SpawnError(String),
}

/// Represents an expected ffmpeg command call and its mock result.
struct MockFfmpegExpectation {
    arg_pattern: String,
    outcome: MockOutcome,
    create_dummy_output: bool,
}

/// Mock implementation of FfmpegSpawner supporting multiple expectations.
///
/// Each spawn consumes the first expectation whose pattern occurs in any
/// argument. Without a match the fallback (if set) is used, otherwise the
/// spawn fails.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    expectations: Arc<Mutex<Vec<MockFfmpegExpectation>>>,
    fallback_success: Arc<Mutex<Option<bool>>>,
    received_calls: Arc<Mutex<Vec<Vec<String>>>>,
    kills: Arc<AtomicUsize>,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, arg_pattern: &str, outcome: MockOutcome, create_dummy_output: bool) {
        lock(&self.expectations).push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            outcome,
            create_dummy_output,
        });
    }

    pub fn add_success_expectation(&self, arg_pattern: &str, events: Vec<FfmpegEvent>, create_dummy_output: bool) {
        self.push(
            arg_pattern,
            MockOutcome::Process { events, exit_code: 0, run: MockRun::Exits },
            create_dummy_output,
        );
    }

    pub fn add_exit_error_expectation(&self, arg_pattern: &str, events: Vec<FfmpegEvent>, exit_code: i32) {
        self.push(
            arg_pattern,
            MockOutcome::Process { events, exit_code, run: MockRun::Exits },
            false,
        );
    }

    /// The matching process runs for `delay` before exiting with
    /// `exit_code`. A zero exit writes the dummy output.
    pub fn add_delayed_expectation(&self, arg_pattern: &str, events: Vec<FfmpegEvent>, exit_code: i32, delay: Duration) {
        self.push(
            arg_pattern,
            MockOutcome::Process { events, exit_code, run: MockRun::Delayed(delay) },
            exit_code == 0,
        );
    }

    /// The matching process keeps running until it is killed.
    pub fn add_hanging_expectation(&self, arg_pattern: &str, events: Vec<FfmpegEvent>) {
        self.push(
            arg_pattern,
            MockOutcome::Process { events, exit_code: ENGINE_KILLED_EXIT_CODE, run: MockRun::UntilKilled },
            false,
        );
    }

    pub fn add_spawn_error_expectation(&self, arg_pattern: &str, message: &str) {
        self.push(arg_pattern, MockOutcome::SpawnError(message.to_string()), false);
    }

    /// Unmatched commands succeed, optionally writing a dummy output file.
    pub fn succeed_by_default(&self, create_dummy_output: bool) {
        *lock(&self.fallback_success) = Some(create_dummy_output);
    }

    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        lock(&self.received_calls).clone()
    }

    /// Number of times any spawned process was killed.
    pub fn killed_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

fn write_dummy_output(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            log::error!("MockFfmpegSpawner failed to create parent dir {:?}: {}", parent, e);
        }
    }
    match std::fs::write(path, b"mock media payload") {
        Ok(()) => log::info!("MockFfmpegSpawner created dummy output file: {:?}", path),
        Err(e) => log::error!("MockFfmpegSpawner failed to create dummy output file {:?}: {}", path, e),
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    fn spawn(&self, command: &EngineCommand) -> CoreResult<Box<dyn FfmpegProcess>> {
        let args = command.args().to_vec();
        lock(&self.received_calls).push(args.clone());

        let expectation = {
            let mut expectations = lock(&self.expectations);
            expectations
                .iter()
                .position(|exp| args.iter().any(|arg| arg.contains(&exp.arg_pattern)))
                .map(|index| expectations.remove(index))
        };

        let Some(expectation) = expectation else {
            return match *lock(&self.fallback_success) {
                Some(create_output) => {
                    if create_output {
                        write_dummy_output(command.output_path());
                    }
                    Ok(Box::new(
                        MockFfmpegProcess::new(Vec::new(), 0).with_kill_counter(Arc::clone(&self.kills)),
                    ))
                }
                None => {
                    log::error!("MockFfmpegSpawner: No expectation found for command args: {:?}", args);
                    Err(CoreError::OperationFailed(format!(
                        "MockFfmpegSpawner: no expectation for {args:?}"
                    )))
                }
            };
        };

        log::info!("MockFfmpegSpawner: Matched expectation with pattern '{}'", expectation.arg_pattern);
        match expectation.outcome {
            MockOutcome::Process { events, exit_code, run } => {
                if expectation.create_dummy_output {
                    write_dummy_output(command.output_path());
                }
                let process = match run {
                    MockRun::Exits => MockFfmpegProcess::new(events, exit_code),
                    MockRun::Delayed(delay) => MockFfmpegProcess::delayed(events, exit_code, delay),
                    MockRun::UntilKilled => MockFfmpegProcess::running_until_killed(events),
                };
                Ok(Box::new(process.with_kill_counter(Arc::clone(&self.kills))))
            }
            MockOutcome::SpawnError(message) => Err(CoreError::CommandStart(
                "ffmpeg (mock)".to_string(),
                std::io::Error::other(message),
            )),
        }
    }
}

/// Mock implementation of MediaProber keyed by absolute path.
#[derive(Clone, Default)]
pub struct MockMediaProber {
    results: Arc<Mutex<HashMap<PathBuf, Result<ProbeData, String>>>>,
}

impl MockMediaProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_probe(&self, path: &Path, data: ProbeData) {
        lock(&self.results).insert(path.to_path_buf(), Ok(data));
    }

    pub fn expect_failure(&self, path: &Path, message: &str) {
        lock(&self.results).insert(path.to_path_buf(), Err(message.to_string()));
    }

    /// Convenience: a landscape clip with audio.
    pub fn expect_clip(&self, path: &Path, duration: f64, width: u32, height: u32) {
        self.expect_probe(
            path,
            ProbeData {
                duration_seconds: Some(duration),
                width,
                height,
                has_video: true,
                has_audio: true,
                ..ProbeData::default()
            },
        );
    }
}

impl MediaProber for MockMediaProber {
    fn probe(&self, path: &Path) -> CoreResult<ProbeData> {
        log::info!("MockMediaProber::probe called for: {}", path.display());
        match lock(&self.results).get(path) {
            Some(Ok(data)) => Ok(data.clone()),
            Some(Err(message)) => Err(CoreError::ProbeFailure {
                path: path.to_path_buf(),
                message: message.clone(),
            }),
            None => Err(CoreError::ProbeFailure {
                path: path.to_path_buf(),
                message: "MockMediaProber: no expectation set".to_string(),
            }),
        }
    }
}
