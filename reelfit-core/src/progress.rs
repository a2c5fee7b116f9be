//! FFmpeg event handling for a single engine run.
//!
//! `FfmpegProgressHandler` turns the sidecar event stream into progress
//! updates, forwards ffmpeg's own log lines to the `log` facade, and keeps a
//! bounded tail of error output for failure messages.

use crate::utils::{format_duration, parse_ffmpeg_time};

use ffmpeg_sidecar::event::{FfmpegEvent, FfmpegProgress, LogLevel as FfmpegLogLevel};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;

/// Number of ffmpeg error lines kept for failure reports.
pub const ERROR_TAIL_LINES: usize = 20;

/// Percentage step between emitted progress updates.
const PROGRESS_STEP_PERCENT: f64 = 1.0;

/// One progress update for a running engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionProgress {
    pub id: String,
    /// Seconds of output written so far.
    pub out_time: f64,
    /// `None` when the expected output length is unknown.
    pub percent: Option<f64>,
    pub speed: f32,
}

/// Handler for ffmpeg events of one run.
pub struct FfmpegProgressHandler {
    id: String,
    duration: Option<f64>,
    start_time: Instant,
    last_progress_percent: f64,
    last_logged_percent_threshold: i32,
    error_tail: VecDeque<String>,
}

impl FfmpegProgressHandler {
    /// `duration` is the expected output length in seconds, if known.
    #[must_use]
    pub fn new(id: impl Into<String>, duration: Option<f64>) -> Self {
        Self {
            id: id.into(),
            duration: duration.filter(|d| d.is_finite() && *d > 0.0),
            start_time: Instant::now(),
            last_progress_percent: -PROGRESS_STEP_PERCENT,
            last_logged_percent_threshold: -1,
            error_tail: VecDeque::with_capacity(ERROR_TAIL_LINES),
        }
    }

    /// Handles one event, returning a progress update when one is due.
    pub fn handle_event(&mut self, event: FfmpegEvent) -> Option<ExecutionProgress> {
        match event {
            FfmpegEvent::Progress(progress) => self.handle_progress(&progress),
            FfmpegEvent::Log(level, message) => {
                self.handle_log(level, &message);
                None
            }
            FfmpegEvent::Error(error) => {
                self.handle_error(&error);
                None
            }
            FfmpegEvent::ParsedDuration(parsed) if self.duration.is_none() => {
                self.duration = Some(parsed.duration).filter(|d| *d > 0.0);
                None
            }
            _ => None,
        }
    }

    /// Last error lines, oldest first, newline-separated.
    #[must_use]
    pub fn error_tail(&self) -> String {
        self.error_tail.iter().cloned().collect::<Vec<_>>().join("\n")
    }

    fn handle_progress(&mut self, progress: &FfmpegProgress) -> Option<ExecutionProgress> {
        let current_secs = parse_ffmpeg_time(&progress.time).unwrap_or(0.0);
        let percent = self
            .duration
            .map(|d| (current_secs / d * 100.0).clamp(0.0, 100.0));

        let due = match percent {
            Some(p) => {
                p >= self.last_progress_percent + PROGRESS_STEP_PERCENT
                    || (p >= 100.0 && self.last_progress_percent < 100.0)
            }
            None => true,
        };
        if !due {
            return None;
        }

        if let Some(p) = percent {
            self.last_progress_percent = p;
            self.log_progress_if_needed(p, current_secs, progress.speed);
        }

        Some(ExecutionProgress {
            id: self.id.clone(),
            out_time: current_secs,
            percent,
            speed: progress.speed,
        })
    }

    fn handle_log(&mut self, level: FfmpegLogLevel, message: &str) {
        let log_level = map_ffmpeg_log_level(&level);
        if log_level <= log::Level::Error {
            self.remember(message);
        }
        if log_level == log::Level::Info {
            log::debug!(target: "ffmpeg_log", "{message}");
        } else {
            log::log!(target: "ffmpeg_log", log_level, "{message}");
        }
    }

    fn handle_error(&mut self, error: &str) {
        if is_non_critical_ffmpeg_error(error) {
            log::debug!("ffmpeg non-critical message: {error}");
        } else {
            log::warn!(target: "ffmpeg_log", "[{}] {error}", self.id);
        }
        self.remember(error);
    }

    fn remember(&mut self, line: &str) {
        if self.error_tail.len() == ERROR_TAIL_LINES {
            self.error_tail.pop_front();
        }
        self.error_tail.push_back(line.trim_end().to_string());
    }

    fn log_progress_if_needed(&mut self, percent: f64, current_secs: f64, speed: f32) {
        let current_threshold = (percent as i32 / 25) * 25;
        if current_threshold > self.last_logged_percent_threshold {
            log::info!(
                target: "reelfit::progress",
                "[{}] {:.0}% | {} / {} | {:.2}x | elapsed {}",
                self.id,
                percent,
                format_duration(current_secs),
                format_duration(self.duration.unwrap_or(0.0)),
                speed,
                format_duration(self.start_time.elapsed().as_secs_f64())
            );
            self.last_logged_percent_threshold = current_threshold;
        }
    }
}

/// Maps ffmpeg log levels to `log` levels.
fn map_ffmpeg_log_level(level: &FfmpegLogLevel) -> log::Level {
    match level {
        FfmpegLogLevel::Fatal | FfmpegLogLevel::Error => log::Level::Error,
        FfmpegLogLevel::Warning => log::Level::Warn,
        FfmpegLogLevel::Info => log::Level::Info,
        _ => log::Level::Trace,
    }
}

/// ffmpeg stderr noise that does not indicate a failure.
fn is_non_critical_ffmpeg_error(error: &str) -> bool {
    error.contains("deprecated pixel format")
        || error.contains("Timestamps are unset")
        || error.contains("Queue input is backward")
        || error.contains("automatically inserted filter")
}
