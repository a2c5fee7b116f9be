// ============================================================================
// reelfit-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: fern dispatch to the console and an optional run log file
//
// Console: plain messages at info (debug with --verbose), warnings and errors
// on stderr with a coloured level tag. When a command prints JSON the console
// keeps only warnings, and everything goes to stderr. ffmpeg's own output (target
// "ffmpeg_log") only reaches the console in verbose mode.
//
// File: every record at debug or below with timestamp, level and target, ANSI
// codes stripped, written to <log_dir>/reelfit_<timestamp>.log.

use crate::error::CliResult;

use console::style;
use log::LevelFilter;
use reelfit_core::CoreError;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Run log file path inside `log_dir`.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("reelfit_{}.log", get_timestamp()))
}

fn console_level(verbose: bool, quiet: bool) -> LevelFilter {
    match (verbose, quiet) {
        (true, _) => LevelFilter::Debug,
        (false, true) => LevelFilter::Warn,
        (false, false) => LevelFilter::Info,
    }
}

fn level_tag(level: log::Level) -> String {
    match level {
        log::Level::Error => style("error").red().bold().to_string(),
        log::Level::Warn => style("warning").yellow().bold().to_string(),
        log::Level::Info => style("info").cyan().to_string(),
        log::Level::Debug => style("debug").magenta().to_string(),
        log::Level::Trace => style("trace").dim().to_string(),
    }
}

/// Installs the global logger. Returns the log file path when one is written.
///
/// `quiet` keeps stdout free for machine-readable output.
pub fn setup_logging(verbose: bool, quiet: bool, log_dir: Option<&Path>) -> CliResult<Option<PathBuf>> {
    let level = console_level(verbose, quiet);

    let stdout = fern::Dispatch::new()
        .filter(move |meta| !quiet && meta.level() > log::Level::Warn)
        .format(move |out, message, record| {
            if verbose && record.level() > log::Level::Info {
                out.finish(format_args!("{} {}", level_tag(record.level()), message))
            } else {
                out.finish(format_args!("{message}"))
            }
        })
        .chain(std::io::stdout());

    let stderr = fern::Dispatch::new()
        .filter(move |meta| quiet || meta.level() <= log::Level::Warn)
        .format(|out, message, record| {
            out.finish(format_args!("{}: {}", level_tag(record.level()), message))
        })
        .chain(std::io::stderr());

    let console = fern::Dispatch::new()
        .level(level)
        .level_for("ffmpeg_log", if verbose { LevelFilter::Debug } else { LevelFilter::Warn })
        .chain(stdout)
        .chain(stderr);

    let mut root = fern::Dispatch::new().level(LevelFilter::Debug).chain(console);

    let log_path = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = log_file_path(dir);
            let file = fern::Dispatch::new()
                .level(LevelFilter::Debug)
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} [{:<5}] {}: {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                        record.level(),
                        record.target(),
                        console::strip_ansi_codes(&message.to_string())
                    ))
                })
                .chain(fern::log_file(&path)?);
            root = root.chain(file);
            Some(path)
        }
        None => None,
    };

    root.apply()
        .map_err(|e| CoreError::OperationFailed(format!("Failed to initialize logging: {e}")))?;

    if let Some(path) = &log_path {
        log::debug!("Writing run log to {}", path.display());
    }
    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_timestamped() {
        let path = log_file_path(Path::new("/var/log/reelfit"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("reelfit_"));
        assert!(name.ends_with(".log"));
        assert_eq!(name.len(), "reelfit_YYYYMMDD_HHMMSS.log".len());
    }

    #[test]
    fn verbose_lowers_console_level() {
        assert_eq!(console_level(false, false), LevelFilter::Info);
        assert_eq!(console_level(true, false), LevelFilter::Debug);
        assert_eq!(console_level(false, true), LevelFilter::Warn);
    }
}
