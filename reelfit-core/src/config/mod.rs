//! Configuration structures and constants for the reelfit-core library.
//!
//! `CoreConfig` is injected into every entry point; nothing in the library
//! reads global state. A config can be assembled with [`CoreConfigBuilder`],
//! loaded from a TOML file, and then adjusted from `REELFIT_*` environment
//! variables.

mod builder;
mod validation;

pub use builder::CoreConfigBuilder;

use crate::error::{CoreError, CoreResult};
use crate::media::Orientation;
use crate::planning::{QualityPreset, Resolution};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// Default constants

/// Total length budget for a compilation: ten minutes.
pub const DEFAULT_MAX_TOTAL_DURATION: f64 = 600.0;

/// Application id used to mint `content://` URIs when none is configured.
pub const DEFAULT_APP_ID: &str = "com.reelfit.app";

/// Original clip audio level in percent when a music track is mixed in.
pub const DEFAULT_CLIP_VOLUME_PERCENT: u32 = 100;

/// Music track level in percent.
pub const DEFAULT_TRACK_VOLUME_PERCENT: u32 = 20;

/// How often a running engine is checked for cancellation and timeout.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "REELFIT_";

/// Main configuration structure for the reelfit-core library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Parent of the run-scoped scratch directories.
    pub cache_dir: PathBuf,
    /// Where final deliverables are written.
    pub output_dir: PathBuf,
    /// Authority prefix for `content://` URIs. `None` mints `file://` URIs.
    pub app_id: Option<String>,

    /// Output box before orientation is applied.
    pub target_resolution: Resolution,
    /// Shared orientation for concatenated output. `None` picks the majority.
    pub target_orientation: Option<Orientation>,
    /// Shrink the output box to the best source resolution when all sources are smaller.
    pub avoid_upscale: bool,

    /// Default budget for `compress + concat` runs, in seconds.
    pub max_total_duration: f64,
    pub allocation_iteration_cap: usize,

    pub splitting_enabled: bool,
    /// Length of one split section in seconds.
    pub section_duration: f64,
    pub min_split_sections: u32,

    /// Rate control for outputs up to HD.
    pub hd_quality: QualityPreset,
    /// Rate control for outputs above HD.
    pub fhd_quality: QualityPreset,

    /// Upper bound on concurrently running engine processes.
    pub max_parallel_jobs: usize,
    /// Per-invocation engine timeout in seconds. `None` waits indefinitely.
    pub engine_timeout_secs: Option<u64>,
    pub poll_interval_ms: u64,

    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,

    pub clip_volume_percent: u32,
    pub track_volume_percent: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("reelfit"),
            output_dir: PathBuf::from("reelfit-output"),
            app_id: None,
            target_resolution: Resolution::HD,
            target_orientation: None,
            avoid_upscale: false,
            max_total_duration: DEFAULT_MAX_TOTAL_DURATION,
            allocation_iteration_cap: crate::allocation::DEFAULT_ITERATION_CAP,
            splitting_enabled: false,
            section_duration: crate::planning::splitting::DEFAULT_SECTION_DURATION,
            min_split_sections: crate::planning::splitting::DEFAULT_MIN_SPLIT_SECTIONS,
            hd_quality: QualityPreset::HD,
            fhd_quality: QualityPreset::FHD,
            max_parallel_jobs: default_parallel_jobs(),
            engine_timeout_secs: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            clip_volume_percent: DEFAULT_CLIP_VOLUME_PERCENT,
            track_volume_percent: DEFAULT_TRACK_VOLUME_PERCENT,
        }
    }
}

fn default_parallel_jobs() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(2)
}

impl CoreConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> CoreResult<Self> {
        toml::from_str(contents).map_err(|e| CoreError::Config(format!("invalid TOML: {e}")))
    }

    /// Loads a TOML configuration file.
    pub fn from_toml_file(path: &Path) -> CoreResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("failed to read config file '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Serializes to TOML, e.g. for `--print-config` style output.
    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Config(format!("failed to serialize config: {e}")))
    }

    /// Applies `REELFIT_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> CoreResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any `REELFIT_*` key lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = get("CACHE_DIR") {
            self.cache_dir = PathBuf::from(v);
        }
        if let Some(v) = get("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get("APP_ID") {
            self.app_id = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = get("TARGET_RESOLUTION") {
            self.target_resolution = v.parse().map_err(|e| env_error("TARGET_RESOLUTION", e))?;
        }
        if let Some(v) = get("TARGET_ORIENTATION") {
            self.target_orientation = Some(v.parse().map_err(|e| env_error("TARGET_ORIENTATION", e))?);
        }
        if let Some(v) = get("MAX_TOTAL_DURATION") {
            self.max_total_duration = parse_env("MAX_TOTAL_DURATION", &v)?;
        }
        if let Some(v) = get("SPLITTING") {
            self.splitting_enabled = parse_bool("SPLITTING", &v)?;
        }
        if let Some(v) = get("SECTION_DURATION") {
            self.section_duration = parse_env("SECTION_DURATION", &v)?;
        }
        if let Some(v) = get("JOBS") {
            self.max_parallel_jobs = parse_env("JOBS", &v)?;
        }
        if let Some(v) = get("TIMEOUT") {
            self.engine_timeout_secs = Some(parse_env("TIMEOUT", &v)?);
        }
        if let Some(v) = get("FFMPEG") {
            self.ffmpeg_path = PathBuf::from(v);
        }
        if let Some(v) = get("FFPROBE") {
            self.ffprobe_path = PathBuf::from(v);
        }
        Ok(())
    }

    #[must_use]
    pub fn engine_timeout(&self) -> Option<Duration> {
        self.engine_timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

fn env_error(name: &str, err: impl std::fmt::Display) -> CoreError {
    CoreError::Config(format!("{ENV_PREFIX}{name}: {err}"))
}

fn parse_env<T>(name: &str, raw: &str) -> CoreResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| env_error(name, e))
}

fn parse_bool(name: &str, raw: &str) -> CoreResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(env_error(name, format!("expected a boolean, got '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = CoreConfig::default();
        assert_eq!(config.target_resolution, Resolution::HD);
        assert_eq!(config.max_total_duration, 600.0);
        assert_eq!(config.section_duration, 5.0);
        assert!(!config.splitting_enabled);
        assert!(config.max_parallel_jobs >= 1);
        config.validate().unwrap();
    }

    #[test]
    fn overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("REELFIT_TARGET_RESOLUTION", "1920x1080"),
            ("REELFIT_TARGET_ORIENTATION", "vertical"),
            ("REELFIT_SPLITTING", "yes"),
            ("REELFIT_JOBS", "3"),
            ("REELFIT_TIMEOUT", "90"),
            ("REELFIT_APP_ID", "org.example.reels"),
        ]
        .into_iter()
        .collect();

        let mut config = CoreConfig::default();
        config
            .apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.target_resolution, Resolution::FHD);
        assert_eq!(config.target_orientation, Some(Orientation::Vertical));
        assert!(config.splitting_enabled);
        assert_eq!(config.max_parallel_jobs, 3);
        assert_eq!(config.engine_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(config.app_id.as_deref(), Some("org.example.reels"));
    }

    #[test]
    fn bad_override_is_a_config_error() {
        let mut config = CoreConfig::default();
        let err = config
            .apply_overrides_from(|k| (k == "REELFIT_JOBS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(msg) if msg.contains("REELFIT_JOBS")));
    }

    #[test]
    fn toml_keeps_defaults_for_missing_keys() {
        let config = CoreConfig::from_toml_str(
            r#"
            target_resolution = "1080x1920"
            splitting_enabled = true
            section_duration = 4.0

            [fhd_quality]
            crf = 20
            max_rate_mbit = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.target_resolution, Resolution::new(1080, 1920));
        assert!(config.splitting_enabled);
        assert_eq!(config.section_duration, 4.0);
        assert_eq!(config.fhd_quality.crf, 20);
        assert_eq!(config.hd_quality, QualityPreset::HD);
        assert_eq!(config.max_total_duration, DEFAULT_MAX_TOTAL_DURATION);
    }

    #[test]
    fn toml_round_trips() {
        let mut config = CoreConfig::default();
        config.app_id = Some("org.example".to_string());
        config.engine_timeout_secs = Some(30);
        let text = config.to_toml_string().unwrap();
        assert_eq!(CoreConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn invalid_toml_is_reported() {
        assert!(matches!(
            CoreConfig::from_toml_str("target_resolution = 12"),
            Err(CoreError::Config(_))
        ));
    }
}
