// ============================================================================
// reelfit-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// Fluent construction of CoreConfig starting from defaults. `build()` runs
// validation so a built config is always usable.

use std::path::PathBuf;

use super::CoreConfig;
use crate::error::CoreResult;
use crate::media::Orientation;
use crate::planning::{QualityPreset, Resolution};

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use reelfit_core::config::CoreConfigBuilder;
/// use reelfit_core::planning::Resolution;
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .cache_dir(PathBuf::from("/tmp/reelfit-cache"))
///     .output_dir(PathBuf::from("/tmp/reelfit-out"))
///     .target_resolution(Resolution::FHD)
///     .max_total_duration(90.0)
///     .splitting_enabled(true)
///     .max_parallel_jobs(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_parallel_jobs, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// Creates a builder holding the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration, e.g. one loaded from a file.
    pub fn from_config(config: CoreConfig) -> Self {
        Self { config }
    }

    pub fn cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.config.cache_dir = cache_dir;
        self
    }

    pub fn output_dir(mut self, output_dir: PathBuf) -> Self {
        self.config.output_dir = output_dir;
        self
    }

    /// Sets the authority prefix used for `content://` URIs.
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.config.app_id = Some(app_id.into());
        self
    }

    pub fn target_resolution(mut self, resolution: Resolution) -> Self {
        self.config.target_resolution = resolution;
        self
    }

    pub fn target_orientation(mut self, orientation: Orientation) -> Self {
        self.config.target_orientation = Some(orientation);
        self
    }

    pub fn avoid_upscale(mut self, enable: bool) -> Self {
        self.config.avoid_upscale = enable;
        self
    }

    /// Sets the default compilation length budget in seconds.
    pub fn max_total_duration(mut self, seconds: f64) -> Self {
        self.config.max_total_duration = seconds;
        self
    }

    pub fn allocation_iteration_cap(mut self, cap: usize) -> Self {
        self.config.allocation_iteration_cap = cap;
        self
    }

    pub fn splitting_enabled(mut self, enable: bool) -> Self {
        self.config.splitting_enabled = enable;
        self
    }

    pub fn section_duration(mut self, seconds: f64) -> Self {
        self.config.section_duration = seconds;
        self
    }

    pub fn min_split_sections(mut self, sections: u32) -> Self {
        self.config.min_split_sections = sections;
        self
    }

    pub fn hd_quality(mut self, quality: QualityPreset) -> Self {
        self.config.hd_quality = quality;
        self
    }

    pub fn fhd_quality(mut self, quality: QualityPreset) -> Self {
        self.config.fhd_quality = quality;
        self
    }

    pub fn max_parallel_jobs(mut self, jobs: usize) -> Self {
        self.config.max_parallel_jobs = jobs;
        self
    }

    /// Kills engine runs exceeding `seconds` and reports them as errors.
    pub fn engine_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.engine_timeout_secs = Some(seconds);
        self
    }

    pub fn poll_interval_ms(mut self, millis: u64) -> Self {
        self.config.poll_interval_ms = millis;
        self
    }

    pub fn ffmpeg_path(mut self, path: PathBuf) -> Self {
        self.config.ffmpeg_path = path;
        self
    }

    pub fn ffprobe_path(mut self, path: PathBuf) -> Self {
        self.config.ffprobe_path = path;
        self
    }

    pub fn clip_volume_percent(mut self, percent: u32) -> Self {
        self.config.clip_volume_percent = percent;
        self
    }

    pub fn track_volume_percent(mut self, percent: u32) -> Self {
        self.config.track_volume_percent = percent;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> CoreResult<CoreConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let config = CoreConfigBuilder::new()
            .app_id("org.example.reels")
            .target_orientation(Orientation::Vertical)
            .section_duration(3.0)
            .engine_timeout_secs(45)
            .track_volume_percent(35)
            .build()
            .unwrap();
        assert_eq!(config.app_id.as_deref(), Some("org.example.reels"));
        assert_eq!(config.target_orientation, Some(Orientation::Vertical));
        assert_eq!(config.section_duration, 3.0);
        assert_eq!(config.engine_timeout_secs, Some(45));
        assert_eq!(config.track_volume_percent, 35);
    }

    #[test]
    fn build_validates() {
        assert!(CoreConfigBuilder::new().max_parallel_jobs(0).build().is_err());
        assert!(CoreConfigBuilder::new().max_total_duration(-5.0).build().is_err());
    }

    #[test]
    fn from_config_keeps_values() {
        let mut base = CoreConfig::default();
        base.clip_volume_percent = 80;
        let config = CoreConfigBuilder::from_config(base).splitting_enabled(true).build().unwrap();
        assert_eq!(config.clip_volume_percent, 80);
        assert!(config.splitting_enabled);
    }
}
