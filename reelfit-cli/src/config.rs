// reelfit-cli/src/config.rs
//
// Resolves the effective CoreConfig for a run. Precedence, lowest first:
// built-in defaults, the --config TOML file, REELFIT_* environment variables,
// command-line flags.

use crate::cli::GlobalArgs;
use crate::error::{CliErrorContext, CliResult};
use reelfit_core::CoreConfig;

/// Defaults -> file -> environment. Validation is left to the caller.
pub fn load_base_config(global: &GlobalArgs) -> CliResult<CoreConfig> {
    let mut config = match &global.config {
        Some(path) => CoreConfig::from_toml_file(path)?,
        None => CoreConfig::default(),
    };
    config
        .apply_env_overrides()
        .cli_context("Invalid REELFIT_* environment variable")?;
    Ok(config)
}

/// Applies the global flags on top of `config`.
pub fn apply_global_flags(config: &mut CoreConfig, global: &GlobalArgs) {
    if let Some(dir) = &global.cache_dir {
        config.cache_dir = dir.clone();
    }
    if let Some(dir) = &global.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(app_id) = &global.app_id {
        config.app_id = Some(app_id.clone());
    }
    if let Some(jobs) = global.jobs {
        config.max_parallel_jobs = jobs;
    }
    if let Some(timeout) = global.timeout {
        config.engine_timeout_secs = Some(timeout);
    }
    if let Some(path) = &global.ffmpeg {
        config.ffmpeg_path = path.clone();
    }
    if let Some(path) = &global.ffprobe {
        config.ffprobe_path = path.clone();
    }
    if let Some(resolution) = global.resolution {
        config.target_resolution = resolution;
    }
    if let Some(orientation) = global.orientation {
        config.target_orientation = Some(orientation);
    }
    if global.split {
        config.splitting_enabled = true;
    }
    if global.avoid_upscale {
        config.avoid_upscale = true;
    }
}

/// Fully resolved and validated configuration.
pub fn resolve_config(global: &GlobalArgs) -> CliResult<CoreConfig> {
    let mut config = load_base_config(global)?;
    apply_global_flags(&mut config, global);
    config.validate()?;
    log::debug!("Effective configuration: {config:?}");
    Ok(config)
}
