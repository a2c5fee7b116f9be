//! Tests for loading configuration files
//!
//! These tests verify:
//! - TOML files override only the keys they name
//! - Saved configuration loads back unchanged
//! - `REELFIT_*` overrides apply on top of a file and are validated

use reelfit_core::config::CoreConfig;
use reelfit_core::planning::Resolution;
use reelfit_core::{CoreConfigBuilder, CoreError, Orientation};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn partial_file_keeps_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("reelfit.toml");
    fs::write(
        &path,
        r#"
output_dir = "/srv/reels"
app_id = "org.example.reels"
target_resolution = "1920x1080"
target_orientation = "vertical"
max_total_duration = 90.0
splitting_enabled = true

[fhd_quality]
crf = 20
max_rate_mbit = 12
"#,
    )?;

    let config = CoreConfig::from_toml_file(&path)?;
    config.validate()?;

    assert_eq!(config.output_dir, PathBuf::from("/srv/reels"));
    assert_eq!(config.app_id.as_deref(), Some("org.example.reels"));
    assert_eq!(config.target_resolution, Resolution::FHD);
    assert_eq!(config.target_orientation, Some(Orientation::Vertical));
    assert_eq!(config.max_total_duration, 90.0);
    assert!(config.splitting_enabled);
    assert_eq!(config.fhd_quality.crf, 20);
    assert_eq!(config.fhd_quality.max_rate_mbit, 12);

    let defaults = CoreConfig::default();
    assert_eq!(config.hd_quality, defaults.hd_quality);
    assert_eq!(config.section_duration, defaults.section_duration);
    assert_eq!(config.track_volume_percent, defaults.track_volume_percent);
    Ok(())
}

#[test]
fn saved_config_loads_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("saved.toml");
    let config = CoreConfigBuilder::new()
        .cache_dir(dir.path().join("cache"))
        .output_dir(dir.path().join("out"))
        .app_id("org.example.reels")
        .max_total_duration(45.0)
        .engine_timeout_secs(120)
        .max_parallel_jobs(3)
        .build()?;

    fs::write(&path, config.to_toml_string()?)?;
    assert_eq!(CoreConfig::from_toml_file(&path)?, config);
    Ok(())
}

#[test]
fn overrides_apply_on_top_of_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CoreConfig::from_toml_str("max_total_duration = 90.0\n")?;
    let env: HashMap<&str, &str> = HashMap::from([
        ("REELFIT_MAX_TOTAL_DURATION", "30"),
        ("REELFIT_TARGET_RESOLUTION", "fhd"),
        ("REELFIT_JOBS", "2"),
        ("REELFIT_SPLITTING", "true"),
    ]);
    config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()))?;

    assert_eq!(config.max_total_duration, 30.0);
    assert_eq!(config.target_resolution, Resolution::FHD);
    assert_eq!(config.max_parallel_jobs, 2);
    assert!(config.splitting_enabled);
    Ok(())
}

#[test]
fn bad_values_are_config_errors() {
    let mut config = CoreConfig::default();
    let err = config
        .apply_overrides_from(|key| (key == "REELFIT_JOBS").then(|| "many".to_string()))
        .unwrap_err();
    assert!(matches!(err, CoreError::Config(_)));

    let config = CoreConfig::from_toml_str("max_total_duration = -5.0\n").unwrap();
    assert!(matches!(config.validate(), Err(CoreError::Config(_))));

    assert!(CoreConfig::from_toml_str("max_total_duration = \"long\"\n").is_err());
}

#[test]
fn missing_file_is_reported() {
    let err = CoreConfig::from_toml_file(&PathBuf::from("/nonexistent/reelfit.toml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/reelfit.toml"));
}
