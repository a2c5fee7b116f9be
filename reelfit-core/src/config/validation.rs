//! Sanity checks for a fully assembled `CoreConfig`.

use super::CoreConfig;
use crate::error::{CoreError, CoreResult};

impl CoreConfig {
    /// Rejects configurations that would fail later in planning or execution.
    pub fn validate(&self) -> CoreResult<()> {
        if self.target_resolution.is_undefined() {
            return Err(invalid(format!(
                "target_resolution {} must have positive width and height",
                self.target_resolution
            )));
        }
        if !self.max_total_duration.is_finite() || self.max_total_duration <= 0.0 {
            return Err(invalid(format!(
                "max_total_duration must be positive, got {}",
                self.max_total_duration
            )));
        }
        if !self.section_duration.is_finite() || self.section_duration <= 0.0 {
            return Err(invalid(format!(
                "section_duration must be positive, got {}",
                self.section_duration
            )));
        }
        if self.min_split_sections == 0 {
            return Err(invalid("min_split_sections must be at least 1".to_string()));
        }
        if self.allocation_iteration_cap == 0 {
            return Err(invalid("allocation_iteration_cap must be at least 1".to_string()));
        }
        if self.max_parallel_jobs == 0 {
            return Err(invalid("max_parallel_jobs must be at least 1".to_string()));
        }
        if self.engine_timeout_secs == Some(0) {
            return Err(invalid("engine_timeout_secs must be positive when set".to_string()));
        }
        for (name, quality) in [("hd_quality", self.hd_quality), ("fhd_quality", self.fhd_quality)] {
            if quality.crf > 51 {
                return Err(invalid(format!("{name}.crf must be in 0..=51, got {}", quality.crf)));
            }
            if quality.max_rate_mbit == 0 {
                return Err(invalid(format!("{name}.max_rate_mbit must be positive")));
            }
        }
        if let Some(app_id) = &self.app_id {
            if app_id.is_empty() || app_id.contains('/') {
                return Err(invalid(format!("app_id '{app_id}' is not a valid authority prefix")));
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> CoreError {
    CoreError::Config(message)
}
