//! Concatenation plans: ordered compressed clips plus an optional music bed.

use crate::error::{CoreError, CoreResult};

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Background track mixed under the concatenated clips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioOverlay {
    pub track_path: PathBuf,
    /// Level of the clips' own audio, in percent.
    pub clip_volume_percent: u32,
    /// Level of the looping track, in percent.
    pub track_volume_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcatPlan {
    /// Absolute paths, in the order they are joined.
    pub ordered_input_paths: Vec<PathBuf>,
    pub audio_overlay: Option<AudioOverlay>,
    pub list_file_path: PathBuf,
    pub output_path: PathBuf,
}

impl ConcatPlan {
    /// Builds a plan, making every input path absolute.
    pub fn new(
        inputs: &[PathBuf],
        audio_overlay: Option<AudioOverlay>,
        list_file_path: PathBuf,
        output_path: PathBuf,
    ) -> CoreResult<Self> {
        if inputs.is_empty() {
            return Err(CoreError::PlanningInvariant(
                "concatenation needs at least one input".to_string(),
            ));
        }
        let ordered_input_paths = inputs
            .iter()
            .map(|p| absolute(p))
            .collect::<CoreResult<Vec<_>>>()?;
        let audio_overlay = audio_overlay
            .map(|overlay| -> CoreResult<AudioOverlay> {
                Ok(AudioOverlay {
                    track_path: absolute(&overlay.track_path)?,
                    ..overlay
                })
            })
            .transpose()?;

        Ok(Self {
            ordered_input_paths,
            audio_overlay,
            list_file_path: absolute(&list_file_path)?,
            output_path: absolute(&output_path)?,
        })
    }
}

fn absolute(path: &Path) -> CoreResult<PathBuf> {
    Ok(std::path::absolute(path)?)
}
