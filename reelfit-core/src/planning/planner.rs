// ============================================================================
// reelfit-core/src/planning/planner.rs
// ============================================================================
//
// COMPRESSION PLANNING: turning a clip and its allocation into a plan
//
// A CompressionPlan records everything the command builder needs for one
// clip: the oriented output box, the time cap or split windows, the user
// rotation to apply, the audio source and the encoder quality tier.

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::media::{ClipInput, Orientation};
use crate::planning::resolution::{QualityPreset, Resolution, select_quality};
use crate::planning::splitting::{SplittingPlan, plan_splitting};

use log::debug;
use serde::Serialize;
use std::path::PathBuf;

/// Where a compressed clip's audio comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSource {
    /// The clip's own first audio stream.
    Original,
    /// Generated silence, for clips without audio.
    Silent,
}

/// Per-clip compression instructions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionPlan {
    pub clip_id: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Output box, already laid out for `target_orientation`.
    pub target_resolution: Resolution,
    pub target_orientation: Orientation,
    /// `None` keeps the whole clip.
    pub target_duration: Option<f64>,
    pub splitting: Option<SplittingPlan>,
    pub user_rotation_degrees: i32,
    pub audio_source: AudioSource,
    pub quality: QualityPreset,
}

/// Planner inputs that come from configuration rather than the clip.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSettings {
    pub target_resolution: Resolution,
    pub section_duration: f64,
    pub min_split_sections: u32,
    pub splitting_enabled: bool,
    pub hd_quality: QualityPreset,
    pub fhd_quality: QualityPreset,
}

impl From<&CoreConfig> for PlannerSettings {
    fn from(config: &CoreConfig) -> Self {
        Self {
            target_resolution: config.target_resolution,
            section_duration: config.section_duration,
            min_split_sections: config.min_split_sections,
            splitting_enabled: config.splitting_enabled,
            hd_quality: config.hd_quality,
            fhd_quality: config.fhd_quality,
        }
    }
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self::from(&CoreConfig::default())
    }
}

/// Plans the compression of one clip.
///
/// `target_orientation` defaults to the clip's own display orientation.
/// A `target_duration` at or beyond the clip's length means no time cap.
pub fn plan_compression(
    clip: &ClipInput,
    output_path: PathBuf,
    target_orientation: Option<Orientation>,
    target_duration: Option<f64>,
    settings: &PlannerSettings,
) -> CoreResult<CompressionPlan> {
    if settings.target_resolution.is_undefined() {
        return Err(CoreError::PlanningInvariant(format!(
            "target resolution {} is undefined",
            settings.target_resolution
        )));
    }

    if let Some(target) = target_duration {
        if !target.is_finite() || target <= 0.0 {
            return Err(CoreError::PlanningInvariant(format!(
                "target duration for clip '{}' must be positive, got {target}",
                clip.id
            )));
        }
    }

    let input_known = clip.has_known_duration();
    let capped = target_duration.filter(|t| !input_known || *t < clip.duration_seconds);

    let splitting = match capped {
        Some(target) if settings.splitting_enabled && input_known => plan_splitting(
            clip.duration_seconds,
            target,
            settings.section_duration,
            settings.min_split_sections,
        ),
        _ => None,
    };

    let orientation = target_orientation.unwrap_or(clip.orientation);
    let box_resolution = settings.target_resolution.oriented(orientation);
    let quality = select_quality(box_resolution, settings.hd_quality, settings.fhd_quality);
    let audio_source = if clip.has_audio {
        AudioSource::Original
    } else {
        AudioSource::Silent
    };

    debug!(
        "Planned clip '{}': box {} ({}), cap {:?}, {} sections, audio {:?}",
        clip.id,
        box_resolution,
        orientation,
        capped,
        splitting.as_ref().map_or(0, |s| s.section_count),
        audio_source
    );

    Ok(CompressionPlan {
        clip_id: clip.id.clone(),
        input_path: clip.absolute_path.clone(),
        output_path,
        target_resolution: box_resolution,
        target_orientation: orientation,
        target_duration: capped,
        splitting,
        user_rotation_degrees: clip.user_rotation_degrees,
        audio_source,
        quality,
    })
}

/// Orientation shared by every clip of a compilation: the majority display
/// orientation, horizontal on a tie.
#[must_use]
pub fn majority_orientation(clips: &[ClipInput]) -> Orientation {
    let vertical = clips.iter().filter(|c| c.orientation.is_vertical()).count();
    if vertical * 2 > clips.len() {
        Orientation::Vertical
    } else {
        Orientation::Horizontal
    }
}

/// Output box that avoids upscaling: the configured target, reduced to the
/// best source resolution when every source is smaller.
#[must_use]
pub fn capped_target_resolution(target: Resolution, clips: &[ClipInput]) -> Resolution {
    let best = clips
        .iter()
        .filter_map(|c| c.resolution)
        .filter(Resolution::is_defined)
        .reduce(|best, r| best.or_better(Some(r)));
    target.or_worse(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(duration: f64, orientation: Orientation) -> ClipInput {
        ClipInput {
            id: "clip".to_string(),
            absolute_path: PathBuf::from("/clips/clip.mp4"),
            duration_seconds: duration,
            orientation,
            user_rotation_degrees: 0,
            resolution: Some(Resolution::FHD),
            has_audio: true,
        }
    }

    fn out() -> PathBuf {
        PathBuf::from("/cache/compressed/clip.mp4")
    }

    #[test]
    fn short_clip_is_passed_through() {
        let c = clip(3.0, Orientation::Horizontal);
        let plan = plan_compression(&c, out(), None, Some(3.0), &PlannerSettings::default()).unwrap();
        assert_eq!(plan.target_duration, None);
        assert!(plan.splitting.is_none());

        let plan = plan_compression(&c, out(), None, None, &PlannerSettings::default()).unwrap();
        assert_eq!(plan.target_duration, None);
    }

    #[test]
    fn plain_trim_when_splitting_disabled() {
        let c = clip(60.0, Orientation::Horizontal);
        let settings = PlannerSettings {
            splitting_enabled: false,
            ..PlannerSettings::default()
        };
        let plan = plan_compression(&c, out(), None, Some(15.0), &settings).unwrap();
        assert_eq!(plan.target_duration, Some(15.0));
        assert!(plan.splitting.is_none());
    }

    #[test]
    fn long_cut_is_split() {
        let c = clip(60.0, Orientation::Horizontal);
        let settings = PlannerSettings {
            splitting_enabled: true,
            ..PlannerSettings::default()
        };
        let plan = plan_compression(&c, out(), None, Some(15.0), &settings).unwrap();
        let split = plan.splitting.unwrap();
        assert_eq!(split.section_count, 3);
        assert_eq!(plan.target_duration, Some(15.0));
    }

    #[test]
    fn vertical_target_swaps_box() {
        let c = clip(10.0, Orientation::Horizontal);
        let plan = plan_compression(
            &c,
            out(),
            Some(Orientation::Vertical),
            None,
            &PlannerSettings::default(),
        )
        .unwrap();
        assert_eq!(plan.target_resolution, Resolution::new(720, 1280));
        assert_eq!(plan.target_orientation, Orientation::Vertical);
    }

    #[test]
    fn defaults_to_clip_orientation() {
        let c = clip(10.0, Orientation::Vertical);
        let plan = plan_compression(&c, out(), None, None, &PlannerSettings::default()).unwrap();
        assert_eq!(plan.target_resolution, Resolution::new(720, 1280));
    }

    #[test]
    fn quality_follows_box() {
        let c = clip(10.0, Orientation::Horizontal);
        let settings = PlannerSettings {
            target_resolution: Resolution::FHD,
            ..PlannerSettings::default()
        };
        let plan = plan_compression(&c, out(), None, None, &settings).unwrap();
        assert_eq!(plan.quality, QualityPreset::FHD);
        let plan = plan_compression(&c, out(), None, None, &PlannerSettings::default()).unwrap();
        assert_eq!(plan.quality, QualityPreset::HD);
    }

    #[test]
    fn silent_audio_for_clips_without_audio() {
        let mut c = clip(10.0, Orientation::Horizontal);
        c.has_audio = false;
        let plan = plan_compression(&c, out(), None, None, &PlannerSettings::default()).unwrap();
        assert_eq!(plan.audio_source, AudioSource::Silent);
    }

    #[test]
    fn rejects_bad_inputs() {
        let c = clip(10.0, Orientation::Horizontal);
        let settings = PlannerSettings::default();
        assert!(matches!(
            plan_compression(&c, out(), None, Some(0.0), &settings),
            Err(CoreError::PlanningInvariant(_))
        ));
        assert!(matches!(
            plan_compression(&c, out(), None, Some(-2.0), &settings),
            Err(CoreError::PlanningInvariant(_))
        ));
        let undefined = PlannerSettings {
            target_resolution: Resolution::new(0, 720),
            ..PlannerSettings::default()
        };
        assert!(plan_compression(&c, out(), None, None, &undefined).is_err());
    }

    #[test]
    fn majority_orientation_ties_horizontal() {
        let v = clip(1.0, Orientation::Vertical);
        let h = clip(1.0, Orientation::Horizontal);
        assert_eq!(majority_orientation(&[v.clone(), v.clone(), h.clone()]), Orientation::Vertical);
        assert_eq!(majority_orientation(&[v, h]), Orientation::Horizontal);
        assert_eq!(majority_orientation(&[]), Orientation::Horizontal);
    }

    #[test]
    fn capped_target_avoids_upscaling() {
        let mut small = clip(1.0, Orientation::Horizontal);
        small.resolution = Some(Resolution::new(640, 360));
        let mut smaller = small.clone();
        smaller.resolution = Some(Resolution::new(480, 270));
        assert_eq!(
            capped_target_resolution(Resolution::HD, &[small.clone(), smaller]),
            Resolution::new(640, 360)
        );
        let big = clip(1.0, Orientation::Horizontal);
        assert_eq!(capped_target_resolution(Resolution::HD, &[small, big]), Resolution::HD);
    }
}
