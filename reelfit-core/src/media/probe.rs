// ============================================================================
// reelfit-core/src/media/probe.rs
// ============================================================================
//
// MEDIA PROBE: clip inspection through ffprobe
//
// Runs `ffprobe -print_format json -show_format -show_streams` and reduces
// the JSON to the handful of facts the planner needs: duration, stored frame
// size, rotation metadata, and whether an audio stream exists.
//
// KEY COMPONENTS:
// - MediaProber: trait seam so tests can substitute canned probe data
// - FfprobeProber: subprocess implementation
// - parse_probe_output: pure JSON to ProbeData reduction
// - ClipInput / probe_clip: the immutable per-clip record used downstream

use crate::error::{CoreError, CoreResult};
use crate::media::orientation::{Orientation, apply_user_rotation, effective_rotation, resolve_orientation};
use crate::planning::Resolution;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Facts extracted from one ffprobe run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProbeData {
    /// Container duration in seconds, falling back to the video stream's.
    pub duration_seconds: Option<f64>,
    /// Stored (pre-rotation) frame width of the first video stream.
    pub width: u32,
    pub height: u32,
    /// `side_data_list[].rotation` of the first video stream.
    pub side_data_rotation: Option<f64>,
    /// Legacy `tags.rotate` of the first video stream.
    pub tag_rotation: Option<f64>,
    pub has_video: bool,
    pub has_audio: bool,
}

impl ProbeData {
    #[must_use]
    pub fn rotation(&self) -> i32 {
        effective_rotation(self.side_data_rotation, self.tag_rotation)
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        resolve_orientation(self.side_data_rotation, self.tag_rotation, self.width, self.height)
    }

    /// Frame size as displayed, i.e. with quarter-turn rotation applied.
    #[must_use]
    pub fn display_resolution(&self) -> Option<Resolution> {
        let stored = Resolution::new(self.width, self.height);
        if stored.is_undefined() {
            return None;
        }
        if crate::media::orientation::is_quarter_turn(self.rotation()) {
            Some(Resolution::new(self.height, self.width))
        } else {
            Some(stored)
        }
    }
}

/// Abstraction over media inspection.
pub trait MediaProber: Send + Sync {
    fn probe(&self, path: &Path) -> CoreResult<ProbeData>;
}

/// Probes media with an `ffprobe` executable.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeProber {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

impl MediaProber for FfprobeProber {
    fn probe(&self, path: &Path) -> CoreResult<ProbeData> {
        if !path.is_file() {
            return Err(CoreError::ProbeFailure {
                path: path.to_path_buf(),
                message: "file not found".to_string(),
            });
        }

        let mut cmd = Command::new(&self.ffprobe_path);
        cmd.args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path);
        debug!("Running ffprobe: {:?}", cmd);

        let output = cmd.output().map_err(|e| CoreError::ProbeFailure {
            path: path.to_path_buf(),
            message: format!("failed to execute {}: {e}", self.ffprobe_path.display()),
        })?;

        if !output.status.success() {
            return Err(CoreError::ProbeFailure {
                path: path.to_path_buf(),
                message: format!(
                    "ffprobe exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        parse_probe_output(&output.stdout).map_err(|e| CoreError::ProbeFailure {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

// ---- ffprobe JSON shape (only the fields we read) ----

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

fn parse_seconds(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Reduces raw `ffprobe -print_format json` output to [`ProbeData`].
pub fn parse_probe_output(json: &[u8]) -> CoreResult<ProbeData> {
    let parsed: FfprobeOutput = serde_json::from_slice(json)?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let duration_seconds = parse_seconds(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .or_else(|| parse_seconds(video.and_then(|v| v.duration.as_deref())));

    let (width, height, side_data_rotation, tag_rotation) = match video {
        Some(v) => (
            v.width.unwrap_or(0),
            v.height.unwrap_or(0),
            v.side_data_list.iter().find_map(|sd| sd.rotation),
            v.tags.get("rotate").and_then(|r| r.trim().parse::<f64>().ok()),
        ),
        None => (0, 0, None, None),
    };

    Ok(ProbeData {
        duration_seconds,
        width,
        height,
        side_data_rotation,
        tag_rotation,
        has_video: video.is_some(),
        has_audio,
    })
}

/// One input clip, immutable once probed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipInput {
    pub id: String,
    pub absolute_path: PathBuf,
    /// Zero means the duration could not be determined.
    pub duration_seconds: f64,
    /// Display orientation including the user's rotation.
    pub orientation: Orientation,
    pub user_rotation_degrees: i32,
    pub resolution: Option<Resolution>,
    pub has_audio: bool,
}

impl ClipInput {
    #[must_use]
    pub fn has_known_duration(&self) -> bool {
        self.duration_seconds.is_finite() && self.duration_seconds > 0.0
    }
}

/// Probes `path` and builds its [`ClipInput`].
///
/// A missing duration is recorded as zero and logged; it is the allocator
/// that later drops such clips.
pub fn probe_clip(
    prober: &dyn MediaProber,
    id: impl Into<String>,
    path: &Path,
    user_rotation_degrees: i32,
) -> CoreResult<ClipInput> {
    let absolute_path = std::path::absolute(path)?;
    let data = prober.probe(&absolute_path)?;

    if !data.has_video {
        return Err(CoreError::ProbeFailure {
            path: absolute_path,
            message: "no video stream".to_string(),
        });
    }

    let duration_seconds = data.duration_seconds.unwrap_or_else(|| {
        warn!("No duration reported for {}", absolute_path.display());
        0.0
    });

    let orientation = apply_user_rotation(data.orientation(), user_rotation_degrees);

    Ok(ClipInput {
        id: id.into(),
        absolute_path,
        duration_seconds,
        orientation,
        user_rotation_degrees,
        resolution: data.display_resolution(),
        has_audio: data.has_audio,
    })
}
