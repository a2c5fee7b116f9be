// ============================================================================
// reelfit-core/src/media/orientation.rs
// ============================================================================
//
// ORIENTATION: rotation metadata to display orientation
//
// A clip's display orientation depends on its stored frame shape and on
// whatever rotation metadata the container carries. ffprobe exposes rotation
// in two places (per-stream side data and the legacy `rotate` tag) and they
// can disagree, so everything funnels through `resolve_orientation`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display orientation of a clip or an output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    #[must_use]
    pub fn is_vertical(self) -> bool {
        self == Orientation::Vertical
    }

    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "horizontal"),
            Orientation::Vertical => write!(f, "vertical"),
        }
    }
}

impl std::str::FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "horizontal" | "landscape" | "h" => Ok(Orientation::Horizontal),
            "vertical" | "portrait" | "v" => Ok(Orientation::Vertical),
            other => Err(format!("unknown orientation '{other}'")),
        }
    }
}

/// Snaps a rotation in degrees to the nearest quarter turn in `0..360`.
#[must_use]
pub fn normalize_rotation(degrees: f64) -> i32 {
    if !degrees.is_finite() {
        return 0;
    }
    let quarters = (degrees / 90.0).round() as i64;
    (quarters * 90).rem_euclid(360) as i32
}

#[must_use]
pub fn is_quarter_turn(degrees: i32) -> bool {
    matches!(degrees.rem_euclid(360), 90 | 270)
}

/// Resolves the display orientation of a clip.
///
/// Rotation precedence: the stream side-data rotation when present, then the
/// display-matrix (container tag) rotation, then none. A quarter turn swaps
/// the stored width and height before the shape is compared. Square frames
/// are horizontal. When the frame size is unknown, a quarter turn alone
/// makes the clip vertical.
#[must_use]
pub fn resolve_orientation(
    side_data_rotation: Option<f64>,
    display_matrix_rotation: Option<f64>,
    width: u32,
    height: u32,
) -> Orientation {
    let rotation = effective_rotation(side_data_rotation, display_matrix_rotation);
    let (display_width, display_height) = if is_quarter_turn(rotation) {
        (height, width)
    } else {
        (width, height)
    };

    if display_width == 0 || display_height == 0 {
        return if is_quarter_turn(rotation) {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        };
    }

    if display_height > display_width {
        Orientation::Vertical
    } else {
        Orientation::Horizontal
    }
}

/// The rotation that wins the precedence rules, normalized to `0..360`.
#[must_use]
pub fn effective_rotation(side_data_rotation: Option<f64>, display_matrix_rotation: Option<f64>) -> i32 {
    side_data_rotation
        .or(display_matrix_rotation)
        .map(normalize_rotation)
        .unwrap_or(0)
}

/// Orientation after the user's own rotation is applied on top.
#[must_use]
pub fn apply_user_rotation(orientation: Orientation, user_rotation_degrees: i32) -> Orientation {
    if is_quarter_turn(user_rotation_degrees) {
        orientation.flipped()
    } else {
        orientation
    }
}

/// `transpose` filters realising a user rotation, if any is needed.
#[must_use]
pub fn transpose_filters(user_rotation_degrees: i32) -> Option<&'static str> {
    match user_rotation_degrees.rem_euclid(360) {
        90 => Some("transpose=1"),
        270 => Some("transpose=2"),
        180 => Some("transpose=1,transpose=1"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_rotations() {
        assert_eq!(normalize_rotation(0.0), 0);
        assert_eq!(normalize_rotation(-90.0), 270);
        assert_eq!(normalize_rotation(90.0), 90);
        assert_eq!(normalize_rotation(-180.0), 180);
        assert_eq!(normalize_rotation(450.0), 90);
        assert_eq!(normalize_rotation(89.4), 90);
        assert_eq!(normalize_rotation(f64::NAN), 0);
    }

    #[test]
    fn plain_shapes_without_rotation() {
        assert_eq!(resolve_orientation(None, None, 1920, 1080), Orientation::Horizontal);
        assert_eq!(resolve_orientation(None, None, 1080, 1920), Orientation::Vertical);
        assert_eq!(resolve_orientation(None, None, 1000, 1000), Orientation::Horizontal);
    }

    #[test]
    fn side_data_quarter_turn_swaps_shape() {
        assert_eq!(resolve_orientation(Some(-90.0), None, 1920, 1080), Orientation::Vertical);
        assert_eq!(resolve_orientation(Some(90.0), None, 1080, 1920), Orientation::Horizontal);
        assert_eq!(resolve_orientation(Some(270.0), None, 1920, 1080), Orientation::Vertical);
    }

    #[test]
    fn half_turn_keeps_shape() {
        assert_eq!(resolve_orientation(Some(180.0), None, 1920, 1080), Orientation::Horizontal);
        assert_eq!(resolve_orientation(Some(-180.0), None, 1080, 1920), Orientation::Vertical);
    }

    #[test]
    fn display_matrix_used_only_without_side_data() {
        assert_eq!(resolve_orientation(None, Some(90.0), 1920, 1080), Orientation::Vertical);
        // Side data says no rotation; the tag is ignored.
        assert_eq!(resolve_orientation(Some(0.0), Some(90.0), 1920, 1080), Orientation::Horizontal);
        assert_eq!(effective_rotation(Some(180.0), Some(90.0)), 180);
        assert_eq!(effective_rotation(None, None), 0);
    }

    #[test]
    fn unknown_size_falls_back_to_rotation() {
        assert_eq!(resolve_orientation(Some(90.0), None, 0, 0), Orientation::Vertical);
        assert_eq!(resolve_orientation(None, None, 0, 0), Orientation::Horizontal);
    }

    #[test]
    fn user_rotation_flips_on_quarter_turns() {
        assert_eq!(apply_user_rotation(Orientation::Horizontal, 90), Orientation::Vertical);
        assert_eq!(apply_user_rotation(Orientation::Horizontal, -90), Orientation::Vertical);
        assert_eq!(apply_user_rotation(Orientation::Vertical, 180), Orientation::Vertical);
        assert_eq!(apply_user_rotation(Orientation::Vertical, 0), Orientation::Vertical);
    }

    #[test]
    fn transpose_mapping() {
        assert_eq!(transpose_filters(90), Some("transpose=1"));
        assert_eq!(transpose_filters(-90), Some("transpose=2"));
        assert_eq!(transpose_filters(270), Some("transpose=2"));
        assert_eq!(transpose_filters(180), Some("transpose=1,transpose=1"));
        assert_eq!(transpose_filters(-180), Some("transpose=1,transpose=1"));
        assert_eq!(transpose_filters(0), None);
        assert_eq!(transpose_filters(45), None);
    }

    #[test]
    fn parses_orientation_names() {
        assert_eq!("Vertical".parse::<Orientation>().unwrap(), Orientation::Vertical);
        assert_eq!("landscape".parse::<Orientation>().unwrap(), Orientation::Horizontal);
        assert!("diagonal".parse::<Orientation>().is_err());
    }
}
