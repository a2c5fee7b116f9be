//! Frame resolutions and the quality tiers derived from them.

use crate::media::Orientation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Short-side pixel count of the named quality levels.
pub const HD_SHORT_SIDE: u32 = 720;
pub const FHD_SHORT_SIDE: u32 = 1080;

/// A frame size in pixels. Serialized as `"WIDTHxHEIGHT"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const HD: Resolution = Resolution { width: 1280, height: 720 };
    pub const FHD: Resolution = Resolution { width: 1920, height: 1080 };

    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are known.
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        !self.is_defined()
    }

    #[must_use]
    pub fn short_side(&self) -> u32 {
        self.width.min(self.height)
    }

    #[must_use]
    pub fn long_side(&self) -> u32 {
        self.width.max(self.height)
    }

    #[must_use]
    pub fn is_better_than_hd(&self) -> bool {
        self.short_side() > HD_SHORT_SIDE
    }

    /// Returns `other` only when it is larger on both the short and the long side.
    #[must_use]
    pub fn or_better(self, other: Option<Resolution>) -> Resolution {
        match other {
            Some(other)
                if self.short_side() < other.short_side() && self.long_side() < other.long_side() =>
            {
                other
            }
            _ => self,
        }
    }

    /// Returns `other` only when it is smaller on both the short and the long side.
    #[must_use]
    pub fn or_worse(self, other: Option<Resolution>) -> Resolution {
        match other {
            Some(other)
                if self.short_side() > other.short_side() && self.long_side() > other.long_side() =>
            {
                other
            }
            _ => self,
        }
    }

    /// Lays the frame out for `orientation`: the narrow side becomes the width
    /// for vertical output and the height for horizontal output.
    #[must_use]
    pub fn oriented(self, orientation: Orientation) -> Resolution {
        match orientation {
            Orientation::Vertical => Resolution::new(self.short_side(), self.long_side()),
            Orientation::Horizontal => Resolution::new(self.long_side(), self.short_side()),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "hd" | "720p" => return Ok(Resolution::HD),
            "fhd" | "1080p" => return Ok(Resolution::FHD),
            _ => {}
        }
        let (w, h) = lowered
            .split_once('x')
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
        let width = w.trim().parse::<u32>().map_err(|e| format!("invalid width '{w}': {e}"))?;
        let height = h.trim().parse::<u32>().map_err(|e| format!("invalid height '{h}': {e}"))?;
        Ok(Resolution::new(width, height))
    }
}

impl TryFrom<String> for Resolution {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

/// Encoder rate control for one quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityPreset {
    pub crf: u8,
    /// Peak bitrate in Mbit/s. The rate-control buffer is twice this.
    pub max_rate_mbit: u32,
}

impl QualityPreset {
    pub const FHD: QualityPreset = QualityPreset { crf: 22, max_rate_mbit: 9 };
    pub const HD: QualityPreset = QualityPreset { crf: 24, max_rate_mbit: 6 };

    #[must_use]
    pub fn buffer_size_mbit(&self) -> u32 {
        self.max_rate_mbit * 2
    }
}

/// Picks the preset for an output box: above-HD outputs get the FHD tier.
#[must_use]
pub fn select_quality(target: Resolution, hd: QualityPreset, fhd: QualityPreset) -> QualityPreset {
    if target.is_better_than_hd() { fhd } else { hd }
}
