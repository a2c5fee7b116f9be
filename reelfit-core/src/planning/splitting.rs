// ============================================================================
// reelfit-core/src/planning/splitting.rs
// ============================================================================
//
// SPLITTING: sampling a long clip as evenly spaced sections
//
// Instead of keeping only the first T seconds of a long clip, a split plan
// keeps `n = floor(T / L)` windows of length L spread across the whole clip at
// a fixed interval `D / n`. The remainder `T - n*L` is handed out to the
// earliest windows, each growing by at most the gap that separates it from
// the next window, so sections never overlap and the kept total equals T.

use serde::Serialize;

/// Default section length in seconds.
pub const DEFAULT_SECTION_DURATION: f64 = 5.0;

/// Splitting requires the target to exceed this many sections.
pub const DEFAULT_MIN_SPLIT_SECTIONS: u32 = 2;

/// One kept window of the source clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start: f64,
    pub duration: f64,
}

impl Segment {
    #[must_use]
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplittingPlan {
    pub section_count: usize,
    /// Base section length before the remainder is distributed.
    pub section_duration: f64,
    /// Ordered, non-overlapping windows inside `[0, input_duration]`.
    pub segments: Vec<Segment>,
}

impl SplittingPlan {
    #[must_use]
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }
}

/// Whether a clip of `input_duration` trimmed to `target_duration` is split.
#[must_use]
pub fn should_split(
    input_duration: f64,
    target_duration: f64,
    section_duration: f64,
    min_sections: u32,
) -> bool {
    section_duration > 0.0
        && input_duration.is_finite()
        && target_duration.is_finite()
        && input_duration - target_duration > section_duration
        && target_duration > f64::from(min_sections) * section_duration
}

/// Builds the split plan, or `None` when the clip should be trimmed plainly.
#[must_use]
pub fn plan_splitting(
    input_duration: f64,
    target_duration: f64,
    section_duration: f64,
    min_sections: u32,
) -> Option<SplittingPlan> {
    if !should_split(input_duration, target_duration, section_duration, min_sections) {
        return None;
    }

    let section_count = (target_duration / section_duration).floor() as usize;
    if section_count == 0 {
        return None;
    }

    let interval = input_duration / section_count as f64;
    let slack = (interval - section_duration).max(0.0);
    let mut remainder = (target_duration - section_count as f64 * section_duration).max(0.0);

    let segments = (0..section_count)
        .map(|i| {
            let extra = slack.min(remainder);
            remainder -= extra;
            let start = i as f64 * interval;
            let duration = (section_duration + extra).min(input_duration - start);
            Segment { start, duration }
        })
        .collect();

    Some(SplittingPlan {
        section_count,
        section_duration,
        segments,
    })
}
