//! Compression planning: output boxes, quality tiers, time caps, split windows
//! and concatenation plans.

pub mod concat;
pub mod planner;
pub mod resolution;
pub mod splitting;

pub use concat::{AudioOverlay, ConcatPlan};
pub use planner::{
    AudioSource, CompressionPlan, PlannerSettings, capped_target_resolution, majority_orientation,
    plan_compression,
};
pub use resolution::{QualityPreset, Resolution, select_quality};
pub use splitting::{Segment, SplittingPlan, plan_splitting, should_split};
