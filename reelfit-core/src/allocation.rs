// ============================================================================
// reelfit-core/src/allocation.rs
// ============================================================================
//
// DURATION ALLOCATION: fitting N clips into a total time budget
//
// Every clip gets `min(duration, share)` where `share` is the largest value
// such that the kept durations sum to at most the budget. Clips shorter than
// the share are kept whole and their unused time is redistributed evenly
// among the longer clips ("water filling").
//
// The share is found by iterating: partition clips around the current share,
// recompute the share from the long clips' remaining budget, and stop once the
// partition no longer changes. Each step moves at least one clip from long to
// short, so the loop ends within N steps; the configured iteration cap is only
// a backstop. Every intermediate share is feasible, so stopping at the cap
// still yields a valid (if under-filled) allocation.

use crate::error::{CoreError, CoreResult};
use crate::media::ClipInput;

use log::{debug, warn};
use serde::Serialize;

/// Default bound on share refinement steps.
pub const DEFAULT_ITERATION_CAP: usize = 64;

/// How much of one clip to keep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationResult {
    pub clip: ClipInput,
    pub input_duration: f64,
    pub target_duration: f64,
}

impl AllocationResult {
    /// The whole clip fits in its share.
    #[must_use]
    pub fn is_whole(&self) -> bool {
        self.target_duration >= self.input_duration
    }
}

/// Allocates `max_total_duration` seconds across `clips`.
///
/// Clips without a usable duration are dropped (with a warning). The result
/// keeps input order.
pub fn allocate(clips: &[ClipInput], max_total_duration: f64) -> CoreResult<Vec<AllocationResult>> {
    allocate_with_cap(clips, max_total_duration, DEFAULT_ITERATION_CAP)
}

/// [`allocate`] with an explicit bound on refinement steps.
pub fn allocate_with_cap(
    clips: &[ClipInput],
    max_total_duration: f64,
    iteration_cap: usize,
) -> CoreResult<Vec<AllocationResult>> {
    validate_budget(max_total_duration)?;

    let usable: Vec<&ClipInput> = clips
        .iter()
        .filter(|clip| {
            let keep = clip.has_known_duration();
            if !keep {
                warn!(
                    "Dropping clip '{}' ({}): unusable duration {}",
                    clip.id,
                    clip.absolute_path.display(),
                    clip.duration_seconds
                );
            }
            keep
        })
        .collect();

    if usable.is_empty() {
        return Ok(Vec::new());
    }

    let durations: Vec<f64> = usable.iter().map(|c| c.duration_seconds).collect();
    let share = fair_share(&durations, max_total_duration, iteration_cap)?;
    debug!(
        "Allocated share {:.3}s per clip for {} clips within {:.3}s",
        share,
        usable.len(),
        max_total_duration
    );

    Ok(usable
        .into_iter()
        .map(|clip| AllocationResult {
            clip: clip.clone(),
            input_duration: clip.duration_seconds,
            target_duration: clip.duration_seconds.min(share),
        })
        .collect())
}

/// Target durations for raw inputs, in input order.
///
/// Unlike [`allocate`] this does not filter: every duration must be positive.
pub fn allocate_durations(durations: &[f64], max_total_duration: f64) -> CoreResult<Vec<f64>> {
    validate_budget(max_total_duration)?;
    if let Some(bad) = durations.iter().find(|d| !d.is_finite() || **d <= 0.0) {
        return Err(CoreError::PlanningInvariant(format!(
            "clip durations must be positive, got {bad}"
        )));
    }
    if durations.is_empty() {
        return Ok(Vec::new());
    }
    let share = fair_share(durations, max_total_duration, DEFAULT_ITERATION_CAP)?;
    Ok(durations.iter().map(|d| d.min(share)).collect())
}

/// Duration to keep for a clip compressed on its own.
///
/// `None` when the probe yielded no duration.
#[must_use]
pub fn allocate_single(duration: Option<f64>, max_total_duration: f64) -> Option<f64> {
    duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| d.min(max_total_duration))
}

fn validate_budget(max_total_duration: f64) -> CoreResult<()> {
    if !max_total_duration.is_finite() || max_total_duration <= 0.0 {
        return Err(CoreError::PlanningInvariant(format!(
            "maximum total duration must be positive, got {max_total_duration}"
        )));
    }
    Ok(())
}

/// Computes the per-clip share for positive `durations`.
fn fair_share(durations: &[f64], max_total: f64, iteration_cap: usize) -> CoreResult<f64> {
    if iteration_cap == 0 {
        return Err(CoreError::PlanningInvariant(
            "allocation iteration cap must be at least 1".to_string(),
        ));
    }

    let mut share = max_total / durations.len() as f64;

    for step in 0..iteration_cap {
        let (short_sum, long_count) = durations.iter().fold((0.0_f64, 0_usize), |(sum, count), d| {
            if *d > share { (sum, count + 1) } else { (sum + d, count) }
        });

        // Everything fits.
        if long_count == 0 {
            return Ok(share);
        }

        let refined = (max_total - short_sum) / long_count as f64;
        // Long clips must stay long under the refined share too, or the budget is not filled.
        let stable = durations.iter().all(|d| *d <= share || *d > refined);
        debug!(
            "Allocation step {}: share {:.3}s, {} long clips, refined {:.3}s",
            step, share, long_count, refined
        );

        if stable || long_count == 1 || long_count == durations.len() {
            return Ok(refined);
        }
        share = refined;
    }

    warn!(
        "Allocation did not settle within {} steps; using share {:.3}s",
        iteration_cap, share
    );
    Ok(share)
}
