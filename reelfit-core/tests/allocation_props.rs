//! Property tests for the duration allocator.
//!
//! These tests verify:
//! - The kept total never exceeds the budget and fills it when clips are cut
//! - No clip is lengthened and clips that fit are kept whole
//! - Every cut clip receives the same share, at least as long as any whole clip
//! - Results keep input order and drop clips without a usable duration

use proptest::prelude::*;
use reelfit_core::allocation::{allocate, allocate_durations, allocate_single, allocate_with_cap};
use reelfit_core::{ClipInput, CoreError, Orientation};
use std::path::PathBuf;

const EPS: f64 = 1e-6;

fn clip(id: &str, duration: f64) -> ClipInput {
    ClipInput {
        id: id.to_string(),
        absolute_path: PathBuf::from(format!("/clips/{id}.mp4")),
        duration_seconds: duration,
        orientation: Orientation::Horizontal,
        user_rotation_degrees: 0,
        resolution: None,
        has_audio: true,
    }
}

proptest! {
    #[test]
    fn kept_total_is_min_of_budget_and_input(
        durations in prop::collection::vec(0.1f64..1000.0, 1..20),
        budget in 1.0f64..2000.0,
    ) {
        let targets = allocate_durations(&durations, budget).unwrap();
        let input_total: f64 = durations.iter().sum();
        let kept: f64 = targets.iter().sum();

        prop_assert!(kept <= budget + EPS);
        prop_assert!((kept - input_total.min(budget)).abs() < EPS * input_total.max(1.0));
    }

    #[test]
    fn clips_are_never_lengthened(
        durations in prop::collection::vec(0.1f64..1000.0, 1..20),
        budget in 1.0f64..2000.0,
    ) {
        let targets = allocate_durations(&durations, budget).unwrap();
        prop_assert_eq!(targets.len(), durations.len());
        for (target, input) in targets.iter().zip(&durations) {
            prop_assert!(*target > 0.0);
            prop_assert!(*target <= *input + EPS);
        }
    }

    #[test]
    fn cut_clips_share_equally(
        durations in prop::collection::vec(0.1f64..1000.0, 1..20),
        budget in 1.0f64..2000.0,
    ) {
        let targets = allocate_durations(&durations, budget).unwrap();
        let cut: Vec<f64> = targets
            .iter()
            .zip(&durations)
            .filter(|(t, d)| **t < **d - EPS)
            .map(|(t, _)| *t)
            .collect();
        if let Some(share) = cut.first() {
            for t in &cut {
                prop_assert!((t - share).abs() < EPS);
            }
            for (t, d) in targets.iter().zip(&durations) {
                if *t >= *d - EPS {
                    prop_assert!(*d <= share + EPS);
                }
            }
        }
    }

    #[test]
    fn whole_when_everything_fits(durations in prop::collection::vec(0.1f64..50.0, 1..10)) {
        let budget: f64 = durations.iter().sum::<f64>() + 1.0;
        let targets = allocate_durations(&durations, budget).unwrap();
        prop_assert_eq!(targets, durations);
    }

    #[test]
    fn single_clip_is_capped(duration in 0.1f64..5000.0, cap in 1.0f64..1000.0) {
        let target = allocate_single(Some(duration), cap).unwrap();
        prop_assert_eq!(target, duration.min(cap));
    }
}

#[test]
fn three_clips_share_thirty_seconds() {
    let clips = [clip("a", 40.0), clip("b", 10.0), clip("c", 5.0)];
    let results = allocate(&clips, 30.0).unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.clip.id.as_str()).collect();
    let targets: Vec<f64> = results.iter().map(|r| r.target_duration).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(targets, vec![15.0, 10.0, 5.0]);
    assert!(!results[0].is_whole());
    assert!(results[1].is_whole());
}

#[test]
fn two_short_clips_are_kept_whole() {
    assert_eq!(allocate_durations(&[8.0, 8.0], 20.0).unwrap(), vec![8.0, 8.0]);
}

#[test]
fn unusable_clips_are_dropped_in_order() {
    let clips = [clip("a", 12.0), clip("nodur", 0.0), clip("b", 12.0)];
    let results = allocate(&clips, 10.0).unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.clip.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(results.iter().all(|r| (r.target_duration - 5.0).abs() < EPS));
}

#[test]
fn every_iterate_is_feasible() {
    let clips = [clip("a", 100.0), clip("b", 30.0), clip("c", 20.0), clip("d", 2.0)];
    for cap in 1..=4 {
        let kept: f64 = allocate_with_cap(&clips, 60.0, cap)
            .unwrap()
            .iter()
            .map(|r| r.target_duration)
            .sum();
        assert!(kept <= 60.0 + EPS, "cap {cap} kept {kept}");
    }
}

#[test]
fn invalid_budget_is_rejected() {
    assert!(matches!(
        allocate_durations(&[10.0], 0.0),
        Err(CoreError::PlanningInvariant(_))
    ));
    assert!(matches!(
        allocate_durations(&[10.0, -1.0], 30.0),
        Err(CoreError::PlanningInvariant(_))
    ));
    assert!(allocate_single(None, 30.0).is_none());
}
