//! Property tests for section splitting.

use proptest::prelude::*;
use reelfit_core::planning::{plan_splitting, should_split};

const EPS: f64 = 1e-6;

proptest! {
    #[test]
    fn split_windows_keep_exactly_the_target(
        input in 20.0f64..3600.0,
        fraction in 0.05f64..0.95,
        section in 1.0f64..10.0,
    ) {
        let target = input * fraction;
        match plan_splitting(input, target, section, 2) {
            Some(plan) => {
                prop_assert!(should_split(input, target, section, 2));
                prop_assert_eq!(plan.section_count, (target / section).floor() as usize);
                prop_assert_eq!(plan.segments.len(), plan.section_count);
                prop_assert!((plan.total_duration() - target).abs() < EPS * target.max(1.0));

                let mut previous_end = 0.0;
                for segment in &plan.segments {
                    prop_assert!(segment.start >= previous_end - EPS);
                    prop_assert!(segment.duration >= section - EPS);
                    prop_assert!(segment.end() <= input + EPS);
                    previous_end = segment.end();
                }
            }
            None => prop_assert!(!should_split(input, target, section, 2)),
        }
    }
}

#[test]
fn remainder_goes_to_the_earliest_windows() {
    // 3 windows of 5s every 20s, 2s of remainder on the first one.
    let plan = plan_splitting(60.0, 17.0, 5.0, 2).unwrap();
    let durations: Vec<f64> = plan.segments.iter().map(|s| s.duration).collect();
    assert_eq!(durations, vec![7.0, 5.0, 5.0]);
}

#[test]
fn short_or_barely_cut_clips_are_not_split() {
    assert!(!should_split(40.0, 37.0, 5.0, 2));
    assert!(!should_split(100.0, 10.0, 5.0, 2));
    assert!(should_split(100.0, 10.5, 5.0, 2));
}
