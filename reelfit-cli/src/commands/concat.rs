// reelfit-cli/src/commands/concat.rs
//
// `reelfit concat`: the full compilation. Clips are probed, trimmed to share
// the budget, compressed in parallel and joined, optionally over a looped
// background track.

use super::{Outcome, check_tools, clip_requests, report_result, run_pipeline};
use crate::cli::ConcatArgs;
use crate::error::CliResult;
use crate::terminal::{print_processing, print_section, print_status};

use reelfit_core::pipeline::ClipRequest;
use reelfit_core::{CoreConfig, CoreError, format_seconds};

/// Applies `INDEX=DEGREES` rotations (1-based) to the requests.
fn apply_rotations(requests: &mut [ClipRequest], rotations: &[(usize, i32)]) -> CliResult<()> {
    for &(index, degrees) in rotations {
        let count = requests.len();
        let request = requests.get_mut(index.wrapping_sub(1)).ok_or_else(|| {
            CoreError::Config(format!("--rotate {index}={degrees}: only {count} clips were given"))
        })?;
        request.user_rotation_degrees = degrees;
    }
    Ok(())
}

pub fn run(args: ConcatArgs, mut config: CoreConfig) -> CliResult<Outcome> {
    if let Some(volume) = args.clip_volume {
        config.clip_volume_percent = volume;
    }
    if let Some(volume) = args.track_volume {
        config.track_volume_percent = volume;
    }
    config.validate()?;
    check_tools(&config)?;

    let mut requests = clip_requests(&args.clips);
    apply_rotations(&mut requests, &args.rotations)?;
    let budget = args.max_duration.unwrap_or(config.max_total_duration);
    let audio = args.audio;

    print_section("Compilation");
    print_status("Clips", &requests.len().to_string(), false);
    print_status("Budget", &format!("{}s", format_seconds(budget)), true);
    if let Some(track) = &audio {
        print_status("Audio track", &track.display().to_string(), false);
    }
    print_processing("Compressing and joining clips");

    let result = run_pipeline(config, move |pipeline, cancel| {
        pipeline.compress_and_concat(&requests, Some(budget), audio, cancel)
    })?;
    Ok(report_result("Compilation", &result))
}
