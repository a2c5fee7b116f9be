// reelfit-cli/src/commands/probe.rs
//
// `reelfit probe`: prints what the planner will see for each clip.

use super::{Outcome, clip_requests};
use crate::cli::ProbeArgs;
use crate::error::CliResult;
use crate::terminal::{print_error, print_section, print_status};

use reelfit_core::{ClipInput, CoreConfig, FfprobeProber, check_dependency, format_duration, probe_clip};

fn describe(clip: &ClipInput) {
    print_section(&clip.id);
    print_status("File", &clip.absolute_path.display().to_string(), false);
    let duration = if clip.has_known_duration() {
        format_duration(clip.duration_seconds)
    } else {
        "unknown".to_string()
    };
    print_status("Duration", &duration, true);
    print_status("Orientation", &clip.orientation.to_string(), false);
    let resolution = clip
        .resolution
        .map_or_else(|| "unknown".to_string(), |r| r.to_string());
    print_status("Resolution", &resolution, false);
    print_status("Audio", if clip.has_audio { "yes" } else { "no" }, false);
}

pub fn run(args: ProbeArgs, config: &CoreConfig) -> CliResult<Outcome> {
    check_dependency(&config.ffprobe_path)?;
    let prober = FfprobeProber::new(config.ffprobe_path.clone());

    let mut outcome = Outcome::Success;
    let mut probed = Vec::new();
    for request in clip_requests(&args.clips) {
        match probe_clip(&prober, request.id.clone(), &request.path, 0) {
            Ok(clip) => probed.push(clip),
            Err(e) => {
                print_error(&format!("Could not probe '{}'", request.path.display()), &e.to_string());
                outcome = Outcome::Failed;
            }
        }
    }

    if args.json {
        let json = serde_json::to_string_pretty(&probed)?;
        println!("{json}");
    } else {
        probed.iter().for_each(describe);
    }
    Ok(outcome)
}
