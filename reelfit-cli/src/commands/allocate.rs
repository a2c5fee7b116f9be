// reelfit-cli/src/commands/allocate.rs
//
// `reelfit allocate`: shows how much of each clip a compilation would keep,
// without running ffmpeg. Durations come from ffprobe or from --durations.

use super::{Outcome, clip_requests};
use crate::cli::AllocateArgs;
use crate::error::CliResult;
use crate::terminal::{print_section, print_status};

use log::warn;
use reelfit_core::{CoreConfig, FfprobeProber, allocate, allocate_durations, check_dependency, probe_clip};
use serde_json::json;

/// One line of the allocation table.
#[derive(Debug, Clone, PartialEq)]
struct Row {
    id: String,
    input_duration: f64,
    target_duration: f64,
}

fn rows_from_durations(durations: &[f64], budget: f64) -> CliResult<Vec<Row>> {
    let targets = allocate_durations(durations, budget)?;
    Ok(durations
        .iter()
        .zip(targets)
        .enumerate()
        .map(|(index, (input, target))| Row {
            id: (index + 1).to_string(),
            input_duration: *input,
            target_duration: target,
        })
        .collect())
}

fn rows_from_clips(args: &AllocateArgs, config: &CoreConfig, budget: f64) -> CliResult<Vec<Row>> {
    check_dependency(&config.ffprobe_path)?;
    let prober = FfprobeProber::new(config.ffprobe_path.clone());

    let mut clips = Vec::new();
    for request in clip_requests(&args.clips) {
        match probe_clip(&prober, request.id.clone(), &request.path, 0) {
            Ok(clip) => clips.push(clip),
            Err(e) => warn!("Skipping '{}': {e}", request.path.display()),
        }
    }

    Ok(allocate(&clips, budget)?
        .into_iter()
        .map(|a| Row {
            id: a.clip.id,
            input_duration: a.input_duration,
            target_duration: a.target_duration,
        })
        .collect())
}

fn to_json(rows: &[Row], budget: f64) -> serde_json::Value {
    let total: f64 = rows.iter().map(|r| r.target_duration).sum();
    json!({
        "max_total_duration": budget,
        "total_duration": total,
        "clips": rows
            .iter()
            .map(|r| json!({
                "id": r.id,
                "input_duration": r.input_duration,
                "target_duration": r.target_duration,
            }))
            .collect::<Vec<_>>(),
    })
}

pub fn run(args: AllocateArgs, config: &CoreConfig) -> CliResult<Outcome> {
    let budget = args.max_duration.unwrap_or(config.max_total_duration);
    let rows = match &args.durations {
        Some(durations) => rows_from_durations(durations, budget)?,
        None => rows_from_clips(&args, config, budget)?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&to_json(&rows, budget))?);
        return Ok(Outcome::Success);
    }

    print_section("Allocation");
    for row in &rows {
        let kept = if row.target_duration < row.input_duration {
            format!("{:.2}s of {:.2}s", row.target_duration, row.input_duration)
        } else {
            format!("{:.2}s (whole)", row.input_duration)
        };
        print_status(&row.id, &kept, false);
    }
    let total: f64 = rows.iter().map(|r| r.target_duration).sum();
    print_status("Total", &format!("{total:.2}s / {budget:.2}s"), true);
    Ok(Outcome::Success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_share_the_budget() {
        let rows = rows_from_durations(&[40.0, 10.0, 5.0], 30.0).unwrap();
        let targets: Vec<f64> = rows.iter().map(|r| r.target_duration).collect();
        assert_eq!(targets, vec![15.0, 10.0, 5.0]);
        assert_eq!(rows[0].id, "1");

        let value = to_json(&rows, 30.0);
        assert_eq!(value["total_duration"], json!(30.0));
        assert_eq!(value["clips"][2]["input_duration"], json!(5.0));
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        assert!(rows_from_durations(&[10.0, 0.0], 30.0).is_err());
    }
}
