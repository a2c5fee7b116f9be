// reelfit-cli/src/commands/batch.rs
//
// `reelfit batch`: compresses each clip on its own. A failing clip does not
// stop the others; the exit status reflects the worst outcome.

use super::{Outcome, check_tools, clip_requests, report_result, run_pipeline};
use crate::cli::BatchArgs;
use crate::error::CliResult;
use crate::terminal::{print_processing, print_section, print_status};

use reelfit_core::{BatchReport, CoreConfig};

fn summarize(report: &BatchReport) -> Outcome {
    print_section("Results");
    let outcome = report
        .outcomes
        .iter()
        .map(|o| report_result(&o.id, &o.result))
        .fold(Outcome::Success, Outcome::combine);

    print_section("Summary");
    print_status("Succeeded", &report.succeeded().to_string(), true);
    print_status("Failed", &report.failed().to_string(), false);
    print_status("Cancelled", &report.cancelled().to_string(), false);
    outcome
}

pub fn run(args: BatchArgs, config: CoreConfig) -> CliResult<Outcome> {
    check_tools(&config)?;
    let requests = clip_requests(&args.clips);
    let max_duration = args.max_duration;

    if !args.json {
        print_section("Batch");
        print_status("Clips", &requests.len().to_string(), false);
        print_processing("Compressing clips independently");
    }

    let report = run_pipeline(config, move |pipeline, cancel| {
        pipeline.compress_many(&requests, max_duration, cancel)
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report
            .outcomes
            .iter()
            .map(|o| Outcome::from(&o.result))
            .fold(Outcome::Success, Outcome::combine));
    }
    Ok(summarize(&report))
}
