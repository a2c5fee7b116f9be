// reelfit-cli/src/commands/compress.rs
//
// `reelfit compress`: one clip in, one capped and compressed file out.

use super::{Outcome, check_tools, clip_requests, report_result, run_pipeline};
use crate::cli::CompressArgs;
use crate::error::{CliErrorContext, CliResult};
use crate::terminal::{print_processing, print_section, print_status};

use reelfit_core::{CoreConfig, format_seconds};

pub fn run(args: CompressArgs, config: CoreConfig) -> CliResult<Outcome> {
    check_tools(&config)?;
    let request = clip_requests(std::slice::from_ref(&args.clip))
        .pop()
        .cli_context("No clip given")?
        .with_rotation(args.rotate);
    let cap = args.max_duration.unwrap_or(config.max_total_duration);

    print_section("Compress");
    print_status("Clip", &args.clip.display().to_string(), false);
    print_status("Max duration", &format!("{}s", format_seconds(cap)), false);
    if args.rotate != 0 {
        print_status("Rotation", &format!("{}°", args.rotate), false);
    }
    print_processing(&format!("Compressing {}", request.id));

    let label = request.id.clone();
    let result = run_pipeline(config, move |pipeline, cancel| {
        pipeline.compress_single(&request, Some(cap), cancel)
    })?;
    Ok(report_result(&label, &result))
}
