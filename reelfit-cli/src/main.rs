// reelfit-cli/src/main.rs
//
// Entry point for the reelfit binary.
//
// - Parses arguments with clap.
// - Sets up console and file logging.
// - Resolves the configuration (defaults, file, environment, flags).
// - Dispatches to the subcommand and maps its outcome to the exit status:
//   0 on success, 1 on failure, 130 when the run was cancelled.

use clap::Parser;
use reelfit_cli::commands::{self, Outcome};
use reelfit_cli::config::resolve_config;
use reelfit_cli::error::CliResult;
use reelfit_cli::logging::setup_logging;
use reelfit_cli::terminal::print_error;
use reelfit_cli::{Cli, Commands};
use std::process;

fn run(cli: Cli) -> CliResult<Outcome> {
    let config = resolve_config(&cli.global)?;
    match cli.command {
        Commands::Probe(args) => commands::probe::run(args, &config),
        Commands::Allocate(args) => commands::allocate::run(args, &config),
        Commands::Compress(args) => commands::compress::run(args, config),
        Commands::Batch(args) => commands::batch::run(args, config),
        Commands::Concat(args) => commands::concat::run(args, config),
    }
}

fn main() {
    let cli = Cli::parse();

    let quiet = cli.command.wants_json();
    if let Err(e) = setup_logging(cli.global.verbose, quiet, cli.global.log_dir.as_deref()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    let outcome = match run(cli) {
        Ok(outcome) => outcome,
        Err(e) => {
            print_error("Error", &e.to_string());
            Outcome::Failed
        }
    };
    process::exit(outcome.exit_code());
}
