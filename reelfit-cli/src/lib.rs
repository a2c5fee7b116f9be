// reelfit-cli/src/lib.rs
//
// Library portion of the reelfit CLI: argument definitions, configuration
// resolution and command logic, shared by the binary and its tests.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod terminal;

pub use cli::{Cli, Commands, GlobalArgs};
pub use commands::Outcome;
