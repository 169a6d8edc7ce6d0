//! CLI module for paperspan.
//!
//! Every command runs to completion in-process: it loads the configuration,
//! builds the display system and exits.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;

use crate::error::PaperspanError;
use crate::logging;

/// Runs the CLI.
///
/// Parses command-line arguments, sets up logging and executes the
/// appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), PaperspanError> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    cli.execute()
}
