//! Command line interface for the release tasks.
//!
//! This module parses the global options and dispatches to the packaging
//! or publishing task.

mod args;
pub mod commands;

pub use args::{Args, Command};

use crate::error::{CliError, Result};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    match args.command {
        Command::Package => commands::package(&args).await?,
        Command::Publish => commands::publish(&args).await?,
    }
    Ok(0)
}
