//! CLI command dispatch and handlers.
//!
//! Routes parsed CLI arguments to the appropriate command handler. Each
//! handler returns the process exit code on success; errors carry their
//! own codes.

pub mod run;
pub mod validate;

use crate::cli::args::{Cli, Commands};
use crate::error::VigilError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<i32, VigilError> {
    match cli.command {
        Commands::Run(args) => run::run(&args).await,
        Commands::Validate(args) => validate::run(&args),
    }
}
