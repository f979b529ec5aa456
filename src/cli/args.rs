//! CLI argument definitions.
//!
//! All Clap derive structs for `vigil` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Sustained-attention session engine.
#[derive(Parser, Debug)]
#[command(name = "vigil", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "VIGIL_COLOR")]
    pub color: ColorChoice,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulated session headlessly and export its records.
    Run(RunArgs),

    /// Validate a session configuration file without running anything.
    Validate(ValidateArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to a YAML session configuration file. Defaults apply when
    /// omitted.
    #[arg(short, long, env = "VIGIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory the JSON/CSV exports and the session snapshot land in.
    #[arg(short, long, default_value = "./sessions", env = "VIGIL_OUT_DIR")]
    pub out_dir: PathBuf,

    /// Write the JSONL event stream to this file.
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// How the simulated participant responds to stimuli.
    #[arg(long, default_value = "targets-only")]
    pub responder: ResponderChoice,

    /// Simulated response delay.
    #[arg(long, default_value = "300ms", value_parser = humantime::parse_duration)]
    pub response_delay: Duration,

    /// Seed for deterministic stimulus and risk-jitter streams.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Value enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Simulated response policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResponderChoice {
    /// Press for target digits only (a perfectly attentive participant).
    #[default]
    TargetsOnly,
    /// Press for every stimulus (commission errors on non-targets).
    Every,
    /// Never press (omission errors on targets).
    Never,
}
