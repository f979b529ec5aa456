//! Error types for `vigil`.
//!
//! A small hierarchy: configuration failures (fatal before any session
//! state exists), session failures (surface a notice and force the finish
//! path), and the usual I/O and serialization wrappers. Exit codes follow
//! Unix conventions.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `vigil` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Session engine error (collaborator channel lost mid-session)
    pub const SESSION_ERROR: i32 = 4;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `vigil` operations.
#[derive(Debug, Error)]
pub enum VigilError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Session engine error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VigilError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => ExitCode::CONFIG_ERROR,
            Self::Session(_) => ExitCode::SESSION_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Json(_) => ExitCode::ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
///
/// All of these fire before a session is created; no partial session state
/// ever exists when one of them is returned.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed (covers absent or non-numeric required fields)
    #[error("parse error in {path}: {message}")]
    Parse {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {} error(s)", errors.len())]
    Validation {
        /// Path to the configuration file
        path: String,
        /// List of validation errors found
        errors: Vec<ValidationIssue>,
    },

    /// Configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },
}

// ============================================================================
// Session Errors
// ============================================================================

/// Failures inside the session loop.
///
/// These are the "unexpected exception" taxonomy entry: the controller
/// surfaces a failure notice and proceeds straight to the finish summary
/// with whatever records were already committed.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The input channel closed while a phase was still running.
    #[error("input channel closed mid-session")]
    InputChannelClosed,

    /// The survey prompter went away while a survey gate was open.
    #[error("survey prompter closed mid-session")]
    SurveyChannelClosed,
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path to the offending field (e.g. `"targetFrequency"`).
    pub path: String,

    /// Human-readable description of the problem.
    pub message: String,

    /// Whether this issue blocks loading.
    pub severity: Severity,
}

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Prevents the configuration from loading.
    Error,
    /// Informational; logged but non-blocking.
    Warning,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{tag}: {}: {}", self.path, self.message)
    }
}
