//! `validate` command: check configuration files without running a session.

use std::path::Path;

use crate::cli::args::ValidateArgs;
use crate::config::{SessionConfig, Validator};
use crate::error::{ExitCode, VigilError};

/// Validates each file and prints every issue found.
///
/// All files are checked even after one fails. With `--strict`, warnings
/// count as failures.
///
/// # Errors
///
/// Never returns `Err`; problems are reported through the exit code so
/// every file gets checked.
pub fn run(args: &ValidateArgs) -> Result<i32, VigilError> {
    let mut failed = false;

    for path in &args.files {
        match check_file(path, args.strict) {
            Ok(()) => println!("{}: ok", path.display()),
            Err(issues) => {
                failed = true;
                println!("{}: invalid", path.display());
                for line in issues {
                    println!("  {line}");
                }
            }
        }
    }

    Ok(if failed {
        ExitCode::CONFIG_ERROR
    } else {
        ExitCode::SUCCESS
    })
}

fn check_file(path: &Path, strict: bool) -> Result<(), Vec<String>> {
    if !path.exists() {
        return Err(vec!["file not found".to_string()]);
    }
    let raw = std::fs::read_to_string(path).map_err(|e| vec![e.to_string()])?;
    let config: SessionConfig =
        serde_yaml::from_str(&raw).map_err(|e| vec![format!("parse error: {e}")])?;

    let result = Validator::new().validate(&config);
    let mut lines: Vec<String> = result
        .errors
        .iter()
        .map(|issue| format!("error: {}: {}", issue.path, issue.message))
        .collect();

    let warnings = result
        .warnings
        .iter()
        .map(|issue| format!("warning: {}: {}", issue.path, issue.message));
    if strict {
        lines.extend(warnings);
    } else {
        for w in warnings {
            println!("  {w}");
        }
    }

    if lines.is_empty() { Ok(()) } else { Err(lines) }
}
