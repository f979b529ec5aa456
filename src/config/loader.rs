//! Configuration loading pipeline: read YAML, deserialize, validate.
//!
//! Loading fails fast — a config problem is reported before any session
//! state exists. Warnings are logged through `tracing` and do not block.

use std::path::Path;

use tracing::warn;

use crate::config::schema::SessionConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

/// Loads and validates a session configuration from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::MissingFile`] if the path does not exist,
/// [`ConfigError::Parse`] if the YAML is malformed or a required field is
/// absent/non-numeric, and [`ConfigError::Validation`] if semantic
/// validation finds errors.
pub fn load_config(path: &Path) -> Result<SessionConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    from_yaml_str(&raw, path)
}

/// Parses and validates a configuration from a YAML string.
///
/// `origin` is only used in error messages.
///
/// # Errors
///
/// Same as [`load_config`], minus the missing-file case.
pub fn from_yaml_str(raw: &str, origin: &Path) -> Result<SessionConfig, ConfigError> {
    let config: SessionConfig =
        serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

    let result = Validator::new().validate(&config);

    for warning in &result.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }

    if result.has_errors() {
        return Err(ConfigError::Validation {
            path: origin.display().to_string(),
            errors: result.errors,
        });
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID: &str = r"
baselineMinutes: 0.5
blockMinutes: 2.0
breakMinutes: 0.5
interStimulusIntervalMs: 900
stimulusDurationMs: 250
targetFrequency: 0.1
";

    #[test]
    fn valid_yaml_loads() {
        let cfg = from_yaml_str(VALID, Path::new("inline.yaml")).unwrap();
        assert_eq!(cfg.stimulus_ms, 250);
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = from_yaml_str("baselineMinutes: [", Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn semantic_errors_are_reported_together() {
        let raw = r"
baselineMinutes: -1.0
blockMinutes: 2.0
breakMinutes: 0.5
interStimulusIntervalMs: 900
stimulusDurationMs: 0
targetFrequency: 0.1
";
        let err = from_yaml_str(raw, Path::new("bad.yaml")).unwrap_err();
        match err {
            ConfigError::Validation { errors, .. } => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_config(&PathBuf::from("/nonexistent/vigil.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }
}
