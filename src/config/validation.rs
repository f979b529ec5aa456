//! Configuration validation.
//!
//! Validation runs on the fully deserialized [`SessionConfig`] and collects
//! ALL issues rather than stopping at the first, so a user fixing a config
//! sees everything at once. Errors block loading; warnings are logged.

use std::collections::HashSet;

use crate::config::schema::SessionConfig;
use crate::error::{Severity, ValidationIssue};
use crate::session::survey::{MIN_QUESTIONS, SCALE_MAX, SCALE_MIN};

/// Longest accepted phase length. Anything above this is a typo, and values
/// far beyond it overflow the conversion to [`std::time::Duration`].
const MAX_PHASE_MINUTES: f64 = 24.0 * 60.0;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns all collected issues.
    pub fn validate(&mut self, config: &SessionConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_durations(config);
        self.validate_trial_timing(config);
        self.validate_target_frequency(config);
        self.validate_keys(config);
        self.validate_survey(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn validate_durations(&mut self, config: &SessionConfig) {
        let minutes = [
            ("baselineMinutes", config.baseline_minutes),
            ("blockMinutes", config.block_minutes),
            ("breakMinutes", config.break_minutes),
        ];
        for (path, value) in minutes {
            if !value.is_finite() {
                self.add_error(path, "must be a finite number of minutes");
            } else if value < 0.0 {
                self.add_error(path, "must not be negative");
            } else if value > MAX_PHASE_MINUTES {
                self.add_error(path, "must not exceed 1440 minutes (24 hours)");
            }
        }
        if config.block_minutes == 0.0 {
            self.add_warning("blockMinutes", "zero-length blocks run no trials");
        }
    }

    fn validate_trial_timing(&mut self, config: &SessionConfig) {
        if config.stimulus_ms == 0 {
            self.add_error(
                "stimulusDurationMs",
                "stimulus must be visible for a non-zero duration",
            );
        }
        if config.isi_ms == 0 {
            self.add_warning(
                "interStimulusIntervalMs",
                "zero ISI closes the response window at stimulus offset",
            );
        }
    }

    fn validate_target_frequency(&mut self, config: &SessionConfig) {
        if !config.target_frequency.is_finite() {
            self.add_error("targetFrequency", "must be a finite number");
        } else if !(0.0..=1.0).contains(&config.target_frequency) {
            // The generator clamps out-of-range values; surface the fact
            // rather than silently wrapping.
            self.add_warning(
                "targetFrequency",
                "outside [0, 1]; will be clamped by the stimulus generator",
            );
        }
    }

    fn validate_keys(&mut self, config: &SessionConfig) {
        let bindings = [
            ("keys.respond", &config.keys.respond),
            ("keys.abort", &config.keys.abort),
            ("keys.selfReport", &config.keys.self_report),
            ("keys.skipBreak", &config.keys.skip_break),
        ];
        let mut seen = HashSet::new();
        for (path, key) in bindings {
            if key.is_empty() {
                self.add_error(path, "key binding cannot be empty");
            } else if !seen.insert(key.clone()) {
                self.add_error(path, "key binding collides with another gesture");
            }
        }
    }

    fn validate_survey(&mut self, config: &SessionConfig) {
        if config.survey.len() < MIN_QUESTIONS {
            self.add_error(
                "survey",
                "at least 4 survey questions must be configured",
            );
        }

        let mut ids = HashSet::new();
        for (i, q) in config.survey.iter().enumerate() {
            let path = format!("survey[{i}]");
            if q.id.is_empty() {
                self.add_error(&path, "question id cannot be empty");
            } else if !ids.insert(q.id.clone()) {
                self.add_error(&path, "duplicate question id");
            }
            let (lo, hi) = q.scale;
            if lo < SCALE_MIN || hi > SCALE_MAX || lo >= hi {
                self.add_error(&path, "scale must be an ascending sub-range of [1, 7]");
            }
        }
    }

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}
