//! Session configuration schema.
//!
//! The six numeric fields are required: absence or a non-numeric value is a
//! parse failure, raised before any session state is created. Field names
//! match the export/meta format (`baselineMinutes`, `targetFrequency`, ...).
//! Key bindings and the survey template are optional supplements with
//! defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::survey::SurveyQuestion;

/// Resolved configuration for one session, read once at session start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Baseline (fixation-only) phase length in minutes.
    #[serde(rename = "baselineMinutes")]
    pub baseline_minutes: f64,

    /// Length of each task block in minutes (blockA and blockB).
    #[serde(rename = "blockMinutes")]
    pub block_minutes: f64,

    /// Break phase length in minutes.
    #[serde(rename = "breakMinutes")]
    pub break_minutes: f64,

    /// Inter-stimulus interval: gap after stimulus offset before the
    /// response window closes, in milliseconds.
    #[serde(rename = "interStimulusIntervalMs")]
    pub isi_ms: u64,

    /// How long each digit stays visible, in milliseconds.
    #[serde(rename = "stimulusDurationMs")]
    pub stimulus_ms: u64,

    /// Probability of presenting the target digit, in [0, 1].
    #[serde(rename = "targetFrequency")]
    pub target_frequency: f64,

    /// Key bindings for the response key and control gestures.
    #[serde(default)]
    pub keys: KeyBindings,

    /// Survey questions shown after each task block.
    #[serde(default = "SurveyQuestion::default_template")]
    pub survey: Vec<SurveyQuestion>,
}

impl SessionConfig {
    /// Baseline phase duration.
    #[must_use]
    pub fn baseline_duration(&self) -> Duration {
        Duration::from_secs_f64(self.baseline_minutes.max(0.0) * 60.0)
    }

    /// Task block duration.
    #[must_use]
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_minutes.max(0.0) * 60.0)
    }

    /// Break phase duration.
    #[must_use]
    pub fn break_duration(&self) -> Duration {
        Duration::from_secs_f64(self.break_minutes.max(0.0) * 60.0)
    }

    /// Full response window: stimulus visibility plus the ISI tail.
    #[must_use]
    pub const fn response_window(&self) -> Duration {
        Duration::from_millis(self.stimulus_ms + self.isi_ms)
    }

    /// How long the stimulus stays on the display.
    #[must_use]
    pub const fn stimulus_duration(&self) -> Duration {
        Duration::from_millis(self.stimulus_ms)
    }
}

impl Default for SessionConfig {
    /// Conventional SART parameters: short baseline and break, 8-minute
    /// blocks, 250ms stimulus with a 900ms ISI, 10% targets.
    fn default() -> Self {
        Self {
            baseline_minutes: 2.0,
            block_minutes: 8.0,
            break_minutes: 2.0,
            isi_ms: 900,
            stimulus_ms: 250,
            target_frequency: 0.1,
            keys: KeyBindings::default(),
            survey: SurveyQuestion::default_template(),
        }
    }
}

/// Key bindings mapping raw input keys to engine gestures.
///
/// Every key other than these four is ignored for scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    /// The designated response key.
    #[serde(default = "default_respond_key")]
    pub respond: String,

    /// Aborts the whole session (jumps straight to the finish summary).
    #[serde(default = "default_abort_key")]
    pub abort: String,

    /// Opens the 5-second self-report window.
    #[serde(default = "default_self_report_key")]
    pub self_report: String,

    /// Skips the break phase (only observed during the break).
    #[serde(default = "default_skip_break_key")]
    pub skip_break: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            respond: default_respond_key(),
            abort: default_abort_key(),
            self_report: default_self_report_key(),
            skip_break: default_skip_break_key(),
        }
    }
}

fn default_respond_key() -> String {
    "Space".to_string()
}

fn default_abort_key() -> String {
    "Escape".to_string()
}

fn default_self_report_key() -> String {
    "o".to_string()
}

fn default_skip_break_key() -> String {
    "Enter".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_only_parses_with_defaults() {
        let yaml = r"
baselineMinutes: 1.0
blockMinutes: 4.0
breakMinutes: 1.0
interStimulusIntervalMs: 900
stimulusDurationMs: 250
targetFrequency: 0.1
";
        let cfg: SessionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.keys.respond, "Space");
        assert_eq!(cfg.survey.len(), 5);
        assert_eq!(cfg.response_window(), Duration::from_millis(1150));
    }

    #[test]
    fn missing_required_field_is_a_parse_error() {
        let yaml = r"
baselineMinutes: 1.0
blockMinutes: 4.0
";
        let result: Result<SessionConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn non_numeric_required_field_is_a_parse_error() {
        let yaml = r#"
baselineMinutes: 1.0
blockMinutes: 4.0
breakMinutes: 1.0
interStimulusIntervalMs: "soon"
stimulusDurationMs: 250
targetFrequency: 0.1
"#;
        let result: Result<SessionConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn config_roundtrips_through_json_meta() {
        let cfg = SessionConfig::default();
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["baselineMinutes"], 2.0);
        assert_eq!(json["interStimulusIntervalMs"], 900);
        let back: SessionConfig = serde_json::from_value(json).unwrap();
        assert!((back.target_frequency - 0.1).abs() < f64::EPSILON);
    }
}
