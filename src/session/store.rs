//! Append-only session store.
//!
//! One [`SessionStore`] per session, owned by the phase controller. Trials
//! and surveys are append-only; meta is written once at session start. The
//! aggregate queries are only consulted at finish, and read exclusively
//! committed records, so an abort or mid-session failure can never leave
//! the summary looking at half a trial.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::survey::SurveyRecord;
use super::{Phase, SurveyPhase};
use crate::config::SessionConfig;
use crate::engine::stats;

/// One emitted trial. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialRecord {
    /// Owning session.
    pub session_id: String,

    /// Phase the trial ran in (always a task block).
    pub phase: Phase,

    /// Wall-clock stimulus onset timestamp.
    pub t_stim_on: DateTime<Utc>,

    /// The digit shown, 0–9.
    pub digit: u8,

    /// Whether the digit was the designated target.
    pub is_target: bool,

    /// Whether the designated response key was pressed in the window.
    pub responded: bool,

    /// The key that was pressed, if any.
    pub key_down: Option<String>,

    /// Reaction time in milliseconds; present only when the press was
    /// observed after the stimulus onset anchor.
    pub rt_ms: Option<u64>,

    /// Go/no-go correctness.
    pub correct: bool,

    /// Attention-failure flag (miss, slow hit, false alarm, or forced by an
    /// active self-report window).
    pub lapse: bool,

    /// Risk score stamped at stimulus onset.
    pub risk_score: f64,

    /// Whether the self-report window was open at onset.
    pub self_report_active: bool,

    /// Whether a feedback pulse actually fired for this trial.
    pub vibrated: bool,
}

/// Resolved configuration and start timestamp; written once, read-only
/// thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    /// The configuration the session ran with.
    pub config: SessionConfig,

    /// Session start timestamp.
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
}

/// Finish-time summary, mirroring the exported record set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub trials: usize,
    pub block_a_trials: usize,
    pub block_b_trials: usize,
    pub lapses_a: usize,
    pub lapses_b: usize,
    /// Rounded median reaction time in blockA, 0 when no responses landed.
    pub median_rt_a: u64,
    /// Rounded median reaction time in blockB, 0 when no responses landed.
    pub median_rt_b: u64,
    pub surveys: Vec<SurveyRecord>,
}

/// Append-only accumulation of everything a session produces.
#[derive(Debug)]
pub struct SessionStore {
    session_id: String,
    meta: SessionMeta,
    trials: Vec<TrialRecord>,
    surveys: Vec<SurveyRecord>,
}

impl SessionStore {
    /// Creates a fresh store with a time-derived unique session id.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let started_at = Utc::now();
        Self {
            session_id: session_id_for(started_at),
            meta: SessionMeta { config, started_at },
            trials: Vec::new(),
            surveys: Vec::new(),
        }
    }

    /// The session's unique identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Session meta (resolved config + start timestamp).
    #[must_use]
    pub const fn meta(&self) -> &SessionMeta {
        &self.meta
    }

    /// Appends an emitted trial record.
    pub fn append_trial(&mut self, trial: TrialRecord) {
        self.trials.push(trial);
    }

    /// Appends a completed survey record.
    pub fn append_survey(&mut self, survey: SurveyRecord) {
        self.surveys.push(survey);
    }

    /// All trials, in emission order.
    #[must_use]
    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    /// All surveys, in submission order.
    #[must_use]
    pub fn surveys(&self) -> &[SurveyRecord] {
        &self.surveys
    }

    /// Number of trials in the given phase.
    #[must_use]
    pub fn trial_count(&self, phase: Phase) -> usize {
        self.trials.iter().filter(|t| t.phase == phase).count()
    }

    /// Number of lapses in the given phase.
    #[must_use]
    pub fn lapse_count(&self, phase: Phase) -> usize {
        self.trials
            .iter()
            .filter(|t| t.phase == phase && t.lapse)
            .count()
    }

    /// Median reaction time over responded trials in the given phase.
    #[must_use]
    pub fn median_rt(&self, phase: Phase) -> Option<f64> {
        let rts: Vec<f64> = self
            .trials
            .iter()
            .filter(|t| t.phase == phase)
            .filter_map(|t| t.rt_ms)
            .map(|rt| rt as f64)
            .collect();
        stats::median(&rts)
    }

    /// Whether a survey for the given transition was recorded.
    #[must_use]
    pub fn has_survey(&self, phase: SurveyPhase) -> bool {
        self.surveys.iter().any(|s| s.phase == phase)
    }

    /// Builds the finish-time summary from committed records only.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let round = |v: Option<f64>| v.map_or(0, |m| m.round() as u64);

        SessionSummary {
            session_id: self.session_id.clone(),
            trials: self.trials.len(),
            block_a_trials: self.trial_count(Phase::BlockA),
            block_b_trials: self.trial_count(Phase::BlockB),
            lapses_a: self.lapse_count(Phase::BlockA),
            lapses_b: self.lapse_count(Phase::BlockB),
            median_rt_a: round(self.median_rt(Phase::BlockA)),
            median_rt_b: round(self.median_rt(Phase::BlockB)),
            surveys: self.surveys.clone(),
        }
    }

    /// The key-value snapshot persisted at finish:
    /// `{ trials, surveys, meta }`.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        json!({
            "trials": self.trials,
            "surveys": self.surveys,
            "meta": self.meta,
        })
    }
}

/// Time-derived session id, filename-safe (`:` and `.` replaced).
fn session_id_for(at: DateTime<Utc>) -> String {
    at.format("VG_%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}
