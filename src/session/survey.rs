//! Post-block surveys.
//!
//! A survey record is only created once every configured question has an
//! in-scale answer; anything less is a rejection and the submission is
//! re-prompted in full. No partial record is ever stored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::SurveyPhase;

/// Minimum number of configured questions for a valid survey.
pub const MIN_QUESTIONS: usize = 4;

/// Lowest permitted scale anchor.
pub const SCALE_MIN: u8 = 1;

/// Highest permitted scale anchor.
pub const SCALE_MAX: u8 = 7;

/// Submitted answers, question id → integer rating.
pub type SurveyAnswers = BTreeMap<String, u8>;

/// A single Likert question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyQuestion {
    /// Stable question identifier used as the answer key.
    pub id: String,

    /// Prompt text shown to the participant.
    pub label: String,

    /// Inclusive rating range, e.g. `(1, 7)`.
    #[serde(default = "default_scale")]
    pub scale: (u8, u8),
}

const fn default_scale() -> (u8, u8) {
    (SCALE_MIN, SCALE_MAX)
}

impl SurveyQuestion {
    /// The standard post-block item set.
    #[must_use]
    pub fn default_template() -> Vec<Self> {
        let items = [
            ("mental_demand", "Mental demand"),
            ("effort", "Effort required"),
            ("focus", "How focused were you?"),
            ("mind_wandering", "Mind-wandering frequency"),
            ("fatigue", "Fatigue right now"),
        ];
        items
            .into_iter()
            .map(|(id, label)| Self {
                id: id.to_string(),
                label: label.to_string(),
                scale: default_scale(),
            })
            .collect()
    }
}

/// Why a survey submission was rejected. Recoverable: the same survey stays
/// active and the participant submits again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurveyRejection {
    /// A configured question has no answer.
    #[error("question '{question_id}' is unanswered")]
    MissingAnswer {
        /// Id of the unanswered question.
        question_id: String,
    },

    /// An answer falls outside the question's scale.
    #[error("answer {value} for '{question_id}' is outside the scale")]
    OutOfScale {
        /// Id of the offending question.
        question_id: String,
        /// The submitted value.
        value: u8,
    },
}

/// A completed survey. Constructed only through [`SurveyRecord::complete`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyRecord {
    /// Owning session.
    pub session_id: String,

    /// Which block this survey follows.
    pub phase: SurveyPhase,

    /// Submission timestamp.
    pub at: DateTime<Utc>,

    /// Question id → rating.
    pub answers: SurveyAnswers,
}

impl SurveyRecord {
    /// Validates a submission against the configured questions and builds
    /// the record.
    ///
    /// Answers for unconfigured question ids are dropped rather than
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns a [`SurveyRejection`] if any configured question is
    /// unanswered or answered outside its scale.
    pub fn complete(
        session_id: &str,
        phase: SurveyPhase,
        questions: &[SurveyQuestion],
        submitted: &SurveyAnswers,
    ) -> Result<Self, SurveyRejection> {
        let mut answers = SurveyAnswers::new();
        for q in questions {
            let Some(&value) = submitted.get(&q.id) else {
                return Err(SurveyRejection::MissingAnswer {
                    question_id: q.id.clone(),
                });
            };
            let (lo, hi) = q.scale;
            if value < lo || value > hi {
                return Err(SurveyRejection::OutOfScale {
                    question_id: q.id.clone(),
                    value,
                });
            }
            answers.insert(q.id.clone(), value);
        }

        Ok(Self {
            session_id: session_id.to_string(),
            phase,
            at: Utc::now(),
            answers,
        })
    }
}
