//! Session data model: phases, records, the append-only store, surveys,
//! and the export/persistence read side.

pub mod export;
pub mod storage;
pub mod store;
pub mod survey;

pub use store::{SessionMeta, SessionStore, SessionSummary, TrialRecord};
pub use survey::{SurveyAnswers, SurveyQuestion, SurveyRecord, SurveyRejection};

use serde::{Deserialize, Serialize};

/// Session phase. Serialized names match the export format
/// (`"blockA"`, `"blockB"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Idle,
    Baseline,
    BlockA,
    Break,
    BlockB,
    Done,
}

impl Phase {
    /// Display label for the stage header.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Baseline => "Baseline (fixation)",
            Self::BlockA => "Block A — no feedback",
            Self::Break => "Break",
            Self::BlockB => "Block B — feedback",
            Self::Done => "Done",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Baseline => "baseline",
            Self::BlockA => "blockA",
            Self::Break => "break",
            Self::BlockB => "blockB",
            Self::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Which task block a survey follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurveyPhase {
    #[serde(rename = "after_blockA")]
    AfterBlockA,
    #[serde(rename = "after_blockB")]
    AfterBlockB,
}

impl std::fmt::Display for SurveyPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AfterBlockA => write!(f, "after_blockA"),
            Self::AfterBlockB => write!(f, "after_blockB"),
        }
    }
}
