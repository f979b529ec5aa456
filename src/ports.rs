//! Collaborator ports.
//!
//! The engine computes; these traits are the seams to everything that
//! renders, senses, or persists. The display is write-only — reaction-time
//! zero is anchored by an explicit onset instant inside the trial machine,
//! never by reading rendered state back.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::VigilError;
use crate::session::SurveyPhase;
use crate::session::survey::{SurveyAnswers, SurveyQuestion};

/// A discrete key press delivered by the host.
#[derive(Debug, Clone)]
pub struct PressEvent {
    /// Raw key name (matched against the configured bindings).
    pub key: String,

    /// Monotonic timestamp the press was registered at.
    pub at: Instant,
}

/// Asynchronous source of press events.
///
/// Presses may arrive at any point; the engine multiplexes this channel
/// against its poll ticks. `None` means the channel is gone, which the
/// engine treats as an unexpected failure (finish with committed records).
#[async_trait]
pub trait InputChannel: Send {
    /// Waits for the next press event.
    ///
    /// Must be cancellation-safe: the engine races this future against its
    /// poll tick and drops the loser, so a dropped call must not lose a
    /// press.
    async fn next_event(&mut self) -> Option<PressEvent>;
}

/// Write-only display surface.
///
/// All methods are best-effort and infallible from the engine's point of
/// view; a host that cannot render simply ignores calls.
pub trait DisplaySink: Send + Sync {
    /// Render a stimulus digit.
    fn show_stimulus(&self, digit: u8);

    /// Render the fixation marker (baseline phase).
    fn show_fixation(&self);

    /// Render the post-stimulus offset marker within a response window.
    fn show_offset_marker(&self);

    /// Render the break marker.
    fn show_break(&self);

    /// Render the current stage label.
    fn show_phase(&self, label: &str);

    /// Update the countdown clock and progress fraction for the running
    /// phase. Called once per poll tick.
    fn show_countdown(&self, clock: &str, progress: f64);

    /// Update the emitted-trial counter.
    fn show_trial_count(&self, count: usize);

    /// Update the displayed risk score (stamped once per onset).
    fn show_risk(&self, risk: f64);

    /// Show a user-visible notice (e.g. the failure notice).
    fn show_notice(&self, message: &str);
}

/// Optional haptic feedback capability.
///
/// Absence of the capability is not an error; a trial on a host without an
/// actuator simply records `vibrated = false`.
pub trait FeedbackActuator: Send + Sync {
    /// Pulses for the given duration. Returns whether a pulse actually
    /// fired.
    fn pulse(&self, duration: Duration) -> bool;
}

/// Presents a survey and collects one full submission at a time.
///
/// The engine validates completeness; an incomplete submission is rejected
/// and the prompter is asked again. There is no timeout. `None` means the
/// prompter is gone.
#[async_trait]
pub trait SurveyPrompter: Send {
    /// Presents the questions for the given transition and awaits a
    /// submission.
    async fn prompt(
        &mut self,
        phase: SurveyPhase,
        questions: &[SurveyQuestion],
    ) -> Option<SurveyAnswers>;
}

/// Key-value sink for the full-session snapshot written at finish.
///
/// Pure side effect: the engine never reads a value back.
pub trait KeyValueStore: Send {
    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted; the caller logs
    /// and continues.
    fn put(&mut self, key: &str, value: &serde_json::Value) -> Result<(), VigilError>;
}
