//! Trial state machine.
//!
//! One machine per stimulus presentation:
//! `AwaitingOnset → StimulusVisible → ResponseWindowOpen → Classifying →
//! Emitted`. The machine owns the response-window timing and the go/no-go
//! classification; the record it produces is appended by the controller and
//! never revisited — a trial is never retried or re-presented.

use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use tokio::time::Instant;
use tracing::trace;

use crate::config::SessionConfig;
use crate::engine::controller::{ControlState, Gesture};
use crate::engine::risk::RiskEstimator;
use crate::engine::stimulus::{self, TARGET_DIGIT};
use crate::engine::timebase::{self, PhaseTimer, TRIAL_POLL};
use crate::error::SessionError;
use crate::ports::{DisplaySink, FeedbackActuator, InputChannel, PressEvent};
use crate::session::{Phase, TrialRecord};

/// Risk score above which a feedback pulse fires (when the phase has
/// feedback enabled).
pub const FEEDBACK_RISK_THRESHOLD: f64 = 0.65;

/// Length of a feedback pulse.
pub const FEEDBACK_PULSE: Duration = Duration::from_millis(60);

/// Floor for the slow-response cutoff in milliseconds.
pub const SLOW_CUTOFF_FLOOR_MS: f64 = 600.0;

/// Lifecycle states of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    AwaitingOnset,
    StimulusVisible,
    ResponseWindowOpen,
    Classifying,
    Emitted,
}

impl std::fmt::Display for TrialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::AwaitingOnset => "awaiting_onset",
            Self::StimulusVisible => "stimulus_visible",
            Self::ResponseWindowOpen => "response_window_open",
            Self::Classifying => "classifying",
            Self::Emitted => "emitted",
        };
        write!(f, "{name}")
    }
}

/// Result of one completed trial.
#[derive(Debug)]
pub struct TrialOutcome {
    /// The immutable record to append to the store.
    pub record: TrialRecord,

    /// End of this trial's response window; the next trial is scheduled
    /// from here.
    pub deadline: Instant,
}

/// Go/no-go classification derived deterministically from the trial facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub correct: bool,
    pub lapse: bool,
}

/// Slow-response cutoff: `max(600, 2 × median(window))`, falling back to
/// the floor when the window carries no median yet.
///
/// The caller passes the window median as it stood *before* the current
/// trial's reaction time is observed — a trial never influences its own
/// cutoff.
#[must_use]
pub fn slow_cutoff_ms(window_median: Option<f64>) -> f64 {
    window_median.map_or(SLOW_CUTOFF_FLOOR_MS, |m| (2.0 * m).max(SLOW_CUTOFF_FLOOR_MS))
}

/// Classifies a trial.
///
/// Target trials require a press: a miss or an over-cutoff reaction time is
/// a lapse. Non-target trials require withholding: any press is a false
/// alarm and always a lapse regardless of speed. An active self-report
/// window forces `lapse` without touching `correct`.
#[must_use]
pub fn classify(
    is_target: bool,
    responded: bool,
    rt_ms: Option<f64>,
    slow_cutoff: f64,
    self_report_active: bool,
) -> Classification {
    let (correct, mut lapse) = if is_target {
        (
            responded,
            !responded || rt_ms.is_some_and(|rt| rt > slow_cutoff),
        )
    } else {
        (!responded, responded)
    };

    if self_report_active {
        lapse = true;
    }

    Classification { correct, lapse }
}

/// Runs one trial to completion and returns its record plus the next
/// schedule point.
///
/// The response window multiplexes the input channel against an 8ms poll
/// tick; the first designated-key press wins and later presses in the same
/// window are ignored. Abort is observed at tick granularity and closes the
/// window early (the partial trial is still classified and emitted).
///
/// # Errors
///
/// Returns [`SessionError::InputChannelClosed`] if the input channel goes
/// away while the window is open.
#[allow(clippy::too_many_arguments, clippy::too_many_lines)]
pub async fn run_trial(
    session_id: &str,
    phase: Phase,
    feedback_enabled: bool,
    config: &SessionConfig,
    phase_timer: &PhaseTimer,
    scheduled_at: Instant,
    controls: &mut ControlState,
    display: &dyn DisplaySink,
    feedback: Option<&dyn FeedbackActuator>,
    input: &mut dyn InputChannel,
    risk: &mut RiskEstimator,
    rng: &mut StdRng,
) -> Result<TrialOutcome, SessionError> {
    trace!(state = %TrialState::AwaitingOnset, %phase, "trial");
    let now = Instant::now();
    let onset = scheduled_at.max(now);
    if onset > now {
        tokio::time::sleep_until(onset).await;
    }

    // Stimulus onset: choose the digit, anchor reaction-time zero at the
    // moment the display call returns, stamp the risk score.
    trace!(state = %TrialState::StimulusVisible, "trial");
    let digit = stimulus::pick_digit(rng, config.target_frequency);
    let is_target = digit == TARGET_DIGIT;
    display.show_stimulus(digit);
    let shown_at = Instant::now();
    let t_stim_on = Utc::now();
    let self_report_active = controls.self_report_active();

    let risk_at = risk.compute();
    display.show_risk(risk_at);

    let vibrated = feedback_enabled
        && risk_at > FEEDBACK_RISK_THRESHOLD
        && feedback.is_some_and(|f| f.pulse(FEEDBACK_PULSE));

    let stim_off = onset + config.stimulus_duration();
    let deadline = onset + config.response_window();

    trace!(state = %TrialState::ResponseWindowOpen, "trial");
    let mut press: Option<PressEvent> = None;
    let mut offset_marked = false;

    loop {
        if controls.aborted() || Instant::now() >= deadline {
            break;
        }

        tokio::select! {
            event = input.next_event() => {
                let Some(event) = event else {
                    return Err(SessionError::InputChannelClosed);
                };
                if matches!(controls.apply(&event), Gesture::Respond) && press.is_none() {
                    press = Some(event);
                }
            }
            () = tokio::time::sleep(TRIAL_POLL) => {
                display.show_countdown(
                    &timebase::format_clock(phase_timer.remaining()),
                    phase_timer.progress(),
                );
                if !offset_marked && Instant::now() >= stim_off {
                    display.show_offset_marker();
                    offset_marked = true;
                }
            }
        }
    }

    trace!(state = %TrialState::Classifying, "trial");
    let responded = press.is_some();
    let key_down = press.as_ref().map(|p| p.key.clone());
    // Presses time-stamped before the onset anchor carry no reaction time.
    let rt_ms: Option<u64> = press
        .as_ref()
        .and_then(|p| p.at.checked_duration_since(shown_at))
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));

    let cutoff = slow_cutoff_ms(risk.window_median());
    #[allow(clippy::cast_precision_loss)]
    let classification = classify(
        is_target,
        responded,
        rt_ms.map(|v| v as f64),
        cutoff,
        self_report_active,
    );

    let record = TrialRecord {
        session_id: session_id.to_string(),
        phase,
        t_stim_on,
        digit,
        is_target,
        responded,
        key_down,
        rt_ms,
        correct: classification.correct,
        lapse: classification.lapse,
        risk_score: risk_at,
        self_report_active,
        vibrated,
    };

    trace!(state = %TrialState::Emitted, digit, correct = record.correct, lapse = record.lapse, "trial");
    Ok(TrialOutcome { record, deadline })
}
