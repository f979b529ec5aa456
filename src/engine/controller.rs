//! Phase controller.
//!
//! Owns the fixed phase sequence (`baseline → blockA → survey → break →
//! blockB → survey → finish`), the control-gesture state, and the single
//! mutable session store. Phases never reorder or repeat; abort jumps
//! straight to the finish step, which always runs and always operates on
//! whatever records were committed.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{KeyBindings, SessionConfig};
use crate::engine::risk::RiskEstimator;
use crate::engine::timebase::{self, COARSE_POLL, PhaseTimer};
use crate::engine::trial;
use crate::error::SessionError;
use crate::observability::{Event, EventEmitter, FinishReason};
use crate::ports::{
    DisplaySink, FeedbackActuator, InputChannel, KeyValueStore, PressEvent, SurveyPrompter,
};
use crate::session::store::{SessionStore, SessionSummary};
use crate::session::survey::SurveyRecord;
use crate::session::{Phase, SurveyPhase};

/// How long one self-report press keeps the marker window open.
pub const SELF_REPORT_WINDOW: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Abort handle
// ---------------------------------------------------------------------------

/// Cooperative session-abort handle.
///
/// Cancellation is one-way and latches the first reason given; the host
/// wires its signal handlers to this, and the abort key press goes through
/// it too.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    token: CancellationToken,
    reason: Arc<OnceLock<FinishReason>>,
}

impl AbortHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the session to finish early. The first reason wins.
    pub fn abort(&self, reason: FinishReason) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    /// Whether an abort has been requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The latched abort reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<FinishReason> {
        self.reason.get().copied()
    }

    /// Resolves when an abort is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

// ---------------------------------------------------------------------------
// Control gestures
// ---------------------------------------------------------------------------

/// What a press event means under the configured bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// The designated response key.
    Respond,
    /// Abort the session.
    Abort,
    /// Open the self-report window.
    SelfReport,
    /// Skip the break (observed only during the break).
    SkipBreak,
    /// Any other key; ignored for scoring.
    Ignored,
}

/// Tracks the control-side effects of presses: abort, the 5-second
/// self-report window, and break skipping.
#[derive(Debug)]
pub struct ControlState {
    bindings: KeyBindings,
    abort: AbortHandle,
    skip_break: CancellationToken,
    self_report_until: Option<Instant>,
    in_break: bool,
}

impl ControlState {
    #[must_use]
    pub fn new(bindings: KeyBindings, abort: AbortHandle) -> Self {
        Self {
            bindings,
            abort,
            skip_break: CancellationToken::new(),
            self_report_until: None,
            in_break: false,
        }
    }

    /// Interprets a press and applies its control side effect, if any.
    ///
    /// A repeat self-report press restarts the window from the press
    /// timestamp. Skip presses outside the break classify but do nothing.
    pub fn apply(&mut self, event: &PressEvent) -> Gesture {
        if event.key == self.bindings.respond {
            Gesture::Respond
        } else if event.key == self.bindings.abort {
            self.abort.abort(FinishReason::Aborted);
            Gesture::Abort
        } else if event.key == self.bindings.self_report {
            self.self_report_until = Some(event.at + SELF_REPORT_WINDOW);
            Gesture::SelfReport
        } else if event.key == self.bindings.skip_break {
            if self.in_break {
                self.skip_break.cancel();
            }
            Gesture::SkipBreak
        } else {
            Gesture::Ignored
        }
    }

    /// Whether the self-report window is open right now.
    #[must_use]
    pub fn self_report_active(&self) -> bool {
        self.self_report_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// Whether an abort has been requested.
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    fn begin_break(&mut self) -> CancellationToken {
        self.in_break = true;
        self.skip_break = CancellationToken::new();
        self.skip_break.clone()
    }

    fn end_break(&mut self) {
        self.in_break = false;
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// The collaborators a session runs against.
///
/// Feedback and the snapshot sink are capabilities a host may lack; the
/// survey prompter is required for a session to complete normally.
pub struct Collaborators {
    pub display: Box<dyn DisplaySink>,
    pub input: Box<dyn InputChannel>,
    pub feedback: Option<Box<dyn FeedbackActuator>>,
    pub surveys: Option<Box<dyn SurveyPrompter>>,
    pub snapshot_store: Option<Box<dyn KeyValueStore>>,
    pub events: EventEmitter,
}

/// Result of a driven session.
#[derive(Debug)]
pub struct SessionOutcome {
    pub store: SessionStore,
    pub summary: SessionSummary,
    pub reason: FinishReason,
}

/// Drives one session through the fixed phase sequence.
pub struct PhaseController {
    config: SessionConfig,
    store: SessionStore,
    risk: RiskEstimator,
    rng: StdRng,
    controls: ControlState,
    display: Box<dyn DisplaySink>,
    input: Box<dyn InputChannel>,
    feedback: Option<Box<dyn FeedbackActuator>>,
    surveys: Option<Box<dyn SurveyPrompter>>,
    snapshot_store: Option<Box<dyn KeyValueStore>>,
    events: EventEmitter,
    boost_rx: watch::Receiver<f64>,
    abort: AbortHandle,
}

impl PhaseController {
    /// Builds a controller plus the boost sender handed to the host.
    ///
    /// With `seed` set, the stimulus stream and the risk jitter are both
    /// deterministic.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        collaborators: Collaborators,
        seed: Option<u64>,
    ) -> (Self, watch::Sender<f64>) {
        let (boost_tx, boost_rx) = watch::channel(0.0);
        let abort = AbortHandle::new();
        let controls = ControlState::new(config.keys.clone(), abort.clone());
        let rng = seed.map_or_else(StdRng::from_os_rng, |s| {
            StdRng::seed_from_u64(s.wrapping_add(1))
        });

        let controller = Self {
            store: SessionStore::new(config.clone()),
            risk: RiskEstimator::new(seed),
            rng,
            controls,
            display: collaborators.display,
            input: collaborators.input,
            feedback: collaborators.feedback,
            surveys: collaborators.surveys,
            snapshot_store: collaborators.snapshot_store,
            events: collaborators.events,
            boost_rx,
            abort,
            config,
        };
        (controller, boost_tx)
    }

    /// The abort handle, for wiring host signal handlers.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// The session identifier all records will carry.
    #[must_use]
    pub fn session_id(&self) -> &str {
        self.store.session_id()
    }

    /// Runs the session to completion and returns the committed records.
    ///
    /// Collaborator failures do not lose data: the session finishes early
    /// with whatever records were committed, a visible failure notice, and
    /// a `Failure` finish reason.
    pub async fn run(mut self) -> SessionOutcome {
        info!(session_id = %self.store.session_id(), "session started");
        self.events.emit(Event::SessionStarted {
            timestamp: Utc::now(),
            session_id: self.store.session_id().to_string(),
        });

        let reason = match self.drive().await {
            Ok(()) => self.abort.reason().unwrap_or(FinishReason::Completed),
            Err(err) => {
                warn!(error = %err, "session failed; finishing with committed records");
                self.display
                    .show_notice("A session component failed; wrapping up with recorded data.");
                FinishReason::Failure
            }
        };

        self.finish(reason)
    }

    // -- phase sequence -----------------------------------------------------

    async fn drive(&mut self) -> Result<(), SessionError> {
        let baseline = self.config.baseline_duration();
        let pause = self.config.break_duration();

        self.run_rest(Phase::Baseline, baseline, false).await?;
        if self.controls.aborted() {
            return Ok(());
        }

        self.run_block(Phase::BlockA, false).await?;
        if self.controls.aborted() {
            return Ok(());
        }
        self.run_survey(SurveyPhase::AfterBlockA).await?;
        if self.controls.aborted() {
            return Ok(());
        }

        self.run_rest(Phase::Break, pause, true).await?;
        if self.controls.aborted() {
            return Ok(());
        }

        self.run_block(Phase::BlockB, true).await?;
        if self.controls.aborted() {
            return Ok(());
        }
        self.run_survey(SurveyPhase::AfterBlockB).await?;

        Ok(())
    }

    fn enter(&mut self, phase: Phase) {
        info!(%phase, "phase entered");
        self.display.show_phase(phase.label());
        self.events.emit(Event::PhaseEntered {
            timestamp: Utc::now(),
            phase,
        });
    }

    /// Baseline and break: no stimuli, coarse countdown ticks, control
    /// gestures still observed.
    async fn run_rest(
        &mut self,
        phase: Phase,
        duration: Duration,
        skippable: bool,
    ) -> Result<(), SessionError> {
        self.enter(phase);
        if phase == Phase::Break {
            self.display.show_break();
        } else {
            self.display.show_fixation();
        }

        let skip = if skippable {
            Some(self.controls.begin_break())
        } else {
            None
        };
        let timer = PhaseTimer::start(duration);

        let result = loop {
            if timer.is_expired() || self.controls.aborted() {
                break Ok(());
            }
            if skip.as_ref().is_some_and(CancellationToken::is_cancelled) {
                debug!(%phase, "break skipped");
                break Ok(());
            }

            tokio::select! {
                event = self.input.next_event() => {
                    let Some(event) = event else {
                        break Err(SessionError::InputChannelClosed);
                    };
                    self.controls.apply(&event);
                }
                () = tokio::time::sleep(COARSE_POLL) => {
                    self.display.show_countdown(
                        &timebase::format_clock(timer.remaining()),
                        timer.progress(),
                    );
                }
            }
        };

        if skippable {
            self.controls.end_break();
        }
        result
    }

    /// A task block: back-to-back trials until the phase clock expires.
    /// The last trial may run past the nominal phase end; its record is
    /// kept.
    async fn run_block(&mut self, phase: Phase, feedback_enabled: bool) -> Result<(), SessionError> {
        self.enter(phase);
        let timer = PhaseTimer::start(self.config.block_duration());
        let mut next_at = Instant::now();

        while !timer.is_expired() && !self.controls.aborted() {
            if self.boost_rx.has_changed().unwrap_or(false) {
                let value = *self.boost_rx.borrow_and_update();
                self.risk.feed_boost(value);
            }

            let outcome = trial::run_trial(
                self.store.session_id(),
                phase,
                feedback_enabled,
                &self.config,
                &timer,
                next_at,
                &mut self.controls,
                self.display.as_ref(),
                self.feedback.as_deref(),
                self.input.as_mut(),
                &mut self.risk,
                &mut self.rng,
            )
            .await?;
            next_at = outcome.deadline;
            let rt_ms = outcome.record.rt_ms;

            if outcome.record.vibrated {
                self.events.emit(Event::FeedbackPulsed {
                    timestamp: Utc::now(),
                    risk_score: outcome.record.risk_score,
                });
            }
            self.events.emit(Event::TrialEmitted {
                timestamp: Utc::now(),
                phase,
                digit: outcome.record.digit,
                correct: outcome.record.correct,
                lapse: outcome.record.lapse,
                risk_score: outcome.record.risk_score,
            });

            self.store.append_trial(outcome.record);
            #[allow(clippy::cast_precision_loss)]
            if let Some(rt) = rt_ms {
                self.risk.observe_rt(rt as f64);
            }
            self.display.show_trial_count(self.store.trials().len());
        }

        Ok(())
    }

    /// Survey gate: the sequence does not advance until one complete
    /// submission is accepted. Incomplete submissions are rejected and the
    /// prompter is asked again; abort closes the gate without a record.
    async fn run_survey(&mut self, phase: SurveyPhase) -> Result<(), SessionError> {
        let abort = self.abort.clone();
        let Some(prompter) = self.surveys.as_mut() else {
            return Err(SessionError::SurveyChannelClosed);
        };

        loop {
            let submitted = tokio::select! {
                answers = prompter.prompt(phase, &self.config.survey) => answers,
                () = abort.cancelled() => return Ok(()),
            };
            let Some(submitted) = submitted else {
                return Err(SessionError::SurveyChannelClosed);
            };

            match SurveyRecord::complete(
                self.store.session_id(),
                phase,
                &self.config.survey,
                &submitted,
            ) {
                Ok(record) => {
                    info!(?phase, "survey recorded");
                    self.events.emit(Event::SurveyRecorded {
                        timestamp: Utc::now(),
                        phase,
                    });
                    self.store.append_survey(record);
                    return Ok(());
                }
                Err(rejection) => {
                    info!(%rejection, "survey submission rejected; re-prompting");
                }
            }
        }
    }

    // -- finish -------------------------------------------------------------

    fn finish(mut self, reason: FinishReason) -> SessionOutcome {
        self.display.show_phase(Phase::Done.label());
        self.events.emit(Event::PhaseEntered {
            timestamp: Utc::now(),
            phase: Phase::Done,
        });

        let summary = self.store.summary();
        info!(
            session_id = %self.store.session_id(),
            ?reason,
            block_a_trials = summary.block_a_trials,
            block_b_trials = summary.block_b_trials,
            lapses = summary.lapses_a + summary.lapses_b,
            "session finished"
        );

        if let Some(snapshot_store) = self.snapshot_store.as_mut() {
            let key = self.store.session_id().to_string();
            if let Err(err) = snapshot_store.put(&key, &self.store.snapshot()) {
                warn!(error = %err, "session snapshot not persisted");
            }
        }

        self.events.emit(Event::SessionFinished {
            timestamp: Utc::now(),
            reason,
            trials: self.store.trials().len(),
        });
        self.events.flush();

        SessionOutcome {
            store: self.store,
            summary,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: &str) -> PressEvent {
        PressEvent {
            key: key.to_string(),
            at: Instant::now(),
        }
    }

    fn controls() -> ControlState {
        ControlState::new(KeyBindings::default(), AbortHandle::new())
    }

    #[test]
    fn presses_map_to_gestures() {
        let mut controls = controls();
        assert_eq!(controls.apply(&press("Space")), Gesture::Respond);
        assert_eq!(controls.apply(&press("o")), Gesture::SelfReport);
        assert_eq!(controls.apply(&press("Enter")), Gesture::SkipBreak);
        assert_eq!(controls.apply(&press("q")), Gesture::Ignored);
        assert_eq!(controls.apply(&press("Escape")), Gesture::Abort);
    }

    #[test]
    fn abort_press_latches_the_handle() {
        let mut controls = controls();
        assert!(!controls.aborted());
        controls.apply(&press("Escape"));
        assert!(controls.aborted());
    }

    #[test]
    fn skip_press_outside_break_does_not_cancel() {
        let mut controls = controls();
        controls.apply(&press("Enter"));
        let skip = controls.begin_break();
        assert!(!skip.is_cancelled());
        controls.apply(&press("Enter"));
        assert!(skip.is_cancelled());
    }

    #[test]
    fn each_break_gets_a_fresh_skip_token() {
        let mut controls = controls();
        let first = controls.begin_break();
        controls.apply(&press("Enter"));
        controls.end_break();
        assert!(first.is_cancelled());

        let second = controls.begin_break();
        assert!(!second.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn self_report_window_expires_after_five_seconds() {
        let mut controls = controls();
        assert!(!controls.self_report_active());

        controls.apply(&press("o"));
        assert!(controls.self_report_active());

        tokio::time::advance(Duration::from_millis(4_900)).await;
        assert!(controls.self_report_active());

        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(!controls.self_report_active());
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_self_report_press_restarts_the_window() {
        let mut controls = controls();
        controls.apply(&press("o"));
        tokio::time::advance(Duration::from_secs(4)).await;
        controls.apply(&press("o"));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(controls.self_report_active());
    }

    #[test]
    fn abort_handle_first_reason_wins() {
        let handle = AbortHandle::new();
        handle.abort(FinishReason::Aborted);
        handle.abort(FinishReason::Interrupted);
        assert!(matches!(handle.reason(), Some(FinishReason::Aborted)));
    }
}
