//! Simulated collaborators.
//!
//! Headless stand-ins for the display, input, feedback, survey, and
//! snapshot ports. The CLI `run` command wires a full session out of these,
//! and the integration tests drive them under paused time. The display
//! broadcasts stimulus onsets; the auto-responder turns those onsets into
//! delayed key presses, closing the loop without a human.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::engine::stimulus::TARGET_DIGIT;
use crate::error::VigilError;
use crate::ports::{
    DisplaySink, FeedbackActuator, InputChannel, KeyValueStore, PressEvent, SurveyPrompter,
};
use crate::session::SurveyPhase;
use crate::session::survey::{SurveyAnswers, SurveyQuestion};

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// A rendered frame worth remembering. Countdown updates are folded into a
/// single latest value rather than recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Stimulus(u8),
    Fixation,
    OffsetMarker,
    Break,
    Phase(String),
    TrialCount(usize),
    Risk(f64),
    Notice(String),
}

/// Recording display that also announces stimulus onsets on a channel.
pub struct SimDisplay {
    frames: Arc<Mutex<Vec<Frame>>>,
    latest_countdown: Mutex<Option<(String, f64)>>,
    onsets: mpsc::UnboundedSender<u8>,
}

impl SimDisplay {
    /// Creates the display plus the onset receiver an
    /// [`AutoResponder`] listens on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<u8>) {
        let (onsets, rx) = mpsc::unbounded_channel();
        let display = Self {
            frames: Arc::new(Mutex::new(Vec::new())),
            latest_countdown: Mutex::new(None),
            onsets,
        };
        (display, rx)
    }

    /// Shared handle to the recorded frames, usable after the display has
    /// been moved into a session.
    #[must_use]
    pub fn frames_handle(&self) -> Arc<Mutex<Vec<Frame>>> {
        Arc::clone(&self.frames)
    }

    fn push(&self, frame: Frame) {
        if let Ok(mut frames) = self.frames.lock() {
            frames.push(frame);
        }
    }
}

impl DisplaySink for SimDisplay {
    fn show_stimulus(&self, digit: u8) {
        self.push(Frame::Stimulus(digit));
        let _ = self.onsets.send(digit);
    }

    fn show_fixation(&self) {
        self.push(Frame::Fixation);
    }

    fn show_offset_marker(&self) {
        self.push(Frame::OffsetMarker);
    }

    fn show_break(&self) {
        self.push(Frame::Break);
    }

    fn show_phase(&self, label: &str) {
        self.push(Frame::Phase(label.to_string()));
    }

    fn show_countdown(&self, clock: &str, progress: f64) {
        if let Ok(mut latest) = self.latest_countdown.lock() {
            *latest = Some((clock.to_string(), progress));
        }
    }

    fn show_trial_count(&self, count: usize) {
        self.push(Frame::TrialCount(count));
    }

    fn show_risk(&self, risk: f64) {
        self.push(Frame::Risk(risk));
    }

    fn show_notice(&self, message: &str) {
        self.push(Frame::Notice(message.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// How the auto-responder reacts to stimulus onsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePolicy {
    /// Never press anything.
    Never,
    /// Press the response key after `delay` for every stimulus.
    Every { delay: Duration },
    /// Press only for target digits, after `delay`.
    TargetsOnly { delay: Duration },
}

/// Input channel that converts announced onsets into delayed presses.
///
/// The press deadline survives cancellation: a dropped `next_event` call
/// resumes waiting for the same press next time, as the port contract
/// requires.
pub struct AutoResponder {
    onsets: mpsc::UnboundedReceiver<u8>,
    policy: ResponsePolicy,
    respond_key: String,
    press_due: Option<Instant>,
}

impl AutoResponder {
    #[must_use]
    pub fn new(
        onsets: mpsc::UnboundedReceiver<u8>,
        policy: ResponsePolicy,
        respond_key: impl Into<String>,
    ) -> Self {
        Self {
            onsets,
            policy,
            respond_key: respond_key.into(),
            press_due: None,
        }
    }
}

#[async_trait]
impl InputChannel for AutoResponder {
    async fn next_event(&mut self) -> Option<PressEvent> {
        loop {
            if let Some(due) = self.press_due {
                tokio::time::sleep_until(due).await;
                self.press_due = None;
                return Some(PressEvent {
                    key: self.respond_key.clone(),
                    at: Instant::now(),
                });
            }

            match self.policy {
                ResponsePolicy::Never => {
                    // Stay open without ever producing a press.
                    std::future::pending::<()>().await;
                }
                ResponsePolicy::Every { delay } => {
                    self.onsets.recv().await?;
                    self.press_due = Some(Instant::now() + delay);
                }
                ResponsePolicy::TargetsOnly { delay } => {
                    let digit = self.onsets.recv().await?;
                    if digit == TARGET_DIGIT {
                        self.press_due = Some(Instant::now() + delay);
                    }
                }
            }
        }
    }
}

/// Input channel fed by hand from a test.
pub struct ScriptedInput {
    events: mpsc::UnboundedReceiver<PressEvent>,
}

impl ScriptedInput {
    /// Creates the channel plus the sender the test keeps.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedSender<PressEvent>) {
        let (tx, events) = mpsc::unbounded_channel();
        (Self { events }, tx)
    }
}

#[async_trait]
impl InputChannel for ScriptedInput {
    async fn next_event(&mut self) -> Option<PressEvent> {
        self.events.recv().await
    }
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

/// Counting actuator; every pulse "fires".
#[derive(Debug, Default)]
pub struct SimFeedback {
    pulses: Arc<AtomicUsize>,
}

impl SimFeedback {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared pulse counter, usable after the actuator moves into a
    /// session.
    #[must_use]
    pub fn pulse_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.pulses)
    }
}

impl FeedbackActuator for SimFeedback {
    fn pulse(&self, _duration: Duration) -> bool {
        self.pulses.fetch_add(1, Ordering::Relaxed);
        true
    }
}

// ---------------------------------------------------------------------------
// Surveys
// ---------------------------------------------------------------------------

/// Prompter that answers every question at the midpoint of its scale.
#[derive(Debug, Default)]
pub struct AutoSurveys;

#[async_trait]
impl SurveyPrompter for AutoSurveys {
    async fn prompt(
        &mut self,
        _phase: SurveyPhase,
        questions: &[SurveyQuestion],
    ) -> Option<SurveyAnswers> {
        let answers = questions
            .iter()
            .map(|q| {
                let (lo, hi) = q.scale;
                (q.id.clone(), lo.midpoint(hi))
            })
            .collect();
        Some(answers)
    }
}

/// Prompter that replays pre-scripted submissions, then reports closure.
#[derive(Debug, Default)]
pub struct ScriptedSurveys {
    submissions: VecDeque<SurveyAnswers>,
}

impl ScriptedSurveys {
    #[must_use]
    pub fn new(submissions: Vec<SurveyAnswers>) -> Self {
        Self {
            submissions: submissions.into(),
        }
    }
}

#[async_trait]
impl SurveyPrompter for ScriptedSurveys {
    async fn prompt(
        &mut self,
        _phase: SurveyPhase,
        _questions: &[SurveyQuestion],
    ) -> Option<SurveyAnswers> {
        self.submissions.pop_front()
    }
}

// ---------------------------------------------------------------------------
// Snapshot store
// ---------------------------------------------------------------------------

/// In-memory key-value sink.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Arc<Mutex<HashMap<String, serde_json::Value>>>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the stored values.
    #[must_use]
    pub fn values_handle(&self) -> Arc<Mutex<HashMap<String, serde_json::Value>>> {
        Arc::clone(&self.values)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn put(&mut self, key: &str, value: &serde_json::Value) -> Result<(), VigilError> {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn auto_responder_presses_after_delay() {
        let (display, onsets) = SimDisplay::new();
        let mut input = AutoResponder::new(
            onsets,
            ResponsePolicy::Every {
                delay: Duration::from_millis(200),
            },
            "Space",
        );

        let before = Instant::now();
        display.show_stimulus(7);
        let event = input.next_event().await.unwrap();
        assert_eq!(event.key, "Space");
        assert_eq!(event.at.duration_since(before), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn targets_only_skips_nontargets() {
        let (display, onsets) = SimDisplay::new();
        let mut input = AutoResponder::new(
            onsets,
            ResponsePolicy::TargetsOnly {
                delay: Duration::from_millis(150),
            },
            "Space",
        );

        display.show_stimulus(5);
        display.show_stimulus(TARGET_DIGIT);
        let event = input.next_event().await.unwrap();
        assert_eq!(event.key, "Space");
    }

    #[tokio::test]
    async fn auto_surveys_answer_every_question_mid_scale() {
        let questions = SurveyQuestion::default_template();
        let mut prompter = AutoSurveys;
        let answers = prompter
            .prompt(SurveyPhase::AfterBlockA, &questions)
            .await
            .unwrap();
        assert_eq!(answers.len(), questions.len());
        assert!(answers.values().all(|&v| v == 4));
    }

    #[tokio::test]
    async fn scripted_surveys_drain_then_close() {
        let mut prompter = ScriptedSurveys::new(vec![SurveyAnswers::new()]);
        assert!(prompter.prompt(SurveyPhase::AfterBlockA, &[]).await.is_some());
        assert!(prompter.prompt(SurveyPhase::AfterBlockA, &[]).await.is_none());
    }

    #[test]
    fn memory_store_keeps_the_latest_value() {
        let mut store = MemoryKeyValueStore::new();
        let values = store.values_handle();
        store.put("k", &serde_json::json!({"v": 1})).unwrap();
        store.put("k", &serde_json::json!({"v": 2})).unwrap();
        assert_eq!(values.lock().unwrap()["k"]["v"], 2);
    }

    #[test]
    fn display_records_frames_in_order() {
        let (display, _onsets) = SimDisplay::new();
        let frames = display.frames_handle();
        display.show_phase("Baseline");
        display.show_fixation();
        display.show_countdown("01:59", 0.01);
        assert_eq!(
            *frames.lock().unwrap(),
            vec![Frame::Phase("Baseline".to_string()), Frame::Fixation]
        );
    }
}
