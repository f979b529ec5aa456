//! Shared harness for the integration tests.
//!
//! Sessions run under a paused tokio clock, so even configurations with
//! minutes-long phases complete instantly and deterministically.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use vigil::config::SessionConfig;
use vigil::engine::{Collaborators, PhaseController, SessionOutcome};
use vigil::observability::EventEmitter;
use vigil::ports::{PressEvent, SurveyPrompter};
use vigil::session::survey::{SurveyAnswers, SurveyQuestion};
use vigil::sim::{
    AutoResponder, AutoSurveys, Frame, MemoryKeyValueStore, ResponsePolicy, ScriptedInput,
    SimDisplay, SimFeedback,
};

/// A short session: 0.6s baseline, 3s blocks, 6s break.
pub fn quick_config(target_frequency: f64) -> SessionConfig {
    SessionConfig {
        baseline_minutes: 0.01,
        block_minutes: 0.05,
        break_minutes: 0.1,
        target_frequency,
        ..SessionConfig::default()
    }
}

/// A complete mid-scale submission for the default question template.
pub fn complete_answers() -> SurveyAnswers {
    SurveyQuestion::default_template()
        .iter()
        .map(|q| (q.id.clone(), 4))
        .collect()
}

/// Handles the test keeps while a session runs.
pub struct Handles {
    pub frames: Arc<Mutex<Vec<Frame>>>,
    pub snapshots: Arc<Mutex<HashMap<String, serde_json::Value>>>,
}

/// Runs a full session with an auto-responder and auto-completed surveys.
pub async fn run_auto(
    config: SessionConfig,
    policy: ResponsePolicy,
) -> (SessionOutcome, Handles) {
    run_auto_boosted(config, policy, None).await
}

/// Like [`run_auto`], but keeps feeding the given boost value into the
/// risk estimator's external signal port for the whole session.
pub async fn run_auto_boosted(
    config: SessionConfig,
    policy: ResponsePolicy,
    boost: Option<f64>,
) -> (SessionOutcome, Handles) {
    let (display, onsets) = SimDisplay::new();
    let respond_key = config.keys.respond.clone();
    let input = AutoResponder::new(onsets, policy, respond_key);
    run_with(config, display, Box::new(input), Box::new(AutoSurveys), boost).await
}

/// Runs a session whose presses come from the returned sender.
pub async fn run_scripted<F>(
    config: SessionConfig,
    surveys: Box<dyn SurveyPrompter>,
    script: F,
) -> (SessionOutcome, Handles)
where
    F: FnOnce(mpsc::UnboundedSender<PressEvent>) + Send + 'static,
{
    let (display, _onsets) = SimDisplay::new();
    let (input, presses) = ScriptedInput::new();
    script(presses);
    run_with(config, display, Box::new(input), surveys, None).await
}

async fn run_with(
    config: SessionConfig,
    display: SimDisplay,
    input: Box<dyn vigil::ports::InputChannel>,
    surveys: Box<dyn SurveyPrompter>,
    boost: Option<f64>,
) -> (SessionOutcome, Handles) {
    let frames = display.frames_handle();
    let feedback = SimFeedback::new();
    let kv = MemoryKeyValueStore::new();
    let snapshots = kv.values_handle();

    let collaborators = Collaborators {
        display: Box::new(display),
        input,
        feedback: Some(Box::new(feedback)),
        surveys: Some(surveys),
        snapshot_store: Some(Box::new(kv)),
        events: EventEmitter::noop(),
    };

    let (controller, boost_tx) = PhaseController::new(config, collaborators, Some(7));

    if let Some(value) = boost {
        // Refresh the signal faster than the trial cadence so every onset
        // sees a recent write. The task ends once the session drops its
        // receiver.
        tokio::spawn(async move {
            loop {
                if boost_tx.send(value).is_err() {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        });
    }

    let outcome = controller.run().await;
    (outcome, Handles { frames, snapshots })
}

/// A press event stamped now.
pub fn press(key: &str) -> PressEvent {
    PressEvent {
        key: key.to_string(),
        at: tokio::time::Instant::now(),
    }
}
