mod common;

use std::time::Duration;

use common::{complete_answers, press, quick_config, run_auto, run_auto_boosted, run_scripted};
use vigil::observability::FinishReason;
use vigil::session::{Phase, SurveyPhase};
use vigil::sim::{ResponsePolicy, ScriptedSurveys};

#[tokio::test(start_paused = true)]
async fn attentive_participant_scores_all_correct() {
    let (outcome, _handles) = run_auto(
        quick_config(1.0),
        ResponsePolicy::TargetsOnly {
            delay: Duration::from_millis(200),
        },
    )
    .await;

    assert!(matches!(outcome.reason, FinishReason::Completed));
    assert!(outcome.summary.block_a_trials > 0);
    assert!(outcome.summary.block_b_trials > 0);
    assert_eq!(outcome.summary.lapses_a, 0);
    assert_eq!(outcome.summary.lapses_b, 0);
    assert!(outcome.store.trials().iter().all(|t| t.correct));
    assert_eq!(outcome.summary.median_rt_a, 200);

    // Both survey gates passed.
    assert!(outcome.store.has_survey(SurveyPhase::AfterBlockA));
    assert!(outcome.store.has_survey(SurveyPhase::AfterBlockB));
}

#[tokio::test(start_paused = true)]
async fn unresponsive_participant_lapses_every_target() {
    let (outcome, _handles) = run_auto(quick_config(1.0), ResponsePolicy::Never).await;

    assert!(matches!(outcome.reason, FinishReason::Completed));
    assert!(outcome.summary.block_a_trials > 0);
    for trial in outcome.store.trials() {
        assert!(trial.is_target);
        assert!(!trial.responded);
        assert!(!trial.correct);
        assert!(trial.lapse);
        assert!(trial.rt_ms.is_none());
        assert!(trial.key_down.is_none());
    }
}

#[tokio::test(start_paused = true)]
async fn withholding_on_nontargets_is_correct() {
    let (outcome, _handles) = run_auto(quick_config(0.0), ResponsePolicy::Never).await;

    assert!(matches!(outcome.reason, FinishReason::Completed));
    assert!(outcome.store.trials().iter().all(|t| !t.is_target));
    assert!(outcome.store.trials().iter().all(|t| t.correct && !t.lapse));
}

#[tokio::test(start_paused = true)]
async fn feedback_never_fires_in_block_a() {
    let (outcome, _handles) = run_auto(
        quick_config(1.0),
        ResponsePolicy::TargetsOnly {
            delay: Duration::from_millis(700),
        },
    )
    .await;

    for trial in outcome.store.trials() {
        if trial.phase == Phase::BlockA {
            assert!(!trial.vibrated, "blockA must run without feedback");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn saturated_boost_drives_feedback_in_block_b_only() {
    // A pinned external signal pushes the risk score over the pulse
    // threshold on every onset.
    let (outcome, _handles) = run_auto_boosted(
        quick_config(1.0),
        ResponsePolicy::TargetsOnly {
            delay: Duration::from_millis(200),
        },
        Some(1.0),
    )
    .await;

    assert!(matches!(outcome.reason, FinishReason::Completed));
    for trial in outcome.store.trials() {
        match trial.phase {
            Phase::BlockA => assert!(!trial.vibrated),
            Phase::BlockB => {
                assert!(trial.risk_score > 0.65, "risk was {}", trial.risk_score);
                assert!(trial.vibrated);
            }
            _ => {}
        }
    }
    assert!(outcome.summary.block_b_trials > 0);
}

#[tokio::test(start_paused = true)]
async fn abort_jumps_to_finish_and_keeps_records() {
    let answers = vec![complete_answers(), complete_answers()];
    let (outcome, _handles) = run_scripted(
        quick_config(1.0),
        Box::new(ScriptedSurveys::new(answers)),
        |presses| {
            tokio::spawn(async move {
                // Baseline is 600ms; land inside blockA.
                tokio::time::sleep(Duration::from_millis(1_500)).await;
                let _ = presses.send(press("Escape"));
                std::future::pending::<()>().await;
            });
        },
    )
    .await;

    assert!(matches!(outcome.reason, FinishReason::Aborted));
    assert!(outcome.summary.block_a_trials > 0);
    assert_eq!(outcome.summary.block_b_trials, 0);
    assert!(!outcome.store.has_survey(SurveyPhase::AfterBlockA));
    assert!(!outcome.store.has_survey(SurveyPhase::AfterBlockB));
}

#[tokio::test(start_paused = true)]
async fn skip_key_ends_the_break_early() {
    let mut config = quick_config(0.0);
    config.break_minutes = 60.0;

    let started = tokio::time::Instant::now();
    let (outcome, _handles) = run_scripted(
        config,
        Box::new(ScriptedSurveys::new(vec![
            complete_answers(),
            complete_answers(),
        ])),
        |presses| {
            tokio::spawn(async move {
                // Spam the skip key; it only acts during the break.
                loop {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    if presses.send(press("Enter")).is_err() {
                        break;
                    }
                }
            });
        },
    )
    .await;

    assert!(matches!(outcome.reason, FinishReason::Completed));
    assert!(
        started.elapsed() < Duration::from_secs(60),
        "the hour-long break should have been skipped"
    );
    assert!(outcome.summary.block_b_trials > 0);
}

#[tokio::test(start_paused = true)]
async fn incomplete_survey_is_reprompted_until_complete() {
    let submissions = vec![
        vigil::session::survey::SurveyAnswers::new(), // rejected: nothing answered
        complete_answers(),
        complete_answers(),
    ];
    let (outcome, _handles) = run_scripted(
        quick_config(0.0),
        Box::new(ScriptedSurveys::new(submissions)),
        |presses| {
            tokio::spawn(async move {
                // Keep the channel open for the whole session.
                let _presses = presses;
                std::future::pending::<()>().await;
            });
        },
    )
    .await;

    assert!(matches!(outcome.reason, FinishReason::Completed));
    assert!(outcome.store.has_survey(SurveyPhase::AfterBlockA));
    assert!(outcome.store.has_survey(SurveyPhase::AfterBlockB));
    assert_eq!(outcome.store.surveys().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn exhausted_survey_prompter_degrades_to_finish() {
    // One submission only: the second gate finds the prompter closed.
    let (outcome, _handles) = run_scripted(
        quick_config(0.0),
        Box::new(ScriptedSurveys::new(vec![complete_answers()])),
        |presses| {
            tokio::spawn(async move {
                let _presses = presses;
                std::future::pending::<()>().await;
            });
        },
    )
    .await;

    assert!(matches!(outcome.reason, FinishReason::Failure));
    assert!(outcome.store.has_survey(SurveyPhase::AfterBlockA));
    assert!(!outcome.store.has_survey(SurveyPhase::AfterBlockB));
    // BlockB ran before the failing gate; its records are kept.
    assert!(outcome.summary.block_b_trials > 0);
}

#[tokio::test(start_paused = true)]
async fn self_report_marks_overlapping_trials_as_lapses() {
    let mut config = quick_config(0.0);
    config.baseline_minutes = 0.0;

    let (outcome, _handles) = run_scripted(
        config,
        Box::new(ScriptedSurveys::new(vec![
            complete_answers(),
            complete_answers(),
        ])),
        |presses| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                let _ = presses.send(press("o"));
                std::future::pending::<()>().await;
            });
        },
    )
    .await;

    assert!(matches!(outcome.reason, FinishReason::Completed));
    let flagged: Vec<_> = outcome
        .store
        .trials()
        .iter()
        .filter(|t| t.self_report_active)
        .collect();
    assert!(!flagged.is_empty(), "the 5s window should cover trials");
    // Withholding on non-targets stays correct; the marker forces lapse.
    assert!(flagged.iter().all(|t| t.correct && t.lapse));
    // The window closes: later trials are unflagged.
    assert!(
        outcome
            .store
            .trials()
            .iter()
            .any(|t| !t.self_report_active),
    );
}
