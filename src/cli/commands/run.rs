//! `run` command: drive a simulated session headlessly and export it.
//!
//! The simulated participant (see [`crate::sim`]) closes the
//! stimulus-to-press loop; everything else — phase sequencing, scoring,
//! risk, surveys, exports — is the real engine.

use std::path::Path;
use std::time::Instant;

use tokio::signal::unix::{SignalKind, signal};
use tracing::info;

use crate::cli::args::{ResponderChoice, RunArgs};
use crate::config::{self, SessionConfig};
use crate::engine::{Collaborators, PhaseController};
use crate::error::{ExitCode, VigilError};
use crate::observability::{EventEmitter, FinishReason};
use crate::session::export;
use crate::session::storage::DirKeyValueStore;
use crate::sim::{AutoResponder, AutoSurveys, ResponsePolicy, SimDisplay, SimFeedback};

/// Runs one simulated session end to end.
///
/// # Errors
///
/// Returns an error on configuration problems or when the exports cannot
/// be written. A session that aborts or degrades still exports whatever it
/// committed.
pub async fn run(args: &RunArgs) -> Result<i32, VigilError> {
    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => SessionConfig::default(),
    };

    let events = match &args.events {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    };

    let policy = match args.responder {
        ResponderChoice::TargetsOnly => ResponsePolicy::TargetsOnly {
            delay: args.response_delay,
        },
        ResponderChoice::Every => ResponsePolicy::Every {
            delay: args.response_delay,
        },
        ResponderChoice::Never => ResponsePolicy::Never,
    };

    let (display, onsets) = SimDisplay::new();
    let input = AutoResponder::new(onsets, policy, config.keys.respond.clone());
    let snapshot_store = DirKeyValueStore::new(&args.out_dir.join("snapshots"))?;

    let collaborators = Collaborators {
        display: Box::new(display),
        input: Box::new(input),
        feedback: Some(Box::new(SimFeedback::new())),
        surveys: Some(Box::new(AutoSurveys)),
        snapshot_store: Some(Box::new(snapshot_store)),
        events,
    };

    let (controller, _boost) = PhaseController::new(config, collaborators, args.seed);

    // First signal requests a graceful finish; records stay intact.
    let mut sigterm = signal(SignalKind::terminate())?;
    let abort = controller.abort_handle();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => abort.abort(FinishReason::Interrupted),
            _ = sigterm.recv() => abort.abort(FinishReason::Terminated),
        }
    });

    let started = Instant::now();
    let outcome = controller.run().await;
    let elapsed = started.elapsed();

    write_exports(&args.out_dir, &outcome.store)?;

    println!(
        "session {} finished ({:?}) in {}",
        outcome.summary.session_id,
        outcome.reason,
        humantime::format_duration(elapsed),
    );
    println!(
        "  blockA: {} trials, {} lapses, median rt {}ms",
        outcome.summary.block_a_trials, outcome.summary.lapses_a, outcome.summary.median_rt_a,
    );
    println!(
        "  blockB: {} trials, {} lapses, median rt {}ms",
        outcome.summary.block_b_trials, outcome.summary.lapses_b, outcome.summary.median_rt_b,
    );

    Ok(match outcome.reason {
        FinishReason::Completed | FinishReason::Aborted => ExitCode::SUCCESS,
        FinishReason::Failure => ExitCode::SESSION_ERROR,
        FinishReason::Interrupted => ExitCode::INTERRUPTED,
        FinishReason::Terminated => ExitCode::TERMINATED,
    })
}

fn write_exports(out_dir: &Path, store: &crate::session::SessionStore) -> Result<(), VigilError> {
    std::fs::create_dir_all(out_dir)?;

    let json_path = out_dir.join(format!("{}.json", store.session_id()));
    std::fs::write(&json_path, export::to_json(store)?)?;
    info!(path = %json_path.display(), "JSON export written");

    let csv_path = out_dir.join(format!("{}.csv", store.session_id()));
    std::fs::write(&csv_path, export::to_csv(store))?;
    info!(path = %csv_path.display(), "CSV export written");

    Ok(())
}
