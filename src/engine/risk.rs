//! Adaptive risk estimation.
//!
//! Maps the recent reaction-time window (plus an optional external
//! physiological signal) to a scalar risk in [0, 1]. A robust median/MAD
//! summary feeds two clamped additive terms over a fixed baseline, with a
//! small stochastic jitter so the score never reads as more precise than
//! the heuristic it is. The score is computed once per stimulus onset and
//! stamped on that trial's record.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::stats::RtWindow;

/// Baseline offset before any deviation terms.
pub const BASELINE_RISK: f64 = 0.2;

/// Reference median reaction time (ms); slower windows add risk.
pub const MEDIAN_REFERENCE_MS: f64 = 350.0;

/// Reference MAD (ms); more dispersed windows add risk.
pub const MAD_REFERENCE_MS: f64 = 60.0;

const MEDIAN_SCALE_MS: f64 = 300.0;
const MEDIAN_TERM_MAX: f64 = 0.6;
const MAD_SCALE_MS: f64 = 200.0;
const MAD_TERM_MAX: f64 = 0.4;
const JITTER_MAX: f64 = 0.05;

/// MAD substitute when the window is too small or degenerate to carry one.
/// Sits below the reference, so the dispersion term contributes nothing.
const MAD_FALLBACK_MS: f64 = 40.0;

/// Geometric decay applied to the boost cell on every read.
pub const BOOST_DECAY: f64 = 0.9;

const BOOST_TERM_MIN: f64 = -0.2;
const BOOST_TERM_MAX: f64 = 0.8;

/// Risk estimator owning the reaction-time window and the physiological
/// boost cell.
///
/// The boost is an explicit input port: [`RiskEstimator::feed_boost`] writes
/// it, and each [`RiskEstimator::compute`] read decays it geometrically —
/// reading is deliberately destructive, so a stale external signal fades
/// instead of pinning the score.
#[derive(Debug)]
pub struct RiskEstimator {
    window: RtWindow,
    boost: f64,
    rng: StdRng,
}

impl RiskEstimator {
    /// Creates an estimator with an empty window.
    ///
    /// A fixed `seed` makes the jitter deterministic for tests; pass `None`
    /// for entropy-seeded operation.
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            window: RtWindow::new(),
            boost: 0.0,
            rng,
        }
    }

    /// Computes the risk score for the current window state.
    ///
    /// Always in [0, 1]. An empty window falls back to the reference median
    /// (and a sub-reference MAD), leaving baseline plus jitter. Reading the
    /// boost decays it by [`BOOST_DECAY`].
    pub fn compute(&mut self) -> f64 {
        let m = self.window.median().unwrap_or(MEDIAN_REFERENCE_MS);
        let mad = {
            let v = self.window.mad();
            if v == 0.0 { MAD_FALLBACK_MS } else { v }
        };

        let mut risk = BASELINE_RISK
            + ((m - MEDIAN_REFERENCE_MS) / MEDIAN_SCALE_MS).clamp(0.0, MEDIAN_TERM_MAX)
            + ((mad - MAD_REFERENCE_MS) / MAD_SCALE_MS).clamp(0.0, MAD_TERM_MAX)
            + self.rng.random::<f64>() * JITTER_MAX;

        if self.boost != 0.0 {
            risk += self.boost.clamp(BOOST_TERM_MIN, BOOST_TERM_MAX);
            self.boost *= BOOST_DECAY;
        }

        risk.clamp(0.0, 1.0)
    }

    /// Feeds an external physiological signal into the boost cell.
    ///
    /// The value is clamped into [-1, 1]; non-finite input is ignored.
    pub fn feed_boost(&mut self, value: f64) {
        if value.is_finite() {
            self.boost = value.clamp(-1.0, 1.0);
        }
    }

    /// Current boost cell value (post any decay already applied).
    #[must_use]
    pub const fn boost(&self) -> f64 {
        self.boost
    }

    /// Appends a reaction time to the window (called after a trial record
    /// is emitted, never before classification).
    pub fn observe_rt(&mut self, rt_ms: f64) {
        self.window.push(rt_ms);
    }

    /// Median of the window as it stands right now. The trial machine reads
    /// this for the slow-response cutoff *before* the trial's own reaction
    /// time is observed.
    #[must_use]
    pub fn window_median(&self) -> Option<f64> {
        self.window.median()
    }

    /// Number of reaction times currently in the window.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.window.len()
    }
}
