//! Monotonic timebase for phase and trial timing.
//!
//! Everything is built on `tokio::time` so the whole engine virtualizes
//! under `#[tokio::test(start_paused = true)]`. Cancellation is cooperative:
//! signals are observed at poll-tick granularity, so cancellation latency is
//! bounded by the active poll interval.

use std::time::Duration;

use tokio::time::Instant;

/// Poll cadence while a trial's response window is open. Trial-window timing
/// precision matters here, so the tick is tight.
pub const TRIAL_POLL: Duration = Duration::from_millis(8);

/// Poll cadence during baseline and break, where only the countdown and the
/// control gestures need servicing.
pub const COARSE_POLL: Duration = Duration::from_millis(200);

/// Countdown clock over a fixed-duration phase.
///
/// Owns the phase start instant and target duration; per-tick the controller
/// reads `remaining()` and `progress()` for the display.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTimer {
    started: Instant,
    duration: Duration,
}

impl PhaseTimer {
    /// Starts a timer for the given duration, anchored at now.
    #[must_use]
    pub fn start(duration: Duration) -> Self {
        Self {
            started: Instant::now(),
            duration,
        }
    }

    /// Time elapsed since the phase started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left in the phase, saturating at zero.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.started.elapsed())
    }

    /// Fraction of the phase completed, in [0, 1].
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed().as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    /// Whether the phase duration has fully elapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.started.elapsed() >= self.duration
    }
}

/// Formats a remaining duration as `MM:SS`, rounding seconds up so the clock
/// only shows `00:00` once the phase is truly over.
#[must_use]
pub fn format_clock(remaining: Duration) -> String {
    let total = remaining.as_millis().div_ceil(1000);
    let minutes = total / 60;
    let seconds = total % 60;
    format!("{minutes:02}:{seconds:02}")
}
