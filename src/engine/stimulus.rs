//! Stimulus generation.
//!
//! Go/no-go digit draws: the target digit appears with the configured
//! frequency, everything else is uniform over the remaining nine digits.

use rand::Rng;

/// The designated target digit; a press is required only when this is shown.
pub const TARGET_DIGIT: u8 = 3;

/// Draws the next stimulus digit in `0..=9`.
///
/// With probability `target_frequency` returns [`TARGET_DIGIT`]; otherwise a
/// uniform draw over the nine non-target digits. Out-of-range frequencies
/// are clamped into [0, 1]; the config validator warns about such values.
pub fn pick_digit<R: Rng + ?Sized>(rng: &mut R, target_frequency: f64) -> u8 {
    let freq = target_frequency.clamp(0.0, 1.0);
    if rng.random::<f64>() < freq {
        return TARGET_DIGIT;
    }
    // Uniform over 0..=9 minus the target: draw from 0..9 and shift the
    // target's slot up.
    let draw = rng.random_range(0..9u8);
    if draw >= TARGET_DIGIT { draw + 1 } else { draw }
}
