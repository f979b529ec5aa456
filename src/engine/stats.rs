//! Robust statistics over reaction times.
//!
//! Median and median-absolute-deviation summaries, plus the bounded FIFO
//! window of recent reaction times the risk estimator reads. Median/MAD are
//! used instead of mean/stddev so a handful of fast guesses or missed
//! responses can't swing the summary.

use std::collections::VecDeque;

/// Number of reaction times retained across the whole session.
pub const RT_WINDOW_CAPACITY: usize = 25;

/// Median of a sequence. Returns `None` for empty input; for even length
/// the midpoint average, for odd length the middle element after sorting.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Median absolute deviation from the sequence's own median.
/// Returns 0 for sequences shorter than 2.
#[must_use]
pub fn median_absolute_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = median(values).unwrap_or(0.0);
    let deviations: Vec<f64> = values.iter().map(|x| (x - m).abs()).collect();
    median(&deviations).unwrap_or(0.0)
}

/// Bounded FIFO window of the most recent reaction times (milliseconds).
///
/// Capacity is fixed at [`RT_WINDOW_CAPACITY`]; pushing beyond it evicts the
/// oldest entry.
#[derive(Debug, Clone, Default)]
pub struct RtWindow {
    values: VecDeque<f64>,
}

impl RtWindow {
    /// Creates an empty window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: VecDeque::with_capacity(RT_WINDOW_CAPACITY),
        }
    }

    /// Appends a reaction time, evicting the oldest entry when full.
    pub fn push(&mut self, rt_ms: f64) {
        self.values.push_back(rt_ms);
        while self.values.len() > RT_WINDOW_CAPACITY {
            self.values.pop_front();
        }
    }

    /// Number of reaction times currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the window holds no reaction times yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Median of the window contents.
    #[must_use]
    pub fn median(&self) -> Option<f64> {
        median(&self.as_slice())
    }

    /// MAD of the window contents.
    #[must_use]
    pub fn mad(&self) -> f64 {
        median_absolute_deviation(&self.as_slice())
    }

    fn as_slice(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn median_of_empty_is_none() {
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn median_odd_length_is_middle_element() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn median_even_length_is_midpoint_average() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn mad_below_two_elements_is_zero() {
        assert_eq!(median_absolute_deviation(&[]), 0.0);
        assert_eq!(median_absolute_deviation(&[42.0]), 0.0);
    }

    #[test]
    fn mad_of_symmetric_sequence() {
        // median = 300, |dev| = [100, 0, 100] -> MAD = 100
        assert_eq!(median_absolute_deviation(&[200.0, 300.0, 400.0]), 100.0);
    }

    #[test]
    fn mad_of_constant_sequence_is_zero() {
        assert_eq!(median_absolute_deviation(&[250.0; 5]), 0.0);
    }

    #[test]
    fn window_evicts_oldest_beyond_capacity() {
        let mut window = RtWindow::new();
        for i in 0..30 {
            window.push(f64::from(i));
        }
        assert_eq!(window.len(), RT_WINDOW_CAPACITY);
        // Oldest five (0..5) evicted; median of 5..30 is 17.
        assert_eq!(window.median(), Some(17.0));
    }

    #[test]
    fn empty_window_has_no_median() {
        let window = RtWindow::new();
        assert!(window.is_empty());
        assert_eq!(window.median(), None);
        assert_eq!(window.mad(), 0.0);
    }

    proptest! {
        #[test]
        fn median_is_order_invariant(mut values in prop::collection::vec(0.0f64..2000.0, 1..50)) {
            let forward = median(&values);
            values.reverse();
            prop_assert_eq!(forward, median(&values));
        }

        #[test]
        fn mad_is_order_invariant(mut values in prop::collection::vec(0.0f64..2000.0, 0..50)) {
            let forward = median_absolute_deviation(&values);
            values.reverse();
            prop_assert_eq!(forward, median_absolute_deviation(&values));
        }

        #[test]
        fn median_lies_within_input_range(values in prop::collection::vec(0.0f64..2000.0, 1..50)) {
            let m = median(&values).unwrap();
            let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(m >= lo && m <= hi);
        }
    }
}
