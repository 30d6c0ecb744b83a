// Rolling statistics - Causal windowed mean and standard deviation
// Output index i only depends on inputs [i + 1 - window, i]

use super::descriptive::{mean, standard_deviation};

/// Trailing slice ending at `index` (inclusive) of at most `window` values
fn trailing(values: &[f64], index: usize, window: usize) -> &[f64] {
    let start = (index + 1).saturating_sub(window.max(1));
    &values[start..=index]
}

/// Rolling mean with the same length as the input
///
/// Early positions average over however many samples exist so far.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| mean(trailing(values, i, window)))
        .collect()
}

/// Rolling population standard deviation with the same length as the input
pub fn rolling_std_dev(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| standard_deviation(trailing(values, i, window)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_mean_same_length() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let rolled = rolling_mean(&values, 3);
        assert_eq!(rolled.len(), values.len());
        assert_eq!(rolled[0], 1.0);
        assert_eq!(rolled[1], 1.5);
        assert_eq!(rolled[2], 2.0);
        assert_eq!(rolled[4], 4.0);
    }

    #[test]
    fn test_rolling_is_causal() {
        let base = [1.0, 1.0, 1.0, 1.0];
        let spiked = [1.0, 1.0, 1.0, 100.0];
        let a = rolling_mean(&base, 2);
        let b = rolling_mean(&spiked, 2);
        // A future spike must not move earlier outputs
        assert_eq!(a[..3], b[..3]);
        assert!(b[3] > a[3]);
    }

    #[test]
    fn test_rolling_std_constant_is_zero() {
        let values = [2.0; 10];
        assert!(rolling_std_dev(&values, 4).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_zero_window_treated_as_one() {
        let values = [3.0, 7.0];
        assert_eq!(rolling_mean(&values, 0), vec![3.0, 7.0]);
    }
}
