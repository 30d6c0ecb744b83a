// Descriptive statistics - Central tendency, spread and outlier fences
// All functions tolerate empty input and return neutral values

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n)
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    let variance = values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Sample standard deviation (divides by n - 1)
///
/// Returns 0.0 when fewer than two values are available.
pub fn sample_standard_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mu = mean(values);
    let variance =
        values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Standard score of `x`; defined as 0.0 when `sigma` is zero
pub fn z_score(x: f64, mu: f64, sigma: f64) -> f64 {
    if sigma == 0.0 || !sigma.is_finite() {
        return 0.0;
    }
    (x - mu) / sigma
}

/// Median of the values (average of the two middle values for even lengths)
pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Quantile with linear interpolation between closest ranks
///
/// `q` is clamped to [0.0, 1.0]. Returns 0.0 for empty input.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let position = clamp(q, 0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;

    lerp(sorted[lower], sorted[upper], position - lower as f64)
}

/// Inter-quartile range Q3 - Q1
pub fn inter_quartile_range(values: &[f64]) -> f64 {
    quantile(values, 0.75) - quantile(values, 0.25)
}

/// Flag values outside the Tukey fences `[Q1 - k*IQR, Q3 + k*IQR]`
///
/// Output has the same length and order as the input.
pub fn detect_outliers(values: &[f64], k: f64) -> Vec<bool> {
    if values.is_empty() {
        return Vec::new();
    }

    let q1 = quantile(values, 0.25);
    let q3 = quantile(values, 0.75);
    let iqr = q3 - q1;
    let low = q1 - k * iqr;
    let high = q3 + k * iqr;

    values.iter().map(|&v| v < low || v > high).collect()
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Linear interpolation from `a` to `b` by `t`
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < 1e-12);
        // Population std of the classic example is exactly 2
        assert!((standard_deviation(&values) - 2.0).abs() < 1e-12);
        assert!(sample_standard_deviation(&values) > 2.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(standard_deviation(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert!(detect_outliers(&[], 1.5).is_empty());
    }

    #[test]
    fn test_z_score_zero_sigma() {
        assert_eq!(z_score(10.0, 2.0, 0.0), 0.0);
        assert!((z_score(4.0, 2.0, 1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_inter_quartile_range() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        // Q1 = 2, Q3 = 4
        assert!((inter_quartile_range(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_detect_outliers() {
        let values = [10.0, 11.0, 10.5, 9.5, 10.2, 40.0];
        let flags = detect_outliers(&values, 1.5);
        assert_eq!(flags, vec![false, false, false, false, false, true]);
    }

    #[test]
    fn test_clamp_and_lerp() {
        assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(lerp(0.0, 10.0, 0.25), 2.5);
    }
}
