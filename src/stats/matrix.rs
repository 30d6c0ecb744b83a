// Multivariate statistics - Covariance, inversion and Mahalanobis distance
// Data matrices are row-major: rows are observations, columns are features

/// Dense row-major matrix
pub type Matrix = Vec<Vec<f64>>;

/// Pivot magnitude below which a matrix is treated as singular
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Per-column mean of an observation matrix
pub fn column_means(data: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = data.first() else {
        return Vec::new();
    };

    let mut means = vec![0.0; first.len()];
    for row in data {
        for (acc, &v) in means.iter_mut().zip(row) {
            *acc += v;
        }
    }

    let n = data.len() as f64;
    means.iter_mut().for_each(|m| *m /= n);
    means
}

/// Sample covariance matrix over the columns of `data`
///
/// Uses the n - 1 denominator. With fewer than two observations the result
/// is the zero matrix, which [`regularize_covariance`] turns invertible.
pub fn covariance_matrix(data: &[Vec<f64>]) -> Matrix {
    let dims = data.first().map(|row| row.len()).unwrap_or(0);
    let mut cov = vec![vec![0.0; dims]; dims];

    if data.len() < 2 {
        return cov;
    }

    let means = column_means(data);
    for row in data {
        for i in 0..dims {
            let di = row[i] - means[i];
            for j in i..dims {
                cov[i][j] += di * (row[j] - means[j]);
            }
        }
    }

    let denom = (data.len() - 1) as f64;
    for i in 0..dims {
        for j in i..dims {
            cov[i][j] /= denom;
            cov[j][i] = cov[i][j];
        }
    }

    cov
}

/// Add `epsilon` to every diagonal entry
pub fn regularize_covariance(cov: &[Vec<f64>], epsilon: f64) -> Matrix {
    let mut out = cov.to_vec();
    for (i, row) in out.iter_mut().enumerate() {
        if let Some(d) = row.get_mut(i) {
            *d += epsilon;
        }
    }
    out
}

/// Add a per-column noise variance (`floors[i]` squared) to the diagonal
///
/// Deviations smaller than a column's floor then stay small even when the
/// observed variance of that column is zero.
pub fn add_variance_floor(cov: &[Vec<f64>], floors: &[f64]) -> Matrix {
    let mut out = cov.to_vec();
    for (i, row) in out.iter_mut().enumerate() {
        if let (Some(d), Some(floor)) = (row.get_mut(i), floors.get(i)) {
            *d += floor * floor;
        }
    }
    out
}

/// Invert a square matrix with Gauss-Jordan elimination and partial pivoting
///
/// Returns `None` for non-square or singular (within tolerance) input.
pub fn invert_matrix(matrix: &[Vec<f64>]) -> Option<Matrix> {
    let n = matrix.len();
    if matrix.iter().any(|row| row.len() != n) {
        return None;
    }

    // Augment with the identity: [A | I]
    let mut aug: Matrix = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = row.clone();
            r.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            r
        })
        .collect();

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&a, &b| {
            aug[a][col]
                .abs()
                .partial_cmp(&aug[b][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

        let pivot = aug[pivot_row][col];
        if !pivot.is_finite() || pivot.abs() < SINGULAR_TOLERANCE {
            return None;
        }

        aug.swap(col, pivot_row);
        aug[col].iter_mut().for_each(|v| *v /= pivot);
        let pivot_values = aug[col].clone();

        for (row, values) in aug.iter_mut().enumerate() {
            if row == col {
                continue;
            }
            let factor = values[col];
            if factor == 0.0 {
                continue;
            }
            for (v, p) in values.iter_mut().zip(&pivot_values) {
                *v -= factor * p;
            }
        }
    }

    Some(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}

/// Mahalanobis distance `sqrt((x - mu)^T inv_cov (x - mu))`
///
/// Negative quadratic forms from rounding are clamped to zero.
pub fn mahalanobis_distance(x: &[f64], mu: &[f64], inv_cov: &[Vec<f64>]) -> f64 {
    let diff: Vec<f64> = x.iter().zip(mu).map(|(a, b)| a - b).collect();

    let mut quad = 0.0;
    for (i, row) in inv_cov.iter().enumerate().take(diff.len()) {
        let projected: f64 = row.iter().zip(&diff).map(|(m, d)| m * d).sum();
        quad += diff[i] * projected;
    }

    quad.max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_invert_diagonal() {
        let m = vec![vec![2.0, 0.0], vec![0.0, 4.0]];
        let inv = invert_matrix(&m).unwrap();
        assert!(approx(inv[0][0], 0.5));
        assert!(approx(inv[1][1], 0.25));
        assert!(approx(inv[0][1], 0.0));
        assert!(approx(inv[1][0], 0.0));
    }

    #[test]
    fn test_invert_singular() {
        let zero = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        assert!(invert_matrix(&zero).is_none());

        let rank_one = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(invert_matrix(&rank_one).is_none());
    }

    #[test]
    fn test_invert_needs_pivoting() {
        // Zero in the top-left forces a row swap
        let m = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let inv = invert_matrix(&m).unwrap();
        assert!(approx(inv[0][1], 1.0));
        assert!(approx(inv[1][0], 1.0));
    }

    #[test]
    fn test_invert_general() {
        let m = vec![
            vec![4.0, 7.0, 2.0],
            vec![3.0, 6.0, 1.0],
            vec![2.0, 5.0, 3.0],
        ];
        let inv = invert_matrix(&m).unwrap();

        // A * A^-1 == I
        for i in 0..3 {
            for j in 0..3 {
                let v: f64 = (0..3).map(|k| m[i][k] * inv[k][j]).sum();
                assert!(approx(v, if i == j { 1.0 } else { 0.0 }));
            }
        }
    }

    #[test]
    fn test_covariance_matrix() {
        let data = vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]];
        let cov = covariance_matrix(&data);
        assert!(approx(cov[0][0], 1.0));
        assert!(approx(cov[1][1], 4.0));
        assert!(approx(cov[0][1], 2.0));
        assert!(approx(cov[1][0], 2.0));
    }

    #[test]
    fn test_covariance_single_row_is_zero() {
        let cov = covariance_matrix(&[vec![1.0, 5.0]]);
        assert_eq!(cov, vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn test_regularize_makes_invertible() {
        let zero = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        let reg = regularize_covariance(&zero, 0.1);
        let inv = invert_matrix(&reg).unwrap();
        assert!(approx(inv[0][0], 10.0));
    }

    #[test]
    fn test_variance_floor_scales_distance() {
        // Constant history: distance becomes deviation over floor per column
        let history = vec![vec![4.0, 0.0], vec![4.0, 0.0], vec![4.0, 0.0]];
        let cov = add_variance_floor(&covariance_matrix(&history), &[0.5, 0.25]);
        assert_eq!(cov, vec![vec![0.25, 0.0], vec![0.0, 0.0625]]);

        let inv = invert_matrix(&cov).unwrap();
        let d = mahalanobis_distance(&[4.5, 0.0], &column_means(&history), &inv);
        assert!((d - 1.0).abs() < 1e-9);
        let d = mahalanobis_distance(&[4.0, 0.5], &column_means(&history), &inv);
        assert!((d - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_mahalanobis_at_mean_is_zero() {
        let cov = vec![vec![2.0, 0.3], vec![0.3, 1.0]];
        let inv = invert_matrix(&cov).unwrap();
        let mu = [1.5, -2.0];
        assert_eq!(mahalanobis_distance(&mu, &mu, &inv), 0.0);
    }

    #[test]
    fn test_mahalanobis_identity_is_euclidean() {
        let identity = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let d = mahalanobis_distance(&[3.0, 4.0], &[0.0, 0.0], &identity);
        assert!(approx(d, 5.0));
    }

    #[test]
    fn test_column_means() {
        let data = vec![vec![1.0, 10.0], vec![3.0, 20.0]];
        assert_eq!(column_means(&data), vec![2.0, 15.0]);
        assert!(column_means(&[]).is_empty());
    }
}
