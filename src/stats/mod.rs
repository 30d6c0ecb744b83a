// Stats Library - Descriptive, rolling and multivariate statistics
// Pure functions over number sequences and row-major matrices

pub mod descriptive;
pub mod matrix;
pub mod rolling;

pub use descriptive::{
    clamp, detect_outliers, inter_quartile_range, lerp, mean, median, quantile,
    sample_standard_deviation, standard_deviation, z_score,
};
pub use matrix::{
    add_variance_floor, column_means, covariance_matrix, invert_matrix, mahalanobis_distance,
    regularize_covariance, Matrix,
};
pub use rolling::{rolling_mean, rolling_std_dev};
