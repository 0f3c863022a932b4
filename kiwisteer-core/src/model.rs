//! Model seam between the core pipeline and regression crates
//!
//! The pipeline treats the regression algorithm as a black box: anything
//! that can fit a feature matrix against a target column and later map a
//! feature vector to a scalar satisfies it. `kiwisteer-ml` provides the
//! shipped implementation; swapping the algorithm means implementing these
//! two traits, nothing else.

use serde::Serialize;

use crate::features::FeatureVector;

/// A fitted regression model: a pure function from feature vector to
/// predicted steering angle.
///
/// Implementations never mutate internal state in `predict`, so one model
/// may be shared read-only across concurrent serving sessions.
pub trait Model: Send + Sync {
    /// Predict a steering angle from a prepared feature vector
    fn predict(&self, features: &[f32]) -> f32;
}

/// Fits a [`Model`] over a prepared feature matrix.
///
/// `Serialize` is required because the fitted model is persisted inside
/// the training artifact as one unit with the transform.
pub trait Trainer {
    /// Model type this trainer produces
    type Fitted: Model + Serialize;
    /// Fit-time error type
    type Error: std::error::Error;

    /// Fit on `rows` (one feature vector per row) against `targets`.
    ///
    /// `rows` and `targets` have equal length and at least one element;
    /// the offline driver guarantees both before calling.
    fn fit(&self, rows: &[FeatureVector], targets: &[f32]) -> Result<Self::Fitted, Self::Error>;
}
