//! Linear Regression for Steering Prediction
//!
//! ## Overview
//!
//! The shipped model behind the [`Model`](kiwisteer_core::Model) /
//! [`Trainer`](kiwisteer_core::Trainer) seam: ordinary least squares with
//! an intercept, solved exactly through the normal equations. Inference is
//! one dot product per prediction, which comfortably keeps up with the
//! sensor bus on the kiwi car's single-board computer.
//!
//! ## Why ordinary least squares?
//!
//! 1. **Tiny feature space**: five features, so the normal-equation solve
//!    is a 6x6 system and numerically unproblematic
//! 2. **No hyperparameters**: nothing to tune, nothing to misconfigure
//! 3. **Transparent**: the fitted weights read directly as per-sensor
//!    steering influence
//! 4. **Cheap inference**: a dot product and an add per message
//!
//! Anything smarter plugs in by implementing the two core traits; the
//! pipeline does not change.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod linear;
pub mod metrics;

pub use linear::{LinearModel, LinearRegressor, ModelError};
pub use metrics::mean_squared_error;

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
