//! Ordinary least squares linear regression
//!
//! Fitting solves the normal equations `XᵀX w = Xᵀy` by Gaussian
//! elimination with partial pivoting, with the intercept handled as an
//! implicit constant-1 column. An exactly collinear feature matrix makes
//! the system singular and fitting fails; since the feature pipeline
//! standardizes columns first, this only happens when two sensors report
//! identical values over the whole training set.

use serde::{Deserialize, Serialize};

use kiwisteer_core::{FeatureVector, Model, Trainer};

/// Errors from fitting a linear model
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    /// The normal-equation system has no unique solution
    #[error("normal equations are singular; feature columns are collinear")]
    SingularSystem,
    /// Fit called with no training rows
    #[error("cannot fit on an empty training set")]
    NoTrainingData,
    /// Rows and targets differ in length
    #[error("feature rows ({rows}) and targets ({targets}) differ in length")]
    LengthMismatch {
        /// Number of feature rows
        rows: usize,
        /// Number of target values
        targets: usize,
    },
}

/// Fitted linear regression parameters.
///
/// `predict` is `weights · features + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    /// One weight per feature, in schema order
    pub weights: Vec<f32>,
    /// Additive bias term
    pub intercept: f32,
}

impl Model for LinearModel {
    fn predict(&self, features: &[f32]) -> f32 {
        let dot: f32 = self
            .weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum();
        dot + self.intercept
    }
}

/// Ordinary least squares trainer
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearRegressor;

impl Trainer for LinearRegressor {
    type Fitted = LinearModel;
    type Error = ModelError;

    fn fit(&self, rows: &[FeatureVector], targets: &[f32]) -> Result<LinearModel, ModelError> {
        if rows.is_empty() {
            return Err(ModelError::NoTrainingData);
        }
        if rows.len() != targets.len() {
            return Err(ModelError::LengthMismatch {
                rows: rows.len(),
                targets: targets.len(),
            });
        }

        let d = rows[0].len();
        // augmented dimension: features plus the constant-1 intercept column
        let k = d + 1;

        // accumulate XᵀX and Xᵀy in f64; the sums span thousands of rows
        let mut xtx = vec![vec![0.0f64; k]; k];
        let mut xty = vec![0.0f64; k];

        for (row, &y) in rows.iter().zip(targets) {
            let augmented = |i: usize| -> f64 {
                if i < d {
                    row[i] as f64
                } else {
                    1.0
                }
            };
            for i in 0..k {
                xty[i] += augmented(i) * y as f64;
                for j in 0..k {
                    xtx[i][j] += augmented(i) * augmented(j);
                }
            }
        }

        let solution = solve(xtx, xty)?;
        let weights = solution[..d].iter().map(|&w| w as f32).collect();
        let intercept = solution[d] as f32;

        log::debug!("fitted linear model over {} rows, {} features", rows.len(), d);
        Ok(LinearModel { weights, intercept })
    }
}

/// Gaussian elimination with partial pivoting on an `n x n` system.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, ModelError> {
    let n = b.len();

    for col in 0..n {
        // pivot: largest magnitude in this column at or below the diagonal
        let pivot = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or(ModelError::SingularSystem)?;
        if a[pivot][col].abs() < 1e-12 {
            return Err(ModelError::SingularSystem);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for j in col..n {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    // back substitution
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|j| a[row][j] * x[j]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(values: &[f32]) -> FeatureVector {
        let mut v = FeatureVector::new();
        for &x in values {
            v.push(x).unwrap();
        }
        v
    }

    #[test]
    fn recovers_exact_linear_relation() {
        // y = 2a - 3b + 0.5
        let rows: Vec<FeatureVector> = [
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [2.0, 1.0],
        ]
        .iter()
        .map(|r| fv(r))
        .collect();
        let targets: Vec<f32> = rows.iter().map(|r| 2.0 * r[0] - 3.0 * r[1] + 0.5).collect();

        let model = LinearRegressor.fit(&rows, &targets).unwrap();
        assert!((model.weights[0] - 2.0).abs() < 1e-4);
        assert!((model.weights[1] + 3.0).abs() < 1e-4);
        assert!((model.intercept - 0.5).abs() < 1e-4);

        let prediction = model.predict(&[3.0, -1.0]);
        assert!((prediction - 9.5).abs() < 1e-3);
    }

    #[test]
    fn fits_noisy_data_close_to_truth() {
        // y = 0.3x + 0.1 plus deterministic pseudo-noise
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 0..50 {
            let x = i as f32 * 0.1;
            let noise = ((i * 37 % 11) as f32 - 5.0) * 0.002;
            rows.push(fv(&[x]));
            targets.push(0.3 * x + 0.1 + noise);
        }

        let model = LinearRegressor.fit(&rows, &targets).unwrap();
        assert!((model.weights[0] - 0.3).abs() < 0.01);
        assert!((model.intercept - 0.1).abs() < 0.01);
    }

    #[test]
    fn collinear_features_are_singular() {
        // second column is exactly the first: XᵀX has no inverse
        let rows: Vec<FeatureVector> = (0..10).map(|i| fv(&[i as f32, i as f32])).collect();
        let targets: Vec<f32> = (0..10).map(|i| i as f32).collect();

        let err = LinearRegressor.fit(&rows, &targets).unwrap_err();
        assert!(matches!(err, ModelError::SingularSystem));
    }

    #[test]
    fn empty_training_set_rejected() {
        assert!(matches!(
            LinearRegressor.fit(&[], &[]),
            Err(ModelError::NoTrainingData)
        ));
    }

    #[test]
    fn length_mismatch_rejected() {
        let rows = vec![fv(&[1.0])];
        assert!(matches!(
            LinearRegressor.fit(&rows, &[1.0, 2.0]),
            Err(ModelError::LengthMismatch { rows: 1, targets: 2 })
        ));
    }

    #[test]
    fn model_serializes_round_trip() {
        let model = LinearModel {
            weights: vec![0.25, -0.75],
            intercept: 0.1,
        };
        let json = serde_json::to_string(&model).unwrap();
        let back: LinearModel = serde_json::from_str(&json).unwrap();
        assert_eq!(model, back);
    }
}
