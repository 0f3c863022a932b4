//! Feature Scaling and Imputation Pipeline
//!
//! ## Overview
//!
//! The feature pipeline turns raw aligned sensor rows into the fixed-order
//! feature vectors the regression model consumes. It is fit exactly once,
//! offline, and then applied identically in two places:
//!
//! ```text
//! offline:  joined rows ──► fit ──► FittedTransform ──► apply ──► matrix
//! online:   accumulator snapshot ─────────────────────► apply ──► vector
//! ```
//!
//! ## Canonical order: scale, then impute
//!
//! `fit` computes both stages over the same training matrix, in a fixed
//! order: scaling statistics (per-column mean and standard deviation) come
//! from the *raw* values, imputation fill values are then the per-column
//! means of the *scaled* values. `apply` replays the same order per vector:
//! scale what is present, then fill what is absent. The source material is
//! inconsistent about this order across variants; this module fixes one
//! canonical contract and the online path replicates it bit for bit.
//!
//! ## Schema validation
//!
//! A [`FittedTransform`] carries the [`FeatureSchema`] it was fit under.
//! `apply` validates arity against that schema and fails loudly with
//! [`PipelineError::ShapeMismatch`] instead of silently mis-scaling a
//! reordered or truncated vector.

use serde::{Deserialize, Serialize};

use crate::errors::{PipelineError, PipelineResult};
use crate::record::StreamId;

/// Current feature schema layout version, persisted with every artifact
pub const SCHEMA_VERSION: u32 = 1;

/// Maximum number of modeled features
pub const MAX_FEATURES: usize = 8;

/// Fixed-order feature vector produced by [`FittedTransform::apply`]
pub type FeatureVector = heapless::Vec<f32, MAX_FEATURES>;

/// A raw row of optional values in schema order, nulls meaning "no record
/// of that stream within tolerance"
pub type RawRow = Vec<Option<f32>>;

/// Ordered feature names plus a layout version.
///
/// The order used at fit time is the contract: a transform applied to a
/// vector whose fields are reordered or of different arity fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Layout version, bumped when the qualified-name scheme changes
    pub version: u32,
    /// Qualified field names in vector order
    pub fields: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema from an ordered field list
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version: SCHEMA_VERSION,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Concatenate the qualified fields of `streams` in the given order
    pub fn for_streams(streams: &[StreamId]) -> Self {
        Self::new(
            streams
                .iter()
                .flat_map(|s| s.fields().iter().copied())
                .collect::<Vec<_>>(),
        )
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Index of a qualified field name in vector order
    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    /// Schema with the named field removed, preserving order of the rest.
    ///
    /// Used to derive the feature schema from a joined-row schema by
    /// dropping the target column.
    pub fn without(&self, field: &str) -> Self {
        Self {
            version: self.version,
            fields: self
                .fields
                .iter()
                .filter(|f| f.as_str() != field)
                .cloned()
                .collect(),
        }
    }

    /// Check that `other` matches this schema exactly (version, arity,
    /// field order).
    pub fn validate(&self, other: &FeatureSchema) -> PipelineResult<()> {
        if self != other {
            return Err(PipelineError::ShapeMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        Ok(())
    }
}

/// Immutable result of fitting the scaler and imputer over one training
/// matrix.
///
/// `apply` never mutates this struct; it is safe to share read-only across
/// concurrent serving sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    /// Schema the statistics were computed under
    pub schema: FeatureSchema,
    /// Per-column mean of raw non-null values
    mean: Vec<f32>,
    /// Per-column population standard deviation of raw non-null values
    std: Vec<f32>,
    /// Per-column fill value, the mean of the scaled non-null values
    fill: Vec<f32>,
}

impl FittedTransform {
    /// Scale then impute one raw row into a feature vector.
    ///
    /// `(x - mean) / std` with a zero std treated as a divisor of 1, then
    /// nulls replaced by the stored fill value.
    pub fn apply(&self, row: &[Option<f32>]) -> PipelineResult<FeatureVector> {
        if row.len() != self.schema.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: self.schema.len(),
                actual: row.len(),
            });
        }
        let mut out = FeatureVector::new();
        for (i, slot) in row.iter().enumerate() {
            let value = match slot {
                Some(x) => scale(*x, self.mean[i], self.std[i]),
                None => self.fill[i],
            };
            out.push(value)
                .map_err(|_| PipelineError::ShapeMismatch {
                    expected: MAX_FEATURES,
                    actual: row.len(),
                })?;
        }
        Ok(out)
    }
}

#[inline]
fn scale(x: f32, mean: f32, std: f32) -> f32 {
    let divisor = if std == 0.0 { 1.0 } else { std };
    (x - mean) / divisor
}

/// Fits scaling and imputation statistics over a training matrix
pub struct FeaturePipeline;

impl FeaturePipeline {
    /// Compute scaling parameters on the raw matrix, then imputation fill
    /// values on the scaled matrix, in that order.
    ///
    /// Rows must all match the schema arity. An entirely null column gets
    /// mean 0, std 0 (scaled as divisor 1) and fill 0, with a warning; the
    /// source data never produces one outside of degenerate recordings.
    pub fn fit(schema: FeatureSchema, rows: &[RawRow]) -> PipelineResult<FittedTransform> {
        let width = schema.len();
        if width > MAX_FEATURES {
            return Err(PipelineError::ShapeMismatch {
                expected: MAX_FEATURES,
                actual: width,
            });
        }
        for row in rows {
            if row.len() != width {
                return Err(PipelineError::ShapeMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
        }

        // Pass 1: per-column mean/std over raw non-null values
        let mut mean = vec![0.0f32; width];
        let mut std = vec![0.0f32; width];
        for col in 0..width {
            let mut n = 0usize;
            let mut sum = 0.0f64;
            for row in rows {
                if let Some(x) = row[col] {
                    n += 1;
                    sum += x as f64;
                }
            }
            if n == 0 {
                log::warn!(
                    "feature '{}' has no observed values; scaling and fill default to 0",
                    schema.fields[col]
                );
                continue;
            }
            let m = sum / n as f64;
            let mut sq_dev = 0.0f64;
            for row in rows {
                if let Some(x) = row[col] {
                    let d = x as f64 - m;
                    sq_dev += d * d;
                }
            }
            mean[col] = m as f32;
            std[col] = (sq_dev / n as f64).sqrt() as f32;
        }

        // Pass 2: fill values over the *scaled* non-null values
        let mut fill = vec![0.0f32; width];
        for col in 0..width {
            let mut n = 0usize;
            let mut sum = 0.0f64;
            for row in rows {
                if let Some(x) = row[col] {
                    n += 1;
                    sum += scale(x, mean[col], std[col]) as f64;
                }
            }
            if n > 0 {
                fill[col] = (sum / n as f64) as f32;
            }
        }

        Ok(FittedTransform {
            schema,
            mean,
            std,
            fill,
        })
    }
}
