//! Error Types for the Steering Prediction Pipeline
//!
//! ## Design Philosophy
//!
//! One taxonomy covers both execution modes, but the two modes propagate
//! errors very differently:
//!
//! 1. **Offline (training)**: every error is fatal. The run aborts before
//!    any artifact is written, so a half-trained model can never be loaded
//!    by a later session.
//!
//! 2. **Online (serving)**: errors are contained to the prediction cycle
//!    that raised them. The cycle is skipped, the accumulator resets, the
//!    failure is counted in [`SessionStats`](crate::serving::SessionStats),
//!    and the message loop keeps running.
//!
//! ## Error Categories
//!
//! ### Data shape violations
//! - `Schema`: a stream or record lacks a field its schema requires
//! - `ShapeMismatch`: a feature vector does not match the fitted schema
//!
//! ### Not enough data
//! - `EmptyStream`: a required stream has zero records during an inner join
//! - `InsufficientData`: too few joined rows to make a train/test split
//!
//! ### Serving lifecycle
//! - `ModelNotLoaded`: predict attempted before an artifact was loaded
//!
//! ### Configuration and I/O
//! - `InvalidConfig`, `TimestampOverflow`, `Io`, `Parse`, `Artifact`, `Fit`

use crate::record::StreamId;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised by the alignment, feature, and training pipeline
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// A stream or record lacks a field its schema requires
    #[error("stream {stream:?} lacks required field '{field}'")]
    Schema {
        /// The offending stream
        stream: StreamId,
        /// The field that was expected but not present
        field: &'static str,
    },

    /// A required stream has no records while inner-joining
    #[error("stream {stream:?} has zero records; inner join requires at least one")]
    EmptyStream {
        /// The empty required stream
        stream: StreamId,
    },

    /// Too few joined rows to train on
    #[error("insufficient data: need {required} joined rows, have {available}")]
    InsufficientData {
        /// Minimum row count for a meaningful train/test split
        required: usize,
        /// Rows actually produced by the join
        available: usize,
    },

    /// Feature vector arity or order differs from the fitted schema
    #[error("shape mismatch: transform fitted for {expected} features, input has {actual}")]
    ShapeMismatch {
        /// Feature count recorded at fit time
        expected: usize,
        /// Feature count of the offending input
        actual: usize,
    },

    /// Predict attempted before a model/transform pair was loaded
    #[error("no model loaded; load an artifact before serving")]
    ModelNotLoaded,

    /// Configuration rejected at construction time
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A (seconds, microseconds) pair does not fit the timestamp type
    #[error("timestamp overflows microsecond representation")]
    TimestampOverflow,

    /// Underlying file I/O failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A log line could not be parsed
    #[error("parse error at line {line}: {reason}")]
    Parse {
        /// 1-based line number within the log file
        line: usize,
        /// What went wrong
        reason: &'static str,
    },

    /// Artifact (de)serialization failure
    #[error("artifact error: {0}")]
    Artifact(#[from] serde_json::Error),

    /// The regression fit itself failed
    #[error("model fitting failed: {0}")]
    Fit(String),
}
