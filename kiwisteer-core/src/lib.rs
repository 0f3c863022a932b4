//! Core steering prediction pipeline for KiwiSteer
//!
//! Aligns independently sampled sensor streams by time, turns them into
//! scaled and imputed feature vectors, and drives both execution modes
//! over the same transform: offline training from recorded logs and
//! online per-message serving.
//!
//! Key properties:
//! - Deterministic: fixed seeds, stable tie-breaking, order-independent joins
//! - No globals: everything serving needs travels through a [`ServingContext`]
//! - One artifact: schema, transform, and model persist and load as a unit
//!
//! ```no_run
//! use kiwisteer_core::{OfflineTrainer, TrainConfig, RecordingPaths};
//! # use kiwisteer_core::PipelineResult;
//! # fn run(recordings: &[RecordingPaths], trainer: &impl kiwisteer_core::Trainer) -> PipelineResult<()> {
//! let offline = OfflineTrainer::new(TrainConfig::default())?;
//! let report = offline.train_and_persist(recordings, trainer, "model.json".as_ref())?;
//! println!("held-out mse: {}", report.mse);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod accumulator;
pub mod align;
pub mod artifact;
pub mod config;
pub mod errors;
pub mod features;
pub mod logfile;
pub mod model;
pub mod record;
pub mod serving;
pub mod time;
pub mod trainer;

// Public API
pub use accumulator::{FillState, OnlineAccumulator};
pub use align::{AlignedRow, TimeAligner};
pub use artifact::ModelArtifact;
pub use config::{AlignConfig, TrainConfig};
pub use errors::{PipelineError, PipelineResult};
pub use features::{FeaturePipeline, FeatureSchema, FeatureVector, FittedTransform, RawRow};
pub use model::{Model, Trainer};
pub use record::{StreamId, StreamLog, StreamRecord};
pub use serving::{OnlineSession, ServingContext, SessionStats, Smoother};
pub use time::{FixedTime, Granularity, SystemTime, TimeSource, Timestamp};
pub use trainer::{predict_log, OfflineTrainer, RecordingPaths, TrainReport};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
