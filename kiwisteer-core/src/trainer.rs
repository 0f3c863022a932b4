//! Offline Training Pipeline
//!
//! ## Overview
//!
//! The trainer turns recorded log files into a persisted model artifact:
//!
//! ```text
//! logs ──► inner join ──► shuffle/split ──► fit transform ──► fit model
//!                                                                 │
//!                   artifact (transform + model) ◄── evaluate ◄───┘
//! ```
//!
//! Multiple recording sessions stack: each recording is joined on its own
//! (timestamps from different sessions never mix), and the joined rows
//! concatenate before the split. The transform is fitted on training rows
//! only; the held-out rows pass through the *fitted* transform, so the
//! reported error reflects what serving will actually do.
//!
//! Every error here is fatal. The artifact is written only after the fit
//! and evaluation both succeed, never before.

use std::path::{Path, PathBuf};

use crate::align::{AlignedRow, TimeAligner};
use crate::artifact::ModelArtifact;
use crate::config::TrainConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::features::{FeaturePipeline, FeatureVector, RawRow};
use crate::logfile::read_stream_log;
use crate::model::{Model, Trainer};
use crate::record::{StreamId, StreamLog};
use crate::serving::ServingContext;
use crate::time::Timestamp;

/// Log file paths of one recording session
#[derive(Debug, Clone)]
pub struct RecordingPaths {
    pub angular_velocity: PathBuf,
    pub ir_left: PathBuf,
    pub ir_right: PathBuf,
    pub ground_steering: PathBuf,
}

impl RecordingPaths {
    fn entries(&self) -> [(&Path, StreamId); 4] {
        [
            (&self.angular_velocity, StreamId::AngularVelocity),
            (&self.ir_left, StreamId::IrLeft),
            (&self.ir_right, StreamId::IrRight),
            (&self.ground_steering, StreamId::GroundSteering),
        ]
    }
}

/// Summary of one training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Joined rows across all recordings
    pub rows_joined: usize,
    /// Rows the model was fitted on
    pub rows_train: usize,
    /// Held-out rows the error was measured on
    pub rows_test: usize,
    /// Mean squared error on the held-out rows
    pub mse: f32,
}

/// xorshift32, seeded from the config. Small and deterministic; the
/// shuffle needs reproducibility across runs, not statistical quality.
struct SplitRng(u32);

impl SplitRng {
    fn new(seed: u32) -> Self {
        Self(seed.max(1))
    }

    fn next(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// Uniform-enough index in `0..bound` for shuffling
    fn below(&mut self, bound: usize) -> usize {
        (self.next() as usize) % bound
    }
}

/// Drives the offline pipeline end to end.
pub struct OfflineTrainer {
    config: TrainConfig,
}

impl OfflineTrainer {
    pub fn new(config: TrainConfig) -> PipelineResult<Self> {
        Ok(Self {
            config: config.validate()?,
        })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Read, join, and stack all recordings into one row set.
    fn joined_rows(&self, recordings: &[RecordingPaths]) -> PipelineResult<Vec<AlignedRow>> {
        let aligner = TimeAligner::new(self.config.align.clone())?;
        let mut rows = Vec::new();
        for recording in recordings {
            let mut logs = Vec::with_capacity(4);
            for (path, stream) in recording.entries() {
                let (log, _) = read_stream_log(path, stream)?;
                logs.push(log);
            }
            rows.extend(aligner.inner_join(&logs)?);
        }
        Ok(rows)
    }

    /// Fisher-Yates over row indices, then split off the held-out tail.
    fn split(&self, n: usize) -> (Vec<usize>, Vec<usize>) {
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = SplitRng::new(self.config.seed);
        for i in (1..n).rev() {
            indices.swap(i, rng.below(i + 1));
        }

        let test_len = ((n as f32 * self.config.split_ratio) as usize).clamp(1, n - 1);
        let train = indices[..n - test_len].to_vec();
        let test = indices[n - test_len..].to_vec();
        (train, test)
    }

    /// Train a model over the given recordings.
    ///
    /// Fails with [`PipelineError::InsufficientData`] when the join yields
    /// fewer than `min_rows` rows, and with [`PipelineError::Fit`] when the
    /// regression itself cannot be solved.
    pub fn train<T: Trainer>(
        &self,
        recordings: &[RecordingPaths],
        trainer: &T,
    ) -> PipelineResult<(ModelArtifact<T::Fitted>, TrainReport)> {
        let aligner = TimeAligner::new(self.config.align.clone())?;
        let row_schema = aligner.row_schema().clone();
        let rows = self.joined_rows(recordings)?;

        if rows.len() < self.config.min_rows {
            return Err(PipelineError::InsufficientData {
                required: self.config.min_rows,
                available: rows.len(),
            });
        }

        // the target column leaves the feature schema; everything else is
        // a model input
        let target_field = StreamId::GroundSteering.fields()[0];
        let target_col = row_schema
            .position(target_field)
            .ok_or(PipelineError::Schema {
                stream: StreamId::GroundSteering,
                field: target_field,
            })?;
        let feature_schema = row_schema.without(target_field);

        let feature_row = |row: &AlignedRow| -> RawRow {
            row.values
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != target_col)
                .map(|(_, v)| *v)
                .collect()
        };
        // inner join: the target is present in every row
        let target = |row: &AlignedRow| -> f32 { row.values[target_col].unwrap_or(0.0) };

        let (train_idx, test_idx) = self.split(rows.len());
        log::info!(
            "training on {} rows, evaluating on {}",
            train_idx.len(),
            test_idx.len()
        );

        let train_raw: Vec<RawRow> = train_idx.iter().map(|&i| feature_row(&rows[i])).collect();
        let transform = FeaturePipeline::fit(feature_schema, &train_raw)?;

        let apply_all = |idx: &[usize]| -> PipelineResult<(Vec<FeatureVector>, Vec<f32>)> {
            let mut features = Vec::with_capacity(idx.len());
            let mut targets = Vec::with_capacity(idx.len());
            for &i in idx {
                features.push(transform.apply(&feature_row(&rows[i]))?);
                targets.push(target(&rows[i]));
            }
            Ok((features, targets))
        };

        let (train_x, train_y) = apply_all(&train_idx)?;
        let (test_x, test_y) = apply_all(&test_idx)?;

        let fitted = trainer
            .fit(&train_x, &train_y)
            .map_err(|e| PipelineError::Fit(e.to_string()))?;

        let mse = {
            let model: &T::Fitted = &fitted;
            let sum: f32 = test_x
                .iter()
                .zip(&test_y)
                .map(|(x, &y)| {
                    let d = model.predict(x) - y;
                    d * d
                })
                .sum();
            sum / test_x.len() as f32
        };
        log::info!("held-out mse: {mse}");

        let report = TrainReport {
            rows_joined: rows.len(),
            rows_train: train_idx.len(),
            rows_test: test_idx.len(),
            mse,
        };
        Ok((ModelArtifact::new(transform, fitted), report))
    }

    /// Train and persist in one step. Nothing is written unless training
    /// succeeded.
    pub fn train_and_persist<T: Trainer>(
        &self,
        recordings: &[RecordingPaths],
        trainer: &T,
        artifact_path: &Path,
    ) -> PipelineResult<TrainReport> {
        let (artifact, report) = self.train(recordings, trainer)?;
        artifact.save(artifact_path)?;
        Ok(report)
    }
}

/// Replay recorded feature logs through a serving context.
///
/// This is the batch analogue of the online session: an outer join keeps
/// every anchor record, imputation fills the gaps, and one prediction is
/// produced per joined row. Returns `(timestamp, prediction)` pairs
/// ascending by timestamp.
pub fn predict_log(
    logs: &[StreamLog],
    align: &crate::config::AlignConfig,
    ctx: &ServingContext,
) -> PipelineResult<Vec<(Timestamp, f32)>> {
    let aligner = TimeAligner::new(align.clone())?;
    ctx.schema().validate(aligner.row_schema())?;

    let rows = aligner.outer_join(logs)?;
    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        out.push((row.timestamp, ctx.predict_raw(&row.values)?));
    }
    Ok(out)
}
