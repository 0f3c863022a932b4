//! Online Serving: Context, Session, and Smoothing
//!
//! ## Overview
//!
//! Serving splits into an immutable part and a mutable part:
//!
//! - [`ServingContext`] holds the loaded transform and model. It is built
//!   once at startup from a persisted artifact, never mutated, and may be
//!   shared read-only by any number of sessions. There are deliberately no
//!   module-level globals: everything a prediction needs travels through
//!   this struct by reference.
//! - [`OnlineSession`] owns the per-session mutable state: the
//!   accumulator, the failure counters, and the optional smoother.
//!
//! ## Error containment
//!
//! A failure inside one prediction cycle (a shape mismatch, a non-finite
//! output) aborts *that cycle only*: it is counted in [`SessionStats`],
//! logged, the accumulator resets, and the message loop continues. Errors
//! never propagate out of `handle_record`.

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::accumulator::OnlineAccumulator;
use crate::artifact::ModelArtifact;
use crate::errors::PipelineResult;
use crate::features::{FeatureSchema, FittedTransform};
use crate::model::Model;
use crate::record::StreamRecord;

/// Upper bound on the smoothing window
pub const MAX_SMOOTHING_WINDOW: usize = 16;

/// Default smoothing window, matching the recorded tuning
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Immutable model/transform pair for one serving deployment.
///
/// Constructed once at startup and passed by reference into sessions.
pub struct ServingContext {
    transform: FittedTransform,
    model: Box<dyn Model>,
}

impl core::fmt::Debug for ServingContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServingContext")
            .field("transform", &self.transform)
            .field("model", &"<dyn Model>")
            .finish()
    }
}

impl ServingContext {
    pub fn new(transform: FittedTransform, model: Box<dyn Model>) -> Self {
        Self { transform, model }
    }

    /// Build a context from a loaded artifact
    pub fn from_artifact<M: Model + 'static>(artifact: ModelArtifact<M>) -> Self {
        Self::new(artifact.transform, Box::new(artifact.model))
    }

    /// Load the artifact at `path` and build a context from it.
    ///
    /// A missing artifact is fatal at startup
    /// ([`PipelineError::ModelNotLoaded`](crate::errors::PipelineError::ModelNotLoaded)).
    pub fn load<M>(path: &Path) -> PipelineResult<Self>
    where
        M: Model + DeserializeOwned + 'static,
    {
        Ok(Self::from_artifact(ModelArtifact::<M>::load(path)?))
    }

    /// Feature schema predictions are made under
    pub fn schema(&self) -> &FeatureSchema {
        &self.transform.schema
    }

    pub fn transform(&self) -> &FittedTransform {
        &self.transform
    }

    /// Scale, impute, and predict one raw row. Pure with respect to the
    /// context.
    pub fn predict_raw(&self, row: &[Option<f32>]) -> PipelineResult<f32> {
        let features = self.transform.apply(row)?;
        Ok(self.model.predict(&features))
    }
}

/// Per-session counters, observable without interrupting the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Records fed into the session
    pub records_seen: u64,
    /// Prediction cycles that completed and emitted a command
    pub cycles_fired: u64,
    /// Prediction cycles aborted by a contained error
    pub cycles_failed: u64,
}

/// Trailing moving average over emitted predictions.
///
/// Fixed-capacity ring storage; the window saturates at
/// [`MAX_SMOOTHING_WINDOW`].
#[derive(Debug, Clone)]
pub struct Smoother {
    buf: [f32; MAX_SMOOTHING_WINDOW],
    window: usize,
    write: usize,
    len: usize,
}

impl Smoother {
    pub fn new(window: usize) -> Self {
        Self {
            buf: [0.0; MAX_SMOOTHING_WINDOW],
            window: window.clamp(1, MAX_SMOOTHING_WINDOW),
            write: 0,
            len: 0,
        }
    }

    /// Push a prediction and return the mean of the current window
    pub fn push(&mut self, value: f32) -> f32 {
        self.buf[self.write] = value;
        self.write = (self.write + 1) % self.window;
        self.len = (self.len + 1).min(self.window);

        let sum: f32 = self.buf[..self.len].iter().sum();
        sum / self.len as f32
    }
}

/// One online prediction session.
///
/// Single-threaded and callback-driven: each incoming record is handled to
/// completion before the next, so the accumulator is never mutated
/// concurrently.
pub struct OnlineSession<'ctx> {
    ctx: &'ctx ServingContext,
    accumulator: OnlineAccumulator,
    smoother: Option<Smoother>,
    stats: SessionStats,
}

impl<'ctx> OnlineSession<'ctx> {
    pub fn new(ctx: &'ctx ServingContext) -> Self {
        Self {
            ctx,
            accumulator: OnlineAccumulator::new(ctx.schema().clone()),
            smoother: None,
            stats: SessionStats::default(),
        }
    }

    /// Enable trailing moving-average smoothing of emitted predictions
    pub fn with_smoothing(mut self, window: usize) -> Self {
        self.smoother = Some(Smoother::new(window));
        self
    }

    /// Feed one decoded record; returns the prediction to emit, if this
    /// record completed a cycle.
    ///
    /// Exactly one prediction is produced per complete required-field set.
    /// Cycle errors are contained: counted, logged, accumulator reset.
    pub fn handle_record(&mut self, record: &StreamRecord) -> Option<f32> {
        self.stats.records_seen += 1;
        self.accumulator.apply_record(record);

        let snapshot = self.accumulator.take_complete()?;
        match self.ctx.predict_raw(&snapshot) {
            Ok(prediction) => {
                self.stats.cycles_fired += 1;
                let emitted = match &mut self.smoother {
                    Some(s) => s.push(prediction),
                    None => prediction,
                };
                log::debug!("cycle fired: predicted steering {emitted}");
                Some(emitted)
            }
            Err(e) => {
                // take_complete already cleared the slots; the next cycle
                // starts from Empty
                self.stats.cycles_failed += 1;
                log::warn!("prediction cycle aborted: {e}");
                None
            }
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }
}
