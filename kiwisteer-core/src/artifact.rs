//! Persisted Training Artifact
//!
//! A training run produces three things that are only valid together: the
//! feature schema (names and order), the fitted scale/impute transform,
//! and the regression model parameters. They are persisted as *one* JSON
//! document so an online session can never pair a model with a transform
//! from a different run.
//!
//! The artifact records two version numbers: the artifact layout version
//! and the feature-schema layout version (inside the transform's schema).
//! Both are checked at load time, and the schema itself is what lets
//! [`FittedTransform::apply`](crate::features::FittedTransform::apply)
//! validate shape before the first prediction.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{PipelineError, PipelineResult};
use crate::features::{FeatureSchema, FittedTransform, SCHEMA_VERSION};

/// Current artifact layout version
pub const ARTIFACT_VERSION: u32 = 1;

/// The single persisted unit: schema + transform + model parameters.
///
/// Generic over the model parameter type so the core crate stays ignorant
/// of which regression algorithm was used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact<M> {
    /// Artifact layout version
    pub version: u32,
    /// Fitted transform, carrying its feature schema
    pub transform: FittedTransform,
    /// Fitted model parameters
    pub model: M,
}

impl<M> ModelArtifact<M> {
    pub fn new(transform: FittedTransform, model: M) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            transform,
            model,
        }
    }

    /// The feature schema this artifact was fitted under
    pub fn schema(&self) -> &FeatureSchema {
        &self.transform.schema
    }

    /// Write the artifact as pretty JSON.
    ///
    /// Callers persist only after a fully successful run; a failed run
    /// must never reach this point with a partial artifact.
    pub fn save(&self, path: &Path) -> PipelineResult<()>
    where
        M: Serialize,
    {
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)?;
        log::info!("artifact written to {}", path.display());
        Ok(())
    }

    /// Load and version-check an artifact.
    ///
    /// A missing file is [`PipelineError::ModelNotLoaded`]: serving must
    /// not start without an artifact, and "train first" is a more useful
    /// diagnosis than a bare file-not-found.
    pub fn load(path: &Path) -> PipelineResult<Self>
    where
        M: DeserializeOwned,
    {
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::ModelNotLoaded
            } else {
                PipelineError::Io(e)
            }
        })?;
        let artifact: Self = serde_json::from_slice(&bytes)?;
        if artifact.version != ARTIFACT_VERSION {
            return Err(PipelineError::InvalidConfig("unsupported artifact version"));
        }
        if artifact.transform.schema.version != SCHEMA_VERSION {
            return Err(PipelineError::InvalidConfig("unsupported feature schema version"));
        }
        Ok(artifact)
    }
}
