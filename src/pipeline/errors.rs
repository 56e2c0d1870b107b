//! Pipeline error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;
use crate::errors::ErrorCategory;
use crate::interpret::InterpretError;
use crate::store::StoreError;

/// Result type for artifact writing
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Result type for a full pipeline run
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failures while writing run artifacts
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write metrics CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to serialize {artifact}: {source}")]
    Serialize {
        artifact: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ArtifactError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ArtifactError::CreateDir { .. } | ArtifactError::Write { .. } | ArtifactError::Csv { .. } => {
                ErrorCategory::Configuration
            }
            ArtifactError::Serialize { .. } => ErrorCategory::MalformedOutput,
        }
    }
}

/// Anything that aborts a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Profiling failed: {0}")]
    Profile(#[from] StoreError),

    #[error(transparent)]
    Interpret(#[from] InterpretError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl PipelineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::Engine(e) => e.category(),
            PipelineError::Profile(e) => e.category(),
            PipelineError::Interpret(e) => e.category(),
            PipelineError::Artifact(e) => e.category(),
        }
    }
}
