//! Error handling module for DashPack

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::errors::{ConfigError, EngineError};
use crate::domain::model::{Quality, Representation};

/// Failure to encode one representation of one asset
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Encoding {asset} at {quality} ({representation}) failed: {cause}")]
pub struct EncodeError {
    pub asset: String,
    pub quality: Quality,
    pub representation: Representation,
    pub cause: String,
}

/// Main error type for DashPack operations
#[derive(Error, Debug)]
pub enum DashPackError {
    /// Invalid ladder or pipeline configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Source asset missing or not a regular file
    #[error("Input file not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    /// A single representation failed to encode
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// One or more representations of an asset failed to encode; packaging was skipped
    #[error("{} of {total} representation(s) of {asset} failed to encode: {}", .failures.len(), summarize(.failures))]
    EncodeFailures {
        asset: String,
        total: usize,
        failures: Vec<EncodeError>,
    },

    /// Stream set handed to the packager does not cover the ladder
    #[error("Stream set is incomplete, missing qualities: {missing_qualities:?}")]
    IncompletePackage { missing_qualities: Vec<Quality> },

    /// The packaging engine failed
    #[error("Packaging failed: {cause}")]
    Package { cause: String },

    /// A presentation already exists and overwriting is disabled
    #[error("Output directory already exists: {}", .path.display())]
    OutputExists { path: PathBuf },

    /// Another source in the same batch already publishes under this name
    #[error("Asset name '{name}' of {} is already taken by {}", .path.display(), .first.display())]
    DuplicateAssetName {
        name: String,
        path: PathBuf,
        first: PathBuf,
    },

    /// The process working directory could not be put back
    #[error("Failed to restore working directory to {}: {source}", .path.display())]
    WorkingDirectoryRestore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashPackError {
    pub fn package(cause: impl std::fmt::Display) -> Self {
        DashPackError::Package {
            cause: cause.to_string(),
        }
    }

    /// Errors after which no further job may run in this process
    pub fn is_process_fatal(&self) -> bool {
        matches!(self, DashPackError::WorkingDirectoryRestore { .. })
    }

    /// Flat list of human-readable causes, one per failed representation where applicable
    pub fn causes(&self) -> Vec<String> {
        match self {
            DashPackError::EncodeFailures { failures, .. } => {
                failures.iter().map(|f| f.to_string()).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

impl From<EngineError> for DashPackError {
    fn from(err: EngineError) -> Self {
        DashPackError::package(err)
    }
}

fn summarize(failures: &[EncodeError]) -> String {
    failures
        .iter()
        .map(|f| f.quality.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for DashPack operations
pub type DashPackResult<T> = std::result::Result<T, DashPackError>;
