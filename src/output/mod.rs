//! Packaged presentation verification module

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::model::RepresentationId;

pub mod verifier;

pub use verifier::PresentationVerifier;

/// Ways a packaged directory can violate the output layout contract
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Manifest {} is missing", .0.display())]
    MissingManifest(PathBuf),

    #[error("Manifest declares {found} adaptation set(s), expected exactly one")]
    AdaptationSetCount { found: usize },

    #[error("Manifest declares representations {found:?}, expected {expected:?}")]
    RepresentationMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Manifest carries audio signalling")]
    AudioSignalled,

    #[error("Representation directory {} is missing", .0.display())]
    MissingRepresentationDir(PathBuf),

    #[error("Initialization segment {} is missing", .0.display())]
    MissingInitSegment(PathBuf),

    #[error("Representation {id} has no media segments")]
    NoMediaSegments { id: RepresentationId },

    #[error("Representation {id} segments are not numbered 1..={count} without gaps (missing {missing})")]
    SegmentGap {
        id: RepresentationId,
        count: usize,
        missing: u32,
    },

    #[error("Unexpected entry {}", .0.display())]
    UnexpectedEntry(PathBuf),

    #[error("Cannot read {}: {message}", .path.display())]
    Unreadable { path: PathBuf, message: String },
}
