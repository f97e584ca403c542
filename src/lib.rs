//! DashPack library
//!
//! Encodes a source video into every rung of a representation ladder and
//! packages the resulting streams into one MPEG-DASH presentation per video:
//! `<asset>.mpd` plus `<id>/init.mp4` and `<id>/chunk_NNNNN.m4s` for each
//! representation.
//!
//! The external encoding and packaging engines sit behind the traits in
//! [`ports`]; [`adapters`] provides ffmpeg/ffprobe implementations and
//! in-process mocks.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{BatchInteractor, BatchReport, DefaultAppContainer, PipelineInteractor};
pub use config::AppConfig;
pub use domain::model::{
    EncodedStream, JobState, PackagedPresentation, Quality, Representation, RepresentationId,
    RepresentationLadder, SourceAsset,
};
pub use error::{DashPackError, DashPackResult, EncodeError};
