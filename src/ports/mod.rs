// Ports - Contracts of the external engines the pipeline drives

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::errors::EngineError;
use crate::domain::model::RepresentationId;

/// One transcode of a source file into a single video-only output
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Video filter chain, applied in order
    pub filters: Vec<String>,
    /// Codec and muxer options as (flag, value) pairs
    pub codec_options: Vec<(String, String)>,
    /// Drop every audio track
    pub drop_audio: bool,
    /// Output container format
    pub format: String,
}

/// Port for the black-box encoding engine
#[async_trait]
pub trait EncodingEngine: Send + Sync {
    /// Transcode `request.input` into `request.output`
    async fn transcode(&self, request: &TranscodeRequest) -> Result<(), EngineError>;
}

/// One segmentation of a full stream set into a manifest plus segments
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRequest {
    /// Encoded streams in ladder order, absolute paths
    pub inputs: Vec<PathBuf>,
    /// Representation ID of each input, same order
    pub representation_ids: Vec<RepresentationId>,
    /// Manifest file name, relative to `cwd`
    pub manifest: String,
    /// Target segment duration in seconds
    pub segment_duration: f64,
    /// Init segment template, relative to `cwd`
    pub init_template: String,
    /// Media segment template, relative to `cwd`
    pub media_template: String,
    /// Number of the first media segment
    pub start_number: u32,
    /// Directory the relative paths above resolve against
    pub cwd: PathBuf,
}

/// Port for the black-box packaging engine
#[async_trait]
pub trait PackagingEngine: Send + Sync {
    /// Write the manifest and every segment described by `request`
    async fn segment(&self, request: &SegmentRequest) -> Result<(), EngineError>;

    /// Whether the engine resolves relative paths against the process working
    /// directory instead of `request.cwd`
    fn requires_process_cwd(&self) -> bool {
        false
    }
}

/// Measured properties of an encoded stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamProbe {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub has_audio: bool,
    pub duration: Option<f64>,
}

/// Port for media probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe the first video stream of `path` and report audio presence
    async fn probe_stream(&self, path: &std::path::Path) -> Result<StreamProbe, EngineError>;
}
