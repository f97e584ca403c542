//! Core encoding and packaging engine module

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

pub mod encoder;
pub mod packager;
pub mod workdir;

pub use encoder::Encoder;
pub use packager::Packager;

/// Encoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Video codec
    pub codec: String,
    /// Encoding preset
    pub preset: Option<String>,
    /// Constant rate factor
    pub crf: Option<u8>,
    /// Forced keyframe spacing in seconds, aligned with the segment target
    pub keyframe_interval: f64,
    /// Probe each output against its representation
    pub verify_output: bool,
}

impl EncoderSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            codec: config.encoding.codec.clone(),
            preset: config.encoding.preset.clone(),
            crf: config.encoding.crf,
            keyframe_interval: config.packaging.segment_duration,
            verify_output: config.encoding.verify_output,
        }
    }
}

/// Packager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagerSettings {
    /// Target segment duration in seconds
    pub segment_duration: f64,
    /// Replace an existing presentation
    pub overwrite: bool,
}

impl PackagerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            segment_duration: config.packaging.segment_duration,
            overwrite: config.packaging.overwrite,
        }
    }
}
