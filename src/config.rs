//! Typed application configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::errors::ConfigError;
use crate::domain::model::*;

/// Complete application configuration; every section has defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub encoding: EncodingConfig,
    pub packaging: PackagingConfig,
    pub batch: BatchConfig,
    /// `[[ladder]]` tables; absent means the reference ladder
    pub ladder: Option<Vec<LadderEntryConfig>>,
}

/// Where sources are discovered and presentations are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("test_sequences"),
            output_dir: PathBuf::from("av1_dash"),
        }
    }
}

/// Encoding engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub codec: String,
    pub preset: Option<String>,
    pub crf: Option<u8>,
    /// Probe every encoded stream and reject mismatches
    pub verify_output: bool,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            codec: "libsvtav1".to_string(),
            preset: None,
            crf: None,
            verify_output: true,
        }
    }
}

/// Packaging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackagingConfig {
    /// Target segment duration in seconds
    pub segment_duration: f64,
    /// Replace an existing presentation of the same asset
    pub overwrite: bool,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            segment_duration: 5.0,
            overwrite: true,
        }
    }
}

/// Batch execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Assets processed at once
    pub jobs: usize,
    /// Encode the representations of one asset concurrently
    pub parallel_encodes: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            parallel_encodes: false,
        }
    }
}

/// One `[[ladder]]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LadderEntryConfig {
    pub quality: Quality,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub id: String,
}

impl AppConfig {
    /// Build the process-wide ladder
    ///
    /// Without a `ladder` key this is the reference ladder; an explicit empty list
    /// is rejected like any other invalid ladder.
    pub fn build_ladder(&self) -> Result<RepresentationLadder, ConfigError> {
        let Some(ladder) = &self.ladder else {
            return Ok(RepresentationLadder::reference());
        };

        let entries = ladder
            .iter()
            .map(|entry| {
                let id = RepresentationId::new(entry.id.clone())?;
                let representation = Representation {
                    width: entry.width,
                    height: entry.height,
                    frame_rate: entry.frame_rate,
                };
                Ok((entry.quality, representation, id))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        RepresentationLadder::new(entries)
    }

    /// Validate the non-ladder settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        let duration = self.packaging.segment_duration;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ConfigError::new(format!(
                "Segment duration must be positive, got {}",
                duration
            )));
        }
        if self.batch.jobs == 0 {
            return Err(ConfigError::new("Batch jobs must be at least 1"));
        }
        if self.encoding.codec.trim().is_empty() {
            return Err(ConfigError::new("Video codec cannot be empty"));
        }
        if let Some(crf) = self.encoding.crf {
            if crf > 63 {
                return Err(ConfigError::new(format!(
                    "CRF value cannot exceed 63, got {}",
                    crf
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_mirror_reference_tool() {
        let config = AppConfig::default();
        assert_eq!(config.paths.input_dir, PathBuf::from("test_sequences"));
        assert_eq!(config.paths.output_dir, PathBuf::from("av1_dash"));
        assert_eq!(config.encoding.codec, "libsvtav1");
        assert_eq!(config.packaging.segment_duration, 5.0);
        assert_eq!(config.batch.jobs, 1);
        assert!(config.validate().is_ok());
        assert_eq!(config.build_ladder().unwrap(), RepresentationLadder::reference());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.packaging.segment_duration = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.batch.jobs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.encoding.crf = Some(70);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_ladder_from_entries() {
        let mut config = AppConfig::default();
        config.ladder = Some(vec![
            LadderEntryConfig {
                quality: Quality::Medium,
                width: 1280,
                height: 720,
                frame_rate: 30.0,
                id: "1".to_string(),
            },
            LadderEntryConfig {
                quality: Quality::Low,
                width: 640,
                height: 360,
                frame_rate: 15.0,
                id: "0".to_string(),
            },
        ]);
        let ladder = config.build_ladder().unwrap();
        assert_eq!(ladder.len(), 2);
        assert_eq!(ladder.get(Quality::Low).unwrap().id.as_str(), "0");

        if let Some(entries) = config.ladder.as_mut() {
            entries[1].id = "1".to_string();
        }
        assert!(config.build_ladder().is_err());
    }

    #[test]
    fn test_explicit_empty_ladder_is_rejected() {
        let mut config = AppConfig::default();
        config.ladder = Some(Vec::new());
        let err = config.build_ladder().unwrap_err();
        assert!(err.message.contains("empty"), "{}", err.message);
    }
}
