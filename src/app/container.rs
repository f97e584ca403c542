use std::sync::Arc;

use crate::adapters::{FfmpegEncodingEngine, FfmpegPackagingEngine, FfprobeAdapter};
use crate::app::{batch_interactor::BatchInteractor, pipeline_interactor::PipelineInteractor};
use crate::config::AppConfig;
use crate::domain::errors::ConfigError;
use crate::domain::model::RepresentationLadder;
use crate::domain::rules::LadderRules;
use crate::engine::{Encoder, EncoderSettings, Packager, PackagerSettings};
use crate::ports::{EncodingEngine, PackagingEngine, ProbePort};
use crate::utils::path::absolutize;

/// Engines the pipeline is wired against
pub struct Engines {
    pub encoding: Arc<dyn EncodingEngine>,
    pub packaging: Arc<dyn PackagingEngine>,
    pub probe: Option<Arc<dyn ProbePort>>,
}

pub trait AppContainer: Send + Sync {
    fn ladder(&self) -> Arc<RepresentationLadder>;
    fn pipeline_interactor(&self) -> Arc<PipelineInteractor>;
    fn batch_interactor(&self) -> Arc<BatchInteractor>;
}

pub struct DefaultAppContainer {
    ladder: Arc<RepresentationLadder>,
    pipeline_interactor: Arc<PipelineInteractor>,
    batch_interactor: Arc<BatchInteractor>,
}

impl DefaultAppContainer {
    /// Wire the ffmpeg and ffprobe adapters named in `config`
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        let ladder = config.build_ladder()?;
        // ffmpeg's DASH muxer numbers representations by input position
        if !LadderRules::has_positional_ids(&ladder) {
            return Err(ConfigError::new(
                "The ffmpeg packager requires representation IDs 0..n-1 in ascending quality order",
            ));
        }

        let probe = config.encoding.verify_output.then(|| {
            Arc::new(FfprobeAdapter::new(config.encoding.ffprobe.clone())) as Arc<dyn ProbePort>
        });
        let engines = Engines {
            encoding: Arc::new(FfmpegEncodingEngine::new(config.encoding.ffmpeg.clone())),
            packaging: Arc::new(FfmpegPackagingEngine::new(config.encoding.ffmpeg.clone())),
            probe,
        };

        Self::with_engines(config, ladder, engines)
    }

    /// Wire arbitrary engines, typically the in-process mocks
    pub fn with_engines(
        config: &AppConfig,
        ladder: RepresentationLadder,
        engines: Engines,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let ladder = Arc::new(ladder);
        // Resolved before any job exists; a packaging engine may switch the working directory later
        let output_root = absolutize(&config.paths.output_dir).map_err(|e| {
            ConfigError::new(format!(
                "Cannot resolve output directory {}: {}",
                config.paths.output_dir.display(),
                e
            ))
        })?;

        let encoder = Arc::new(Encoder::new(
            engines.encoding,
            engines.probe,
            EncoderSettings::from_config(config),
        ));
        let packager = Arc::new(Packager::new(
            engines.packaging,
            PackagerSettings::from_config(config),
        ));

        let pipeline_interactor = Arc::new(PipelineInteractor::new(
            Arc::clone(&ladder),
            encoder,
            packager,
            output_root,
            config.batch.parallel_encodes,
        ));
        let batch_interactor = Arc::new(BatchInteractor::new(
            Arc::clone(&pipeline_interactor),
            config.batch.jobs,
        ));

        Ok(Self {
            ladder,
            pipeline_interactor,
            batch_interactor,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn ladder(&self) -> Arc<RepresentationLadder> {
        Arc::clone(&self.ladder)
    }

    fn pipeline_interactor(&self) -> Arc<PipelineInteractor> {
        Arc::clone(&self.pipeline_interactor)
    }

    fn batch_interactor(&self) -> Arc<BatchInteractor> {
        Arc::clone(&self.batch_interactor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LadderEntryConfig;
    use crate::domain::model::Quality;

    #[test]
    fn test_default_config_wires_reference_ladder() {
        let container = DefaultAppContainer::new(&AppConfig::default()).unwrap();
        assert_eq!(*container.ladder(), RepresentationLadder::reference());
        assert_eq!(container.pipeline_interactor().ladder().len(), 3);
    }

    #[test]
    fn test_non_positional_ids_are_rejected_for_ffmpeg() {
        let mut config = AppConfig::default();
        config.ladder = Some(vec![
            LadderEntryConfig {
                quality: Quality::Low,
                width: 640,
                height: 360,
                frame_rate: 15.0,
                id: "low".to_string(),
            },
            LadderEntryConfig {
                quality: Quality::Medium,
                width: 1280,
                height: 720,
                frame_rate: 30.0,
                id: "mid".to_string(),
            },
        ]);
        assert!(config.build_ladder().is_ok());
        assert!(DefaultAppContainer::new(&config).is_err());
    }

    #[test]
    fn test_relative_output_root_is_resolved_at_wiring() {
        let mut config = AppConfig::default();
        config.paths.output_dir = "renditions".into();
        let container = DefaultAppContainer::new(&config).unwrap();
        let root = container.pipeline_interactor().output_root().to_path_buf();
        assert!(root.is_absolute());
        assert!(root.ends_with("renditions"));
    }

    #[test]
    fn test_invalid_segment_duration_is_rejected() {
        let mut config = AppConfig::default();
        config.packaging.segment_duration = 0.0;
        assert!(DefaultAppContainer::new(&config).is_err());
    }
}
