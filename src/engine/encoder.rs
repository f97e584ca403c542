//! Per-representation encoder
//!
//! Produces one audio-free fragmented MP4 per (asset, representation) pair. The
//! engine writes to a hidden partial file that is only renamed to the requested
//! path once the engine succeeded and the stream passed verification.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::model::*;
use crate::engine::EncoderSettings;
use crate::error::EncodeError;
use crate::ports::*;

const FRAME_RATE_TOLERANCE: f64 = 0.01;

/// Fragmented MP4 flags: keyframe-led fragments, empty moov, moof-relative offsets
const FRAGMENT_FLAGS: &str = "frag_keyframe+empty_moov+default_base_moof";

/// Encoder for a single representation of a source asset
pub struct Encoder {
    engine: Arc<dyn EncodingEngine>,
    probe: Option<Arc<dyn ProbePort>>,
    settings: EncoderSettings,
}

impl Encoder {
    /// Create a new encoder; `probe` is used when `settings.verify_output` is set
    pub fn new(
        engine: Arc<dyn EncodingEngine>,
        probe: Option<Arc<dyn ProbePort>>,
        settings: EncoderSettings,
    ) -> Self {
        Self {
            engine,
            probe,
            settings,
        }
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Engine request for one representation
    pub fn build_request(
        &self,
        source: &Path,
        representation: &Representation,
        output: &Path,
    ) -> TranscodeRequest {
        let mut codec_options = vec![
            ("-map".to_string(), "0:v:0".to_string()),
            ("-c:v".to_string(), self.settings.codec.clone()),
        ];
        if let Some(preset) = &self.settings.preset {
            codec_options.push(("-preset".to_string(), preset.clone()));
        }
        if let Some(crf) = self.settings.crf {
            codec_options.push(("-crf".to_string(), crf.to_string()));
        }
        codec_options.push((
            "-force_key_frames".to_string(),
            format!("expr:gte(t,n_forced*{})", self.settings.keyframe_interval),
        ));
        codec_options.push(("-movflags".to_string(), FRAGMENT_FLAGS.to_string()));

        TranscodeRequest {
            input: source.to_path_buf(),
            output: output.to_path_buf(),
            filters: vec![representation.scale_filter(), representation.fps_filter()],
            codec_options,
            drop_audio: true,
            format: "mp4".to_string(),
        }
    }

    /// Encode `asset` at `entry` into `output`
    ///
    /// On error nothing is left at `output`.
    pub async fn encode(
        &self,
        asset: &SourceAsset,
        entry: &LadderEntry,
        output: &Path,
    ) -> Result<EncodedStream, EncodeError> {
        let started = Instant::now();
        let fail = |cause: String| EncodeError {
            asset: asset.name().to_string(),
            quality: entry.quality,
            representation: entry.representation,
            cause,
        };

        if !asset.path().is_file() {
            return Err(fail(format!(
                "source {} is not a readable file",
                asset.path().display()
            )));
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| fail(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        discard(output);

        let partial = partial_path(output);
        let request = self.build_request(asset.path(), &entry.representation, &partial);

        info!(
            asset = %asset.name(),
            quality = %entry.quality,
            id = %entry.id,
            "Encoding {} -> {}",
            entry.representation,
            output.display()
        );

        if let Err(e) = self.engine.transcode(&request).await {
            discard(&partial);
            return Err(fail(e.to_string()));
        }

        if !partial.is_file() {
            return Err(fail("engine reported success but wrote no output".to_string()));
        }

        if self.settings.verify_output {
            if let Err(cause) = self.verify(&partial, &entry.representation).await {
                discard(&partial);
                return Err(fail(cause));
            }
        }

        std::fs::rename(&partial, output).map_err(|e| {
            discard(&partial);
            fail(format!("cannot publish {}: {}", output.display(), e))
        })?;

        debug!(
            "Encoded {} at {} in {:.2}s",
            asset.name(),
            entry.quality,
            started.elapsed().as_secs_f64()
        );

        Ok(EncodedStream {
            asset_name: asset.name().to_string(),
            quality: entry.quality,
            representation: entry.representation,
            id: entry.id.clone(),
            path: output.to_path_buf(),
        })
    }

    /// Check measured geometry, frame rate and audio absence
    async fn verify(&self, path: &Path, representation: &Representation) -> Result<(), String> {
        let probe = match &self.probe {
            Some(probe) => probe,
            None => {
                warn!("Output verification requested without a probe, skipping");
                return Ok(());
            }
        };

        let measured = probe
            .probe_stream(path)
            .await
            .map_err(|e| format!("probe failed: {}", e))?;

        if measured.width != representation.width || measured.height != representation.height {
            return Err(format!(
                "output is {}x{}, expected {}x{}",
                measured.width, measured.height, representation.width, representation.height
            ));
        }
        if (measured.frame_rate - representation.frame_rate).abs() > FRAME_RATE_TOLERANCE {
            return Err(format!(
                "output runs at {} fps, expected {}",
                measured.frame_rate, representation.frame_rate
            ));
        }
        if measured.has_audio {
            return Err("output still carries an audio track".to_string());
        }
        Ok(())
    }
}

/// Hidden sibling the engine writes to before publication
fn partial_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stream".to_string());
    output.with_file_name(format!(".{}.partial", name))
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockEncodingEngine, MockProbeAdapter};

    fn settings(verify: bool) -> EncoderSettings {
        EncoderSettings {
            codec: "libsvtav1".to_string(),
            preset: Some("8".to_string()),
            crf: Some(35),
            keyframe_interval: 5.0,
            verify_output: verify,
        }
    }

    fn entry(quality: Quality) -> LadderEntry {
        RepresentationLadder::reference().get(quality).unwrap().clone()
    }

    fn source(dir: &Path) -> SourceAsset {
        let path = dir.join("bunny.y4m");
        std::fs::write(&path, b"source").unwrap();
        SourceAsset::new(path).unwrap()
    }

    #[test]
    fn test_request_scales_resamples_and_strips_audio() {
        let encoder = Encoder::new(Arc::new(MockEncodingEngine::new()), None, settings(false));
        let rep = entry(Quality::Medium).representation;
        let request = encoder.build_request(Path::new("/in/a.mp4"), &rep, Path::new("/w/1.mp4"));

        assert_eq!(request.filters, vec!["scale=1280:720", "fps=30"]);
        assert!(request.drop_audio);
        assert_eq!(request.format, "mp4");
        assert!(request
            .codec_options
            .contains(&("-movflags".to_string(), FRAGMENT_FLAGS.to_string())));
        assert!(request
            .codec_options
            .contains(&("-force_key_frames".to_string(), "expr:gte(t,n_forced*5)".to_string())));
        assert!(request
            .codec_options
            .contains(&("-crf".to_string(), "35".to_string())));
    }

    #[tokio::test]
    async fn test_encode_success_creates_parent_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let asset = source(dir.path());
        let encoder = Encoder::new(
            Arc::new(MockEncodingEngine::new()),
            Some(Arc::new(MockProbeAdapter::new())),
            settings(true),
        );

        let output = dir.path().join("work").join("nested").join("0.mp4");
        let stream = encoder
            .encode(&asset, &entry(Quality::Low), &output)
            .await
            .unwrap();

        assert_eq!(stream.path, output);
        assert!(stream.exists());
        assert_eq!(stream.quality, Quality::Low);
        assert_eq!(stream.id.as_str(), "0");
        assert!(!partial_path(&output).exists());
    }

    #[tokio::test]
    async fn test_failed_encode_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let asset = source(dir.path());
        let medium = entry(Quality::Medium);
        let engine = MockEncodingEngine::new().with_failure_for(medium.representation);
        let encoder = Encoder::new(Arc::new(engine), None, settings(false));

        let output = dir.path().join("1.mp4");
        std::fs::write(&output, b"stale from an earlier run").unwrap();

        let err = encoder.encode(&asset, &medium, &output).await.unwrap_err();
        assert_eq!(err.quality, Quality::Medium);
        assert_eq!(err.asset, "bunny");
        assert!(err.cause.contains("injected failure"));
        assert!(!output.exists());
        assert!(!partial_path(&output).exists());
    }

    #[tokio::test]
    async fn test_missing_source_is_an_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let asset = SourceAsset::new(dir.path().join("absent.mp4")).unwrap();
        let engine = Arc::new(MockEncodingEngine::new());
        let encoder = Encoder::new(engine.clone(), None, settings(false));

        let err = encoder
            .encode(&asset, &entry(Quality::Low), &dir.path().join("0.mp4"))
            .await
            .unwrap_err();
        assert!(err.cause.contains("not a readable file"));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_verification_rejects_audio() {
        let dir = tempfile::tempdir().unwrap();
        let asset = source(dir.path());
        let encoder = Encoder::new(
            Arc::new(MockEncodingEngine::new().with_audio_kept()),
            Some(Arc::new(MockProbeAdapter::new())),
            settings(true),
        );

        let output = dir.path().join("2.mp4");
        let err = encoder
            .encode(&asset, &entry(Quality::High), &output)
            .await
            .unwrap_err();
        assert!(err.cause.contains("audio"));
        assert!(!output.exists());
    }
}
