//! DASH packager
//!
//! Turns a complete set of encoded streams into one presentation. Segmentation
//! happens in a hidden staging directory next to the final output; the staging
//! directory is verified and renamed into place only when every representation
//! is fully populated, so a manifest never appears next to missing segments.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::model::*;
use crate::domain::rules::{NamingContract, StreamSetRules};
use crate::engine::{workdir, PackagerSettings};
use crate::error::{DashPackError, DashPackResult};
use crate::output::PresentationVerifier;
use crate::ports::*;
use crate::utils::path::{absolutize, private_prefix};

/// Packager for one asset's full stream set
pub struct Packager {
    engine: Arc<dyn PackagingEngine>,
    settings: PackagerSettings,
}

impl Packager {
    pub fn new(engine: Arc<dyn PackagingEngine>, settings: PackagerSettings) -> Self {
        Self { engine, settings }
    }

    pub fn settings(&self) -> &PackagerSettings {
        &self.settings
    }

    /// Package `streams` into `output_dir` with manifest `<manifest_base>.mpd`
    pub async fn package(
        &self,
        ladder: &RepresentationLadder,
        streams: &[EncodedStream],
        output_dir: &Path,
        manifest_base: &str,
    ) -> DashPackResult<PackagedPresentation> {
        let missing_qualities = StreamSetRules::missing_qualities(ladder, streams);
        if !missing_qualities.is_empty() {
            return Err(DashPackError::IncompletePackage { missing_qualities });
        }
        let ordered = StreamSetRules::order_by_ladder(ladder, streams).ok_or_else(|| {
            DashPackError::IncompletePackage {
                missing_qualities: ladder.qualities().collect(),
            }
        })?;

        let output_dir = absolutize(output_dir)?;
        if output_dir.exists() && !self.settings.overwrite {
            return Err(DashPackError::OutputExists { path: output_dir });
        }

        let parent = output_dir
            .parent()
            .ok_or_else(|| DashPackError::package("output directory has no parent"))?;
        std::fs::create_dir_all(parent)?;

        let started = Instant::now();
        let staging = tempfile::Builder::new()
            .prefix(&private_prefix(manifest_base, "staging"))
            .tempdir_in(parent)?;

        for entry in ladder.entries() {
            std::fs::create_dir_all(staging.path().join(entry.id.as_str()))?;
        }

        let request = SegmentRequest {
            inputs: ordered
                .iter()
                .map(|s| absolutize(&s.path))
                .collect::<Result<Vec<_>, _>>()?,
            representation_ids: ordered.iter().map(|s| s.id.clone()).collect(),
            manifest: NamingContract::manifest_file_name(manifest_base),
            segment_duration: self.settings.segment_duration,
            init_template: NamingContract::INIT_SEGMENT_TEMPLATE.to_string(),
            media_template: NamingContract::MEDIA_SEGMENT_TEMPLATE.to_string(),
            start_number: NamingContract::FIRST_SEGMENT_NUMBER,
            cwd: staging.path().to_path_buf(),
        };

        info!(
            asset = %manifest_base,
            "Packaging {} representation(s) into {}",
            request.inputs.len(),
            output_dir.display()
        );

        self.segment(&request).await?;

        let staged = PresentationVerifier::verify(staging.path(), ladder, manifest_base)
            .map_err(DashPackError::package)?;

        self.publish(staging.path(), &output_dir)?;
        debug!(
            "Packaged {} in {:.2}s",
            manifest_base,
            started.elapsed().as_secs_f64()
        );

        // The staging directory is gone after the rename; dropping the handle is a no-op
        drop(staging);
        Ok(staged.relocate(&output_dir))
    }

    /// Run the engine, inside the process-wide critical section when it needs one
    async fn segment(&self, request: &SegmentRequest) -> DashPackResult<()> {
        if self.engine.requires_process_cwd() {
            workdir::run_in_dir(&request.cwd, async {
                self.engine.segment(request).await.map_err(DashPackError::from)
            })
            .await
        } else {
            self.engine
                .segment(request)
                .await
                .map_err(DashPackError::from)
        }
    }

    /// Move a verified staging directory to its final location
    fn publish(&self, staging: &Path, output_dir: &Path) -> DashPackResult<()> {
        if output_dir.exists() {
            if !self.settings.overwrite {
                return Err(DashPackError::OutputExists {
                    path: output_dir.to_path_buf(),
                });
            }
            warn!("Replacing existing presentation {}", output_dir.display());
            if output_dir.is_dir() {
                std::fs::remove_dir_all(output_dir)?;
            } else {
                std::fs::remove_file(output_dir)?;
            }
        }
        std::fs::rename(staging, output_dir)?;
        Ok(())
    }
}
