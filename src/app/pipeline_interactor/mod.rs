// Pipeline interactor - Encodes every rung of the ladder for one asset, then packages

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::domain::model::*;
use crate::engine::{workdir, Encoder, Packager};
use crate::error::{DashPackError, DashPackResult, EncodeError};
use crate::utils::format_duration;
use crate::utils::path::private_prefix;

/// Outcome of one pipeline job together with the states it went through
#[derive(Debug)]
pub struct JobRecord {
    pub asset_name: String,
    pub states: Vec<JobState>,
    pub result: DashPackResult<PackagedPresentation>,
}

impl JobRecord {
    /// Record of a job refused before it started
    pub fn rejected(asset: &SourceAsset, error: DashPackError) -> Self {
        Self {
            asset_name: asset.name().to_string(),
            states: vec![JobState::Pending, JobState::Failed],
            result: Err(error),
        }
    }

    pub fn final_state(&self) -> JobState {
        self.states.last().copied().unwrap_or(JobState::Pending)
    }
}

/// State tracking for a single job
struct PipelineJob {
    asset_name: String,
    states: Vec<JobState>,
}

impl PipelineJob {
    fn new(asset_name: &str) -> Self {
        Self {
            asset_name: asset_name.to_string(),
            states: vec![JobState::Pending],
        }
    }

    fn transition(&mut self, state: JobState) {
        info!(asset = %self.asset_name, "{}", state);
        self.states.push(state);
    }
}

/// Interactor for the encode-then-package use case
pub struct PipelineInteractor {
    ladder: Arc<RepresentationLadder>,
    encoder: Arc<Encoder>,
    packager: Arc<Packager>,
    output_root: PathBuf,
    parallel_encodes: bool,
}

impl PipelineInteractor {
    /// Create new pipeline interactor with injected stages
    pub fn new(
        ladder: Arc<RepresentationLadder>,
        encoder: Arc<Encoder>,
        packager: Arc<Packager>,
        output_root: PathBuf,
        parallel_encodes: bool,
    ) -> Self {
        Self {
            ladder,
            encoder,
            packager,
            output_root,
            parallel_encodes,
        }
    }

    pub fn ladder(&self) -> &RepresentationLadder {
        &self.ladder
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Run one asset through the pipeline
    pub async fn run(&self, asset: &SourceAsset) -> DashPackResult<PackagedPresentation> {
        self.execute(asset).await.result
    }

    /// Run one asset and keep the state history
    pub async fn execute(&self, asset: &SourceAsset) -> JobRecord {
        let started = Instant::now();
        let mut job = PipelineJob::new(asset.name());

        let result = match workdir::capture().await {
            Ok(captured) => {
                let result = self.drive(asset, &mut job).await;
                // A drifted working directory outranks whatever the job reported
                match workdir::ensure_unchanged(&captured).await {
                    Ok(()) => result,
                    Err(fatal) => Err(fatal),
                }
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(presentation) => {
                job.transition(JobState::Done);
                info!(
                    asset = %asset.name(),
                    "Published {} in {}",
                    presentation.manifest_path.display(),
                    format_duration(started.elapsed())
                );
            }
            Err(e) => {
                job.transition(JobState::Failed);
                error!(asset = %asset.name(), "{}", e);
            }
        }

        JobRecord {
            asset_name: job.asset_name,
            states: job.states,
            result,
        }
    }

    async fn drive(
        &self,
        asset: &SourceAsset,
        job: &mut PipelineJob,
    ) -> DashPackResult<PackagedPresentation> {
        if !asset.path().is_file() {
            return Err(DashPackError::InputNotFound {
                path: asset.path().to_path_buf(),
            });
        }

        let output_root = &self.output_root;
        let output_dir = output_root.join(asset.name());
        if output_dir.exists() && !self.packager.settings().overwrite {
            return Err(DashPackError::OutputExists { path: output_dir });
        }

        std::fs::create_dir_all(output_root)?;
        let work = tempfile::Builder::new()
            .prefix(&private_prefix(asset.name(), "encode"))
            .tempdir_in(output_root)?;

        let streams = if self.parallel_encodes {
            self.encode_parallel(asset, work.path(), job).await
        } else {
            self.encode_sequential(asset, work.path(), job).await
        }?;

        job.transition(JobState::Packaging);
        self.packager
            .package(&self.ladder, &streams, &output_dir, asset.name())
            .await
    }

    /// One rung after another, attempting every rung even after a failure
    async fn encode_sequential(
        &self,
        asset: &SourceAsset,
        work: &Path,
        job: &mut PipelineJob,
    ) -> DashPackResult<Vec<EncodedStream>> {
        let total = self.ladder.len();
        let mut streams = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (index, entry) in self.ladder.entries().enumerate() {
            job.transition(JobState::Encoding {
                index: index + 1,
                total,
            });
            match self
                .encoder
                .encode(asset, entry, &stream_path(work, asset, entry))
                .await
            {
                Ok(stream) => streams.push(stream),
                Err(e) => {
                    warn!(asset = %asset.name(), quality = %entry.quality, "{}", e);
                    failures.push(e);
                }
            }
        }

        collect(asset, total, streams, failures)
    }

    /// All rungs at once, bounded by the number of CPUs
    async fn encode_parallel(
        &self,
        asset: &SourceAsset,
        work: &Path,
        job: &mut PipelineJob,
    ) -> DashPackResult<Vec<EncodedStream>> {
        let total = self.ladder.len();
        let permits = Arc::new(Semaphore::new(num_cpus::get().clamp(1, total.max(1))));
        let mut tasks = JoinSet::new();

        for (index, entry) in self.ladder.entries().enumerate() {
            job.transition(JobState::Encoding {
                index: index + 1,
                total,
            });
            let encoder = Arc::clone(&self.encoder);
            let permits = Arc::clone(&permits);
            let asset = asset.clone();
            let entry = entry.clone();
            let output = stream_path(work, &asset, &entry);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (index, encoder.encode(&asset, &entry, &output).await)
            });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    results.insert(index, result);
                }
                Err(e) => error!(asset = %asset.name(), "Encode task aborted: {}", e),
            }
        }

        let mut streams = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (index, entry) in self.ladder.entries().enumerate() {
            match results.remove(&index) {
                Some(Ok(stream)) => streams.push(stream),
                Some(Err(e)) => failures.push(e),
                None => failures.push(EncodeError {
                    asset: asset.name().to_string(),
                    quality: entry.quality,
                    representation: entry.representation,
                    cause: "encode task panicked".to_string(),
                }),
            }
        }

        collect(asset, total, streams, failures)
    }
}

/// Work file for one encoded rung
fn stream_path(work: &Path, asset: &SourceAsset, entry: &LadderEntry) -> PathBuf {
    work.join(format!("{}_{}.mp4", asset.name(), entry.quality.as_str()))
}

/// Streams when every rung succeeded, otherwise the aggregate failure
fn collect(
    asset: &SourceAsset,
    total: usize,
    streams: Vec<EncodedStream>,
    mut failures: Vec<EncodeError>,
) -> DashPackResult<Vec<EncodedStream>> {
    if failures.is_empty() {
        return Ok(streams);
    }
    failures.sort_by_key(|f| f.quality);
    Err(DashPackError::EncodeFailures {
        asset: asset.name().to_string(),
        total,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockEncodingEngine, MockPackagingEngine, MockProbeAdapter};
    use crate::engine::{EncoderSettings, PackagerSettings};

    fn interactor(
        encoding: MockEncodingEngine,
        packaging: MockPackagingEngine,
        output_root: &Path,
        parallel: bool,
    ) -> PipelineInteractor {
        let encoder = Encoder::new(
            Arc::new(encoding),
            Some(Arc::new(MockProbeAdapter::new())),
            EncoderSettings {
                codec: "libsvtav1".to_string(),
                preset: None,
                crf: None,
                keyframe_interval: 5.0,
                verify_output: true,
            },
        );
        let packager = Packager::new(
            Arc::new(packaging),
            PackagerSettings {
                segment_duration: 5.0,
                overwrite: true,
            },
        );
        PipelineInteractor::new(
            Arc::new(RepresentationLadder::reference()),
            Arc::new(encoder),
            Arc::new(packager),
            output_root.to_path_buf(),
            parallel,
        )
    }

    fn source(dir: &Path) -> SourceAsset {
        let path = dir.join("bunny.mp4");
        std::fs::write(&path, b"source").unwrap();
        SourceAsset::new(path).unwrap()
    }

    #[tokio::test]
    async fn test_state_history_of_successful_job() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let pipeline = interactor(
            MockEncodingEngine::new(),
            MockPackagingEngine::new(),
            output.path(),
            false,
        );

        let record = pipeline.execute(&source(input.path())).await;
        assert!(record.result.is_ok());
        assert_eq!(
            record.states,
            vec![
                JobState::Pending,
                JobState::Encoding { index: 1, total: 3 },
                JobState::Encoding { index: 2, total: 3 },
                JobState::Encoding { index: 3, total: 3 },
                JobState::Packaging,
                JobState::Done,
            ]
        );
        assert_eq!(record.final_state(), JobState::Done);
    }

    #[tokio::test]
    async fn test_every_rung_is_attempted_after_a_failure() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let ladder = RepresentationLadder::reference();
        let low = ladder.get(Quality::Low).unwrap().representation;
        let high = ladder.get(Quality::High).unwrap().representation;
        let encoding = MockEncodingEngine::new()
            .with_failure_for(high)
            .with_failure_for(low);
        let pipeline = interactor(encoding, MockPackagingEngine::new(), output.path(), false);

        let record = pipeline.execute(&source(input.path())).await;
        assert_eq!(record.final_state(), JobState::Failed);
        assert!(!record.states.contains(&JobState::Packaging));
        match record.result {
            Err(DashPackError::EncodeFailures { failures, total, .. }) => {
                assert_eq!(total, 3);
                let qualities: Vec<Quality> = failures.iter().map(|f| f.quality).collect();
                assert_eq!(qualities, vec![Quality::Low, Quality::High]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        // The job-private work directory is cleaned up
        assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_parallel_encodes_match_sequential_layout() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let pipeline = interactor(
            MockEncodingEngine::new(),
            MockPackagingEngine::new(),
            output.path(),
            true,
        );

        let presentation = pipeline.run(&source(input.path())).await.unwrap();
        assert_eq!(presentation.output_dir, output.path().join("bunny"));
        assert_eq!(presentation.total_segments(), 9);
    }

    #[tokio::test]
    async fn test_missing_input() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let pipeline = interactor(
            MockEncodingEngine::new(),
            MockPackagingEngine::new(),
            output.path(),
            false,
        );

        let asset = SourceAsset::new(input.path().join("ghost.mp4")).unwrap();
        let record = pipeline.execute(&asset).await;
        assert!(matches!(record.result, Err(DashPackError::InputNotFound { .. })));
        assert_eq!(record.states, vec![JobState::Pending, JobState::Failed]);
    }
}
