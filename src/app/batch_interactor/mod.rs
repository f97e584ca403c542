// Batch interactor - Runs the pipeline over many assets and collects per-asset outcomes

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::app::pipeline_interactor::{JobRecord, PipelineInteractor};
use crate::domain::model::*;
use crate::error::{DashPackError, DashPackResult};

/// Result of one asset in a batch
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetStatus {
    Success { presentation: PackagedPresentation },
    Failure { causes: Vec<String> },
}

/// Per-asset line of the batch report
#[derive(Debug, Clone, Serialize)]
pub struct AssetOutcome {
    pub asset: PathBuf,
    pub name: String,
    pub final_state: JobState,
    #[serde(flatten)]
    pub status: AssetStatus,
}

impl AssetOutcome {
    fn from_record(asset: &SourceAsset, record: JobRecord) -> Self {
        let final_state = record.final_state();
        let status = match record.result {
            Ok(presentation) => AssetStatus::Success { presentation },
            Err(e) => AssetStatus::Failure { causes: e.causes() },
        };
        Self {
            asset: asset.path().to_path_buf(),
            name: record.asset_name,
            final_state,
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, AssetStatus::Success { .. })
    }
}

/// Outcomes of a batch, in input order
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<AssetOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// Interactor for the batch use case
pub struct BatchInteractor {
    pipeline: Arc<PipelineInteractor>,
    jobs: usize,
}

impl BatchInteractor {
    /// `jobs` bounds how many assets are in flight at once
    pub fn new(pipeline: Arc<PipelineInteractor>, jobs: usize) -> Self {
        Self {
            pipeline,
            jobs: jobs.max(1),
        }
    }

    /// Run every asset; one asset's failure never stops its siblings
    ///
    /// Returns `Err` only for a process-fatal failure, after cancelling the
    /// jobs still in flight.
    pub async fn run_all(&self, assets: &[SourceAsset]) -> DashPackResult<BatchReport> {
        let started_at = Utc::now();
        info!(
            "Processing {} asset(s) with {} concurrent job(s)",
            assets.len(),
            self.jobs
        );

        let mut records = BTreeMap::new();
        let mut claimed: HashMap<&str, &Path> = HashMap::new();

        let permits = Arc::new(Semaphore::new(self.jobs));
        let mut tasks = JoinSet::new();
        for (index, asset) in assets.iter().enumerate() {
            // Both would publish to <output_root>/<name>; the first one keeps it
            if let Some(first) = claimed.get(asset.name()) {
                let err = DashPackError::DuplicateAssetName {
                    name: asset.name().to_string(),
                    path: asset.path().to_path_buf(),
                    first: first.to_path_buf(),
                };
                warn!(asset = %asset.name(), "{}", err);
                records.insert(index, JobRecord::rejected(asset, err));
                continue;
            }
            claimed.insert(asset.name(), asset.path());

            let pipeline = Arc::clone(&self.pipeline);
            let permits = Arc::clone(&permits);
            let asset = asset.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (index, pipeline.execute(&asset).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, record) = match joined {
                Ok(done) => done,
                Err(e) => {
                    error!("Pipeline task aborted: {}", e);
                    continue;
                }
            };

            if let Err(e) = &record.result {
                if e.is_process_fatal() {
                    error!("Aborting batch: {}", e);
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    return Err(fatal(record));
                }
            }
            records.insert(index, record);
        }

        let outcomes = assets
            .iter()
            .enumerate()
            .map(|(index, asset)| match records.remove(&index) {
                Some(record) => AssetOutcome::from_record(asset, record),
                None => AssetOutcome {
                    asset: asset.path().to_path_buf(),
                    name: asset.name().to_string(),
                    final_state: JobState::Failed,
                    status: AssetStatus::Failure {
                        causes: vec!["pipeline task panicked".to_string()],
                    },
                },
            })
            .collect();

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }
}

fn fatal(record: JobRecord) -> DashPackError {
    match record.result {
        Err(e) => e,
        Ok(_) => DashPackError::package("job reported success after a fatal error"),
    }
}
