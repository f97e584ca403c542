// Local filesystem adapter - Source asset discovery in the input directory

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::model::SourceAsset;
use crate::error::{DashPackError, DashPackResult};
use crate::utils::path::absolutize;

/// Discovers source assets directly inside an input directory
pub struct FsLocalAdapter {
    input_dir: PathBuf,
}

impl FsLocalAdapter {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Every regular, non-hidden file at depth 1, sorted by file name
    ///
    /// Asset paths come back absolute.
    pub fn discover_all(&self) -> DashPackResult<Vec<SourceAsset>> {
        let input_dir = absolutize(&self.input_dir)?;
        if !input_dir.is_dir() {
            return Err(DashPackError::InputNotFound { path: input_dir });
        }

        let mut assets = Vec::new();
        for entry in WalkDir::new(&input_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            match SourceAsset::new(entry.path()) {
                Ok(asset) => assets.push(asset),
                Err(_) => debug!("Skipping {}", entry.path().display()),
            }
        }

        if assets.is_empty() {
            warn!("No source assets found in {}", self.input_dir.display());
        }
        Ok(assets)
    }

    /// `<input_dir>/<name>`, which must be an existing file
    pub fn resolve_named(&self, name: &str) -> DashPackResult<SourceAsset> {
        let path = absolutize(&self.input_dir)?.join(name);
        if !path.is_file() {
            return Err(DashPackError::InputNotFound { path });
        }
        Ok(SourceAsset::new(path)?)
    }
}
