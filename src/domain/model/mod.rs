// Domain models - Representation ladder, assets, streams and presentations

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::ConfigError;

/// Quality level of a representation, ordered by ascending fidelity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    High,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// Resolution and frame rate of one encoded variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Representation {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

impl Representation {
    /// Create a new representation with validation
    pub fn new(width: u32, height: u32, frame_rate: f64) -> Result<Self, ConfigError> {
        let representation = Self {
            width,
            height,
            frame_rate,
        };
        representation.validate()?;
        Ok(representation)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::new(format!(
                "Representation dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(ConfigError::new(format!(
                "Representation frame rate must be positive, got {}",
                self.frame_rate
            )));
        }
        Ok(())
    }

    /// Scale filter argument for the encoding engine
    pub fn scale_filter(&self) -> String {
        format!("scale={}:{}", self.width, self.height)
    }

    /// Frame rate filter argument for the encoding engine
    pub fn fps_filter(&self) -> String {
        format!("fps={}", self.frame_rate)
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{}", self.width, self.height, self.frame_rate)
    }
}

/// Stable output token of a representation, used verbatim as a directory name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepresentationId(String);

impl RepresentationId {
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ConfigError::new("Representation ID cannot be empty"));
        }
        if id == "." || id == ".." || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(ConfigError::new(format!(
                "Representation ID '{}' is not a valid directory name",
                id
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepresentationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One rung of the ladder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LadderEntry {
    pub quality: Quality,
    pub representation: Representation,
    pub id: RepresentationId,
}

/// Ordered mapping Quality -> (Representation, RepresentationId)
///
/// Built once at startup and shared read-only by every job. Construction
/// validates, so holding a ladder means holding a valid one.
#[derive(Debug, Clone, PartialEq)]
pub struct RepresentationLadder {
    entries: BTreeMap<Quality, LadderEntry>,
}

impl RepresentationLadder {
    /// Build and validate a ladder
    pub fn new(
        entries: impl IntoIterator<Item = (Quality, Representation, RepresentationId)>,
    ) -> Result<Self, ConfigError> {
        let mut map = BTreeMap::new();
        for (quality, representation, id) in entries {
            let entry = LadderEntry {
                quality,
                representation,
                id,
            };
            if map.insert(quality, entry).is_some() {
                return Err(ConfigError::new(format!(
                    "Quality {} is defined more than once",
                    quality
                )));
            }
        }
        let ladder = Self { entries: map };
        crate::domain::rules::LadderRules::validate(&ladder)?;
        Ok(ladder)
    }

    /// Low 640x360@15, medium 1280x720@30, high 3840x2160@60 with ids 0, 1, 2
    pub fn reference() -> Self {
        let entries = [
            (Quality::Low, 640, 360, 15.0, "0"),
            (Quality::Medium, 1280, 720, 30.0, "1"),
            (Quality::High, 3840, 2160, 60.0, "2"),
        ];
        Self {
            entries: entries
                .into_iter()
                .map(|(quality, width, height, frame_rate, id)| {
                    (
                        quality,
                        LadderEntry {
                            quality,
                            representation: Representation {
                                width,
                                height,
                                frame_rate,
                            },
                            id: RepresentationId(id.to_string()),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Entries in ascending quality order
    pub fn entries(&self) -> impl Iterator<Item = &LadderEntry> {
        self.entries.values()
    }

    pub fn get(&self, quality: Quality) -> Option<&LadderEntry> {
        self.entries.get(&quality)
    }

    pub fn qualities(&self) -> impl Iterator<Item = Quality> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Input media file; identity is its absolute path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceAsset {
    path: PathBuf,
    name: String,
}

impl SourceAsset {
    /// Create an asset, deriving its name by stripping the extension
    ///
    /// A relative path is resolved against the working directory at construction,
    /// never later while jobs may be running.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path: PathBuf = path.into();
        let path = crate::utils::path::absolutize(&path)
            .map_err(|e| ConfigError::new(format!("Cannot resolve source path: {}", e)))?;
        let name = crate::utils::path::asset_name(&path).ok_or_else(|| {
            ConfigError::new(format!(
                "Cannot derive an asset name from {}",
                path.display()
            ))
        })?;
        Ok(Self { path, name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Output base name and output subdirectory name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for SourceAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Encoder output for one (asset, representation) pair
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedStream {
    pub asset_name: String,
    pub quality: Quality,
    pub representation: Representation,
    pub id: RepresentationId,
    pub path: PathBuf,
}

impl EncodedStream {
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Packaged output of one representation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackagedRepresentation {
    pub quality: Quality,
    pub id: RepresentationId,
    pub directory: PathBuf,
    pub init_segment: PathBuf,
    pub segment_count: usize,
}

/// Final artifact for one asset: manifest plus per-representation segments
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackagedPresentation {
    pub asset_name: String,
    pub output_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub representations: Vec<PackagedRepresentation>,
}

impl PackagedPresentation {
    /// Same presentation described at another root directory
    pub fn relocate(self, new_root: &Path) -> Self {
        let old_root = self.output_dir.clone();
        let rebase = |path: PathBuf| match path.strip_prefix(&old_root) {
            Ok(relative) => new_root.join(relative),
            Err(_) => path,
        };
        Self {
            asset_name: self.asset_name,
            output_dir: new_root.to_path_buf(),
            manifest_path: rebase(self.manifest_path),
            representations: self
                .representations
                .into_iter()
                .map(|rep| PackagedRepresentation {
                    directory: rebase(rep.directory),
                    init_segment: rebase(rep.init_segment),
                    ..rep
                })
                .collect(),
        }
    }

    pub fn total_segments(&self) -> usize {
        self.representations.iter().map(|r| r.segment_count).sum()
    }
}

/// Pipeline job state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Encoding { index: usize, total: usize },
    Packaging,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "PENDING"),
            JobState::Encoding { index, total } => write!(f, "ENCODING({}/{})", index, total),
            JobState::Packaging => write!(f, "PACKAGING"),
            JobState::Done => write!(f, "DONE"),
            JobState::Failed => write!(f, "FAILED"),
        }
    }
}

#[cfg(test)]
mod tests;
