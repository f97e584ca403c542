//! Output layout verification
//!
//! Checks a packaged directory against the naming contract before it is
//! published: one manifest with a single video-only adaptation set, one
//! directory per representation ID, each holding `init.mp4` and a gap-free
//! run of `chunk_NNNNN.m4s` starting at 1.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::model::*;
use crate::domain::rules::NamingContract;
use crate::output::LayoutError;

/// Packaged presentation verifier
pub struct PresentationVerifier;

impl PresentationVerifier {
    /// Verify `dir` and describe what it contains
    pub fn verify(
        dir: &Path,
        ladder: &RepresentationLadder,
        manifest_base: &str,
    ) -> Result<PackagedPresentation, LayoutError> {
        debug!("Verifying presentation layout in {}", dir.display());

        let manifest_name = NamingContract::manifest_file_name(manifest_base);
        let manifest_path = dir.join(&manifest_name);
        if !manifest_path.is_file() {
            return Err(LayoutError::MissingManifest(manifest_path));
        }
        let manifest = std::fs::read_to_string(&manifest_path).map_err(|e| unreadable(&manifest_path, e))?;
        Self::check_manifest(&manifest, ladder)?;

        let expected_dirs: BTreeSet<&str> = ladder.entries().map(|e| e.id.as_str()).collect();
        for entry in read_dir(dir)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            let allowed = if path.is_dir() {
                expected_dirs.contains(name.as_str())
            } else {
                name == manifest_name
            };
            if !allowed {
                return Err(LayoutError::UnexpectedEntry(path));
            }
        }

        let mut representations = Vec::with_capacity(ladder.len());
        for entry in ladder.entries() {
            representations.push(Self::check_representation(dir, entry)?);
        }

        let presentation = PackagedPresentation {
            asset_name: manifest_base.to_string(),
            output_dir: dir.to_path_buf(),
            manifest_path,
            representations,
        };
        info!(
            "Presentation {} verified: {} representation(s), {} segment(s)",
            manifest_base,
            presentation.representations.len(),
            presentation.total_segments()
        );
        Ok(presentation)
    }

    /// Manifest-level checks on the MPD text
    pub fn check_manifest(manifest: &str, ladder: &RepresentationLadder) -> Result<(), LayoutError> {
        let adaptation_sets = manifest.matches("<AdaptationSet").count();
        if adaptation_sets != 1 {
            return Err(LayoutError::AdaptationSetCount {
                found: adaptation_sets,
            });
        }

        if manifest.contains("contentType=\"audio\"") || manifest.contains("mimeType=\"audio/") {
            return Err(LayoutError::AudioSignalled);
        }

        let mut found: Vec<String> = representation_ids(manifest);
        let mut expected: Vec<String> = ladder.entries().map(|e| e.id.to_string()).collect();
        found.sort();
        expected.sort();
        if found != expected {
            return Err(LayoutError::RepresentationMismatch { expected, found });
        }
        Ok(())
    }

    fn check_representation(
        dir: &Path,
        entry: &LadderEntry,
    ) -> Result<PackagedRepresentation, LayoutError> {
        let rep_dir = dir.join(entry.id.as_str());
        if !rep_dir.is_dir() {
            return Err(LayoutError::MissingRepresentationDir(rep_dir));
        }

        let init_segment = rep_dir.join(NamingContract::INIT_SEGMENT_NAME);
        if !init_segment.is_file() {
            return Err(LayoutError::MissingInitSegment(init_segment));
        }

        let mut numbers = BTreeSet::new();
        for item in read_dir(&rep_dir)? {
            let name = item.file_name().to_string_lossy().into_owned();
            if name == NamingContract::INIT_SEGMENT_NAME {
                continue;
            }
            match NamingContract::parse_media_segment_name(&name) {
                Some(number) if item.path().is_file() => {
                    numbers.insert(number);
                }
                _ => return Err(LayoutError::UnexpectedEntry(item.path())),
            }
        }

        if numbers.is_empty() {
            return Err(LayoutError::NoMediaSegments {
                id: entry.id.clone(),
            });
        }

        let count = numbers.len();
        let first = NamingContract::FIRST_SEGMENT_NUMBER;
        if let Some(missing) = (first..first + count as u32).find(|n| !numbers.contains(n)) {
            return Err(LayoutError::SegmentGap {
                id: entry.id.clone(),
                count,
                missing,
            });
        }

        Ok(PackagedRepresentation {
            quality: entry.quality,
            id: entry.id.clone(),
            directory: rep_dir,
            init_segment,
            segment_count: count,
        })
    }
}

/// Values of every `<Representation id="...">` attribute
///
/// Attributes may be separated by any whitespace, including newlines, and quoted
/// with either quote character.
fn representation_ids(manifest: &str) -> Vec<String> {
    manifest
        .split("<Representation")
        .skip(1)
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/'))
        .filter_map(|rest| attribute(&rest[..rest.find('>').unwrap_or(rest.len())], "id"))
        .collect()
}

/// Value of attribute `name` inside the body of a start tag
fn attribute(tag: &str, name: &str) -> Option<String> {
    let mut rest = tag;
    while let Some(at) = rest.find(name) {
        let preceded_by_space = rest[..at]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_whitespace());
        let after = rest[at + name.len()..].trim_start();
        rest = &rest[at + name.len()..];

        let Some(value) = after.strip_prefix('=').map(str::trim_start) else {
            continue;
        };
        if !preceded_by_space {
            continue;
        }
        let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let value = &value[1..];
        let end = value.find(quote)?;
        return Some(value[..end].to_string());
    }
    None
}

fn read_dir(dir: &Path) -> Result<Vec<std::fs::DirEntry>, LayoutError> {
    std::fs::read_dir(dir)
        .and_then(|entries| entries.collect::<Result<Vec<_>, _>>())
        .map_err(|e| unreadable(dir, e))
}

fn unreadable(path: &Path, err: std::io::Error) -> LayoutError {
    LayoutError::Unreadable {
        path: PathBuf::from(path),
        message: err.to_string(),
    }
}
