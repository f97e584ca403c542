//! Path helpers for asset naming and absolute path resolution

use std::io;
use std::path::{Path, PathBuf};

/// Asset name: the file name with its last extension stripped
pub fn asset_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    if stem.is_empty() || stem.starts_with('.') {
        return None;
    }
    Some(stem.into_owned())
}

/// Resolve a path against the current working directory without touching the filesystem
///
/// Everything handed to the engines goes through here, so a later change of the
/// process working directory cannot re-target a job's files.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Hidden sibling prefix for job-private directories next to `output_root`
pub fn private_prefix(asset_name: &str, purpose: &str) -> String {
    format!(".{}.{}-", asset_name, purpose)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_name() {
        assert_eq!(asset_name(Path::new("a/b/video.mp4")).as_deref(), Some("video"));
        assert_eq!(asset_name(Path::new("video.tar.gz")).as_deref(), Some("video.tar"));
        assert_eq!(asset_name(Path::new("/")), None);
        assert_eq!(asset_name(Path::new(".hidden")), None);
    }

    #[test]
    fn test_absolutize_keeps_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(absolutize(dir.path()).unwrap(), dir.path());

        let relative = absolutize(Path::new("clip.mp4")).unwrap();
        assert!(relative.is_absolute());
        assert!(relative.ends_with("clip.mp4"));
    }

    #[test]
    fn test_private_prefix() {
        assert_eq!(private_prefix("bunny", "staging"), ".bunny.staging-");
    }
}
