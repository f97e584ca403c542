//! Process working directory critical section
//!
//! The working directory is process-wide state. Every change to it goes through
//! one async mutex, is scoped to a single engine call, and is undone before the
//! lock is released.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, warn};

use crate::error::{DashPackError, DashPackResult};

fn process_cwd_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Holds the critical section while the process runs inside another directory
pub struct WorkingDirGuard {
    original: PathBuf,
    restored: bool,
    _lock: MutexGuard<'static, ()>,
}

impl WorkingDirGuard {
    /// Take the lock, capture the current directory and switch to `dir`
    pub async fn enter(dir: &Path) -> DashPackResult<Self> {
        let lock = process_cwd_lock().lock().await;
        let original = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        debug!("Working directory switched to {}", dir.display());

        Ok(Self {
            original,
            restored: false,
            _lock: lock,
        })
    }

    /// Switch back to the captured directory, then release the lock
    pub fn restore(mut self) -> DashPackResult<()> {
        self.restored = true;
        std::env::set_current_dir(&self.original).map_err(|source| {
            DashPackError::WorkingDirectoryRestore {
                path: self.original.clone(),
                source,
            }
        })?;
        debug!("Working directory restored to {}", self.original.display());
        Ok(())
    }
}

impl Drop for WorkingDirGuard {
    // Cancellation or panic between enter() and restore()
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = std::env::set_current_dir(&self.original) {
            error!(
                "Failed to restore working directory to {}: {}",
                self.original.display(),
                e
            );
        }
    }
}

/// Run `operation` with the process working directory set to `dir`
///
/// Restoration runs on success and on failure; a restore failure wins over the
/// operation's own result.
pub async fn run_in_dir<T, F>(dir: &Path, operation: F) -> DashPackResult<T>
where
    F: Future<Output = DashPackResult<T>>,
{
    let guard = WorkingDirGuard::enter(dir).await?;
    let result = operation.await;
    guard.restore()?;
    result
}

/// Current working directory, read under the lock so an in-flight switch is never observed
pub async fn capture() -> DashPackResult<PathBuf> {
    let _lock = process_cwd_lock().lock().await;
    Ok(std::env::current_dir()?)
}

/// Check under the lock that the working directory still equals `captured`,
/// putting it back if it drifted
pub async fn ensure_unchanged(captured: &Path) -> DashPackResult<()> {
    let _lock = process_cwd_lock().lock().await;

    let current = std::env::current_dir().ok();
    if current.as_deref() == Some(captured) {
        return Ok(());
    }

    warn!(
        "Working directory drifted to {:?}, restoring {}",
        current,
        captured.display()
    );
    std::env::set_current_dir(captured).map_err(|source| DashPackError::WorkingDirectoryRestore {
        path: captured.to_path_buf(),
        source,
    })
}
