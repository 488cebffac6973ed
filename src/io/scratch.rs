use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

/// Per-run scratch directory for transient artifacts (canonical rasters,
/// composite VRTs, warped intermediates). Removed on drop on every exit
/// path; removal failures are logged and never propagated.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
}

impl ScratchDir {
    /// Create a uniquely named directory under `parent` (system temp dir when `None`)
    pub fn new(parent: Option<&Path>, prefix: &str) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let dir = match parent {
            Some(p) => {
                std::fs::create_dir_all(p)?;
                builder.tempdir_in(p)?
            }
            None => builder.tempdir()?,
        };
        debug!("Scratch directory: {:?}", dir.path());
        Ok(Self { dir: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(d) => d.path(),
            None => Path::new(""),
        }
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!("ResourceCleanupError: failed to remove {:?}: {}", path, e);
            }
        }
    }
}

/// Remove a single transient file if present, logging failures
pub fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("ResourceCleanupError: failed to remove {:?}: {}", path, e);
        }
    }
}

/// Remove a transient directory tree if present, logging failures
pub fn remove_tree_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_dir_all(path) {
            warn!("ResourceCleanupError: failed to remove {:?}: {}", path, e);
        }
    }
}

/// Move a finished file out of scratch onto `dest`, replacing any previous
/// version in one step. Crossing file systems goes through a temporary file
/// next to `dest`.
pub fn publish(staged: &Path, dest: &Path) -> std::io::Result<()> {
    if std::fs::rename(staged, dest).is_ok() {
        return Ok(());
    }
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    std::io::copy(&mut std::fs::File::open(staged)?, &mut tmp)?;
    std::fs::set_permissions(tmp.path(), std::fs::metadata(staged)?.permissions())?;
    tmp.persist(dest).map_err(|e| e.error)?;
    remove_quietly(staged);
    Ok(())
}
