//! Temporary files for change detection tests.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

/// A temporary directory of watched files.
///
/// Modification times are moved forward explicitly instead of relying on
/// wall-clock time between writes, so change detection is deterministic on
/// file systems with coarse timestamps.
pub struct WatchedDir {
    temp_dir: TempDir,
}

impl Default for WatchedDir {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchedDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` to `name`, returning its canonical path.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        canonical(&path)
    }

    /// Rewrite `path` and move its modification time past both the
    /// previous one and the write itself.
    pub fn modify(&self, path: &Path, content: &str) {
        let before = fs::metadata(path).and_then(|m| m.modified()).ok();
        fs::write(path, content).unwrap();
        let written = fs::metadata(path).unwrap().modified().unwrap();
        let latest = before.map_or(written, |before| before.max(written));
        set_modified(path, latest + Duration::from_secs(5));
    }

    /// Move the modification time of `path` five seconds forward.
    pub fn touch(path: &Path) {
        let current = fs::metadata(path).unwrap().modified().unwrap();
        set_modified(path, current + Duration::from_secs(5));
    }
}

fn set_modified(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

fn canonical(path: &Path) -> PathBuf {
    contrib_deploy::ConfigLocation::from_path(path)
        .watch_path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.to_path_buf())
}
