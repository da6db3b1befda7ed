//! Request-scoped scratch directories.
//!
//! A [`Workspace`] owns a [`TempDir`]. It is removed either by an explicit
//! [`Workspace::release`] or, on every other exit path (early `?` return,
//! panic unwind, a dropped response stream), by `Drop`. `release` consumes
//! the workspace, so a directory can never be removed twice.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const WORKSPACE_PREFIX: &str = "convertkit-";

/// An isolated, uniquely-named scratch directory for one conversion job.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh directory under `root`, or the OS temp dir when `None`.
    pub fn acquire(root: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        debug!("Acquired workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `<base>.<extension>` inside this workspace.
    pub fn file(&self, base: &str, extension: &str) -> PathBuf {
        self.dir.path().join(format!("{base}.{extension}"))
    }

    /// Remove the directory and everything in it.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Released workspace {}", path.display()),
            Err(e) => warn!("Failed to remove workspace {}: {}", path.display(), e),
        }
    }

    /// [`release`](Self::release) on the blocking pool when inside a tokio
    /// runtime, inline otherwise.
    pub fn release_in_background(self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || self.release());
            }
            Err(_) => self.release(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_creates_unique_dirs() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::acquire(Some(root.path())).unwrap();
        let b = Workspace::acquire(Some(root.path())).unwrap();
        assert!(a.path().is_dir());
        assert!(b.path().is_dir());
        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(root.path()));
    }

    #[test]
    fn test_release_removes_contents() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(Some(root.path())).unwrap();
        let path = ws.path().to_path_buf();
        std::fs::write(ws.file("report", "pdf"), b"%PDF").unwrap();
        std::fs::create_dir(path.join("nested")).unwrap();
        ws.release();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_dir() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::acquire(Some(root.path())).unwrap();
            std::fs::write(ws.file("a", "png"), b"x").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_on_error_path() {
        fn failing(root: &Path) -> io::Result<()> {
            let ws = Workspace::acquire(Some(root))?;
            std::fs::write(ws.file("in", "doc"), b"x")?;
            Err(io::Error::other("backend exploded"))
        }
        let root = tempfile::tempdir().unwrap();
        assert!(failing(root.path()).is_err());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_root_is_created() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("scratch").join("jobs");
        let ws = Workspace::acquire(Some(&nested)).unwrap();
        assert!(ws.path().starts_with(&nested));
    }

    #[tokio::test]
    async fn test_release_in_background() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(Some(root.path())).unwrap();
        let path = ws.path().to_path_buf();
        ws.release_in_background();
        for _ in 0..100 {
            if !path.exists() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("workspace {} was not removed", path.display());
    }

    #[test]
    fn test_release_in_background_without_runtime() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(Some(root.path())).unwrap();
        let path = ws.path().to_path_buf();
        ws.release_in_background();
        assert!(!path.exists());
    }

    #[test]
    fn test_file_naming() {
        let ws = Workspace::acquire(None).unwrap();
        assert_eq!(ws.file("photo", "bmp"), ws.path().join("photo.bmp"));
    }
}
