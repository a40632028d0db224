//! Per-run scratch workspace.

use std::io;
use std::path::{Path, PathBuf};

use slidecast_common::error::{SlidecastError, SlidecastResult};
use tempfile::TempDir;

use crate::outcome::CleanupReport;

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "slidecast-";

/// File name of the assembled video inside the workspace.
pub const INTERMEDIATE_VIDEO: &str = "assembled.mp4";

/// Filesystem deletions used by workspace cleanup.
#[async_trait::async_trait]
pub trait FileRemover: Send + Sync {
    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    async fn remove_dir(&self, path: &Path) -> io::Result<()>;

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// Deletes through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

#[async_trait::async_trait]
impl FileRemover for FsRemover {
    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn remove_dir(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_dir(path).await
    }

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_dir_all(path).await
    }
}

/// A uniquely named directory owned by exactly one run.
///
/// If a run is dropped without calling [`Workspace::cleanup`], the directory
/// is still removed recursively when the guard goes out of scope.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under `root`.
    pub fn create(root: &Path) -> SlidecastResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)
            .map_err(|e| {
                SlidecastError::workspace(format!(
                    "Cannot create workspace in {}: {e}",
                    root.display()
                ))
            })?;
        tracing::debug!(path = %dir.path().display(), "Created workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the assembled video is written before publishing.
    pub fn intermediate_video_path(&self) -> PathBuf {
        self.dir.path().join(INTERMEDIATE_VIDEO)
    }

    /// Delete every entry individually, then the directory itself.
    ///
    /// Never fails: anything that could not be removed is listed in the
    /// returned report. Entries that are already gone are not failures.
    pub async fn cleanup(self) -> CleanupReport {
        self.cleanup_with(&FsRemover).await
    }

    /// [`Workspace::cleanup`] with deletions routed through `remover`.
    pub async fn cleanup_with(self, remover: &dyn FileRemover) -> CleanupReport {
        let mut report = CleanupReport::default();
        let path = self.dir.path().to_path_buf();

        match tokio::fs::read_dir(&path).await {
            Ok(mut entries) => loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => remove_entry(remover, &entry.path(), &mut report).await,
                    Ok(None) => break,
                    Err(e) => {
                        report.record_failure(&path, format!("Failed to list workspace: {e}"));
                        break;
                    }
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Already removed from under us; nothing else to do.
                let _ = self.dir.keep();
                return report;
            }
            Err(e) => report.record_failure(&path, format!("Failed to list workspace: {e}")),
        }

        match remover.remove_dir(&path).await {
            Ok(()) => {
                report.record_removed();
                let _ = self.dir.keep();
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let _ = self.dir.keep();
            }
            Err(e) => {
                report.record_failure(&path, e.to_string());
                // Last resort: recursive removal of whatever is left.
                if let Err(e) = self.dir.close() {
                    tracing::warn!(error = %e, path = %path.display(), "Recursive workspace removal failed");
                }
            }
        }

        if report.is_clean() {
            tracing::debug!(path = %path.display(), removed = report.removed, "Workspace removed");
        } else {
            for failure in &report.failures {
                tracing::warn!("{failure}");
            }
        }
        report
    }
}

async fn remove_entry(remover: &dyn FileRemover, path: &Path, report: &mut CleanupReport) {
    let is_dir = tokio::fs::symlink_metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    let result = if is_dir {
        remover.remove_dir_all(path).await
    } else {
        remover.remove_file(path).await
    };
    match result {
        Ok(()) => report.record_removed(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => report.record_failure(path, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_is_unique_and_prefixed() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::create(root.path()).unwrap();
        let b = Workspace::create(root.path()).unwrap();

        assert_ne!(a.path(), b.path());
        let name = a.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(WORKSPACE_PREFIX));
        assert_eq!(a.path().parent().unwrap(), root.path());
        assert_eq!(
            a.intermediate_video_path(),
            a.path().join(INTERMEDIATE_VIDEO)
        );
    }

    #[tokio::test]
    async fn test_create_in_missing_root_fails() {
        let root = tempfile::tempdir().unwrap();
        let err = Workspace::create(&root.path().join("nope")).unwrap_err();
        assert!(matches!(err, SlidecastError::WorkspaceCreateFailed { .. }));
    }

    #[tokio::test]
    async fn test_cleanup_removes_every_entry_and_the_directory() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(root.path()).unwrap();
        let path = workspace.path().to_path_buf();
        std::fs::write(path.join("0.png"), b"a").unwrap();
        std::fs::write(path.join("0.wav"), b"b").unwrap();
        std::fs::write(workspace.intermediate_video_path(), b"c").unwrap();

        let report = workspace.cleanup().await;

        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.removed, 4);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    /// Refuses to delete `.png` files; everything else goes to disk.
    struct PngLockedRemover;

    #[async_trait::async_trait]
    impl FileRemover for PngLockedRemover {
        async fn remove_file(&self, path: &Path) -> io::Result<()> {
            if path.extension().is_some_and(|ext| ext == "png") {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
            }
            FsRemover.remove_file(path).await
        }

        async fn remove_dir(&self, path: &Path) -> io::Result<()> {
            FsRemover.remove_dir(path).await
        }

        async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
            FsRemover.remove_dir_all(path).await
        }
    }

    #[tokio::test]
    async fn test_cleanup_reports_entries_it_could_not_delete() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(root.path()).unwrap();
        let path = workspace.path().to_path_buf();
        std::fs::write(path.join("0.png"), b"a").unwrap();
        std::fs::write(path.join("0.wav"), b"b").unwrap();

        let report = workspace.cleanup_with(&PngLockedRemover).await;

        assert!(!report.is_clean());
        assert_eq!(report.removed, 1);
        assert_eq!(report.failures.len(), 2, "{report:?}");
        assert!(report.failures[0].to_string().contains("0.png"));
        assert!(report.failures[1].to_string().contains(&*path.to_string_lossy()));
        // The recursive fallback still takes the directory away.
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_of_vanished_workspace_is_clean() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(root.path()).unwrap();
        std::fs::remove_dir(workspace.path()).unwrap();

        let report = workspace.cleanup().await;
        assert!(report.is_clean());
        assert_eq!(report.removed, 0);
    }
}
