//! Copy-after-complete publishing of the assembled video.

use std::path::{Path, PathBuf};

use slidecast_common::error::{SlidecastError, SlidecastResult};

/// Default published location for `deck_path`: same directory, same stem,
/// `extension` in place of the deck's own.
pub fn destination_path(deck_path: &Path, extension: &str) -> PathBuf {
    deck_path.with_extension(extension)
}

/// Copy the finished `intermediate` video to `destination`.
///
/// Only called once assembly has succeeded. An existing destination is
/// overwritten. If the copy fails part way, the partial destination is
/// removed so no truncated video is left behind.
pub async fn publish(intermediate: &Path, destination: &Path) -> SlidecastResult<u64> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            SlidecastError::publish(format!("Cannot create {}: {e}", parent.display()))
        })?;
    }

    match tokio::fs::copy(intermediate, destination).await {
        Ok(bytes) => {
            tracing::info!(
                path = %destination.display(),
                bytes,
                "Published video"
            );
            Ok(bytes)
        }
        Err(e) => {
            match tokio::fs::remove_file(destination).await {
                Ok(()) => {
                    tracing::debug!(path = %destination.display(), "Removed partial publish")
                }
                Err(remove) if remove.kind() == std::io::ErrorKind::NotFound => {}
                Err(remove) => tracing::warn!(
                    error = %remove,
                    path = %destination.display(),
                    "Failed to remove partial publish"
                ),
            }
            Err(SlidecastError::publish(format!(
                "Cannot copy {} to {}: {e}",
                intermediate.display(),
                destination.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_replaces_extension_in_place() {
        assert_eq!(
            destination_path(Path::new("/decks/talk.pptx"), "mp4"),
            PathBuf::from("/decks/talk.mp4")
        );
        assert_eq!(
            destination_path(Path::new("talk.v2.pptx"), "mp4"),
            PathBuf::from("talk.v2.mp4")
        );
        assert_eq!(
            destination_path(Path::new("/decks/talk"), "mp4"),
            PathBuf::from("/decks/talk.mp4")
        );
    }

    #[tokio::test]
    async fn test_publish_copies_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("assembled.mp4");
        let dest = dir.path().join("talk.mp4");
        std::fs::write(&source, b"new video").unwrap();
        std::fs::write(&dest, b"stale").unwrap();

        let bytes = publish(&source, &dest).await.unwrap();

        assert_eq!(bytes, 9);
        assert_eq!(std::fs::read(&dest).unwrap(), b"new video");
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_missing_source_is_publish_failed_without_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("talk.mp4");

        let err = publish(&dir.path().join("missing.mp4"), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, SlidecastError::PublishFailed { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_creates_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("assembled.mp4");
        std::fs::write(&source, b"v").unwrap();
        let dest = dir.path().join("out/nested/talk.mp4");

        publish(&source, &dest).await.unwrap();
        assert!(dest.exists());
    }
}
