//! Positional staging of slide assets.
//!
//! Slide `i` is staged as `<i>.<image-ext>` and `<i>.<audio-ext>` in the
//! staging directory. The mux engine addresses frame N and audio N by these
//! names, so the index set has to stay contiguous from zero.

use std::path::{Path, PathBuf};

use slidecast_common::error::{SlidecastError, SlidecastResult};

/// The two files staged for one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSlide {
    pub index: usize,
    pub image: PathBuf,
    pub audio: PathBuf,
}

/// Canonical staged file name for `index`.
pub fn staged_file_name(index: usize, extension: &str) -> String {
    format!("{index}.{extension}")
}

/// Lowercased extension of `path`, if it has one.
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Copy a slide's image and narration into `staging_dir` under the
/// positional names for `index`.
///
/// Both files are copied byte-for-byte; the sources are left in place.
pub async fn stage_slide(
    image: &Path,
    audio: &Path,
    index: usize,
    staging_dir: &Path,
) -> SlidecastResult<StagedSlide> {
    let image_ext = file_extension(image).ok_or_else(|| {
        SlidecastError::staging(format!(
            "Slide {index} image {} has no file extension",
            image.display()
        ))
    })?;
    let audio_ext = file_extension(audio).ok_or_else(|| {
        SlidecastError::staging(format!(
            "Slide {index} audio {} has no file extension",
            audio.display()
        ))
    })?;

    let staged_image = staging_dir.join(staged_file_name(index, &image_ext));
    let staged_audio = staging_dir.join(staged_file_name(index, &audio_ext));

    copy_asset(image, &staged_image, index, "image").await?;
    copy_asset(audio, &staged_audio, index, "audio").await?;

    tracing::trace!(
        index,
        image = %staged_image.display(),
        audio = %staged_audio.display(),
        "Slide staged"
    );

    Ok(StagedSlide {
        index,
        image: staged_image,
        audio: staged_audio,
    })
}

async fn copy_asset(from: &Path, to: &Path, index: usize, what: &str) -> SlidecastResult<u64> {
    tokio::fs::copy(from, to).await.map_err(|e| {
        SlidecastError::staging(format!(
            "Failed to stage slide {index} {what} {} -> {}: {e}",
            from.display(),
            to.display()
        ))
    })
}
