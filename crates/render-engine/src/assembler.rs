//! Video assembly over a staged directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use slidecast_common::error::{SlidecastError, SlidecastResult};

use crate::mux::{MuxEngine, MuxRequest, MuxSegment, OutputGeometry};

/// Drives a mux engine once over a whole staging directory.
#[derive(Clone)]
pub struct VideoAssembler {
    engine: Arc<dyn MuxEngine>,
    geometry: OutputGeometry,
}

impl std::fmt::Debug for VideoAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoAssembler")
            .field("engine", &self.engine.name())
            .field("geometry", &self.geometry)
            .finish()
    }
}

impl VideoAssembler {
    pub fn new(engine: Arc<dyn MuxEngine>, geometry: OutputGeometry) -> Self {
        Self { engine, geometry }
    }

    pub fn engine(&self) -> &dyn MuxEngine {
        self.engine.as_ref()
    }

    /// Mux the staged `%d.<frame_ext>` / `%d.<audio_ext>` sequences in
    /// `staging_dir` into `output`.
    ///
    /// Every slide is shown for the length of its staged audio. On failure
    /// any partial `output` is removed.
    pub async fn assemble(
        &self,
        staging_dir: &Path,
        frame_extension: &str,
        audio_extension: &str,
        output: &Path,
    ) -> SlidecastResult<PathBuf> {
        let count = staged_sequence_len(staging_dir, frame_extension, audio_extension).await?;
        if count == 0 {
            return Err(SlidecastError::assembly("no slides to assemble"));
        }

        let mut segments = Vec::with_capacity(count);
        for index in 0..count {
            let audio = staging_dir.join(format!("{index}.{audio_extension}"));
            let duration_secs = staged_audio_secs(&audio).await?;
            segments.push(MuxSegment {
                index,
                duration_secs,
            });
        }

        let request = MuxRequest::new(
            staging_dir,
            frame_extension,
            audio_extension,
            segments,
            self.geometry,
            output,
        );

        tracing::info!(
            engine = self.engine.name(),
            slides = count,
            total_secs = request.total_secs(),
            "Assembling video"
        );

        if let Err(e) = self.engine.mux(&request).await {
            discard_partial(output).await;
            return Err(SlidecastError::assembly(format!(
                "{} failed: {e:#}",
                self.engine.name()
            )));
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => Ok(output.to_path_buf()),
            Ok(_) => {
                discard_partial(output).await;
                Err(SlidecastError::assembly(format!(
                    "{} reported success but wrote an empty file",
                    self.engine.name()
                )))
            }
            Err(e) => Err(SlidecastError::assembly(format!(
                "{} reported success but {} is missing: {e}",
                self.engine.name(),
                output.display()
            ))),
        }
    }
}

/// Number of staged slides in `staging_dir`.
///
/// Frame and audio indices must both be exactly `0..N`; anything else means
/// the positional sequence is broken and the mux would misalign slides.
pub async fn staged_sequence_len(
    staging_dir: &Path,
    frame_extension: &str,
    audio_extension: &str,
) -> SlidecastResult<usize> {
    let mut frames = BTreeSet::new();
    let mut audio = BTreeSet::new();

    let mut entries = tokio::fs::read_dir(staging_dir).await.map_err(|e| {
        SlidecastError::assembly(format!(
            "Failed to read staging directory {}: {e}",
            staging_dir.display()
        ))
    })?;
    while let Some(entry) = entries.next_entry().await.map_err(|e| {
        SlidecastError::assembly(format!(
            "Failed to read staging directory {}: {e}",
            staging_dir.display()
        ))
    })? {
        let path = entry.path();
        let (Some(stem), Some(ext)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.extension().and_then(|e| e.to_str()),
        ) else {
            continue;
        };
        let Ok(index) = stem.parse::<usize>() else {
            continue;
        };
        if ext == frame_extension {
            frames.insert(index);
        }
        if ext == audio_extension {
            audio.insert(index);
        }
    }

    let count = frames.len();
    let contiguous = |set: &BTreeSet<usize>| set.iter().copied().eq(0..set.len());
    if !contiguous(&frames) || !contiguous(&audio) || frames != audio {
        return Err(SlidecastError::assembly(format!(
            "Staged sequence is not contiguous: frames {:?}, audio {:?}",
            frames, audio
        )));
    }
    Ok(count)
}

async fn staged_audio_secs(path: &Path) -> SlidecastResult<u64> {
    let wav_path = path.to_path_buf();
    let secs = tokio::task::spawn_blocking(move || -> Result<u64, hound::Error> {
        let reader = hound::WavReader::open(&wav_path)?;
        let rate = u64::from(reader.spec().sample_rate.max(1));
        Ok(u64::from(reader.duration()).div_ceil(rate))
    })
    .await
    .map_err(|e| SlidecastError::assembly(format!("Audio length task failed: {e}")))?
    .map_err(|e| {
        SlidecastError::assembly(format!(
            "Failed to read staged audio {}: {e}",
            path.display()
        ))
    })?;

    if secs == 0 {
        return Err(SlidecastError::assembly(format!(
            "Staged audio {} is empty",
            path.display()
        )));
    }
    Ok(secs)
}

async fn discard_partial(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => tracing::debug!(path = %output.display(), "Removed partial mux output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(error = %e, path = %output.display(), "Failed to remove partial mux output")
        }
    }
}
