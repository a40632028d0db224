//! Per-slide narration synthesis.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use slidecast_common::config::NarrationConfig;
use slidecast_common::error::{SlidecastError, SlidecastResult};
use tempfile::TempPath;

use crate::clip::{bounded_clip_secs, write_bounded_wav, PcmAudio};
use crate::engine::TextToSpeechEngine;

/// A narrated clip on disk.
///
/// The backing temp file is removed when the clip is dropped, so clips from
/// an aborted run never outlive it.
#[derive(Debug)]
pub struct AudioClip {
    path: TempPath,

    /// Exported clip length in whole seconds.
    pub duration_secs: u64,

    /// Speech duration measured from the engine output.
    pub measured_secs: f64,
}

impl AudioClip {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clip file extension.
    pub fn extension(&self) -> &'static str {
        "wav"
    }
}

/// Turns notes text into duration-bounded clips through an injected
/// speech engine.
#[derive(Clone)]
pub struct NarrationSynthesizer {
    engine: Arc<dyn TextToSpeechEngine>,
    scratch_dir: PathBuf,
    min_clip_secs: u32,
}

impl std::fmt::Debug for NarrationSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationSynthesizer")
            .field("engine", &self.engine.name())
            .field("scratch_dir", &self.scratch_dir)
            .field("min_clip_secs", &self.min_clip_secs)
            .finish()
    }
}

impl NarrationSynthesizer {
    pub fn new(engine: Arc<dyn TextToSpeechEngine>) -> Self {
        Self {
            engine,
            scratch_dir: std::env::temp_dir(),
            min_clip_secs: 1,
        }
    }

    pub fn from_config(engine: Arc<dyn TextToSpeechEngine>, config: &NarrationConfig) -> Self {
        Self {
            engine,
            scratch_dir: config
                .scratch_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            min_clip_secs: config.min_clip_secs,
        }
    }

    /// Directory where clip files are created.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Shortest clip, for slides with nothing audible to say.
    pub fn with_min_clip_secs(mut self, secs: u32) -> Self {
        self.min_clip_secs = secs;
        self
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Synthesize `notes` into a clip.
    ///
    /// Opens a fresh engine session, waits for end of speech, measures the
    /// rendered audio and exports it rounded up to whole seconds.
    pub async fn synthesize(&self, notes: &str) -> SlidecastResult<AudioClip> {
        let mut session = self
            .engine
            .open_session()
            .await
            .map_err(|e| SlidecastError::synthesis(format!("Failed to open speech session: {e:#}")))?;

        let speech = session
            .speak(notes)
            .await
            .map_err(|e| SlidecastError::synthesis(format!("Speech engine failed: {e:#}")))?;
        drop(session);

        if speech.is_empty() {
            return Err(SlidecastError::synthesis(
                "Speech engine returned an empty buffer",
            ));
        }

        let audio = PcmAudio::decode_wav(speech.as_bytes())
            .map_err(|e| SlidecastError::synthesis(e.to_string()))?;

        if audio.frames() == 0 && !notes.trim().is_empty() {
            return Err(SlidecastError::synthesis(format!(
                "Speech engine produced no audio for {} characters of notes",
                notes.chars().count()
            )));
        }

        let measured_secs = audio.duration_secs();
        let duration_secs = bounded_clip_secs(audio.frames(), audio.sample_rate, self.min_clip_secs);

        let file = tempfile::Builder::new()
            .prefix("slidecast-narration-")
            .suffix(".wav")
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| {
                SlidecastError::synthesis(format!(
                    "Failed to create clip file in {}: {e}",
                    self.scratch_dir.display()
                ))
            })?;
        let path = file.into_temp_path();

        let path = tokio::task::spawn_blocking(move || {
            write_bounded_wav(&path, &audio, duration_secs).map(|()| path)
        })
        .await
        .map_err(|e| SlidecastError::synthesis(format!("Clip encoder task failed: {e}")))?
        .map_err(|e| SlidecastError::synthesis(e.to_string()))?;

        tracing::debug!(
            engine = self.engine.name(),
            path = %path.display(),
            measured_secs,
            duration_secs,
            "Narration clip written"
        );

        Ok(AudioClip {
            path,
            duration_secs,
            measured_secs,
        })
    }
}
