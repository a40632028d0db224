//! Mux engine contract and the fixed encoding profile.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use slidecast_common::config::VideoConfig;

/// Video codec for every output.
pub const VIDEO_CODEC: &str = "libx264";
/// Audio codec for every output.
pub const AUDIO_CODEC: &str = "aac";
/// Pixel format for every output.
pub const PIXEL_FORMAT: &str = "yuv420p";
/// Container extension for every output.
pub const VIDEO_EXTENSION: &str = "mp4";
/// Audio bitrate for every output.
pub const AUDIO_BITRATE: &str = "192k";
/// Sample rate every segment's audio is resampled to before concatenation.
pub const OUTPUT_SAMPLE_RATE: u32 = 48_000;

/// Output frame geometry, applied uniformly to every slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputGeometry {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for OutputGeometry {
    fn default() -> Self {
        Self::from(&VideoConfig::default())
    }
}

impl From<&VideoConfig> for OutputGeometry {
    fn from(config: &VideoConfig) -> Self {
        // yuv420p needs even dimensions.
        Self {
            width: (config.width.max(2) / 2) * 2,
            height: (config.height.max(2) / 2) * 2,
            fps: config.fps.max(1),
        }
    }
}

/// How long slide `index` stays on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxSegment {
    pub index: usize,
    pub duration_secs: u64,
}

/// One mux invocation over a whole staged set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxRequest {
    /// `<staging>/%d.<frame-ext>`
    pub frame_pattern: PathBuf,

    /// `<staging>/%d.<audio-ext>`
    pub audio_pattern: PathBuf,

    /// One entry per staged index, in index order.
    pub segments: Vec<MuxSegment>,

    pub geometry: OutputGeometry,

    /// File the engine writes.
    pub output: PathBuf,
}

impl MuxRequest {
    /// Build a request for `staging_dir` with positional input patterns.
    pub fn new(
        staging_dir: &Path,
        frame_extension: &str,
        audio_extension: &str,
        segments: Vec<MuxSegment>,
        geometry: OutputGeometry,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            frame_pattern: staging_dir.join(format!("%d.{frame_extension}")),
            audio_pattern: staging_dir.join(format!("%d.{audio_extension}")),
            segments,
            geometry,
            output: output.into(),
        }
    }

    /// Frame file for `index`.
    pub fn frame_path(&self, index: usize) -> PathBuf {
        expand_pattern(&self.frame_pattern, index)
    }

    /// Audio file for `index`.
    pub fn audio_path(&self, index: usize) -> PathBuf {
        expand_pattern(&self.audio_pattern, index)
    }

    /// Total output duration.
    pub fn total_secs(&self) -> u64 {
        self.segments.iter().map(|s| s.duration_secs).sum()
    }
}

/// Substitute `index` for `%d` in the file-name part of `pattern`.
pub fn expand_pattern(pattern: &Path, index: usize) -> PathBuf {
    match pattern.file_name() {
        Some(name) => {
            let name = name.to_string_lossy().replace("%d", &index.to_string());
            pattern.with_file_name(name)
        }
        None => pattern.to_path_buf(),
    }
}

/// Encoding progress report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuxProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Seconds of output encoded so far.
    pub encoded_secs: f64,

    /// Expected output duration.
    pub total_secs: f64,

    /// Whether the engine reported the end of the stream.
    pub complete: bool,
}

/// Trait for mux backends (FFmpeg, GStreamer, test doubles).
#[async_trait::async_trait]
pub trait MuxEngine: Send + Sync {
    /// Encode the request's frame and audio sequences into `request.output`.
    ///
    /// Resolves once the engine has reported success or failure.
    async fn mux(&self, request: &MuxRequest) -> anyhow::Result<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool {
        true
    }

    /// Backend name.
    fn name(&self) -> &str;
}
