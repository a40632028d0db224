//! FFmpeg mux backend.
//!
//! One `ffmpeg` process per request. Each staged index contributes a looped
//! still image trimmed to its narration length plus the narration itself;
//! a `concat` filter joins the segments in index order.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use slidecast_common::config::VideoConfig;
use slidecast_common::process::command_exists;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::mux::{
    MuxEngine, MuxProgress, MuxRequest, OutputGeometry, AUDIO_BITRATE, AUDIO_CODEC,
    OUTPUT_SAMPLE_RATE, PIXEL_FORMAT, VIDEO_CODEC,
};

/// Progress callback for mux encoding.
pub type MuxProgressCallback = Arc<dyn Fn(MuxProgress) + Send + Sync>;

/// Mux engine that shells out to ffmpeg.
#[derive(Clone)]
pub struct FfmpegMuxer {
    binary: String,
    progress: Option<MuxProgressCallback>,
}

impl std::fmt::Debug for FfmpegMuxer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegMuxer")
            .field("binary", &self.binary)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegMuxer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            progress: None,
        }
    }

    pub fn from_config(config: &VideoConfig) -> Self {
        Self::new(config.ffmpeg_path.clone())
    }

    /// Receive progress reports while encoding.
    pub fn with_progress(mut self, callback: MuxProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Full ffmpeg argument list for `request`.
    pub fn build_args(request: &MuxRequest) -> Vec<String> {
        let geometry = request.geometry;
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-nostats".to_string(),
            "-progress".to_string(),
            "pipe:1".to_string(),
        ];

        for segment in &request.segments {
            args.push("-loop".to_string());
            args.push("1".to_string());
            args.push("-framerate".to_string());
            args.push(geometry.fps.to_string());
            args.push("-t".to_string());
            args.push(segment.duration_secs.to_string());
            args.push("-i".to_string());
            args.push(request.frame_path(segment.index).display().to_string());

            args.push("-i".to_string());
            args.push(request.audio_path(segment.index).display().to_string());
        }

        args.push("-filter_complex".to_string());
        args.push(build_filter_graph(request.segments.len(), geometry));
        args.push("-map".to_string());
        args.push("[vout]".to_string());
        args.push("-map".to_string());
        args.push("[aout]".to_string());
        args.push("-r".to_string());
        args.push(geometry.fps.to_string());

        args.append(&mut codec_args());

        args.push(request.output.display().to_string());
        args
    }
}

#[async_trait::async_trait]
impl MuxEngine for FfmpegMuxer {
    async fn mux(&self, request: &MuxRequest) -> anyhow::Result<()> {
        if request.segments.is_empty() {
            anyhow::bail!("nothing to mux");
        }

        let args = Self::build_args(request);
        tracing::debug!(args = ?args, "Running ffmpeg");

        let start = std::time::Instant::now();
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.binary))?;

        tracing::info!(
            pid = child.id(),
            segments = request.segments.len(),
            total_secs = request.total_secs(),
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .context("Failed to capture ffmpeg stdout")?;
        let mut stderr = child
            .stderr
            .take()
            .context("Failed to capture ffmpeg stderr")?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let total_secs = request.total_secs() as f64;
        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        while let Some(line) = lines
            .next_line()
            .await
            .context("Failed reading ffmpeg progress")?
        {
            let trimmed = line.trim();
            let Some((key, value)) = trimmed.split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key == "progress" {
                let report = progress_report(&state, total_secs);
                tracing::trace!(
                    encoded_secs = report.encoded_secs,
                    progress = report.progress,
                    "ffmpeg progress"
                );
                if let Some(cb) = &self.progress {
                    cb(report);
                }
            }
        }

        let status = child.wait().await.context("Failed to wait on ffmpeg")?;
        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            anyhow::bail!(
                "ffmpeg failed (status {}): {}",
                status,
                stderr_output.trim()
            );
        }

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            output = %request.output.display(),
            "ffmpeg finished"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Filter graph normalizing every segment and concatenating them in order.
///
/// Inputs alternate image, audio: segment `i` is image input `2i` and audio
/// input `2i + 1`.
pub fn build_filter_graph(segments: usize, geometry: OutputGeometry) -> String {
    let OutputGeometry { width, height, .. } = geometry;
    let mut graph = String::new();
    let mut concat_inputs = String::new();

    for i in 0..segments {
        let video_input = 2 * i;
        let audio_input = 2 * i + 1;
        graph.push_str(&format!(
            "[{video_input}:v]scale={width}:{height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,format={PIXEL_FORMAT}[v{i}];"
        ));
        graph.push_str(&format!(
            "[{audio_input}:a]aresample={OUTPUT_SAMPLE_RATE},\
             aformat=sample_fmts=fltp:channel_layouts=stereo[a{i}];"
        ));
        concat_inputs.push_str(&format!("[v{i}][a{i}]"));
    }

    graph.push_str(&format!(
        "{concat_inputs}concat=n={segments}:v=1:a=1[vout][aout]"
    ));
    graph
}

/// The fixed codec profile.
fn codec_args() -> Vec<String> {
    vec![
        "-c:v".to_string(),
        VIDEO_CODEC.to_string(),
        "-preset".to_string(),
        "medium".to_string(),
        "-tune".to_string(),
        "stillimage".to_string(),
        "-pix_fmt".to_string(),
        PIXEL_FORMAT.to_string(),
        "-c:a".to_string(),
        AUDIO_CODEC.to_string(),
        "-b:a".to_string(),
        AUDIO_BITRATE.to_string(),
        "-fflags".to_string(),
        "+bitexact".to_string(),
        "-flags:v".to_string(),
        "+bitexact".to_string(),
        "-flags:a".to_string(),
        "+bitexact".to_string(),
        "-map_metadata".to_string(),
        "-1".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
    ]
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(state: &ProgressState, total_secs: f64) -> MuxProgress {
    let progress = if state.complete {
        1.0
    } else if total_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / total_secs).clamp(0.0, 1.0)
    };

    MuxProgress {
        progress,
        encoded_secs: state.out_time_secs,
        total_secs,
        complete: state.complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::MuxSegment;
    use std::path::{Path, PathBuf};

    fn request(segments: &[u64]) -> MuxRequest {
        MuxRequest::new(
            Path::new("/stage"),
            "png",
            "wav",
            segments
                .iter()
                .enumerate()
                .map(|(index, secs)| MuxSegment {
                    index,
                    duration_secs: *secs,
                })
                .collect(),
            OutputGeometry {
                width: 1280,
                height: 720,
                fps: 25,
            },
            PathBuf::from("/stage/assembled.mp4"),
        )
    }

    #[test]
    fn test_args_reference_inputs_in_index_order() {
        let args = FfmpegMuxer::build_args(&request(&[3, 1]));
        let inputs: Vec<&str> = args
            .windows(2)
            .filter(|pair| pair[0] == "-i")
            .map(|pair| pair[1].as_str())
            .collect();
        assert_eq!(
            inputs,
            ["/stage/0.png", "/stage/0.wav", "/stage/1.png", "/stage/1.wav"]
        );
        assert_eq!(args.last().unwrap(), "/stage/assembled.mp4");
    }

    #[test]
    fn test_args_trim_each_still_to_its_narration() {
        let args = FfmpegMuxer::build_args(&request(&[3, 1]));
        let durations: Vec<&str> = args
            .windows(2)
            .filter(|pair| pair[0] == "-t")
            .map(|pair| pair[1].as_str())
            .collect();
        assert_eq!(durations, ["3", "1"]);
    }

    #[test]
    fn test_args_use_fixed_codecs() {
        let args = FfmpegMuxer::build_args(&request(&[1]));
        let joined = args.join(" ");
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-pix_fmt yuv420p"));
    }

    #[test]
    fn test_filter_graph_concats_all_segments() {
        let graph = build_filter_graph(
            3,
            OutputGeometry {
                width: 640,
                height: 360,
                fps: 30,
            },
        );
        assert!(graph.starts_with("[0:v]scale=640:360"));
        assert!(graph.contains("[5:a]aresample=48000"));
        assert!(graph.ends_with("[v0][a0][v1][a1][v2][a2]concat=n=3:v=1:a=1[vout][aout]"));
    }

    #[test]
    fn test_progress_report_clamps_and_completes() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "1500000");
        state.update("progress", "continue");
        let report = progress_report(&state, 3.0);
        assert!((report.progress - 0.5).abs() < 1e-9);
        assert!(!report.complete);

        state.update("out_time_us", "9000000");
        assert!((progress_report(&state, 3.0).progress - 1.0).abs() < 1e-9);

        state.update("progress", "end");
        assert!(progress_report(&state, 0.0).complete);
    }

    #[tokio::test]
    async fn test_failed_process_reports_stderr() {
        // `sh` rejects ffmpeg's arguments and exits non-zero with a message.
        let muxer = FfmpegMuxer::new("sh");
        let err = muxer.mux(&request(&[1])).await.unwrap_err();
        assert!(format!("{err:#}").contains("ffmpeg failed"));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_start() {
        let muxer = FfmpegMuxer::new("/definitely/missing/ffmpeg");
        assert!(!muxer.is_available());
        let err = muxer.mux(&request(&[1])).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to start"));
    }
}
