//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlidecastConfig {
    /// Narration (text-to-speech) settings.
    pub narration: NarrationConfig,

    /// Output video settings.
    pub video: VideoConfig,

    /// Directory in which per-run workspaces are created.
    /// `None` places them next to the input deck.
    pub workspace_root: Option<PathBuf>,

    /// Maximum number of slides staged concurrently.
    pub staging_concurrency: usize,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Narration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Shortest clip a slide can get, in whole seconds.
    /// Slides with empty or silent notes are padded to this length.
    pub min_clip_secs: u32,

    /// Maximum number of slides narrated concurrently.
    pub concurrency: usize,

    /// Directory for per-slide clip files. `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,

    /// External speech command.
    pub command: SpeechCommandConfig,
}

/// External text-to-speech program invocation.
///
/// `{output}` in `args` is replaced with the WAV path the program must
/// write; `{voice}` with the configured voice. Notes text is written to the
/// program's stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechCommandConfig {
    pub program: String,
    pub args: Vec<String>,
    pub voice: Option<String>,
}

/// Output video parameters. Applied uniformly to every slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,

    /// ffmpeg binary to invoke.
    pub ffmpeg_path: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "slidecast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for SlidecastConfig {
    fn default() -> Self {
        Self {
            narration: NarrationConfig::default(),
            video: VideoConfig::default(),
            workspace_root: None,
            staging_concurrency: 4,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            min_clip_secs: 1,
            concurrency: 1,
            scratch_dir: None,
            command: SpeechCommandConfig::default(),
        }
    }
}

impl Default for SpeechCommandConfig {
    fn default() -> Self {
        Self {
            program: "espeak-ng".to_string(),
            args: vec![
                "--stdin".to_string(),
                "-w".to_string(),
                "{output}".to_string(),
            ],
            voice: None,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl SlidecastConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from `path`, falling back to defaults when the file is
    /// missing or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("slidecast").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SlidecastConfig::default();
        assert_eq!(config.narration.min_clip_secs, 1);
        assert_eq!(config.narration.command.program, "espeak-ng");
        assert_eq!(config.video.fps, 30);
        assert!(config.workspace_root.is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "video": { "width": 1280 }, "staging_concurrency": 2 }"#;
        let config: SlidecastConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.video.width, 1280);
        assert_eq!(config.video.height, 1080);
        assert_eq!(config.staging_concurrency, 2);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_and_load_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = SlidecastConfig::default();
        config.narration.concurrency = 3;
        config.narration.command.voice = Some("en-us".to_string());
        config.save_to(&path).unwrap();

        let loaded = SlidecastConfig::load_from(&path);
        assert_eq!(loaded.narration.concurrency, 3);
        assert_eq!(loaded.narration.command.voice.as_deref(), Some("en-us"));
    }

    #[test]
    fn test_unparsable_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = SlidecastConfig::load_from(&path);
        assert_eq!(loaded.staging_concurrency, 4);
    }
}
