//! Speech engine backed by an external program.
//!
//! Each session owns a temp WAV path. The notes text is written to the
//! program's stdin, the program writes the WAV, and the session reads the
//! file back once the process has exited (the end-of-speech event).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context;
use slidecast_common::config::SpeechCommandConfig;
use slidecast_common::process::command_exists;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::engine::{SpeechAudio, SpeechSession, TextToSpeechEngine};

const OUTPUT_PLACEHOLDER: &str = "{output}";
const VOICE_PLACEHOLDER: &str = "{voice}";

/// Runs a text-to-speech command such as `espeak-ng --stdin -w {output}`.
#[derive(Debug, Clone)]
pub struct CommandSpeechEngine {
    program: String,
    args: Vec<String>,
    voice: Option<String>,
    scratch_dir: PathBuf,
}

impl CommandSpeechEngine {
    pub fn new(config: &SpeechCommandConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            voice: config.voice.clone(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Directory for the per-session WAV files.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Program arguments for one session writing to `output`.
    ///
    /// A configured voice with no `{voice}` placeholder in the arguments is
    /// passed as a leading `-v <voice>`.
    pub fn resolve_args(&self, output: &Path) -> Vec<String> {
        let output = output.display().to_string();
        let voice = self.voice.as_deref().unwrap_or_default();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                arg.replace(OUTPUT_PLACEHOLDER, &output)
                    .replace(VOICE_PLACEHOLDER, voice)
            })
            .collect();

        let has_voice_slot = self.args.iter().any(|arg| arg.contains(VOICE_PLACEHOLDER));
        if !voice.is_empty() && !has_voice_slot {
            args.insert(0, voice.to_string());
            args.insert(0, "-v".to_string());
        }
        args
    }
}

#[async_trait::async_trait]
impl TextToSpeechEngine for CommandSpeechEngine {
    async fn open_session(&self) -> anyhow::Result<Box<dyn SpeechSession>> {
        let output = tempfile::Builder::new()
            .prefix("slidecast-speech-")
            .suffix(".wav")
            .tempfile_in(&self.scratch_dir)
            .with_context(|| {
                format!(
                    "Failed to create speech output in {}",
                    self.scratch_dir.display()
                )
            })?
            .into_temp_path();

        let args = self.resolve_args(&output);
        Ok(Box::new(CommandSpeechSession {
            program: self.program.clone(),
            args,
            output,
        }))
    }

    fn is_available(&self) -> bool {
        command_exists(&self.program)
    }

    fn name(&self) -> &str {
        &self.program
    }
}

struct CommandSpeechSession {
    program: String,
    args: Vec<String>,
    output: TempPath,
}

#[async_trait::async_trait]
impl SpeechSession for CommandSpeechSession {
    async fn speak(&mut self, text: &str) -> anyhow::Result<SpeechAudio> {
        tracing::trace!(program = %self.program, args = ?self.args, "Starting speech command");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program))?;

        let mut stdin = child
            .stdin
            .take()
            .context("Failed to capture speech command stdin")?;
        // A program that exits without reading stdin is judged by its exit
        // status, not by the broken pipe.
        if let Err(e) = stdin.write_all(text.as_bytes()).await {
            tracing::debug!(error = %e, program = %self.program, "Speech command closed stdin early");
        }
        stdin.shutdown().await.ok();
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("Failed to wait on {}", self.program))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let wav = tokio::fs::read(&*self.output)
            .await
            .with_context(|| format!("Failed to read speech output {}", self.output.display()))?;
        if wav.is_empty() {
            anyhow::bail!("{} wrote no audio", self.program);
        }

        Ok(SpeechAudio::from_wav(wav))
    }
}
