//! Deck-to-video orchestration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use slidecast_common::config::SlidecastConfig;
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_deck_model::{deck_directory, rich_cards, DeckParser, RichCard};
use slidecast_narration::{AudioClip, NarrationSynthesizer, TextToSpeechEngine};
use slidecast_render_engine::{
    file_extension, stage_slide, MuxEngine, OutputGeometry, StagedSlide, VideoAssembler,
    VIDEO_EXTENSION,
};
use tracing::Instrument;

use crate::outcome::{CleanupReport, PipelineFailure, PipelineOutput};
use crate::publish::{destination_path, publish};
use crate::state::{PipelineEvent, PipelineProgressCallback, PipelineState};
use crate::workspace::{FileRemover, FsRemover, Workspace};

/// Frame extension used when no slide has one to offer.
const DEFAULT_FRAME_EXTENSION: &str = "png";

/// Knobs for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Where the workspace is created. `None` means the deck's directory.
    pub workspace_root: Option<PathBuf>,

    /// Slides narrated at once.
    pub narration_concurrency: usize,

    /// Slides staged at once.
    pub staging_concurrency: usize,

    /// Published location. `None` means `<deck-dir>/<deck-stem>.mp4`.
    pub output_path: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&SlidecastConfig::default())
    }
}

impl From<&SlidecastConfig> for PipelineOptions {
    fn from(config: &SlidecastConfig) -> Self {
        Self {
            workspace_root: config.workspace_root.clone(),
            narration_concurrency: config.narration.concurrency.max(1),
            staging_concurrency: config.staging_concurrency.max(1),
            output_path: None,
        }
    }
}

/// Turns one slide deck into one narrated video.
///
/// A pipeline is single-use: [`Pipeline::run`] consumes it, so each run gets
/// its own state machine and workspace.
pub struct Pipeline {
    parser: Arc<dyn DeckParser>,
    synthesizer: NarrationSynthesizer,
    assembler: VideoAssembler,
    options: PipelineOptions,
    progress: Option<PipelineProgressCallback>,
    remover: Arc<dyn FileRemover>,
    state: PipelineState,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("parser", &self.parser.name())
            .field("synthesizer", &self.synthesizer)
            .field("assembler", &self.assembler)
            .field("options", &self.options)
            .field("state", &self.state)
            .finish()
    }
}

/// What a successful `execute` hands back before cleanup.
struct CompletedRun {
    video_path: PathBuf,
    rich_cards: Vec<RichCard>,
    clip_secs: Vec<u64>,
}

impl Pipeline {
    pub fn new(
        parser: Arc<dyn DeckParser>,
        synthesizer: NarrationSynthesizer,
        assembler: VideoAssembler,
    ) -> Self {
        Self {
            parser,
            synthesizer,
            assembler,
            options: PipelineOptions::default(),
            progress: None,
            remover: Arc::new(FsRemover),
            state: PipelineState::Start,
        }
    }

    /// Wire a pipeline from configuration and the three external engines.
    pub fn from_config(
        parser: Arc<dyn DeckParser>,
        speech: Arc<dyn TextToSpeechEngine>,
        mux: Arc<dyn MuxEngine>,
        config: &SlidecastConfig,
    ) -> Self {
        let synthesizer = NarrationSynthesizer::from_config(speech, &config.narration);
        let assembler = VideoAssembler::new(mux, OutputGeometry::from(&config.video));
        Self::new(parser, synthesizer, assembler).with_options(PipelineOptions::from(config))
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Publish to `path` instead of next to the deck.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.output_path = Some(path.into());
        self
    }

    pub fn with_progress(mut self, callback: PipelineProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Route workspace cleanup deletions through `remover`.
    pub fn with_remover(mut self, remover: Arc<dyn FileRemover>) -> Self {
        self.remover = remover;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Render `deck_path` into a video.
    ///
    /// The workspace is cleaned up on every exit path. On failure the
    /// returned [`PipelineFailure`] carries the first fatal error, the state
    /// it happened in and anything cleanup could not remove.
    pub async fn run(self, deck_path: &Path) -> Result<PipelineOutput, PipelineFailure> {
        let span = tracing::info_span!("pipeline", deck = %deck_path.display());
        self.run_inner(deck_path).instrument(span).await
    }

    async fn run_inner(mut self, deck_path: &Path) -> Result<PipelineOutput, PipelineFailure> {
        let started_at: DateTime<Utc> = Utc::now();
        let clock = Instant::now();
        tracing::info!(
            parser = self.parser.name(),
            speech = self.synthesizer.engine_name(),
            mux = self.assembler.engine().name(),
            "Starting pipeline"
        );

        let mut workspace = None;
        let result = self.execute(deck_path, &mut workspace).await;
        let failed_in = self.state;

        if let Err(error) = &result {
            tracing::error!(
                state = %failed_in,
                kind = ?error.kind(),
                error = %error,
                "Pipeline failed"
            );
            self.transition(PipelineState::Failed);
        }

        let cleanup = match workspace {
            Some(workspace) => workspace.cleanup_with(self.remover.as_ref()).await,
            None => CleanupReport::default(),
        };

        match result {
            Ok(run) => {
                self.transition(PipelineState::CleanedUp);
                self.transition(PipelineState::Done);
                let elapsed_secs = clock.elapsed().as_secs_f64();
                tracing::info!(
                    path = %run.video_path.display(),
                    slides = run.rich_cards.len(),
                    video_secs = run.clip_secs.iter().sum::<u64>(),
                    elapsed_secs,
                    cleanup_failures = cleanup.failures.len(),
                    "Pipeline complete"
                );
                Ok(PipelineOutput {
                    video_path: run.video_path,
                    rich_cards: run.rich_cards,
                    clip_secs: run.clip_secs,
                    started_at,
                    elapsed_secs,
                    cleanup,
                })
            }
            Err(error) => Err(PipelineFailure {
                error,
                failed_in,
                cleanup,
            }),
        }
    }

    async fn execute(
        &mut self,
        deck_path: &Path,
        workspace: &mut Option<Workspace>,
    ) -> SlidecastResult<CompletedRun> {
        if !self.assembler.engine().is_available() {
            return Err(SlidecastError::unsupported(format!(
                "Mux engine '{}' is not available on this system",
                self.assembler.engine().name()
            )));
        }

        let destination = self
            .options
            .output_path
            .clone()
            .unwrap_or_else(|| destination_path(deck_path, VIDEO_EXTENSION));
        if destination == deck_path {
            return Err(SlidecastError::config(format!(
                "Output {} would overwrite the deck",
                destination.display()
            )));
        }

        let slides = self
            .parser
            .extract_all_slides(deck_path)
            .await
            .map_err(|e| SlidecastError::extraction(format!("{}: {e:#}", self.parser.name())))?;
        let deck_dir = deck_directory(deck_path);
        let cards = rich_cards(&slides, &deck_dir);
        tracing::info!(slides = cards.len(), "Extracted slides");
        self.transition(PipelineState::Extracted);

        let clips = self.narrate_all(&cards).await?;
        let clip_secs: Vec<u64> = clips.iter().map(|clip| clip.duration_secs).collect();
        self.transition(PipelineState::NarratedAll);

        let root = self.options.workspace_root.clone().unwrap_or(deck_dir);
        let workspace = workspace.insert(Workspace::create(&root)?);

        let frame_ext = frame_extension(&cards)?;
        let audio_ext = clips.first().map_or("wav", AudioClip::extension);
        self.stage_all(&cards, &clips, workspace.path()).await?;
        // Staged copies are all the mux needs; release the scratch clips now.
        drop(clips);
        self.transition(PipelineState::Staged);

        let intermediate = workspace.intermediate_video_path();
        self.assembler
            .assemble(workspace.path(), &frame_ext, audio_ext, &intermediate)
            .await?;
        self.transition(PipelineState::Assembled);

        publish(&intermediate, &destination).await?;
        self.transition(PipelineState::Published);

        Ok(CompletedRun {
            video_path: destination,
            rich_cards: cards,
            clip_secs,
        })
    }

    /// Synthesize every slide's notes, at most `narration_concurrency` at a
    /// time. Clips come back in slide order whatever order they finish in.
    async fn narrate_all(&self, cards: &[RichCard]) -> SlidecastResult<Vec<AudioClip>> {
        let total = cards.len();
        let completed = AtomicUsize::new(0);
        let completed = &completed;

        stream::iter(cards.iter().enumerate())
            .map(|(index, card)| async move {
                let clip = self
                    .synthesizer
                    .synthesize(&card.notes)
                    .await
                    .map_err(|e| at_slide(index, e))?;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!(
                    index,
                    duration_secs = clip.duration_secs,
                    measured_secs = clip.measured_secs,
                    "Narrated slide"
                );
                self.emit(&PipelineEvent::SlideNarrated {
                    index,
                    completed: done,
                    total,
                    duration_secs: clip.duration_secs,
                });
                Ok::<_, SlidecastError>(clip)
            })
            .buffered(self.options.narration_concurrency.max(1))
            .try_collect()
            .await
    }

    /// Stage slide `i`'s image and clip as `i.<ext>` in `staging_dir`.
    async fn stage_all(
        &self,
        cards: &[RichCard],
        clips: &[AudioClip],
        staging_dir: &Path,
    ) -> SlidecastResult<Vec<StagedSlide>> {
        let total = cards.len();
        let completed = AtomicUsize::new(0);
        let completed = &completed;

        stream::iter(cards.iter().zip(clips).enumerate())
            .map(|(index, (card, clip))| async move {
                let staged = stage_slide(&card.image, clip.path(), index, staging_dir).await?;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                self.emit(&PipelineEvent::SlideStaged {
                    index,
                    completed: done,
                    total,
                });
                Ok::<_, SlidecastError>(staged)
            })
            .buffered(self.options.staging_concurrency.max(1))
            .try_collect()
            .await
    }

    fn transition(&mut self, to: PipelineState) {
        let from = self.state;
        debug_assert!(
            from.can_transition_to(to),
            "illegal pipeline transition {from} -> {to}"
        );
        self.state = to;
        tracing::debug!(%from, %to, "Pipeline state changed");
        self.emit(&PipelineEvent::StateChanged { from, to });
    }

    fn emit(&self, event: &PipelineEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }
}

/// The single frame extension shared by every slide image.
fn frame_extension(cards: &[RichCard]) -> SlidecastResult<String> {
    let found: BTreeSet<String> = cards
        .iter()
        .filter_map(|card| file_extension(&card.image))
        .collect();
    if found.len() > 1 {
        let formats: Vec<&str> = found.iter().map(String::as_str).collect();
        return Err(SlidecastError::staging(format!(
            "Slides mix image formats ({}); convert them to one format",
            formats.join(", ")
        )));
    }
    Ok(found
        .into_iter()
        .next()
        .unwrap_or_else(|| DEFAULT_FRAME_EXTENSION.to_string()))
}

fn at_slide(index: usize, error: SlidecastError) -> SlidecastError {
    match error {
        SlidecastError::SynthesisFailed { message } => {
            SlidecastError::synthesis(format!("slide {index}: {message}"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(image: &str) -> RichCard {
        RichCard {
            title: String::new(),
            image: PathBuf::from(image),
            notes: String::new(),
        }
    }

    #[test]
    fn test_frame_extension_is_shared_and_lowercased() {
        let cards = [card("/d/a.PNG"), card("/d/b.png")];
        assert_eq!(frame_extension(&cards).unwrap(), "png");
    }

    #[test]
    fn test_mixed_frame_extensions_are_rejected() {
        let cards = [card("/d/a.png"), card("/d/b.jpg")];
        let err = frame_extension(&cards).unwrap_err();
        assert!(matches!(err, SlidecastError::StagingFailed { .. }));
        assert!(err.to_string().contains("jpg, png"));
    }

    #[test]
    fn test_no_slides_defaults_to_png() {
        assert_eq!(frame_extension(&[]).unwrap(), "png");
    }

    #[test]
    fn test_options_clamp_concurrency() {
        let mut config = SlidecastConfig::default();
        config.narration.concurrency = 0;
        config.staging_concurrency = 0;
        let options = PipelineOptions::from(&config);
        assert_eq!(options.narration_concurrency, 1);
        assert_eq!(options.staging_concurrency, 1);
        assert_eq!(options.output_path, None);
    }

    #[test]
    fn test_synthesis_errors_name_the_slide() {
        let err = at_slide(3, SlidecastError::synthesis("engine crashed"));
        assert_eq!(err.to_string(), "Synthesis failed: slide 3: engine crashed");
        let err = at_slide(3, SlidecastError::staging("x"));
        assert_eq!(err.to_string(), "Staging failed: x");
    }
}
