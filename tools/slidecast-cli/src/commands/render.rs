//! Render a deck into a narrated video.

use std::path::PathBuf;
use std::sync::Arc;

use slidecast_common::config::SlidecastConfig;
use slidecast_deck_model::ManifestDeckParser;
use slidecast_narration::CommandSpeechEngine;
use slidecast_pipeline::{Pipeline, PipelineEvent, PipelineState};
use slidecast_render_engine::{FfmpegMuxer, MuxProgress};

pub async fn run(
    mut config: SlidecastConfig,
    deck: PathBuf,
    output: Option<PathBuf>,
    manifest: Option<PathBuf>,
    concurrency: Option<usize>,
    cards: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(n) = concurrency {
        config.narration.concurrency = n.max(1);
    }

    let parser = match manifest {
        Some(path) => ManifestDeckParser::with_manifest(path),
        None => ManifestDeckParser::new(),
    };
    let speech = CommandSpeechEngine::new(&config.narration.command);
    let speech = match &config.narration.scratch_dir {
        Some(dir) => speech.with_scratch_dir(dir),
        None => speech,
    };
    let mut muxer = FfmpegMuxer::from_config(&config.video);
    if !json {
        muxer = muxer.with_progress(Arc::new(|p: MuxProgress| {
            eprint!(
                "\r  Encoding: {:.1}% ({:.1}/{:.0}s)  ",
                p.progress * 100.0,
                p.encoded_secs,
                p.total_secs
            );
        }));
    }

    if !json {
        println!("Rendering deck: {}", deck.display());
        println!(
            "  Video: {}x{} @ {}fps",
            config.video.width, config.video.height, config.video.fps
        );
        println!("  Speech: {}", config.narration.command.program);
    }

    let mut pipeline = Pipeline::from_config(
        Arc::new(parser),
        Arc::new(speech),
        Arc::new(muxer),
        &config,
    );
    if let Some(path) = output {
        pipeline = pipeline.with_output_path(path);
    }
    if !json {
        pipeline = pipeline.with_progress(Arc::new(print_event));
    }

    match pipeline.run(&deck).await {
        Ok(output) => {
            if let Some(path) = &cards {
                let cards_json = serde_json::to_string_pretty(&output.rich_cards)?;
                std::fs::write(path, cards_json)?;
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!();
                println!("Render complete: {}", output.video_path.display());
                println!(
                    "  Slides: {} ({}s of narration)",
                    output.slide_count(),
                    output.total_secs()
                );
                println!("  Took: {:.1}s", output.elapsed_secs);
                if let Some(path) = &cards {
                    println!("  Cards: {}", path.display());
                }
            }
            for failure in &output.cleanup.failures {
                eprintln!("[WARN] {failure}");
            }
            Ok(())
        }
        Err(failure) => {
            if !json {
                println!();
            }
            Err(failure.into())
        }
    }
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::SlideNarrated {
            completed,
            total,
            duration_secs,
            ..
        } => println!("  Narrated {completed}/{total} ({duration_secs}s)"),
        PipelineEvent::SlideStaged {
            completed, total, ..
        } if completed == total => println!("  Staged {total} slide(s)"),
        PipelineEvent::StateChanged {
            to: PipelineState::Assembled,
            ..
        } => eprintln!(),
        _ => {}
    }
}
