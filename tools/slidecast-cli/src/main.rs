//! Slidecast CLI: turn a slide deck and its speaker notes into a narrated video.
//!
//! Usage:
//!   slidecast render <DECK>     Render a deck to <deck-dir>/<deck-stem>.mp4
//!   slidecast inspect <DECK>    Print the deck's rich cards as JSON
//!   slidecast check             Check for ffmpeg and the speech engine

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use slidecast_common::config::SlidecastConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "slidecast",
    about = "Render slide decks into narrated videos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the per-user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a deck into a narrated video
    Render {
        /// Path to the deck
        deck: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Slide manifest (defaults to <DECK>.slides.json)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Slides narrated in parallel
        #[arg(long)]
        concurrency: Option<usize>,

        /// Write the rich cards to this JSON file
        #[arg(long)]
        cards: Option<PathBuf>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a deck and print its rich cards
    Inspect {
        /// Path to the deck
        deck: PathBuf,

        /// Slide manifest (defaults to <DECK>.slides.json)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SlidecastConfig::load_from(path),
        None => SlidecastConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    slidecast_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Render {
            deck,
            output,
            manifest,
            concurrency,
            cards,
            json,
        } => commands::render::run(config, deck, output, manifest, concurrency, cards, json).await,
        Commands::Inspect { deck, manifest } => commands::inspect::run(deck, manifest).await,
        Commands::Check => commands::check::run(&config),
    }
}
