//! Per-slide records.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One slide as produced by a deck parser.
///
/// Records are ordered by slide position and never modified after
/// extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// Slide title (may be empty).
    pub title: String,

    /// Speaker notes to narrate (may be empty).
    #[serde(default)]
    pub notes: String,

    /// Rendered slide image. Relative paths are relative to the deck's
    /// directory.
    #[serde(rename = "image")]
    pub image_path: PathBuf,
}

impl SlideRecord {
    pub fn new(
        title: impl Into<String>,
        notes: impl Into<String>,
        image_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            title: title.into(),
            notes: notes.into(),
            image_path: image_path.into(),
        }
    }
}

/// Per-slide summary with the image resolved against the deck directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichCard {
    pub title: String,
    pub image: PathBuf,
    pub notes: String,
}

impl RichCard {
    /// Build a card from a slide record. `deck_dir` anchors relative image
    /// paths; absolute image paths are kept as they are.
    pub fn from_slide(slide: &SlideRecord, deck_dir: &Path) -> Self {
        Self {
            title: slide.title.clone(),
            image: deck_dir.join(&slide.image_path),
            notes: slide.notes.clone(),
        }
    }
}

/// Build rich cards for every slide, preserving order.
pub fn rich_cards(slides: &[SlideRecord], deck_dir: &Path) -> Vec<RichCard> {
    slides
        .iter()
        .map(|slide| RichCard::from_slide(slide, deck_dir))
        .collect()
}

/// Directory of the deck file, or `.` for a bare file name.
pub fn deck_directory(deck_path: &Path) -> PathBuf {
    match deck_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
