//! Deck parser contract.

use std::path::Path;

use crate::slide::SlideRecord;

/// Extracts ordered slide records from a deck file.
///
/// Implementations are external collaborators: a PPTX extractor, an
/// exporter's manifest, a test fixture. Errors are opaque to the pipeline
/// and reported as extraction failures.
#[async_trait::async_trait]
pub trait DeckParser: Send + Sync {
    /// Parse `deck_path` and return one record per slide, in slide order.
    async fn extract_all_slides(&self, deck_path: &Path) -> anyhow::Result<Vec<SlideRecord>>;

    /// Parser name, for logs.
    fn name(&self) -> &str;
}

/// A parser that returns a fixed set of slides regardless of the deck path.
#[derive(Debug, Clone, Default)]
pub struct StaticDeckParser {
    slides: Vec<SlideRecord>,
}

impl StaticDeckParser {
    pub fn new(slides: Vec<SlideRecord>) -> Self {
        Self { slides }
    }
}

#[async_trait::async_trait]
impl DeckParser for StaticDeckParser {
    async fn extract_all_slides(&self, _deck_path: &Path) -> anyhow::Result<Vec<SlideRecord>> {
        Ok(self.slides.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}
