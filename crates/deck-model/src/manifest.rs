//! JSON slide manifest parser.
//!
//! Slide rendering is done by an external exporter, which writes the slide
//! images next to the deck together with a manifest:
//!
//! ```json
//! {
//!   "slides": [
//!     { "title": "Intro", "notes": "Welcome.", "image": "talk/slide1.png" }
//!   ]
//! }
//! ```
//!
//! The manifest is either the deck path itself (when it ends in `.json`) or
//! a sidecar file named `<deck>.slides.json`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::parser::DeckParser;
use crate::slide::SlideRecord;

/// Manifest file suffix appended to the deck file name.
pub const MANIFEST_SUFFIX: &str = "slides.json";

/// On-disk manifest layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlideManifest {
    #[serde(default)]
    pub slides: Vec<SlideRecord>,
}

/// Errors that can occur when reading a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid manifest {path}: {message}")]
    ValidationError { path: PathBuf, message: String },
}

/// Reads slides from a JSON manifest.
#[derive(Debug, Clone, Default)]
pub struct ManifestDeckParser {
    /// Explicit manifest path; overrides the sidecar lookup.
    manifest_path: Option<PathBuf>,
}

impl ManifestDeckParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `path` as the manifest regardless of the deck path.
    pub fn with_manifest(path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: Some(path.into()),
        }
    }

    /// Where the manifest for `deck_path` is expected.
    pub fn manifest_path_for(&self, deck_path: &Path) -> PathBuf {
        if let Some(path) = &self.manifest_path {
            return path.clone();
        }
        let is_json = deck_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            return deck_path.to_path_buf();
        }
        let mut name = deck_path.as_os_str().to_owned();
        name.push(".");
        name.push(MANIFEST_SUFFIX);
        PathBuf::from(name)
    }

    /// Read and validate the manifest for `deck_path`.
    pub async fn load(&self, deck_path: &Path) -> Result<SlideManifest, ManifestError> {
        let path = self.manifest_path_for(deck_path);
        let content =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| ManifestError::IoError {
                    path: path.clone(),
                    source,
                })?;
        let manifest: SlideManifest =
            serde_json::from_str(&content).map_err(|source| ManifestError::ParseError {
                path: path.clone(),
                source,
            })?;

        if let Some(position) = manifest
            .slides
            .iter()
            .position(|slide| slide.image_path.as_os_str().is_empty())
        {
            return Err(ManifestError::ValidationError {
                path,
                message: format!("slide {} has no image", position + 1),
            });
        }

        Ok(manifest)
    }
}

#[async_trait::async_trait]
impl DeckParser for ManifestDeckParser {
    async fn extract_all_slides(&self, deck_path: &Path) -> anyhow::Result<Vec<SlideRecord>> {
        let manifest = self.load(deck_path).await?;
        tracing::debug!(
            deck = %deck_path.display(),
            slides = manifest.slides.len(),
            "Loaded slide manifest"
        );
        Ok(manifest.slides)
    }

    fn name(&self) -> &str {
        "manifest"
    }
}
