//! Run results: output summary, cleanup report, aggregated failure.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use slidecast_common::error::SlidecastError;
use slidecast_deck_model::RichCard;

use crate::state::PipelineState;

/// One deletion that did not succeed during cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    pub path: PathBuf,
    pub message: String,
}

impl std::fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cleanup failed for {}: {}",
            self.path.display(),
            self.message
        )
    }
}

/// What cleanup removed and what it could not.
///
/// Cleanup failures never fail a run; they are reported here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Files and directories removed.
    pub removed: usize,

    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn record_removed(&mut self) {
        self.removed += 1;
    }

    pub fn record_failure(&mut self, path: impl Into<PathBuf>, message: impl Into<String>) {
        self.failures.push(CleanupFailure {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    /// Published video.
    pub video_path: PathBuf,

    /// One card per slide, in slide order.
    pub rich_cards: Vec<RichCard>,

    /// Narration length per slide, in whole seconds.
    pub clip_secs: Vec<u64>,

    pub started_at: DateTime<Utc>,

    pub elapsed_secs: f64,

    pub cleanup: CleanupReport,
}

impl PipelineOutput {
    pub fn slide_count(&self) -> usize {
        self.rich_cards.len()
    }

    pub fn total_secs(&self) -> u64 {
        self.clip_secs.iter().sum()
    }
}

/// A failed run: the first fatal error plus whatever cleanup could not do.
#[derive(Debug)]
pub struct PipelineFailure {
    pub error: SlidecastError,

    /// Last state reached before the error.
    pub failed_in: PipelineState,

    pub cleanup: CleanupReport,
}

impl std::fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (after {})", self.error, self.failed_in)?;
        if !self.cleanup.is_clean() {
            write!(f, "; {} cleanup failure(s):", self.cleanup.failures.len())?;
            for failure in &self.cleanup.failures {
                write!(f, " [{failure}]")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display_includes_cleanup_details() {
        let mut cleanup = CleanupReport::default();
        cleanup.record_failure("/w/0.png", "permission denied");
        let failure = PipelineFailure {
            error: SlidecastError::assembly("ffmpeg failed"),
            failed_in: PipelineState::Staged,
            cleanup,
        };
        let text = failure.to_string();
        assert!(text.starts_with("Assembly failed: ffmpeg failed (after staged)"));
        assert!(text.contains("Cleanup failed for /w/0.png: permission denied"));
    }

    #[test]
    fn test_clean_failure_display_is_just_the_error() {
        let failure = PipelineFailure {
            error: SlidecastError::extraction("bad zip"),
            failed_in: PipelineState::Start,
            cleanup: CleanupReport::default(),
        };
        assert_eq!(
            failure.to_string(),
            "Extraction failed: bad zip (after start)"
        );
    }
}
