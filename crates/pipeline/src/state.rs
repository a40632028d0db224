//! Pipeline states and progress events.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Where a pipeline run is. Runs move strictly forward; any failure jumps
/// to [`PipelineState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Start,
    Extracted,
    NarratedAll,
    Staged,
    Assembled,
    Published,
    CleanedUp,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Extracted => "extracted",
            Self::NarratedAll => "narrated_all",
            Self::Staged => "staged",
            Self::Assembled => "assembled",
            Self::Published => "published",
            Self::CleanedUp => "cleaned_up",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// The state a successful step moves to, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Start => Some(Self::Extracted),
            Self::Extracted => Some(Self::NarratedAll),
            Self::NarratedAll => Some(Self::Staged),
            Self::Staged => Some(Self::Assembled),
            Self::Assembled => Some(Self::Published),
            Self::Published => Some(Self::CleanedUp),
            Self::CleanedUp => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `to` is a legal transition from this state.
    pub fn can_transition_to(&self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress notifications emitted during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StateChanged {
        from: PipelineState,
        to: PipelineState,
    },
    SlideNarrated {
        index: usize,
        completed: usize,
        total: usize,
        duration_secs: u64,
    },
    SlideStaged {
        index: usize,
        completed: usize,
        total: usize,
    },
}

/// Progress callback for pipeline runs.
pub type PipelineProgressCallback = Arc<dyn Fn(&PipelineEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_order() {
        let mut state = PipelineState::Start;
        let mut visited = vec![state];
        while let Some(next) = state.next() {
            assert!(state.can_transition_to(next));
            state = next;
            visited.push(state);
        }
        assert_eq!(visited.len(), 8);
        assert_eq!(state, PipelineState::Done);
    }

    #[test]
    fn test_failed_reachable_until_terminal() {
        assert!(PipelineState::Staged.can_transition_to(PipelineState::Failed));
        assert!(PipelineState::CleanedUp.can_transition_to(PipelineState::Failed));
        assert!(!PipelineState::Done.can_transition_to(PipelineState::Failed));
        assert!(!PipelineState::Failed.can_transition_to(PipelineState::Failed));
    }

    #[test]
    fn test_no_skipping() {
        assert!(!PipelineState::Extracted.can_transition_to(PipelineState::Staged));
        assert!(!PipelineState::Start.can_transition_to(PipelineState::Done));
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(
            serde_json::to_string(&PipelineState::NarratedAll).unwrap(),
            "\"narrated_all\""
        );
        assert_eq!(PipelineState::CleanedUp.to_string(), "cleaned_up");
    }
}
