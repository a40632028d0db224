//! Slidecast Pipeline
//!
//! Orchestrates one slide deck into one narrated video:
//!
//! ```text
//! Start → Extracted → NarratedAll → Staged → Assembled → Published → CleanedUp → Done
//!   └──────────┴───────────┴───────────┴──────────┴──────────┴──→ Failed (cleanup still runs)
//! ```
//!
//! - **Workspace:** one uniquely named directory per run, emptied file by
//!   file and removed on every exit path
//! - **Publish:** copy-after-complete to `<deck-dir>/<deck-stem>.mp4`
//! - **Outcome:** run output, cleanup report, and the aggregated failure

pub mod orchestrator;
pub mod outcome;
pub mod publish;
pub mod state;
pub mod workspace;

pub use orchestrator::*;
pub use outcome::*;
pub use publish::*;
pub use state::*;
pub use workspace::*;
