//! Slidecast Deck Model
//!
//! Defines the data contracts between a slide-deck parser and the
//! narration pipeline:
//! - **SlideRecord:** title, notes, and rendered image reference per slide
//! - **RichCard:** the per-slide summary with the image resolved to an
//!   absolute path
//! - **DeckParser:** the async boundary to whatever extracts slides from a
//!   deck file, plus a JSON manifest implementation

pub mod manifest;
pub mod parser;
pub mod slide;

pub use manifest::*;
pub use parser::*;
pub use slide::*;
