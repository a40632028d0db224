//! Slidecast Narration
//!
//! Turns a slide's speaker notes into a WAV clip whose length is bounded by
//! the measured speech duration:
//! - **Engine:** the injected text-to-speech capability and its sessions
//! - **Clip:** WAV measurement and ceiling-to-the-second export
//! - **Synthesizer:** one engine session and one temp file per slide
//! - **Command engine:** a speech engine backed by an external program
//!   (espeak-ng by default)

pub mod clip;
pub mod command;
pub mod engine;
pub mod synthesizer;

pub use clip::*;
pub use command::*;
pub use engine::*;
pub use synthesizer::*;
