//! Slidecast Render Engine
//!
//! Turns narrated slides into one video file.
//!
//! # Pipeline Architecture
//!
//! ```text
//! slide image ──┐
//!               ├── Stage (copy to <index>.png / <index>.wav)
//! narration ────┘         │
//!                         ▼
//!                  staging directory
//!                  0.png 0.wav 1.png 1.wav ...
//!                         │
//!                         ├── Assemble (%d.png + %d.wav patterns)
//!                         ▼
//!                  Encode (H.264 + AAC, yuv420p)
//!                         │
//!                         ▼
//!                    output.mp4
//! ```

pub mod assembler;
pub mod ffmpeg;
pub mod mux;
pub mod stager;

pub use assembler::*;
pub use ffmpeg::*;
pub use mux::*;
pub use stager::*;
