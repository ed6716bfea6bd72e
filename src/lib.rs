//! Clipsmith highlight clipper library
//!
//! Analyzes long-form video for high-energy moments using audio and visual
//! signals, then exports the best segments as short clips with optional
//! portrait framing, stacked overlay video and burned-in karaoke subtitles.

pub mod analysis;
pub mod cli;
pub mod clips;
pub mod config;
pub mod error;
pub mod export;
pub mod probe;
pub mod tools;
pub mod transcribe;
pub mod utils;

// Re-export commonly used types
pub use clips::{Clip, ClipStore};
pub use config::Config;
pub use error::{ClipError, ClipResult};
