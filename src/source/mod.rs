//! External FFmpeg collaborators.
//!
//! Decoding, playback and metadata probing are delegated to the FFmpeg suite;
//! this module owns the processes and turns their output into typed data.

pub mod ffmpeg;
pub mod metadata;

pub use ffmpeg::{find_tool, ManagedProcess};
pub use metadata::{probe_tags, TrackInfo};
