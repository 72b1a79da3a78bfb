//! Terminal waveform visualizer for internet radio streams.

pub mod app;
pub mod commands;
pub mod config;
pub mod logging;
pub mod source;
pub mod visualizer;
