//! Configuration management for radioscope.
//!
//! Settings are read from an optional TOML file in the user's config
//! directory and layered under command-line flags.

pub mod file;

pub use file::{config_path, MetadataConfig, RadioscopeConfig, DEFAULT_CONFIG};
