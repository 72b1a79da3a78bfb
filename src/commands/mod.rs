//! Application command handlers for radioscope.
//!
//! # Commands
//! - `play`: Visualize and play a stream (default)
//! - `probe`: Print the current track of a stream
//! - `config`: Open the configuration file in the user's preferred editor
//! - `logs`: Display recent log entries

pub mod config;
pub mod logs;
pub mod play;
pub mod probe;

pub use config::handle_config;
pub use logs::handle_logs;
pub use play::{handle_play, PlayArgs};
pub use probe::handle_probe;
