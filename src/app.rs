//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands::{self, PlayArgs};
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;

/// Live ASCII waveform for internet radio streams
#[derive(Parser, Debug)]
#[command(name = "radioscope")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "Live ASCII waveform for internet radio streams.\n\nDecodes the stream with ffmpeg, draws a mirrored waveform in the terminal,\nplays the audio through ffplay, and shows the current track above the waveform.\n\nDEFAULT COMMAND:\n    If no command is specified, 'play' is used by default.\n\nEXAMPLES:\n    # Visualize and play a stream\n    $ radioscope http://s2-webradio.rockantenne.de/rockantenne\n\n    # Wider, unsmoothed, silent\n    $ radioscope --width 100 --smooth 1.0 --mute http://radio.example/stream\n\n    # Show what is playing right now\n    $ radioscope probe http://radio.example/stream")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/radioscope/radioscope.toml\n    Logs:               ~/.local/state/radioscope/radioscope.log.*"
)]
struct Cli {
    #[command(flatten)]
    play: PlayArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Visualize and play a stream (default)
    ///
    /// Press Ctrl-C to stop.
    #[command(visible_alias = "p")]
    Play(PlayArgs),

    /// Print the track currently playing on a stream
    Probe {
        /// Stream URL
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Writes a commented default file first if none exists.
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   radioscope completions bash > radioscope.bash
    ///   radioscope completions zsh > _radioscope
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that neither log nor read the config
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "radioscope", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::Logs) => return commands::handle_logs(),
        _ => {}
    }

    logging::init_logging()?;
    tracing::debug!("radioscope {} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        None => commands::handle_play(cli.play).await,
        Some(Commands::Play(args)) => commands::handle_play(args).await,
        Some(Commands::Probe { url }) => commands::handle_probe(url).await,
        Some(Commands::Config) => commands::handle_config(),
        Some(Commands::Completions { .. }) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }
}
