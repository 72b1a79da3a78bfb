//! Live visualization of an internet radio stream.
//!
//! Runs the waveform loop in the foreground, ffplay for audible playback,
//! and a background task that refreshes the now-playing header. Ctrl-C or
//! SIGTERM stops the loop; the cursor is restored on every exit path.

use crate::config::RadioscopeConfig;
use crate::source::ManagedProcess;
use crate::visualizer::{
    AnsiTerminal, PlainTerminal, StreamOutcome, Visualizer, VisualizerConfig,
    VisualizerConfigBuilder,
};
use anyhow::anyhow;
use clap::Args;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Options for the `play` command, also accepted without naming it.
#[derive(Args, Debug, Default, Clone, PartialEq)]
pub struct PlayArgs {
    /// Stream URL (defaults to stream_url from the config file)
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Waveform width in columns
    #[arg(long)]
    pub width: Option<usize>,

    /// Waveform height in rows
    #[arg(long)]
    pub height: Option<usize>,

    /// Frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Samples consumed per frame
    #[arg(long, value_name = "SAMPLES")]
    pub chunk_size: Option<usize>,

    /// PCM sample rate requested from ffmpeg
    #[arg(long, value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// Smoothing factor between 0 (frozen) and 1 (no smoothing)
    #[arg(long, value_name = "FACTOR")]
    pub smooth: Option<f64>,

    /// Character used to draw bars
    #[arg(long)]
    pub glyph: Option<String>,

    /// Columns per bar; 2 leaves a gap after every bar
    #[arg(long, value_name = "COLUMNS")]
    pub spacing: Option<usize>,

    /// Vertical gain applied to column energy
    #[arg(long, value_name = "GAIN")]
    pub amplify: Option<f64>,

    /// Hide the status line below the waveform
    #[arg(long)]
    pub no_status: bool,

    /// Visualize without starting audible playback
    #[arg(long)]
    pub mute: bool,
}

impl PlayArgs {
    /// Visualizer settings given on the command line; unset flags stay unset.
    pub fn overrides(&self) -> VisualizerConfigBuilder {
        VisualizerConfigBuilder {
            width: self.width,
            height: self.height,
            sample_rate: self.sample_rate,
            chunk_size: self.chunk_size,
            fps: self.fps,
            smooth_factor: self.smooth,
            glyph: self.glyph.clone(),
            bar_spacing: self.spacing,
            amplify: self.amplify,
            show_status: self.no_status.then_some(false),
        }
    }
}

/// Picks the stream URL and builds the visualizer config from flags layered
/// over the config file.
///
/// # Errors
/// - If neither the command line nor the config file names a stream
/// - If the merged visualizer settings are invalid
pub fn resolve(
    args: &PlayArgs,
    file: &RadioscopeConfig,
) -> anyhow::Result<(String, VisualizerConfig)> {
    let stream_url = args
        .url
        .clone()
        .or_else(|| file.stream_url.clone())
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| {
            anyhow!("No stream URL given. Pass one as an argument or set stream_url in the config file.")
        })?;

    let config = file.visualizer.clone().merge(args.overrides()).build()?;
    Ok((stream_url, config))
}

/// Plays and visualizes a stream until interrupted.
///
/// # Errors
/// - If the config file is invalid or no stream URL is available
/// - If the decoder cannot be started or the stream fails
pub async fn handle_play(args: PlayArgs) -> anyhow::Result<()> {
    let file = RadioscopeConfig::load()?;
    let (stream_url, config) = resolve(&args, &file)?;

    tracing::info!(
        "Playing {} ({}x{}, {} FPS, mute: {})",
        stream_url,
        config.width(),
        config.height(),
        config.fps(),
        args.mute
    );

    let visualizer = Visualizer::new(config)
        .with_stream_url(stream_url.clone())
        .with_metadata_timeout(file.metadata.timeout());
    let visualizer = Arc::new(if std::io::stdout().is_terminal() {
        visualizer.with_terminal(AnsiTerminal)
    } else {
        visualizer.with_terminal(PlainTerminal)
    });

    visualizer.clear_screen()?;

    let player = if args.mute {
        None
    } else {
        match ManagedProcess::spawn_player(&stream_url) {
            Ok(player) => Some(player),
            Err(e) => {
                tracing::warn!("Playback unavailable, visualizing only: {e:#}");
                None
            }
        }
    };

    let poller = tokio::spawn(poll_now_playing(
        Arc::clone(&visualizer),
        file.metadata.poll_interval(),
    ));
    let signals = tokio::spawn(stop_on_signal(Arc::clone(&visualizer)));

    let result = visualizer.start_from_url(&stream_url).await;

    poller.abort();
    signals.abort();
    if let Some(player) = player {
        player.shutdown().await;
    }
    if let Err(e) = visualizer.restore_cursor() {
        tracing::warn!("Failed to restore cursor: {e:#}");
    }

    match result {
        Ok(StreamOutcome::Cancelled) => {
            tracing::info!("Playback stopped");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Playback failed: {e:#}");
            Err(e)
        }
    }
}

/// Refreshes the now-playing header every `period` until aborted.
async fn poll_now_playing(visualizer: Arc<Visualizer>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let track = visualizer.fetch_track().await;
        if let Err(e) = visualizer.print_now_playing(&track) {
            tracing::warn!("Stopping now-playing updates: {e:#}");
            return;
        }
    }
}

/// Stops the visualizer on Ctrl-C or SIGTERM.
async fn stop_on_signal(visualizer: Arc<Visualizer>) {
    match wait_for_shutdown_signal().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signals: {e}");
            return;
        }
    }
    visualizer.stop();
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
