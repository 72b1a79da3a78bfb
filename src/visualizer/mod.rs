//! Live waveform visualizer.
//!
//! Turns a stream of raw 16-bit mono PCM into a smoothed per-column energy
//! profile and renders it as text at a fixed frame rate. The stream loop runs
//! in one task while any number of callers read the current profile, frame
//! and track info through the accessors on `Visualizer`.

pub mod config;
pub mod demux;
pub mod reducer;
pub mod render;
pub mod smoothing;
pub mod state;
pub mod stream;
pub mod terminal;

pub use config::{VisualizerConfig, VisualizerConfigBuilder};
pub use state::CancelToken;
pub use stream::StreamOutcome;
pub use terminal::{AnsiTerminal, PlainTerminal, TerminalControl};

use crate::source::{probe_tags, ManagedProcess, TrackInfo};
use anyhow::{Context, Result};
use state::{RunState, SharedState};
use std::io::Write;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::io::AsyncRead;

/// Default upper bound for one metadata probe.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Streaming waveform renderer with thread-safe accessors.
///
/// Share it behind an `Arc` to drive the stream from one task and read from
/// others.
pub struct Visualizer {
    config: VisualizerConfig,
    state: SharedState,
    run: RunState,
    stream_url: Mutex<Option<String>>,
    output: Mutex<Box<dyn Write + Send>>,
    terminal: Box<dyn TerminalControl>,
    metadata_timeout: Duration,
}

impl Visualizer {
    /// Creates a visualizer that draws to stdout with ANSI cursor control.
    pub fn new(config: VisualizerConfig) -> Self {
        Self {
            state: SharedState::new(config.width(), config.smooth_factor()),
            config,
            run: RunState::default(),
            stream_url: Mutex::new(None),
            output: Mutex::new(Box::new(std::io::stdout())),
            terminal: Box::new(AnsiTerminal),
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
        }
    }

    /// Sends frames to `output` instead of stdout.
    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Mutex::new(Box::new(output));
        self
    }

    pub fn with_terminal(mut self, terminal: impl TerminalControl + 'static) -> Self {
        self.terminal = Box::new(terminal);
        self
    }

    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    /// Sets the locator used by `fetch_track` before any stream is started.
    pub fn with_stream_url(self, stream_url: impl Into<String>) -> Self {
        self.set_stream_url(stream_url.into());
        self
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    /// Decodes `stream_url` with ffmpeg and visualizes it until stopped.
    ///
    /// The decoder process belongs to this call and is shut down before it
    /// returns, whichever way the loop ended.
    ///
    /// # Errors
    /// - If ffmpeg cannot be started (no loop is run)
    /// - If reading the decoded stream fails
    /// - If writing a frame to the output fails
    pub async fn start_from_url(&self, stream_url: &str) -> Result<StreamOutcome> {
        let run = self.run.begin();
        self.set_stream_url(stream_url.to_string());

        let (decoder, pcm) = ManagedProcess::spawn_decoder(stream_url, self.config.sample_rate())
            .context("Failed to start stream decoder")?;

        tracing::info!("Visualizing {}", stream_url);
        let result = self.process_stream(pcm, run.token()).await;
        decoder.shutdown().await;
        result
    }

    /// Visualizes raw s16le mono PCM read from `reader` until stopped.
    ///
    /// # Errors
    /// - If reading from `reader` fails with anything but a short read
    /// - If writing a frame to the output fails
    pub async fn start_from_reader<R>(&self, reader: R) -> Result<StreamOutcome>
    where
        R: AsyncRead + Unpin,
    {
        let run = self.run.begin();
        tracing::info!("Visualizing PCM reader");
        self.process_stream(reader, run.token()).await
    }

    /// Signals the running stream loop to stop.
    pub fn stop(&self) {
        tracing::debug!("Stop requested");
        self.run.stop();
    }

    pub fn is_running(&self) -> bool {
        self.run.is_running()
    }

    /// Returns a copy of the current smoothed profile.
    pub fn waveform(&self) -> Vec<f64> {
        self.state.profile()
    }

    /// Renders the current smoothed profile, without terminal control codes.
    pub fn render(&self) -> String {
        self.state
            .with_profile(|profile| render::render_frame(profile, &self.config))
    }

    /// Returns the cached track info.
    pub fn track(&self) -> TrackInfo {
        self.state.track()
    }

    /// Probes the stream for its current track and updates the cache.
    ///
    /// Failures are logged and leave the cache untouched; the cached value is
    /// returned either way.
    pub async fn fetch_track(&self) -> TrackInfo {
        let Some(stream_url) = self.stream_url() else {
            return self.track();
        };

        match probe_tags(&stream_url, self.metadata_timeout).await {
            Ok(tags) => self.state.update_track(|track| {
                if !track.apply_tags(&tags) {
                    tracing::debug!("No track tags in stream metadata");
                }
            }),
            Err(e) => {
                tracing::debug!("Metadata fetch failed: {e:#}");
                self.track()
            }
        }
    }

    /// Writes the now-playing header line through the frame output.
    ///
    /// An unknown track just clears the header. Control characters in the
    /// published title are dropped so it stays on one line.
    ///
    /// # Errors
    /// - If the output cannot be written
    pub fn print_now_playing(&self, track: &TrackInfo) -> Result<()> {
        let prefix = self.terminal.header_prefix();
        let title: String = track.raw.chars().filter(|c| !c.is_control()).collect();
        if title.is_empty() {
            self.write_output(&[prefix.as_str()])
        } else {
            let line = format!("Now playing: {title}\n");
            self.write_output(&[prefix.as_str(), line.as_str()])
        }
    }

    /// # Errors
    /// - If the output cannot be written
    pub fn clear_screen(&self) -> Result<()> {
        self.write_output(&[self.terminal.clear_screen().as_str()])
    }

    /// # Errors
    /// - If the output cannot be written
    pub fn restore_cursor(&self) -> Result<()> {
        self.write_output(&[self.terminal.restore_cursor().as_str()])
    }

    fn stream_url(&self) -> Option<String> {
        self.stream_url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_stream_url(&self, stream_url: String) {
        *self.stream_url.lock().unwrap_or_else(PoisonError::into_inner) = Some(stream_url);
    }

    fn write_output(&self, parts: &[&str]) -> Result<()> {
        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        for part in parts {
            output
                .write_all(part.as_bytes())
                .context("Failed to write to output")?;
        }
        output.flush().context("Failed to flush output")?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    /// Output sink that keeps everything written for inspection.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn visualizer(buffer: &SharedBuffer) -> Visualizer {
        let config = VisualizerConfig::builder()
            .width(4)
            .height(4)
            .show_status(false)
            .build()
            .unwrap();
        Visualizer::new(config)
            .with_output(buffer.clone())
            .with_terminal(PlainTerminal)
    }

    #[test]
    fn test_initial_state() {
        let vis = visualizer(&SharedBuffer::default());

        assert!(!vis.is_running());
        assert_eq!(vis.waveform(), vec![0.0; 4]);
        assert_eq!(vis.track(), TrackInfo::default());
        assert_eq!(vis.render(), "    \n    \n    \n    \n");
    }

    #[test]
    fn test_waveform_copy_is_independent() {
        let vis = visualizer(&SharedBuffer::default());
        let mut copy = vis.waveform();
        copy[0] = 42.0;

        assert_eq!(vis.waveform(), vec![0.0; 4]);
    }

    #[tokio::test]
    async fn test_fetch_track_without_url_returns_cache() {
        let vis = visualizer(&SharedBuffer::default());
        assert_eq!(vis.fetch_track().await, TrackInfo::default());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_cached_track() {
        let vis = visualizer(&SharedBuffer::default())
            .with_stream_url("http://127.0.0.1:1/x")
            .with_metadata_timeout(Duration::from_secs(2));
        let cached = vis.state.update_track(|track| {
            track.artist = "A".to_string();
            track.title = "B".to_string();
            track.raw = "A - B".to_string();
        });

        assert_eq!(vis.fetch_track().await, cached);
        assert_eq!(vis.track(), cached);
    }

    #[test]
    fn test_print_now_playing_strips_control_characters() {
        let buffer = SharedBuffer::default();
        let vis = visualizer(&buffer);

        let track = TrackInfo {
            raw: "A\n - \x1b[2JB\r".to_string(),
            ..Default::default()
        };
        vis.print_now_playing(&track).unwrap();

        assert_eq!(buffer.contents(), "Now playing: A - [2JB\n");
    }

    #[test]
    fn test_print_now_playing() {
        let buffer = SharedBuffer::default();
        let vis = Visualizer::new(VisualizerConfig::default()).with_output(buffer.clone());

        let track = TrackInfo {
            raw: "A - B".to_string(),
            ..Default::default()
        };
        vis.print_now_playing(&track).unwrap();
        vis.print_now_playing(&TrackInfo::default()).unwrap();

        assert_eq!(
            buffer.contents(),
            "\x1b[1;1H\x1b[KNow playing: A - B\n\x1b[1;1H\x1b[K"
        );
    }

    #[test]
    fn test_screen_helpers_use_terminal_strategy() {
        let buffer = SharedBuffer::default();
        let vis = Visualizer::new(VisualizerConfig::default()).with_output(buffer.clone());

        vis.clear_screen().unwrap();
        vis.restore_cursor().unwrap();

        assert_eq!(buffer.contents(), "\x1b[2J\x1b[?25h");
    }
}
