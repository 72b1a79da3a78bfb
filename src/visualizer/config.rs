//! Visualizer configuration.
//!
//! `VisualizerConfig` is immutable once built. All construction goes through
//! `VisualizerConfigBuilder`, whose fields are optional: anything left unset is
//! completed from the named defaults below, anything set explicitly is
//! validated as given.

use anyhow::{anyhow, Result};
use serde::Deserialize;

pub const DEFAULT_WIDTH: usize = 60;
pub const DEFAULT_HEIGHT: usize = 12;
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_SMOOTH_FACTOR: f64 = 0.9;
pub const DEFAULT_GLYPH: &str = "|";
pub const DEFAULT_BAR_SPACING: usize = 1;
pub const DEFAULT_AMPLIFY: f64 = 2.5;
pub const DEFAULT_SHOW_STATUS: bool = true;

/// Validated visualizer parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizerConfig {
    width: usize,
    height: usize,
    sample_rate: u32,
    chunk_size: usize,
    fps: u32,
    smooth_factor: f64,
    glyph: String,
    bar_spacing: usize,
    amplify: f64,
    show_status: bool,
}

impl VisualizerConfig {
    /// Starts a builder with every field unset.
    pub fn builder() -> VisualizerConfigBuilder {
        VisualizerConfigBuilder::default()
    }

    /// Canvas width in columns; also the length of the profile vector.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Canvas height in rows.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples consumed per frame.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Bytes read from the source per frame (16-bit mono).
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_size * 2
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Target duration of one frame.
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(1) / self.fps
    }

    pub fn smooth_factor(&self) -> f64 {
        self.smooth_factor
    }

    pub fn glyph(&self) -> &str {
        &self.glyph
    }

    pub fn bar_spacing(&self) -> usize {
        self.bar_spacing
    }

    pub fn amplify(&self) -> f64 {
        self.amplify
    }

    pub fn show_status(&self) -> bool {
        self.show_status
    }
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            fps: DEFAULT_FPS,
            smooth_factor: DEFAULT_SMOOTH_FACTOR,
            glyph: DEFAULT_GLYPH.to_string(),
            bar_spacing: DEFAULT_BAR_SPACING,
            amplify: DEFAULT_AMPLIFY,
            show_status: DEFAULT_SHOW_STATUS,
        }
    }
}

/// Builder for `VisualizerConfig`.
///
/// Setters only record a value; validation happens in `build()` so that a
/// config file and command-line flags can be layered with `merge` first.
/// Deserializes from the `[visualizer]` table of the config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisualizerConfigBuilder {
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub sample_rate: Option<u32>,
    pub chunk_size: Option<usize>,
    pub fps: Option<u32>,
    pub smooth_factor: Option<f64>,
    pub glyph: Option<String>,
    pub bar_spacing: Option<usize>,
    pub amplify: Option<f64>,
    pub show_status: Option<bool>,
}

impl VisualizerConfigBuilder {
    pub fn width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: usize) -> Self {
        self.height = Some(height);
        self
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn smooth_factor(mut self, smooth_factor: f64) -> Self {
        self.smooth_factor = Some(smooth_factor);
        self
    }

    pub fn glyph(mut self, glyph: impl Into<String>) -> Self {
        self.glyph = Some(glyph.into());
        self
    }

    pub fn bar_spacing(mut self, bar_spacing: usize) -> Self {
        self.bar_spacing = Some(bar_spacing);
        self
    }

    pub fn amplify(mut self, amplify: f64) -> Self {
        self.amplify = Some(amplify);
        self
    }

    pub fn show_status(mut self, show_status: bool) -> Self {
        self.show_status = Some(show_status);
        self
    }

    /// Layers `other` on top of `self`: fields set in `other` win.
    pub fn merge(self, other: VisualizerConfigBuilder) -> Self {
        Self {
            width: other.width.or(self.width),
            height: other.height.or(self.height),
            sample_rate: other.sample_rate.or(self.sample_rate),
            chunk_size: other.chunk_size.or(self.chunk_size),
            fps: other.fps.or(self.fps),
            smooth_factor: other.smooth_factor.or(self.smooth_factor),
            glyph: other.glyph.or(self.glyph),
            bar_spacing: other.bar_spacing.or(self.bar_spacing),
            amplify: other.amplify.or(self.amplify),
            show_status: other.show_status.or(self.show_status),
        }
    }

    /// Completes unset fields from defaults and validates the result.
    ///
    /// # Errors
    /// - If a numeric field that must be positive was set to zero
    /// - If the smoothing factor lies outside `[0, 1]`
    /// - If the amplify factor is not a positive finite number
    /// - If the glyph is empty
    pub fn build(self) -> Result<VisualizerConfig> {
        let config = VisualizerConfig {
            width: positive("width", self.width.unwrap_or(DEFAULT_WIDTH))?,
            height: positive("height", self.height.unwrap_or(DEFAULT_HEIGHT))?,
            sample_rate: positive(
                "sample_rate",
                self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE) as usize,
            )? as u32,
            chunk_size: positive("chunk_size", self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE))?,
            fps: positive("fps", self.fps.unwrap_or(DEFAULT_FPS) as usize)? as u32,
            smooth_factor: self.smooth_factor.unwrap_or(DEFAULT_SMOOTH_FACTOR),
            glyph: self.glyph.unwrap_or_else(|| DEFAULT_GLYPH.to_string()),
            bar_spacing: positive("bar_spacing", self.bar_spacing.unwrap_or(DEFAULT_BAR_SPACING))?,
            amplify: self.amplify.unwrap_or(DEFAULT_AMPLIFY),
            show_status: self.show_status.unwrap_or(DEFAULT_SHOW_STATUS),
        };

        if !(0.0..=1.0).contains(&config.smooth_factor) {
            return Err(anyhow!(
                "smooth_factor must be between 0 and 1, got {}",
                config.smooth_factor
            ));
        }
        if !config.amplify.is_finite() || config.amplify <= 0.0 {
            return Err(anyhow!(
                "amplify must be a positive number, got {}",
                config.amplify
            ));
        }
        if config.glyph.is_empty() {
            return Err(anyhow!("glyph must not be empty"));
        }

        Ok(config)
    }
}

fn positive(name: &str, value: usize) -> Result<usize> {
    if value == 0 {
        return Err(anyhow!("{name} must be greater than zero"));
    }
    Ok(value)
}
