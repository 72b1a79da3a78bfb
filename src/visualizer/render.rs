//! Text rendering of the smoothed profile.
//!
//! Bars grow symmetrically up and down from a horizontal midline. Output is
//! plain text: `height` newline-terminated rows of `width` cells, optionally
//! followed by a status line.

use super::config::VisualizerConfig;

/// Renders one frame for `profile`.
pub fn render_frame(profile: &[f64], config: &VisualizerConfig) -> String {
    let width = config.width();
    let height = config.height();
    let glyph = config.glyph();
    let midline = height / 2;

    let bars: Vec<Option<usize>> = (0..width)
        .map(|col| column_bar(profile, col, midline, config))
        .collect();

    let mut frame = String::with_capacity((width * glyph.len() + 1) * height + 64);
    for row in 0..height {
        for bar in &bars {
            match bar {
                Some(bar) if *bar > 0 && row + bar >= midline && row <= midline + bar => {
                    frame.push_str(glyph);
                }
                _ => frame.push(' '),
            }
        }
        frame.push('\n');
    }

    if config.show_status() {
        frame.push_str(&status_line(config));
        frame.push('\n');
    }

    frame
}

/// The line appended below the canvas when status display is on.
pub fn status_line(config: &VisualizerConfig) -> String {
    format!(
        "Audio Visualizer | {}Hz | {} samples | {} FPS",
        config.sample_rate(),
        config.chunk_size(),
        config.fps()
    )
}

/// Half-height of the bar in `col`, or `None` for gap and out-of-range columns.
fn column_bar(
    profile: &[f64],
    col: usize,
    midline: usize,
    config: &VisualizerConfig,
) -> Option<usize> {
    let spacing = config.bar_spacing();
    if spacing > 1 && col % spacing != 0 {
        return None;
    }

    let value = *profile.get(col / spacing)?;
    Some(bar_height(value, config.amplify(), midline))
}

/// `floor(value * amplify * (midline - 1))`, clamped to `[0, midline - 1]`.
pub fn bar_height(value: f64, amplify: f64, midline: usize) -> usize {
    let max = midline as i64 - 1;
    if max <= 0 {
        return 0;
    }

    let scaled = (value * amplify * max as f64).floor();
    if scaled.is_nan() || scaled <= 0.0 {
        return 0;
    }

    scaled.min(max as f64) as usize
}
