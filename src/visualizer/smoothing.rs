//! Exponential smoothing of the column profile across frames.

/// Single-pole exponential moving average over a fixed-width profile.
///
/// Starts at all zeros; each `update` blends the stored values towards the new
/// raw profile by `factor`.
#[derive(Debug, Clone)]
pub struct ProfileSmoother {
    values: Vec<f64>,
    factor: f64,
}

impl ProfileSmoother {
    /// Creates a smoother of `width` zeroed columns.
    pub fn new(width: usize, factor: f64) -> Self {
        Self {
            values: vec![0.0; width],
            factor,
        }
    }

    /// Applies `smoothed[i] = smoothed[i] * (1 - a) + raw[i] * a`.
    ///
    /// Extra raw values beyond the smoother's width are ignored, missing ones
    /// leave their columns untouched, so the width never changes.
    pub fn update(&mut self, raw: &[f64]) {
        let keep = 1.0 - self.factor;
        for (smoothed, &new) in self.values.iter_mut().zip(raw) {
            *smoothed = *smoothed * keep + new * self.factor;
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn width(&self) -> usize {
        self.values.len()
    }
}
