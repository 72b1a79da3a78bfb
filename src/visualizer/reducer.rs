//! Column-wise RMS reduction.
//!
//! Splits one chunk of samples into equal-width buckets, one per canvas
//! column, and measures the root-mean-square energy of each bucket. Samples are
//! normalized against full-scale 16-bit magnitude, so in-range input yields
//! values in `[0, 1]`.

const FULL_SCALE: f64 = 32768.0;

/// Fills `profile` with the RMS energy of each column of `samples`.
///
/// The last column also takes the samples left over by the integer division.
/// When there are more columns than samples every column stays at zero.
pub fn reduce_columns(samples: &[i16], profile: &mut [f64]) {
    profile.fill(0.0);

    let columns = profile.len();
    if columns == 0 {
        return;
    }

    let samples_per_column = samples.len() / columns;
    if samples_per_column == 0 {
        return;
    }

    for (col, value) in profile.iter_mut().enumerate() {
        let start = col * samples_per_column;
        let end = if col == columns - 1 {
            samples.len()
        } else {
            (start + samples_per_column).min(samples.len())
        };

        *value = rms(&samples[start..end]);
    }
}

fn rms(window: &[i16]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }

    let sum: f64 = window
        .iter()
        .map(|&s| {
            let normalized = s as f64 / FULL_SCALE;
            normalized * normalized
        })
        .sum();

    (sum / window.len() as f64).sqrt()
}
