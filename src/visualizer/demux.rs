//! Raw PCM byte decoding.

/// Decodes little-endian signed 16-bit samples from `bytes` into `samples`.
///
/// Decodes `min(bytes.len() / 2, samples.len())` samples and returns that count.
/// A trailing odd byte is ignored.
pub fn decode_samples(bytes: &[u8], samples: &mut [i16]) -> usize {
    let mut count = 0;
    for (pair, sample) in bytes.chunks_exact(2).zip(samples.iter_mut()) {
        *sample = i16::from_le_bytes([pair[0], pair[1]]);
        count += 1;
    }
    count
}
