// Channel downmix and sample-rate conversion for 16-bit PCM
//
// Integer arithmetic only, so identical input always yields identical output.

/// Average interleaved channels into mono with equal weights.
///
/// A trailing partial frame (fewer than `channels` samples) is dropped.
pub fn downmix(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Resample mono PCM from `from_rate` to `to_rate` by linear interpolation.
///
/// Output length is `floor(len * to_rate / from_rate)`.
pub fn resample_linear(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let from = from_rate as u64;
    let to = to_rate as u64;
    let out_len = (samples.len() as u64 * to / from) as usize;

    (0..out_len)
        .map(|i| {
            // Position in the input, as an integer index plus a fraction of `to`.
            let position = i as u64 * from;
            let index = (position / to) as usize;
            let fraction = (position % to) as i64;

            let current = samples[index] as i64;
            let next = samples.get(index + 1).copied().unwrap_or(samples[index]) as i64;
            (current + (next - current) * fraction / to as i64) as i16
        })
        .collect()
}
