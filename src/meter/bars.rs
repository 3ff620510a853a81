//! Chunked-mean reduction of the history ring into display bars

/// Reduce `history` to exactly `bar_count` values by averaging contiguous
/// chunks.
///
/// `chunk_size` uses truncating integer division, so when the history length
/// is not a multiple of `bar_count` the last few samples are dropped rather
/// than redistributed. Histories shorter than `bar_count` leave the trailing
/// bars at zero. A `bar_count` of zero is treated as one.
pub fn aggregate(history: &[f32], bar_count: usize) -> Vec<f32> {
    let bar_count = bar_count.max(1);
    let n = history.len();
    let chunk_size = (n / bar_count).max(1);

    (0..bar_count)
        .map(|i| {
            let start = i * chunk_size;
            let end = (start + chunk_size).min(n);
            if start >= end {
                return 0.0;
            }
            let chunk = &history[start..end];
            chunk.iter().sum::<f32>() / chunk.len() as f32
        })
        .collect()
}
