//! Segments a regular stream at data breaks and re-derives a uniform grid
//! by least-squares refit against sample index (§4.6).
//!
//! Grounded on `original_source/Python/xdf.py`'s `_jitter_removal`, with
//! two corrections the design notes call for: the per-segment refit is
//! written into the segment's own slice (the original overwrites the
//! entire `time_stamps` array each iteration, leaving only the last
//! segment), and `effective_srate` is the sample-weighted mean across all
//! segments rather than whatever the last loop iteration happened to leave
//! behind.

use crate::options::XdfOptions;

/// Ordinary least-squares fit of `y ≈ a + b·x`.
fn least_squares_affine(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xx: f64 = x.iter().map(|v| v * v).sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(xi, yi)| xi * yi).sum();
    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return (sum_y / n, 0.0);
    }
    let b = (n * sum_xy - sum_x * sum_y) / denom;
    let a = (sum_y - b * sum_x) / n;
    (a, b)
}

/// Dejitters `time_stamps` in place and returns the stream's aggregate
/// effective sampling rate. A no-op (returning `0.0`) for irregular
/// streams (`tdiff <= 0.0`) or streams with fewer than two samples.
pub(crate) fn dejitter(time_stamps: &mut [f64], tdiff: f64, opts: &XdfOptions) -> f64 {
    let n = time_stamps.len();
    if n < 2 || tdiff <= 0.0 {
        return 0.0;
    }

    let threshold = opts
        .jitter_break_threshold_seconds
        .max(opts.jitter_break_threshold_samples as f64 * tdiff);

    let diffs: Vec<f64> = time_stamps.windows(2).map(|w| w[1] - w[0]).collect();
    let break_indices: Vec<usize> = (0..diffs.len()).filter(|&i| diffs[i] > threshold).collect();

    let ranges: Vec<(usize, usize)> = if break_indices.is_empty() {
        vec![(0, n - 1)]
    } else {
        let mut ranges = Vec::with_capacity(break_indices.len() + 1);
        let mut begin = 0;
        for &i in &break_indices {
            ranges.push((begin, i));
            begin = i + 1;
        }
        ranges.push((begin, n - 1));
        ranges
    };

    let mut weighted_sum = 0.0;
    let mut total_n = 0.0;

    for (b, e) in ranges {
        if e > b {
            let orig_begin = time_stamps[b];
            let orig_end = time_stamps[e];

            let idx: Vec<f64> = (b..=e).map(|i| i as f64).collect();
            let (a, slope) = least_squares_affine(&idx, &time_stamps[b..=e]);
            for (k, i) in (b..=e).enumerate() {
                time_stamps[i] = a + slope * idx[k];
            }

            let n_i = (e - b + 1) as f64;
            let duration = orig_end - orig_begin;
            if duration > 0.0 {
                let r_i = n_i / duration;
                weighted_sum += r_i * n_i;
                total_n += n_i;
            }
        }
    }

    if total_n > 0.0 {
        weighted_sum / total_n
    } else {
        0.0
    }
}
