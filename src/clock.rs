//! Clock-offset regression with reset detection (§4.4).
//!
//! Segment boundaries and the robust fit are grounded on
//! `original_source/Python/xdf.py`'s `_clock_sync`; per the design notes,
//! the correction is applied to the INCLUSIVE range `[begin, end]` rather
//! than the original's half-open `slice(begin, end)`, which silently drops
//! the last point of every segment but the final one.

use crate::options::XdfOptions;
use crate::robust_fit::robust_fit;

fn median(xs: &[f64]) -> f64 {
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn mad(xs: &[f64], center: f64) -> f64 {
    let dev: Vec<f64> = xs.iter().map(|&x| (x - center).abs()).collect();
    median(&dev)
}

/// Splits `[0, clock_times.len()-1]` into contiguous, inclusive
/// `(begin, end)` segments around detected clock resets (§4.4 steps 3-4).
fn compute_ranges(clock_times: &[f64], clock_values: &[f64], opts: &XdfOptions) -> Vec<(usize, usize)> {
    let n = clock_times.len();
    if !opts.handle_clock_resets || n < 2 {
        return vec![(0, n.saturating_sub(1))];
    }

    let time_diff: Vec<f64> = clock_times.windows(2).map(|w| w[1] - w[0]).collect();
    let value_diff: Vec<f64> = clock_values.windows(2).map(|w| (w[1] - w[0]).abs()).collect();

    let median_ival = median(&time_diff);
    let median_slope = median(&value_diff);
    let mad_time = mad(&time_diff, median_ival) + f64::EPSILON;
    let mad_slope = mad(&value_diff, median_slope) + f64::EPSILON;

    let time_glitch: Vec<bool> = time_diff
        .iter()
        .map(|&d| {
            d < 0.0
                || ((d - median_ival) / mad_time > opts.clock_reset_threshold_stds
                    && d - median_ival > opts.clock_reset_threshold_seconds)
        })
        .collect();

    let value_glitch: Vec<bool> = value_diff
        .iter()
        .map(|&d| {
            d < 0.0
                || ((d - median_slope) / mad_slope > opts.clock_reset_threshold_offset_stds
                    && d - median_slope > opts.clock_reset_threshold_offset_seconds)
        })
        .collect();

    let reset_indices: Vec<usize> = (0..time_diff.len())
        .filter(|&i| time_glitch[i] && value_glitch[i])
        .collect();

    if reset_indices.is_empty() {
        return vec![(0, n - 1)];
    }

    let mut ranges = Vec::with_capacity(reset_indices.len() + 1);
    let mut begin = 0;
    for &i in &reset_indices {
        ranges.push((begin, i));
        begin = i + 1;
    }
    ranges.push((begin, n - 1));
    ranges
}

/// Fits and applies clock-offset correction to `time_stamps` in place,
/// per §4.4. A no-op if there are no clock-offset measurements.
pub(crate) fn apply_clock_sync(
    time_stamps: &mut [f64],
    clock_times: &[f64],
    clock_values: &[f64],
    opts: &XdfOptions,
) {
    if clock_times.is_empty() || time_stamps.is_empty() {
        return;
    }

    let ranges = compute_ranges(clock_times, clock_values, opts);

    let coefs: Vec<(f64, f64)> = ranges
        .iter()
        .map(|&(b, e)| {
            if b != e {
                let t: Vec<f64> = clock_times[b..=e]
                    .iter()
                    .map(|&x| x / opts.winsor_threshold)
                    .collect();
                let v: Vec<f64> = clock_values[b..=e]
                    .iter()
                    .map(|&x| x / opts.winsor_threshold)
                    .collect();
                robust_fit(1.0 / opts.winsor_threshold, &t, &v)
            } else {
                (clock_values[b], 0.0)
            }
        })
        .collect();

    if ranges.len() == 1 {
        let (a, b) = coefs[0];
        for ts in time_stamps.iter_mut() {
            *ts += a + b * *ts;
        }
    } else {
        for (&(rb, re), &(a, b)) in ranges.iter().zip(coefs.iter()) {
            let end = re.min(time_stamps.len() - 1);
            if rb > end {
                continue;
            }
            for ts in &mut time_stamps[rb..=end] {
                *ts += a + b * *ts;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> XdfOptions {
        XdfOptions::default()
    }

    #[test]
    fn single_segment_applies_globally() {
        let clock_times: Vec<f64> = (0..10).map(|i| i as f64).collect();
        // offset of exactly +2 at every measurement => a=2, b=0
        let clock_values: Vec<f64> = clock_times.iter().map(|_| 2.0).collect();
        let mut stamps = vec![0.0, 1.0, 2.0, 3.0];
        let mut o = opts();
        o.winsor_threshold = 1.0;
        apply_clock_sync(&mut stamps, &clock_times, &clock_values, &o);
        assert!((stamps[0] - 2.0).abs() < 1e-6);
        assert!((stamps[3] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn single_segment_at_default_winsor_threshold() {
        // Same scenario as `single_segment_applies_globally`, but at the
        // default `winsor_threshold` (1e-4) rather than 1.0, so the design
        // matrix's intercept column is actually exercised scaled.
        let clock_times: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let clock_values: Vec<f64> = clock_times.iter().map(|_| 2.0).collect();
        let mut stamps = vec![0.0, 1.0, 2.0, 3.0];
        apply_clock_sync(&mut stamps, &clock_times, &clock_values, &opts());
        assert!((stamps[0] - 2.0).abs() < 1e-6, "stamps[0]={}", stamps[0]);
        assert!((stamps[3] - 5.0).abs() < 1e-6, "stamps[3]={}", stamps[3]);
    }

    #[test]
    fn detects_reset_and_splits_segments() {
        // Two pristine affine segments (different slope/intercept) joined by
        // a sudden +10s time jump and a large value jump, per scenario 4:
        // reset detection must split here and fit each segment independently,
        // agreeing with a plain least-squares fit on each pristine segment to
        // within 1e-6. `stamps` is set equal to `clock_times` so the
        // correction's own fitted axis lines up with where it's applied.
        let mut o = opts();
        o.winsor_threshold = 1.0;
        o.clock_reset_threshold_seconds = 5.0;
        o.clock_reset_threshold_offset_seconds = 1.0;

        let seg1_times: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let seg1_values: Vec<f64> = seg1_times.iter().map(|&t| 1.0 + 0.01 * t).collect();
        let seg2_times: Vec<f64> = (20..30).map(|i| i as f64).collect();
        let seg2_values: Vec<f64> = seg2_times.iter().map(|&t| 50.0 + 0.05 * t).collect();

        let mut clock_times = seg1_times.clone();
        clock_times.extend(seg2_times.iter().copied());
        let mut clock_values = seg1_values.clone();
        clock_values.extend(seg2_values.iter().copied());

        let mut stamps = clock_times.clone();
        apply_clock_sync(&mut stamps, &clock_times, &clock_values, &o);

        assert!(stamps.iter().all(|v| v.is_finite()));

        let (a0, b0) = least_squares(&seg1_times, &seg1_values);
        for i in 0..10 {
            let expect = clock_times[i] + a0 + b0 * clock_times[i];
            assert!((stamps[i] - expect).abs() < 1e-6, "segment 1 index {i}: got {}, want {expect}", stamps[i]);
        }
        let (a1, b1) = least_squares(&seg2_times, &seg2_values);
        for i in 10..20 {
            let expect = clock_times[i] + a1 + b1 * clock_times[i];
            assert!((stamps[i] - expect).abs() < 1e-6, "segment 2 index {i}: got {}, want {expect}", stamps[i]);
        }
    }

    fn least_squares(x: &[f64], y: &[f64]) -> (f64, f64) {
        let n = x.len() as f64;
        let sx: f64 = x.iter().sum();
        let sy: f64 = y.iter().sum();
        let sxx: f64 = x.iter().map(|v| v * v).sum();
        let sxy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
        let b = (n * sxy - sx * sy) / (n * sxx - sx * sx);
        let a = (sy - b * sx) / n;
        (a, b)
    }

    #[test]
    fn no_offsets_is_noop() {
        let mut stamps = vec![1.0, 2.0, 3.0];
        let before = stamps.clone();
        apply_clock_sync(&mut stamps, &[], &[], &opts());
        assert_eq!(stamps, before);
    }
}
