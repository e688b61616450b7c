//! Cross-stream alignment utilities (§4.7). Operate on an already-loaded
//! slice of streams; neither is invoked automatically by [`crate::load`].

use ndarray::{s, Array2};

use crate::model::{FinalStream, TimeSeries};

/// Expands every stream's timestamps onto the fastest regular stream's
/// uniform grid, spanning the union of all streams' original time ranges.
///
/// Numeric streams are linearly interpolated column-by-column; points
/// outside a stream's original span become `NaN`. Integer-typed streams
/// are rounded to the nearest integer after interpolation. String streams
/// start as all-empty rows; each original marker is snapped to its nearest
/// grid point.
///
/// A no-op if no stream has a positive `effective_srate` (nothing to grid
/// against).
pub fn sync_timestamps(streams: &mut [FinalStream]) {
    let master_tdiff = streams
        .iter()
        .filter(|s| s.info.effective_srate > 0.0)
        .max_by(|a, b| {
            a.info
                .effective_srate
                .partial_cmp(&b.info.effective_srate)
                .unwrap()
        })
        .map(|s| 1.0 / s.info.effective_srate);

    let Some(tdiff) = master_tdiff else {
        return;
    };

    let t_lo = streams
        .iter()
        .filter_map(|s| s.time_stamps.first().copied())
        .fold(f64::INFINITY, f64::min);
    let t_hi = streams
        .iter()
        .filter_map(|s| s.time_stamps.last().copied())
        .fold(f64::NEG_INFINITY, f64::max);
    if !t_lo.is_finite() || !t_hi.is_finite() {
        return;
    }

    let n_grid = ((t_hi - t_lo) / tdiff).round() as usize + 1;
    let grid: Vec<f64> = (0..n_grid).map(|i| t_lo + i as f64 * tdiff).collect();

    for stream in streams.iter_mut() {
        let old_t = std::mem::replace(&mut stream.time_stamps, grid.clone());

        match &stream.time_series {
            TimeSeries::Numeric(mat) => {
                let nchns = mat.shape()[1];
                let mut new_mat = Array2::<f64>::from_elem((grid.len(), nchns), f64::NAN);
                for c in 0..nchns {
                    let col: Vec<f64> = (0..mat.shape()[0]).map(|r| mat[[r, c]]).collect();
                    for (r, v) in interpolate_column(&old_t, &col, &grid).into_iter().enumerate() {
                        new_mat[[r, c]] = v;
                    }
                }
                if stream.info.channel_format.is_integer() {
                    new_mat.mapv_inplace(|v| if v.is_nan() { v } else { v.round() });
                }
                stream.time_series = TimeSeries::Numeric(new_mat);
            }
            TimeSeries::String(rows) => {
                let nchns = stream.info.channel_count;
                let mut new_rows = vec![vec![String::new(); nchns]; grid.len()];
                for (orig_t, orig_row) in old_t.iter().zip(rows.iter()) {
                    let idx = nearest_grid_index(t_lo, tdiff, grid.len(), *orig_t);
                    new_rows[idx] = orig_row.clone();
                }
                stream.time_series = TimeSeries::String(new_rows);
            }
        }
    }
}

/// A stream's first/last timestamp that actually carries original data,
/// as opposed to a `sync_timestamps`-extrapolated `NaN`/empty grid row.
///
/// Before `sync_timestamps` every row is original, so this is just
/// `time_stamps.first()/.last()`; after it, the extrapolated region is
/// exactly the `NaN`/empty rows, so this recovers the pre-extrapolation
/// span `sync_timestamps` overwrote `time_stamps` with.
fn original_span(stream: &FinalStream) -> Option<(f64, f64)> {
    let valid_at = |row: usize| -> bool {
        match &stream.time_series {
            TimeSeries::Numeric(mat) => mat.shape()[1] == 0 || !mat[[row, 0]].is_nan(),
            TimeSeries::String(rows) => rows[row].iter().any(|s| !s.is_empty()),
        }
    };
    let n = stream.time_stamps.len();
    if n == 0 {
        return None;
    }
    let first = (0..n).find(|&r| valid_at(r))?;
    let last = (0..n).rev().find(|&r| valid_at(r))?;
    Some((stream.time_stamps[first], stream.time_stamps[last]))
}

/// Restricts every stream to the common temporal intersection of all
/// streams' original (pre-extrapolation) spans.
///
/// A no-op if any stream has no samples at all.
pub fn limit_to_overlap(streams: &mut [FinalStream]) {
    let spans: Vec<Option<(f64, f64)>> = streams.iter().map(original_span).collect();
    let t_lo = spans
        .iter()
        .filter_map(|s| s.map(|(a, _)| a))
        .fold(f64::NEG_INFINITY, f64::max);
    let t_hi = spans
        .iter()
        .filter_map(|s| s.map(|(_, b)| b))
        .fold(f64::INFINITY, f64::min);
    if !t_lo.is_finite() || !t_hi.is_finite() {
        return;
    }

    for stream in streams.iter_mut() {
        let keep: Vec<usize> = stream
            .time_stamps
            .iter()
            .enumerate()
            .filter(|&(_, &t)| t >= t_lo && t <= t_hi)
            .map(|(i, _)| i)
            .collect();

        if keep.is_empty() {
            stream.time_stamps.clear();
            match &mut stream.time_series {
                TimeSeries::Numeric(mat) => {
                    let nchns = mat.shape()[1];
                    *mat = Array2::zeros((0, nchns));
                }
                TimeSeries::String(rows) => rows.clear(),
            }
            continue;
        }

        let lo = keep[0];
        let hi = *keep.last().unwrap();
        stream.time_stamps = stream.time_stamps[lo..=hi].to_vec();
        match &mut stream.time_series {
            TimeSeries::Numeric(mat) => {
                *mat = mat.slice(s![lo..=hi, ..]).to_owned();
            }
            TimeSeries::String(rows) => {
                *rows = rows[lo..=hi].to_vec();
            }
        }
    }
}

fn nearest_grid_index(t_lo: f64, tdiff: f64, len: usize, t: f64) -> usize {
    let idx = ((t - t_lo) / tdiff).round();
    if idx < 0.0 {
        0
    } else if idx as usize >= len {
        len - 1
    } else {
        idx as usize
    }
}

/// Linearly interpolates `fp` (sampled at `xp`) onto `grid`; points outside
/// `[xp.first(), xp.last()]` map to `NaN`. `xp` must be non-decreasing.
fn interpolate_column(xp: &[f64], fp: &[f64], grid: &[f64]) -> Vec<f64> {
    if xp.is_empty() {
        return vec![f64::NAN; grid.len()];
    }
    grid.iter()
        .map(|&x| {
            if x < xp[0] || x > xp[xp.len() - 1] {
                return f64::NAN;
            }
            match xp.binary_search_by(|v| v.partial_cmp(&x).unwrap()) {
                Ok(idx) => fp[idx],
                Err(idx) => {
                    let i0 = idx - 1;
                    let i1 = idx;
                    let (x0, x1) = (xp[i0], xp[i1]);
                    let (y0, y1) = (fp[i0], fp[i1]);
                    if (x1 - x0).abs() < f64::EPSILON {
                        y0
                    } else {
                        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
                    }
                }
            }
        })
        .collect()
}
