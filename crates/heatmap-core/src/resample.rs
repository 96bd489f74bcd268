//! Piecewise-linear resampling of dense signals.

/// `count` evenly spaced values from `start` to `end` inclusive.
///
/// The last value is exactly `end`.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![end],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            let mut out: Vec<f64> = (0..count - 1).map(|i| start + i as f64 * step).collect();
            out.push(end);
            out
        }
    }
}

/// Fit `data` to exactly `new_width` values by linear interpolation.
///
/// `data` is treated as samples at positions `0..n`. One- and
/// two-element inputs degenerate to a straight line between the first
/// and last value. The last output always equals the last input.
pub fn resample(data: &[f64], new_width: usize) -> Vec<f64> {
    let n = data.len();
    if n == 0 || new_width == 0 {
        return vec![0.0; new_width];
    }
    if n <= 2 {
        return linspace(data[0], data[n - 1], new_width);
    }
    if new_width == 1 {
        return vec![data[n - 1]];
    }

    let span = (n - 1) as f64;
    let denom = (new_width - 1) as f64;
    let mut out = Vec::with_capacity(new_width);
    for j in 0..new_width - 1 {
        let x = j as f64 * span / denom;
        let i = (x.floor() as usize).min(n - 2);
        out.push(data[i] + (x - i as f64) * (data[i + 1] - data[i]));
    }
    out.push(data[n - 1]);
    out
}
