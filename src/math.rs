//! Series math primitives
//!
//! Rolling-window and cumulative statistics aligned to the input index. Every
//! rolling output has the same length as its input; the first `window - 1`
//! positions are `None`, and a window larger than the input (or zero) yields
//! an all-`None` column. The `*_opt` variants accept partially defined input:
//! any window that touches a `None` is itself `None`.

use crate::Series;

// ============================================================
// ROLLING WINDOWS
// ============================================================

fn rolling_apply<F>(values: &[f64], window: usize, f: F) -> Series
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let n = values.len();
    if window == 0 || window > n {
        return vec![None; n];
    }
    let mut out = vec![None; window - 1];
    out.extend(values.windows(window).map(&f));
    out
}

fn rolling_apply_opt<F>(values: &[Option<f64>], window: usize, f: F) -> Series
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let n = values.len();
    if window == 0 || window > n {
        return vec![None; n];
    }
    let mut buf = Vec::with_capacity(window);
    let mut out = vec![None; window - 1];
    for w in values.windows(window) {
        buf.clear();
        buf.extend(w.iter().map_while(|v| *v));
        out.push(if buf.len() == window { f(&buf) } else { None });
    }
    out
}

pub fn rolling_sum(values: &[f64], window: usize) -> Series {
    rolling_apply(values, window, |w| Some(w.iter().sum()))
}

pub fn rolling_mean(values: &[f64], window: usize) -> Series {
    rolling_apply(values, window, mean)
}

/// Sample standard deviation (n - 1) over each window
pub fn rolling_std(values: &[f64], window: usize) -> Series {
    rolling_apply(values, window, sample_std)
}

pub fn rolling_min(values: &[f64], window: usize) -> Series {
    rolling_apply(values, window, |w| w.iter().copied().reduce(f64::min))
}

pub fn rolling_max(values: &[f64], window: usize) -> Series {
    rolling_apply(values, window, |w| w.iter().copied().reduce(f64::max))
}

pub fn rolling_sum_opt(values: &[Option<f64>], window: usize) -> Series {
    rolling_apply_opt(values, window, |w| Some(w.iter().sum()))
}

pub fn rolling_mean_opt(values: &[Option<f64>], window: usize) -> Series {
    rolling_apply_opt(values, window, mean)
}

pub fn rolling_std_opt(values: &[Option<f64>], window: usize) -> Series {
    rolling_apply_opt(values, window, sample_std)
}

// ============================================================
// EXPONENTIAL SMOOTHING
// ============================================================

/// Smoothing constant for an EMA span
#[inline]
pub fn ema_alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Exponential moving average seeded with the first value, single pass.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = ema_alpha(span);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &x in values {
        let next = match prev {
            Some(p) => p + alpha * (x - p),
            None => x,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// EMA over a partially defined column. Seeds on the first defined value;
/// leading `None` stays `None`, later gaps hold the previous average.
pub fn ema_opt(values: &[Option<f64>], span: usize) -> Series {
    let alpha = ema_alpha(span);
    let mut prev: Option<f64> = None;
    values
        .iter()
        .map(|v| {
            prev = match (prev, v) {
                (Some(p), Some(x)) => Some(p + alpha * (x - p)),
                (None, Some(x)) => Some(*x),
                (p, None) => p,
            };
            prev
        })
        .collect()
}

/// Wilder smoothing: first output is the simple mean of the first `period`
/// values, then `prev + (x - prev) / period`.
pub fn wilder_smooth(values: &[f64], period: usize) -> Series {
    let n = values.len();
    if period == 0 || period > n {
        return vec![None; n];
    }
    let mut out = vec![None; period - 1];
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out.push(Some(prev));
    for &x in &values[period..] {
        prev += (x - prev) / period as f64;
        out.push(Some(prev));
    }
    out
}

// ============================================================
// POINT STATISTICS
// ============================================================

pub fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation; undefined below two observations.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (n - 1) as f64).sqrt())
}

/// Population standard deviation (divides by n).
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / values.len() as f64).sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

/// Percentile `q` in [0, 100] with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&q) {
        return None;
    }
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Pearson correlation. Undefined for mismatched or short input and for
/// zero variance on either side.
pub fn correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Least-squares slope of `ys` against their index.
pub fn linear_slope(ys: &[f64]) -> Option<f64> {
    let n = ys.len();
    if n < 2 {
        return None;
    }
    let mx = (n - 1) as f64 / 2.0;
    let my = mean(ys)?;
    let (mut num, mut den) = (0.0, 0.0);
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - mx;
        num += dx * (y - my);
        den += dx * dx;
    }
    Some(num / den)
}

/// Bias-corrected sample skewness. Undefined below three observations or at zero variance.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let m = mean(values)?;
    let s = sample_std(values)?;
    if s == 0.0 {
        return None;
    }
    let nf = n as f64;
    let sum3: f64 = values.iter().map(|v| ((v - m) / s).powi(3)).sum();
    Some(nf / ((nf - 1.0) * (nf - 2.0)) * sum3)
}

/// Bias-corrected excess kurtosis. Undefined below four observations or at zero variance.
pub fn excess_kurtosis(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 4 {
        return None;
    }
    let m = mean(values)?;
    let s = sample_std(values)?;
    if s == 0.0 {
        return None;
    }
    let nf = n as f64;
    let sum4: f64 = values.iter().map(|v| ((v - m) / s).powi(4)).sum();
    let a = nf * (nf + 1.0) / ((nf - 1.0) * (nf - 2.0) * (nf - 3.0));
    let b = 3.0 * (nf - 1.0).powi(2) / ((nf - 2.0) * (nf - 3.0));
    Some(a * sum4 - b)
}

// ============================================================
// DIFFERENCES
// ============================================================

/// `x[i] - x[i - lag]`, undefined for the first `lag` positions.
pub fn diff(values: &[f64], lag: usize) -> Series {
    (0..values.len())
        .map(|i| (i >= lag && lag > 0).then(|| values[i] - values[i - lag]))
        .collect()
}

/// `(x[i] - x[i - lag]) / x[i - lag]`, undefined for the first `lag`
/// positions and where the base is zero.
pub fn pct_change(values: &[f64], lag: usize) -> Series {
    (0..values.len())
        .map(|i| {
            if lag == 0 || i < lag || values[i - lag] == 0.0 {
                return None;
            }
            Some((values[i] - values[i - lag]) / values[i - lag])
        })
        .collect()
}

/// Defined entries of a column, in order.
pub fn defined(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

/// Value at `index` counted from the end (0 = last).
#[inline]
pub fn back(values: &[Option<f64>], lag: usize) -> Option<f64> {
    let n = values.len();
    if lag >= n {
        return None;
    }
    values[n - 1 - lag]
}

// ============================================================
// TESTS
// ============================================================
