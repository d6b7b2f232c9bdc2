//! Common helper functions for level and swing detection
//!
//! Swing tests, distance conversions and the calendar-day arithmetic shared
//! across detector modules.

// ============================================================
// CONSTANTS
// ============================================================

pub const SECONDS_PER_DAY: i64 = 86_400;
/// Bars in one trading year of daily data
pub const BARS_PER_YEAR: usize = 252;

// ============================================================
// SWINGS
// ============================================================

#[inline]
fn window(values: &[f64], i: usize, radius: usize) -> &[f64] {
    let start = i.saturating_sub(radius);
    let end = (i + radius + 1).min(values.len());
    &values[start..end]
}

/// `values[i]` is the maximum of `[i - radius, i + radius]`, clipped to the slice.
#[inline]
pub fn is_swing_high(values: &[f64], i: usize, radius: usize) -> bool {
    let v = values[i];
    window(values, i, radius).iter().all(|&x| x <= v)
}

/// `values[i]` is the minimum of `[i - radius, i + radius]`, clipped to the slice.
#[inline]
pub fn is_swing_low(values: &[f64], i: usize, radius: usize) -> bool {
    let v = values[i];
    window(values, i, radius).iter().all(|&x| x >= v)
}

/// Indices with a full neighbourhood on both sides that are swing highs.
pub fn swing_highs(values: &[f64], radius: usize) -> Vec<usize> {
    full_window_indices(values.len(), radius)
        .filter(|&i| is_swing_high(values, i, radius))
        .collect()
}

/// Indices with a full neighbourhood on both sides that are swing lows.
pub fn swing_lows(values: &[f64], radius: usize) -> Vec<usize> {
    full_window_indices(values.len(), radius)
        .filter(|&i| is_swing_low(values, i, radius))
        .collect()
}

fn full_window_indices(len: usize, radius: usize) -> std::ops::Range<usize> {
    radius..len.saturating_sub(radius)
}

// ============================================================
// DISTANCES
// ============================================================

/// Signed percentage move from `from` to `to`.
#[inline]
pub fn percent_from(from: f64, to: f64) -> f64 {
    (to - from) / from * 100.0
}

/// Whole calendar days between two unix timestamps.
#[inline]
pub fn days_between(from: i64, to: i64) -> i64 {
    (to - from).div_euclid(SECONDS_PER_DAY)
}

/// Round to `places` decimals, for report fields presented as rounded values.
#[inline]
pub fn round_to(value: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (value * f).round() / f
}
