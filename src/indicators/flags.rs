//! Per-bar candle flags carried on the indicator frame.

use crate::{OHLCVExt, OHLCV};

/// Body under 10% of a non-zero range
pub const DOJI_BODY_RATIO: f64 = 0.1;
/// Lower shadow must exceed this multiple of the body
pub const HAMMER_SHADOW_FACTOR: f64 = 2.0;
/// Upper shadow must stay below this fraction of the body
pub const HAMMER_UPPER_LIMIT: f64 = 0.3;

#[inline]
pub fn is_doji<T: OHLCV>(bar: &T) -> bool {
    bar.body_ratio().is_some_and(|r| r < DOJI_BODY_RATIO)
}

#[inline]
pub fn is_hammer<T: OHLCV>(bar: &T) -> bool {
    let body = bar.body();
    bar.lower_shadow() > HAMMER_SHADOW_FACTOR * body
        && bar.upper_shadow() < HAMMER_UPPER_LIMIT * body
        && bar.is_bullish()
}

/// Bearish candle followed by a bullish one whose body spans it.
#[inline]
pub fn is_bullish_engulfing<T: OHLCV>(prev: &T, cur: &T) -> bool {
    prev.is_bearish() && cur.is_bullish() && cur.open() < prev.close() && cur.close() > prev.open()
}

/// Bullish candle followed by a bearish one whose body spans it.
#[inline]
pub fn is_bearish_engulfing<T: OHLCV>(prev: &T, cur: &T) -> bool {
    prev.is_bullish() && cur.is_bearish() && cur.open() > prev.close() && cur.close() < prev.open()
}

pub fn single_bar_flags<T: OHLCV>(bars: &[T], f: fn(&T) -> bool) -> Vec<bool> {
    bars.iter().map(f).collect()
}

pub fn two_bar_flags<T: OHLCV>(bars: &[T], f: fn(&T, &T) -> bool) -> Vec<bool> {
    (0..bars.len())
        .map(|i| i > 0 && f(&bars[i - 1], &bars[i]))
        .collect()
}
