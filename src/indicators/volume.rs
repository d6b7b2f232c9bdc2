//! Volume-weighted indicators: VWAP, OBV, Force Index, Accumulation/Distribution.

use crate::math::ema_opt;
use crate::{OHLCVExt, Series, OHLCV};

/// Cumulative VWAP from the start of the series (no session reset).
pub fn vwap<T: OHLCV>(bars: &[T]) -> Series {
    let mut pv = 0.0;
    let mut vol = 0.0;
    bars.iter()
        .map(|b| {
            pv += b.typical_price() * b.volume();
            vol += b.volume();
            (vol > 0.0).then(|| pv / vol)
        })
        .collect()
}

/// On-balance volume seeded with the first bar's volume.
pub fn obv<T: OHLCV>(bars: &[T]) -> Series {
    let mut out = Vec::with_capacity(bars.len());
    let mut acc = 0.0;
    for (i, b) in bars.iter().enumerate() {
        if i == 0 {
            acc = b.volume();
        } else {
            let prev = bars[i - 1].close();
            if b.close() > prev {
                acc += b.volume();
            } else if b.close() < prev {
                acc -= b.volume();
            }
        }
        out.push(Some(acc));
    }
    out
}

/// EMA(`period`) of `(close - prev_close) * volume`.
pub fn force_index<T: OHLCV>(bars: &[T], period: usize) -> Series {
    let raw: Series = bars
        .iter()
        .enumerate()
        .map(|(i, b)| (i > 0).then(|| (b.close() - bars[i - 1].close()) * b.volume()))
        .collect();
    ema_opt(&raw, period)
}

/// Cumulative close-location value times volume. A zero-range bar contributes nothing.
pub fn accumulation_distribution<T: OHLCV>(bars: &[T]) -> Series {
    let mut acc = 0.0;
    bars.iter()
        .map(|b| {
            let range = b.range();
            let clv = if range > 0.0 {
                ((b.close() - b.low()) - (b.high() - b.close())) / range
            } else {
                0.0
            };
            acc += clv * b.volume();
            Some(acc)
        })
        .collect()
}

// ============================================================
// TESTS
// ============================================================
