//! Momentum oscillators: RSI, MFI, ROC, Momentum.

use crate::math::{diff, pct_change, rolling_mean, rolling_sum};
use crate::{OHLCVExt, Series, OHLCV};

/// `100 - 100 / (1 + up / down)` with saturation at 100 when nothing moved
/// down and undefined when nothing moved at all.
#[inline]
fn saturating_index(up: f64, down: f64) -> Option<f64> {
    if down == 0.0 {
        return (up > 0.0).then_some(100.0);
    }
    Some(100.0 - 100.0 / (1.0 + up / down))
}

/// Relative Strength Index from rolling means of gains and losses.
///
/// The first bar has no delta and counts as a zero move, so a `period`-bar
/// history already yields one value.
pub fn rsi(closes: &[f64], period: usize) -> Series {
    let deltas = diff(closes, 1);
    let gains: Vec<f64> = deltas.iter().map(|d| d.map_or(0.0, |d| d.max(0.0))).collect();
    let losses: Vec<f64> = deltas.iter().map(|d| d.map_or(0.0, |d| (-d).max(0.0))).collect();

    rolling_mean(&gains, period)
        .into_iter()
        .zip(rolling_mean(&losses, period))
        .map(|(g, l)| saturating_index(g?, l?))
        .collect()
}

/// Money Flow Index: RSI construction over typical-price money flow.
pub fn mfi<T: OHLCV>(bars: &[T], period: usize) -> Series {
    let n = bars.len();
    let mut positive = vec![0.0; n];
    let mut negative = vec![0.0; n];
    for i in 1..n {
        let tp = bars[i].typical_price();
        let prev_tp = bars[i - 1].typical_price();
        let flow = tp * bars[i].volume();
        if tp > prev_tp {
            positive[i] = flow;
        } else if tp < prev_tp {
            negative[i] = flow;
        }
    }

    rolling_sum(&positive, period)
        .into_iter()
        .zip(rolling_sum(&negative, period))
        .map(|(p, q)| saturating_index(p?, q?))
        .collect()
}

/// Rate of change over `period` bars, percent.
pub fn roc(closes: &[f64], period: usize) -> Series {
    pct_change(closes, period)
        .into_iter()
        .map(|v| v.map(|v| v * 100.0))
        .collect()
}

/// Price difference over `period` bars.
pub fn momentum(closes: &[f64], period: usize) -> Series {
    diff(closes, period)
}

// ============================================================
// TESTS
// ============================================================
