//! Range and dispersion measures.

use crate::math::{pct_change, rolling_mean, rolling_std_opt};
use crate::{OHLCVExt, Series, OHLCV};

/// Per-bar true range; the first bar uses its own high-low range.
pub fn true_range<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, b)| b.true_range(i.checked_sub(1).map(|p| bars[p].close())))
        .collect()
}

/// Average true range: simple rolling mean of the true range.
pub fn atr<T: OHLCV>(bars: &[T], period: usize) -> Series {
    rolling_mean(&true_range(bars), period)
}

/// Rolling sample deviation of simple returns, scaled by
/// `sqrt(periods_per_year) * 100`.
pub fn annualized_volatility(closes: &[f64], window: usize, periods_per_year: f64) -> Series {
    let scale = periods_per_year.sqrt() * 100.0;
    rolling_std_opt(&pct_change(closes, 1), window)
        .into_iter()
        .map(|v| v.map(|v| v * scale))
        .collect()
}
