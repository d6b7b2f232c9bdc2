//! Supplementary analytics
//!
//! Single-series and cross-series statistics that sit beside the scorers:
//! multi-timeframe momentum, mean reversion, volatility regime, return
//! distribution, calendar seasonality, win rate by weekday and hour, the
//! monthly performance calendar and relative performance.

pub mod calendar;
pub mod mean_reversion;
pub mod momentum;
pub mod relative;
pub mod statistics;
pub mod volatility;

pub use calendar::*;
pub use mean_reversion::*;
pub use momentum::*;
pub use relative::*;
pub use statistics::*;
pub use volatility::*;

/// Annualization factor for daily returns
pub(crate) fn annualize(daily_std: f64) -> f64 {
    daily_std * (crate::detectors::helpers::BARS_PER_YEAR as f64).sqrt()
}
