//! Pattern and level detectors
//!
//! Each detector is a pure function of a [`PriceSeries`](crate::series::PriceSeries),
//! optionally its [`IndicatorFrame`](crate::indicators::IndicatorFrame) and a
//! parameter struct. Too-short input yields
//! [`AnalysisError::InsufficientData`](crate::AnalysisError::InsufficientData).
//!
//! # Detector Categories
//!
//! - **Divergence**: price vs RSI swing disagreement
//! - **Gaps**: opening gaps and their fills
//! - **Breakout**: 52-week high/low breaks with a strength score
//! - **Levels**: clustered and pivot support/resistance, confluence, Fibonacci,
//!   pivots, volume profile
//! - **Candles**: fixed-confidence candlestick library
//! - **Anomalies**: statistical outliers and last-bar alerts
//! - **Drawdown**: peak-to-trough episodes
//! - **Price action**: double tops/bottoms, triangles, flags
//! - **Time zones**: Fibonacci bar offsets from a swing low
//! - **Waves**: Elliott swing count and Wyckoff phase

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple pattern types.
macro_rules! impl_with_defaults {
  ($($pattern:ty),* $(,)?) => {
    $(impl $pattern {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod anomalies;
pub mod breakout;
pub mod candles;
pub mod divergence;
pub mod drawdown;
pub mod gaps;
pub mod levels;
pub mod price_action;
pub mod time_zones;
pub mod waves;

// Re-export all detectors for convenience
pub use anomalies::*;
pub use breakout::*;
pub use candles::*;
pub use divergence::*;
pub use drawdown::*;
pub use gaps::*;
pub use levels::*;
pub use price_action::*;
pub use time_zones::*;
pub use waves::*;
