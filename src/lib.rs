//! # Coinsight - crypto market analytics core
//!
//! Deterministic numeric pipeline that turns a raw OHLCV series into indicator
//! columns, pattern and level detections, composite scores and price simulations.
//!
//! ## Quick Start
//!
//! ```rust
//! use coinsight::prelude::*;
//!
//! let bars: Vec<PriceBar> = (0..60)
//!     .map(|i| {
//!         let c = 100.0 + i as f64;
//!         PriceBar::new(i * 86_400, c - 0.5, c + 1.0, c - 1.0, c, 1_000.0)
//!     })
//!     .collect();
//!
//! let series = PriceSeries::new(bars).unwrap();
//! let frame = IndicatorEngine::default().compute(&series);
//! let score = technical_score(&series, &frame).unwrap();
//! assert!((0.0..=100.0).contains(&score.score));
//! ```

pub mod analytics;
pub mod batch;
pub mod detectors;
pub mod indicators;
pub mod math;
pub mod params;
pub mod scoring;
pub mod series;
pub mod simulation;

pub mod prelude {
    pub use crate::{
        // Analytics
        analytics::*,
        // Batch
        batch::{
            compare_watchlist, fast_movers, screen_parallel, sector_rotation, top_movers, ScanError,
            ScreenFilter,
        },
        // Detectors
        detectors::*,
        // Indicators
        indicators::{IndicatorConfig, IndicatorEngine, IndicatorFrame, IndicatorRow},
        // Parameters
        params::{get_amount, get_period, get_ratio, ParamMeta, ParamType, Parameterized},
        // Scoring
        scoring::*,
        // Series
        series::{PriceBar, PriceSeries},
        // Simulation
        simulation::*,
        // Errors
        AnalysisError,
        // Types
        Direction,
        OHLCVExt,
        Period,
        Ratio,
        Result,
        Series,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur during analysis
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },

    #[error("Timestamps not strictly increasing at index {index}")]
    UnorderedTimestamps { index: usize },

    #[error("Undefined value: {0}")]
    Undefined(&'static str),
}

impl AnalysisError {
    /// Shorthand used by every length-gated analysis
    #[inline]
    pub(crate) fn require(need: usize, got: usize) -> Result<()> {
        if got < need {
            return Err(AnalysisError::InsufficientData { need, got });
        }
        Ok(())
    }
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Tolerance or band expressed as a fraction of price, in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Ratio(f64);

impl Ratio {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(AnalysisError::InvalidValue("ratio must be finite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange { field: "ratio", value, min: 0.0, max: 1.0 });
        }
        Ok(Self(value))
    }

    /// Unchecked, for literal defaults.
    pub(crate) const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Ratio {
    type Error = AnalysisError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Ratio> for f64 {
    fn from(ratio: Ratio) -> f64 {
        ratio.0
    }
}

/// Window, lookback or horizon length in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Period(usize);

impl Period {
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    /// Unchecked, for literal defaults.
    pub(crate) const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl TryFrom<usize> for Period {
    type Error = AnalysisError;

    fn try_from(value: usize) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Period> for usize {
    fn from(period: Period) -> usize {
        period.0
    }
}

/// Indicator column aligned to a bar index. `None` marks warm-up or an
/// undefined computation (zero range, zero variance, 0/0).
pub type Series = Vec<Option<f64>>;

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

impl<T: OHLCV + ?Sized> OHLCV for &T {
    fn open(&self) -> f64 {
        (**self).open()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }

    fn volume(&self) -> f64 {
        (**self).volume()
    }

    fn timestamp(&self) -> Option<i64> {
        (**self).timestamp()
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// (H + L + C) / 3
    #[inline]
    fn typical_price(&self) -> f64 {
        (self.high() + self.low() + self.close()) / 3.0
    }

    /// Max of H-L, |H-prev_close|, |L-prev_close|; plain H-L without a previous bar
    #[inline]
    fn true_range(&self, prev_close: Option<f64>) -> f64 {
        let hl = self.range();
        match prev_close {
            Some(pc) => hl.max((self.high() - pc).abs()).max((self.low() - pc).abs()),
            None => hl,
        }
    }

    /// Body as ratio of range. Returns None if range is zero
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > 0.0).then(|| self.body() / range)
    }

    /// Validate price ordering and finiteness
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(AnalysisError::InvalidBar {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(AnalysisError::InvalidBar {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        if prices.iter().any(|p| *p <= 0.0) {
            return Err(AnalysisError::InvalidBar {
                index: 0,
                reason: "non-positive price",
            });
        }
        if self.high() < self.low() {
            return Err(AnalysisError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        if self.open().min(self.close()) < self.low() || self.open().max(self.close()) > self.high()
        {
            return Err(AnalysisError::InvalidBar {
                index: 0,
                reason: "open/close outside high-low range",
            });
        }
        let v = self.volume();
        if !v.is_finite() || v < 0.0 {
            return Err(AnalysisError::InvalidBar {
                index: 0,
                reason: "volume must be finite and non-negative",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

// ============================================================
// DIRECTION
// ============================================================

/// Directional bias of a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

// ============================================================
// TESTS
// ============================================================
