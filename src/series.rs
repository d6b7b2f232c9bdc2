//! Price bars and ordered price series.

use serde::{Deserialize, Serialize};

use crate::{AnalysisError, OHLCVExt, Result, OHLCV};

/// One sampling period. Timestamps are unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub const fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for PriceBar {
    #[inline]
    fn open(&self) -> f64 {
        self.open
    }

    #[inline]
    fn high(&self) -> f64 {
        self.high
    }

    #[inline]
    fn low(&self) -> f64 {
        self.low
    }

    #[inline]
    fn close(&self) -> f64 {
        self.close
    }

    #[inline]
    fn volume(&self) -> f64 {
        self.volume
    }

    #[inline]
    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

/// Ordered bars for one instrument with strictly increasing timestamps.
///
/// The integer position is the index every indicator column is aligned to;
/// timestamps are carried alongside and only used for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: Option<String>,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Validate every bar and the timestamp ordering.
    pub fn new(bars: Vec<PriceBar>) -> Result<Self> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                AnalysisError::InvalidBar { reason, .. } => AnalysisError::InvalidBar { index: i, reason },
                other => other,
            })?;
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(AnalysisError::UnorderedTimestamps { index: i });
            }
        }
        Ok(Self { symbol: None, bars })
    }

    /// Build from any OHLCV source. Every bar must carry a timestamp.
    pub fn from_ohlcv<T: OHLCV>(source: &[T]) -> Result<Self> {
        let bars = source
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let timestamp = b.timestamp().ok_or(AnalysisError::InvalidBar {
                    index: i,
                    reason: "missing timestamp",
                })?;
                Ok(PriceBar::new(timestamp, b.open(), b.high(), b.low(), b.close(), b.volume()))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(bars)
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[inline]
    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    #[inline]
    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    /// Simple close-to-close returns, length `len - 1`.
    pub fn returns(&self) -> Vec<f64> {
        self.bars
            .windows(2)
            .map(|w| (w[1].close - w[0].close) / w[0].close)
            .collect()
    }

    /// The last `n` bars as a new series (the whole series when shorter).
    pub fn tail(&self, n: usize) -> PriceSeries {
        let start = self.bars.len().saturating_sub(n);
        PriceSeries {
            symbol: self.symbol.clone(),
            bars: self.bars[start..].to_vec(),
        }
    }

    /// Closing price `lag` bars before the last one.
    pub(crate) fn close_back(&self, lag: usize) -> Option<f64> {
        let n = self.bars.len();
        (lag < n).then(|| self.bars[n - 1 - lag].close)
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, c: f64) -> PriceBar {
        PriceBar::new(ts, c, c + 1.0, c - 1.0, c, 10.0)
    }

    #[test]
    fn test_series_rejects_unordered_timestamps() {
        let err = PriceSeries::new(vec![bar(10, 100.0), bar(10, 101.0)]).unwrap_err();
        assert_eq!(err, AnalysisError::UnorderedTimestamps { index: 1 });

        let err = PriceSeries::new(vec![bar(10, 100.0), bar(5, 101.0)]).unwrap_err();
        assert_eq!(err, AnalysisError::UnorderedTimestamps { index: 1 });
    }

    #[test]
    fn test_series_reports_bad_bar_index() {
        let bad = PriceBar::new(30, 100.0, 99.0, 101.0, 100.0, 1.0);
        let err = PriceSeries::new(vec![bar(10, 100.0), bar(20, 100.0), bad]).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidBar { index: 2, .. }));
    }

    #[test]
    fn test_empty_series_is_valid() {
        let series = PriceSeries::new(Vec::new()).unwrap();
        assert!(series.is_empty());
        assert!(series.returns().is_empty());
        assert!(series.last().is_none());
    }

    #[test]
    fn test_returns_and_tail() {
        let series = PriceSeries::new(vec![bar(1, 100.0), bar(2, 110.0), bar(3, 99.0)])
            .unwrap()
            .with_symbol("BTC-USD");
        let r = series.returns();
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.1).abs() < 1e-12);
        assert!((r[1] + 0.1).abs() < 1e-12);

        let tail = series.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.symbol(), Some("BTC-USD"));
        assert_eq!(tail.closes(), vec![110.0, 99.0]);
        assert_eq!(series.tail(10).len(), 3);
        assert_eq!(series.close_back(0), Some(99.0));
        assert_eq!(series.close_back(2), Some(100.0));
        assert_eq!(series.close_back(3), None);
    }

    #[test]
    fn test_from_ohlcv_requires_timestamps() {
        struct Untimed;
        impl OHLCV for Untimed {
            fn open(&self) -> f64 {
                1.0
            }
            fn high(&self) -> f64 {
                1.0
            }
            fn low(&self) -> f64 {
                1.0
            }
            fn close(&self) -> f64 {
                1.0
            }
            fn volume(&self) -> f64 {
                1.0
            }
        }

        assert!(PriceSeries::from_ohlcv(&[Untimed]).is_err());

        let timed = vec![bar(1, 50.0), bar(2, 51.0)];
        let series = PriceSeries::from_ohlcv(&timed).unwrap();
        assert_eq!(series.timestamps(), vec![1, 2]);
    }
}
