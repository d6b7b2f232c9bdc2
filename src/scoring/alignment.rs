//! Moving-average stack alignment.

use serde::Serialize;

use crate::detectors::helpers::round_to;
use crate::indicators::IndicatorFrame;
use crate::math::mean;
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlignmentCheck {
    pub name: &'static str,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlignmentSignal {
    #[serde(rename = "STRONG BULLISH")]
    StrongBullish,
    #[serde(rename = "BULLISH")]
    Bullish,
    #[serde(rename = "NEUTRAL")]
    Neutral,
    #[serde(rename = "BEARISH")]
    Bearish,
}

impl AlignmentSignal {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::StrongBullish
        } else if score >= 60.0 {
            Self::Bullish
        } else if score >= 40.0 {
            Self::Neutral
        } else {
            Self::Bearish
        }
    }

    /// Bands for the share of aligned timeframes, which are coarser than
    /// the single-series checks.
    pub fn from_timeframe_share(score: f64) -> Self {
        if score >= 75.0 {
            Self::StrongBullish
        } else if score >= 50.0 {
            Self::Bullish
        } else if score >= 25.0 {
            Self::Neutral
        } else {
            Self::Bearish
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentReport {
    /// Only checks whose inputs are defined at the last bar
    pub checks: Vec<AlignmentCheck>,
    pub aligned: usize,
    pub total: usize,
    pub score: f64,
    pub signal: AlignmentSignal,
}

/// Price above SMA20/50 and each shorter average above the next longer one.
pub fn trend_alignment(series: &PriceSeries, frame: &IndicatorFrame) -> Result<AlignmentReport> {
    let (Some(bar), Some(row)) = (series.last(), frame.last_row()) else {
        return Err(AnalysisError::InsufficientData { need: 20, got: 0 });
    };
    let price = Some(bar.close);
    let pairs = [
        ("Price > SMA20", price, row.sma_20),
        ("Price > SMA50", price, row.sma_50),
        ("SMA20 > SMA50", row.sma_20, row.sma_50),
        ("SMA50 > SMA100", row.sma_50, row.sma_100),
        ("SMA100 > SMA200", row.sma_100, row.sma_200),
    ];
    let checks: Vec<AlignmentCheck> = pairs
        .iter()
        .filter_map(|&(name, a, b)| Some(AlignmentCheck { name, passed: a? > b? }))
        .collect();
    if checks.is_empty() {
        return Err(AnalysisError::InsufficientData { need: 20, got: series.len() });
    }

    let aligned = checks.iter().filter(|c| c.passed).count();
    let total = checks.len();
    let score = round_to(aligned as f64 / total as f64 * 100.0, 1);

    Ok(AlignmentReport {
        checks,
        aligned,
        total,
        score,
        signal: AlignmentSignal::from_score(score),
    })
}

// ============================================================
// MULTI-TIMEFRAME
// ============================================================

pub const TIMEFRAME_MIN_BARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeframeView {
    pub timeframe: String,
    pub price: f64,
    pub sma_20: f64,
    pub sma_50: f64,
    /// SMA20 above SMA50
    pub bullish_trend: bool,
    pub above_sma_20: bool,
    pub aligned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeframeAlignment {
    pub timeframes: Vec<TimeframeView>,
    /// Timeframes shorter than 50 bars, left out of the score
    pub skipped: Vec<String>,
    pub aligned: usize,
    pub total: usize,
    pub score: f64,
    pub signal: AlignmentSignal,
}

fn timeframe_view(timeframe: &str, series: &PriceSeries) -> Option<TimeframeView> {
    if series.len() < TIMEFRAME_MIN_BARS {
        return None;
    }
    let closes = series.closes();
    let n = closes.len();
    let price = closes[n - 1];
    let sma_20 = mean(&closes[n - 20..])?;
    let sma_50 = mean(&closes[n - TIMEFRAME_MIN_BARS..])?;
    let bullish_trend = sma_20 > sma_50;
    let above_sma_20 = price > sma_20;
    Some(TimeframeView {
        timeframe: timeframe.to_string(),
        price,
        sma_20,
        sma_50,
        bullish_trend,
        above_sma_20,
        aligned: bullish_trend && above_sma_20,
    })
}

/// Bullish alignment of the same instrument across labelled timeframes
/// (e.g. `"1h"`, `"1d"`). Each qualifying timeframe is aligned when its
/// SMA20 is above its SMA50 and price is above its SMA20.
pub fn multi_timeframe_alignment(timeframes: &[(&str, &PriceSeries)]) -> Result<TimeframeAlignment> {
    let mut views = Vec::with_capacity(timeframes.len());
    let mut skipped = Vec::new();
    for &(label, series) in timeframes {
        match timeframe_view(label, series) {
            Some(view) => views.push(view),
            None => skipped.push(label.to_string()),
        }
    }
    if views.is_empty() {
        let longest = timeframes.iter().map(|(_, s)| s.len()).max().unwrap_or(0);
        return Err(AnalysisError::InsufficientData {
            need: TIMEFRAME_MIN_BARS,
            got: longest,
        });
    }

    let aligned = views.iter().filter(|v| v.aligned).count();
    let total = views.len();
    let score = round_to(aligned as f64 / total as f64 * 100.0, 1);
    Ok(TimeframeAlignment {
        timeframes: views,
        skipped,
        aligned,
        total,
        score,
        signal: AlignmentSignal::from_timeframe_share(score),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PriceBar;

    fn series(closes: &[f64]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::new(i as i64 * 86_400, c, c, c, c, 1.0))
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn test_full_uptrend_is_strong_bullish() {
        let closes: Vec<f64> = (0..220).map(|i| 100.0 + i as f64).collect();
        let s = series(&closes);
        let report = trend_alignment(&s, &IndicatorFrame::compute(&s)).unwrap();
        assert_eq!(report.total, 5);
        assert_eq!(report.aligned, 5);
        assert_eq!(report.score, 100.0);
        assert_eq!(report.signal, AlignmentSignal::StrongBullish);
    }

    #[test]
    fn test_undefined_checks_are_excluded() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let s = series(&closes);
        let report = trend_alignment(&s, &IndicatorFrame::compute(&s)).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.aligned, 0);
        assert_eq!(report.signal, AlignmentSignal::Bearish);
    }

    #[test]
    fn test_needs_sma20() {
        let s = series(&[100.0; 10]);
        assert!(matches!(
            trend_alignment(&s, &IndicatorFrame::compute(&s)),
            Err(AnalysisError::InsufficientData { need: 20, got: 10 })
        ));
    }

    #[test]
    fn test_timeframe_bands() {
        assert_eq!(AlignmentSignal::from_timeframe_share(75.0), AlignmentSignal::StrongBullish);
        assert_eq!(AlignmentSignal::from_timeframe_share(66.7), AlignmentSignal::Bullish);
        assert_eq!(AlignmentSignal::from_timeframe_share(33.3), AlignmentSignal::Neutral);
        assert_eq!(AlignmentSignal::from_timeframe_share(0.0), AlignmentSignal::Bearish);
    }

    #[test]
    fn test_short_timeframes_are_skipped() {
        let up: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let (daily, hourly) = (series(&up), series(&up[..30]));
        let report = multi_timeframe_alignment(&[("1d", &daily), ("1h", &hourly)]).unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.skipped, ["1h"]);
        assert_eq!(report.score, 100.0);
        assert!(multi_timeframe_alignment(&[("1h", &hourly)]).is_err());
    }
}
