//! Additive reversal probability.

use serde::Serialize;

use crate::detectors::helpers::{round_to, BARS_PER_YEAR};
use crate::indicators::IndicatorFrame;
use crate::math::back;
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

const BASE_PROBABILITY: i32 = 50;
const MIN_PROBABILITY: i32 = 5;
const MAX_PROBABILITY: i32 = 95;
/// Distance to a yearly extreme counted as "near"
const EXTREME_PROXIMITY: f64 = 0.05;
const SHORT_MOVE_BARS: usize = 5;
const TREND_BARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReversalFactor {
    RsiOversold,
    RsiOverbought,
    Near52WeekLow,
    Near52WeekHigh,
    HighVolume,
    ExtremeMove,
    RsiDivergence,
}

impl ReversalFactor {
    pub fn weight(self) -> i32 {
        match self {
            Self::RsiOversold | Self::RsiOverbought => 20,
            Self::Near52WeekLow | Self::Near52WeekHigh => 15,
            Self::HighVolume | Self::ExtremeMove => 10,
            Self::RsiDivergence => 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReversalLikelihood {
    #[serde(rename = "HIGH PROBABILITY")]
    High,
    #[serde(rename = "MODERATE PROBABILITY")]
    Moderate,
    #[serde(rename = "LOW PROBABILITY")]
    Low,
    #[serde(rename = "UNLIKELY")]
    Unlikely,
}

impl ReversalLikelihood {
    pub fn from_probability(p: f64) -> Self {
        if p >= 75.0 {
            Self::High
        } else if p >= 60.0 {
            Self::Moderate
        } else if p >= 40.0 {
            Self::Low
        } else {
            Self::Unlikely
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReversalReport {
    /// Percent in [5, 95]
    pub probability: f64,
    pub likelihood: ReversalLikelihood,
    pub factors: Vec<ReversalFactor>,
    pub rsi: Option<f64>,
}

pub fn reversal_probability(series: &PriceSeries, frame: &IndicatorFrame) -> Result<ReversalReport> {
    AnalysisError::require(1, series.len())?;
    let bars = series.bars();
    let n = bars.len();
    let last = bars[n - 1];
    let price = last.close;
    let rsi = back(&frame.rsi, 0);
    let mut factors = Vec::new();

    match rsi {
        Some(r) if r < 30.0 => factors.push(ReversalFactor::RsiOversold),
        Some(r) if r > 70.0 => factors.push(ReversalFactor::RsiOverbought),
        _ => {},
    }

    let year = &bars[n.saturating_sub(BARS_PER_YEAR)..];
    let high_52w = year.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low_52w = year.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    if ((price - low_52w) / low_52w).abs() < EXTREME_PROXIMITY {
        factors.push(ReversalFactor::Near52WeekLow);
    } else if ((price - high_52w) / high_52w).abs() < EXTREME_PROXIMITY {
        factors.push(ReversalFactor::Near52WeekHigh);
    }

    if back(&frame.volume_sma, 0).is_some_and(|avg| last.volume > avg * 1.5) {
        factors.push(ReversalFactor::HighVolume);
    }

    if let Some(start) = series.close_back(SHORT_MOVE_BARS - 1) {
        if ((price - start) / start * 100.0).abs() > 10.0 {
            factors.push(ReversalFactor::ExtremeMove);
        }
    }

    // price and RSI moving in opposite directions over the trend window
    let earlier = series.close_back(TREND_BARS - 1).zip(back(&frame.rsi, TREND_BARS - 1));
    if let (Some((start, rsi_start)), Some(r)) = (earlier, rsi) {
        let price_trend = price - start;
        let rsi_trend = r - rsi_start;
        if (price_trend < 0.0 && rsi_trend > 0.0) || (price_trend > 0.0 && rsi_trend < 0.0) {
            factors.push(ReversalFactor::RsiDivergence);
        }
    }

    let raw = BASE_PROBABILITY + factors.iter().map(|f| f.weight()).sum::<i32>();
    let probability = raw.clamp(MIN_PROBABILITY, MAX_PROBABILITY) as f64;
    tracing::debug!(probability, factors = factors.len(), "reversal probability");

    Ok(ReversalReport {
        probability,
        likelihood: ReversalLikelihood::from_probability(probability),
        factors,
        rsi: rsi.map(|r| round_to(r, 2)),
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
            .map(|(i, &c)| PriceBar::new(i as i64 * 86_400, c, c, c, c, 1_000.0))
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn test_likelihood_bands() {
        assert_eq!(ReversalLikelihood::from_probability(95.0), ReversalLikelihood::High);
        assert_eq!(ReversalLikelihood::from_probability(60.0), ReversalLikelihood::Moderate);
        assert_eq!(ReversalLikelihood::from_probability(50.0), ReversalLikelihood::Low);
        assert_eq!(ReversalLikelihood::from_probability(39.0), ReversalLikelihood::Unlikely);
    }

    #[test]
    fn test_sharp_selloff() {
        // 40 flat bars then a 30% slide into the yearly low
        let mut closes = vec![100.0; 40];
        closes.extend((1..=10).map(|i| 100.0 - 3.0 * i as f64));
        let s = series(&closes);
        let frame = IndicatorFrame::compute(&s);
        let report = reversal_probability(&s, &frame).unwrap();
        assert!(report.factors.contains(&ReversalFactor::RsiOversold));
        assert!(report.factors.contains(&ReversalFactor::Near52WeekLow));
        assert!(report.factors.contains(&ReversalFactor::ExtremeMove));
        assert_eq!(report.probability, 95.0);
        assert_eq!(report.likelihood, ReversalLikelihood::High);
    }

    #[test]
    fn test_flat_series_only_sits_at_extremes() {
        let s = series(&[100.0; 30]);
        let frame = IndicatorFrame::compute(&s);
        let report = reversal_probability(&s, &frame).unwrap();
        assert_eq!(report.factors, vec![ReversalFactor::Near52WeekLow]);
        assert_eq!(report.probability, 65.0);
        assert_eq!(report.rsi, None);
    }

    #[test]
    fn test_empty_series() {
        let s = PriceSeries::default();
        let frame = IndicatorFrame::compute(&s);
        assert!(reversal_probability(&s, &frame).is_err());
    }
}
