//! Volatility regime: realized volatility percentile, band width and ATR.

use serde::Serialize;

use super::annualize;
use crate::detectors::helpers::round_to;
use crate::indicators::IndicatorFrame;
use crate::math::{back, defined, mean, rolling_std, sample_std};
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

const VOL_WINDOW: usize = 20;
/// Band width below this fraction of its average is a squeeze
const SQUEEZE_FACTOR: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VolatilityRegime {
    #[serde(rename = "VERY HIGH")]
    VeryHigh,
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "VERY LOW")]
    VeryLow,
}

impl VolatilityRegime {
    pub fn from_percentile(p: f64) -> Self {
        if p > 80.0 {
            Self::VeryHigh
        } else if p > 60.0 {
            Self::High
        } else if p > 40.0 {
            Self::Normal
        } else if p > 20.0 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolatilityProfile {
    /// Annualized volatility of the last 20 returns, percent
    pub current_volatility: f64,
    /// Annualized volatility of all returns, percent
    pub historical_avg: f64,
    /// Share of rolling 20-bar volatilities below the current one
    pub percentile: f64,
    pub regime: VolatilityRegime,
    /// (upper - lower) / middle, percent
    pub bb_width: Option<f64>,
    pub bb_width_avg: Option<f64>,
    pub squeeze: bool,
    pub atr: Option<f64>,
    pub atr_percent: Option<f64>,
}

pub fn volatility_profile(series: &PriceSeries, frame: &IndicatorFrame) -> Result<VolatilityProfile> {
    AnalysisError::require(VOL_WINDOW + 1, series.len())?;
    let returns = series.returns();
    let price = series.closes()[series.len() - 1];

    let undefined = AnalysisError::Undefined("return deviation");
    let current = sample_std(&returns[returns.len() - VOL_WINDOW..]).ok_or(undefined.clone())?;
    let historical = sample_std(&returns).ok_or(undefined)?;
    let rolling = defined(&rolling_std(&returns, VOL_WINDOW));
    let below = rolling.iter().filter(|&&v| v < current).count();
    let percentile = below as f64 / rolling.len() as f64 * 100.0;

    let width: Vec<Option<f64>> = frame
        .bb_upper
        .iter()
        .zip(frame.bb_lower.iter().zip(&frame.bb_middle))
        .map(|(&u, (&l, &m))| match (u, l, m) {
            (Some(u), Some(l), Some(m)) if m != 0.0 => Some((u - l) / m * 100.0),
            _ => None,
        })
        .collect();
    let bb_width = back(&width, 0);
    let bb_width_avg = mean(&defined(&width));
    let squeeze = matches!((bb_width, bb_width_avg), (Some(w), Some(avg)) if w < avg * SQUEEZE_FACTOR);
    let atr = back(&frame.atr, 0);

    Ok(VolatilityProfile {
        current_volatility: round_to(annualize(current) * 100.0, 2),
        historical_avg: round_to(annualize(historical) * 100.0, 2),
        percentile: round_to(percentile, 1),
        regime: VolatilityRegime::from_percentile(percentile),
        bb_width: bb_width.map(|w| round_to(w, 2)),
        bb_width_avg: bb_width_avg.map(|w| round_to(w, 2)),
        squeeze,
        atr,
        atr_percent: atr.map(|a| round_to(a / price * 100.0, 2)),
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
            .map(|(i, &c)| PriceBar::new(i as i64 * 86_400, c, c * 1.01, c * 0.99, c, 1.0))
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    /// Wide swings followed by a calm stretch
    fn calming() -> PriceSeries {
        let mut closes: Vec<f64> = (0..80).map(|i| if i % 2 == 0 { 100.0 } else { 110.0 }).collect();
        closes.extend((0..25).map(|i| if i % 2 == 0 { 100.0 } else { 100.5 }));
        series(&closes)
    }

    #[test]
    fn test_calm_tail_is_very_low_with_squeeze() {
        let s = calming();
        let profile = volatility_profile(&s, &IndicatorFrame::compute(&s)).unwrap();
        assert_eq!(profile.regime, VolatilityRegime::VeryLow);
        assert!(profile.current_volatility < profile.historical_avg);
        assert!(profile.squeeze);
        assert!(profile.atr_percent.is_some());
    }

    #[test]
    fn test_regime_bands() {
        assert_eq!(VolatilityRegime::from_percentile(81.0), VolatilityRegime::VeryHigh);
        assert_eq!(VolatilityRegime::from_percentile(61.0), VolatilityRegime::High);
        assert_eq!(VolatilityRegime::from_percentile(50.0), VolatilityRegime::Normal);
        assert_eq!(VolatilityRegime::from_percentile(21.0), VolatilityRegime::Low);
        assert_eq!(VolatilityRegime::from_percentile(20.0), VolatilityRegime::VeryLow);
    }

    #[test]
    fn test_needs_twenty_returns() {
        let s = series(&[100.0; 20]);
        assert!(volatility_profile(&s, &IndicatorFrame::compute(&s)).is_err());
    }
}
