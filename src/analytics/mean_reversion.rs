//! Z-score of the close against its rolling mean.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::detectors::helpers::round_to;
use crate::math::{rolling_mean, rolling_std};
use crate::params::{get_period, impl_validated_serde, ParamMeta, Parameterized};
use crate::series::PriceSeries;
use crate::{AnalysisError, Period, Result};

const HISTORY_BARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct MeanReversionParams {
    pub window: Period,
}

impl Default for MeanReversionParams {
    fn default() -> Self {
        Self {
            window: Period::new_const(20),
        }
    }
}

const MEAN_REVERSION_PARAMS: &[ParamMeta] = &[ParamMeta::period(
    "window",
    20.0,
    (2.0, 200.0, 1.0),
    "Rolling mean and deviation window",
)];

impl Parameterized for MeanReversionParams {
    fn param_meta() -> &'static [ParamMeta] {
        MEAN_REVERSION_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let p = Self {
            window: get_period(params, "window", 20)?,
        };
        p.validate()?;
        Ok(p)
    }

    fn param_values(&self) -> Vec<f64> {
        vec![self.window.get() as f64]
    }
}

impl_validated_serde!(MeanReversionParams);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReversionSignal {
    #[serde(rename = "OVERBOUGHT")]
    Overbought,
    #[serde(rename = "OVERSOLD")]
    Oversold,
    #[serde(rename = "MODERATE")]
    Moderate,
    #[serde(rename = "NEUTRAL")]
    Neutral,
}

impl ReversionSignal {
    pub fn from_z(z: f64) -> Self {
        if z > 2.0 {
            Self::Overbought
        } else if z < -2.0 {
            Self::Oversold
        } else if z.abs() > 1.0 {
            Self::Moderate
        } else {
            Self::Neutral
        }
    }

    /// Heuristic chance of a move back toward the mean, percent
    pub fn probability(self) -> u32 {
        match self {
            Self::Overbought | Self::Oversold => 75,
            Self::Moderate => 50,
            Self::Neutral => 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZScorePoint {
    pub index: usize,
    pub timestamp: i64,
    pub price: f64,
    pub z_score: f64,
    pub sma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanReversionReport {
    pub current_price: f64,
    pub sma: f64,
    pub z_score: f64,
    /// Position inside the 2-sigma bands, percent
    pub bb_percent: f64,
    pub signal: ReversionSignal,
    pub reversion_probability: u32,
    /// Defined z-scores over the last 60 bars
    pub history: Vec<ZScorePoint>,
}

pub fn mean_reversion(series: &PriceSeries, params: &MeanReversionParams) -> Result<MeanReversionReport> {
    let window = params.window.get();
    AnalysisError::require(window, series.len())?;
    let bars = series.bars();
    let closes = series.closes();
    let sma = rolling_mean(&closes, window);
    let std = rolling_std(&closes, window);

    let z: Vec<Option<f64>> = closes
        .iter()
        .zip(sma.iter().zip(&std))
        .map(|(&c, (&m, &s))| match (m, s) {
            (Some(m), Some(s)) if s > 0.0 => Some((c - m) / s),
            _ => None,
        })
        .collect();

    let n = closes.len();
    let (Some(current_z), Some(current_sma)) = (z[n - 1], sma[n - 1]) else {
        return Err(AnalysisError::Undefined("z-score of a flat window"));
    };
    // %B over bands at +-2 sigma reduces to a linear map of z
    let bb_percent = (current_z + 2.0) / 4.0 * 100.0;
    let signal = ReversionSignal::from_z(current_z);

    let history = (n.saturating_sub(HISTORY_BARS)..n)
        .filter_map(|i| {
            Some(ZScorePoint {
                index: i,
                timestamp: bars[i].timestamp,
                price: closes[i],
                z_score: round_to(z[i]?, 2),
                sma: sma[i]?,
            })
        })
        .collect();

    Ok(MeanReversionReport {
        current_price: closes[n - 1],
        sma: current_sma,
        z_score: round_to(current_z, 2),
        bb_percent: round_to(bb_percent, 1),
        signal,
        reversion_probability: signal.probability(),
        history,
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
    fn test_spike_is_overbought() {
        let mut closes: Vec<f64> = (0..40).map(|i| 100.0 + (i % 2) as f64).collect();
        closes.push(120.0);
        let report = mean_reversion(&series(&closes), &MeanReversionParams::default()).unwrap();
        assert!(report.z_score > 2.0);
        assert_eq!(report.signal, ReversionSignal::Overbought);
        assert_eq!(report.reversion_probability, 75);
        assert!(report.bb_percent > 100.0);
        assert_eq!(report.history.len(), 22);
    }

    #[test]
    fn test_signal_bands() {
        assert_eq!(ReversionSignal::from_z(-2.5), ReversionSignal::Oversold);
        assert_eq!(ReversionSignal::from_z(1.5), ReversionSignal::Moderate);
        assert_eq!(ReversionSignal::from_z(0.5), ReversionSignal::Neutral);
    }

    #[test]
    fn test_flat_window_is_undefined() {
        let err = mean_reversion(&series(&[50.0; 30]), &MeanReversionParams::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Undefined(_)));
    }

    #[test]
    fn test_with_params() {
        let p = MeanReversionParams::with_params(&HashMap::from([("window", 10.0)])).unwrap();
        assert_eq!(p.window.get(), 10);
        assert!(MeanReversionParams::with_params(&HashMap::from([("window", 500.0)])).is_err());
    }
}
