//! Price/RSI divergence detection.
//!
//! A swing high at `i` (close is the maximum of `[i - lookback, i + lookback]`)
//! is paired with the first earlier swing high found in
//! `[i - 2 * lookback, i - lookback)`. Higher price with lower RSI is a bearish
//! divergence; the mirror case on swing lows is bullish.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::helpers::{is_swing_high, is_swing_low};
use crate::indicators::IndicatorFrame;
use crate::params::{get_period, impl_validated_serde, ParamMeta, Parameterized};
use crate::series::PriceSeries;
use crate::{AnalysisError, Direction, Period, Result};

const MAX_REPORTED: usize = 10;

type SwingTest = fn(&[f64], usize, usize) -> bool;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct DivergenceParams {
    /// Swing neighbourhood radius in bars
    pub lookback: Period,
}

impl Default for DivergenceParams {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(20),
        }
    }
}

const DIVERGENCE_PARAMS: &[ParamMeta] = &[ParamMeta::period(
    "lookback",
    20.0,
    (2.0, 100.0, 1.0),
    "Swing neighbourhood radius",
)];

impl Parameterized for DivergenceParams {
    fn param_meta() -> &'static [ParamMeta] {
        DIVERGENCE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let p = Self {
            lookback: get_period(params, "lookback", 20)?,
        };
        p.validate()?;
        Ok(p)
    }

    fn param_values(&self) -> Vec<f64> {
        vec![self.lookback.get() as f64]
    }
}

impl_validated_serde!(DivergenceParams);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Divergence {
    pub direction: Direction,
    pub index: usize,
    pub timestamp: i64,
    pub price: f64,
    pub rsi: f64,
    /// Absolute RSI difference between the two swings
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivergenceReport {
    /// Newest first
    pub divergences: Vec<Divergence>,
    pub last_signal: Option<Divergence>,
}

impl DivergenceReport {
    #[inline]
    pub fn total(&self) -> usize {
        self.divergences.len()
    }
}

/// First earlier swing of the same kind, searched oldest to newest.
fn prior_swing(closes: &[f64], i: usize, lb: usize, is_swing: SwingTest) -> Option<usize> {
    let start = i.saturating_sub(2 * lb).max(1);
    (start..i - lb).find(|&j| is_swing(closes, j, lb))
}

pub fn detect_divergences(
    series: &PriceSeries,
    frame: &IndicatorFrame,
    params: &DivergenceParams,
) -> Result<DivergenceReport> {
    let lb = params.lookback.get();
    AnalysisError::require(2 * lb, series.len())?;
    tracing::debug!(bars = series.len(), lookback = lb, "scanning for divergences");

    let closes = series.closes();
    let bars = series.bars();
    let rsi = &frame.rsi;
    let mut found = Vec::new();

    for i in lb..closes.len() - lb {
        let candidates: [(SwingTest, Direction); 2] =
            [(is_swing_high, Direction::Bearish), (is_swing_low, Direction::Bullish)];
        for (is_swing, direction) in candidates {
            if !is_swing(&closes, i, lb) {
                continue;
            }
            let Some(j) = prior_swing(&closes, i, lb, is_swing) else {
                continue;
            };
            let (Some(rsi_i), Some(rsi_j)) = (rsi.get(i).copied().flatten(), rsi.get(j).copied().flatten()) else {
                continue;
            };
            let diverges = match direction {
                Direction::Bearish => closes[i] > closes[j] && rsi_i < rsi_j,
                _ => closes[i] < closes[j] && rsi_i > rsi_j,
            };
            if diverges {
                found.push(Divergence {
                    direction,
                    index: i,
                    timestamp: bars[i].timestamp,
                    price: closes[i],
                    rsi: rsi_i,
                    strength: (rsi_i - rsi_j).abs(),
                });
            }
        }
    }

    found.reverse();
    found.truncate(MAX_REPORTED);
    Ok(DivergenceReport {
        last_signal: found.first().copied(),
        divergences: found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PriceBar;

    fn series_from(closes: &[f64]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::new(i as i64 * 86_400, c, c + 0.5, c - 0.5, c, 100.0))
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn test_requires_two_lookbacks() {
        let s = series_from(&[1.0; 30]);
        let frame = IndicatorFrame::compute(&s);
        assert!(matches!(
            detect_divergences(&s, &frame, &DivergenceParams::default()),
            Err(AnalysisError::InsufficientData { need: 40, got: 30 })
        ));
    }

    #[test]
    fn test_bearish_divergence_with_injected_rsi() {
        // Peaks at 8 (price 10) and 12 (price 12), lookback 3
        let mut closes = vec![5.0; 20];
        closes[8] = 10.0;
        closes[12] = 12.0;
        let s = series_from(&closes);
        let mut frame = IndicatorFrame::compute(&s);
        frame.rsi = vec![Some(50.0); 20];
        frame.rsi[8] = Some(80.0);
        frame.rsi[12] = Some(65.0);

        let params = DivergenceParams {
            lookback: Period::new_const(3),
        };
        let report = detect_divergences(&s, &frame, &params).unwrap();
        let bearish: Vec<_> = report
            .divergences
            .iter()
            .filter(|d| d.direction == Direction::Bearish)
            .collect();
        assert_eq!(bearish.len(), 1);
        assert_eq!(bearish[0].index, 12);
        assert!((bearish[0].strength - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_params_roundtrip() {
        let mut map = HashMap::new();
        map.insert("lookback", 14.0);
        let p = DivergenceParams::with_params(&map).unwrap();
        assert_eq!(p.lookback.get(), 14);
        assert_eq!(p.param_values(), vec![14.0]);
        map.insert("lookback", 1.0);
        assert!(DivergenceParams::with_params(&map).is_err());
    }
}
