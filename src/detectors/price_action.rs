//! Classic chart formations over the recent window.

use serde::Serialize;

use super::helpers::{swing_highs, swing_lows};
use crate::math::{linear_slope, population_std};
use crate::series::PriceSeries;
use crate::{AnalysisError, Direction, Result};

pub const PRICE_ACTION_MIN_BARS: usize = 50;
const DOUBLE_WINDOW: usize = 60;
const DOUBLE_RADIUS: usize = 5;
const DOUBLE_TOLERANCE: f64 = 0.02;
const TRIANGLE_WINDOW: usize = 30;
const TRIANGLE_FLAT_BARS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceActionKind {
    DoubleTop,
    DoubleBottom,
    AscendingTriangle,
    BullFlag,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceActionPattern {
    pub kind: PriceActionKind,
    pub direction: Direction,
    pub confidence: u8,
    pub target: f64,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceActionReport {
    pub patterns: Vec<PriceActionPattern>,
}

impl PriceActionReport {
    pub fn has_bullish(&self) -> bool {
        self.patterns.iter().any(|p| p.direction.is_bullish())
    }

    pub fn has_bearish(&self) -> bool {
        self.patterns.iter().any(|p| p.direction.is_bearish())
    }
}

/// Last two swings of `swings` within `DOUBLE_TOLERANCE` of each other.
///
/// Closes are positive: `PriceSeries` rejects bars with non-positive prices.
fn matching_pair(window: &[f64], swings: &[usize]) -> bool {
    match swings {
        [.., a, b] => {
            debug_assert!(window[*a] > 0.0, "swing close must be positive");
            ((window[*a] - window[*b]) / window[*a]).abs() < DOUBLE_TOLERANCE
        },
        _ => false,
    }
}

pub fn detect_price_patterns(series: &PriceSeries) -> Result<PriceActionReport> {
    AnalysisError::require(PRICE_ACTION_MIN_BARS, series.len())?;
    tracing::debug!(bars = series.len(), "detecting price action patterns");
    let closes = series.closes();
    let highs = series.highs();
    let lows = series.lows();
    let n = closes.len();
    let last = closes[n - 1];
    let mut patterns = Vec::new();

    if n >= DOUBLE_WINDOW {
        let window = &closes[n - DOUBLE_WINDOW..];
        let (lo, hi) = window
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| (lo.min(c), hi.max(c)));
        if matching_pair(window, &swing_highs(window, DOUBLE_RADIUS)) {
            patterns.push(PriceActionPattern {
                kind: PriceActionKind::DoubleTop,
                direction: Direction::Bearish,
                confidence: 70,
                target: lo,
                description: "Reversal pattern - consider selling",
            });
        }
        if matching_pair(window, &swing_lows(window, DOUBLE_RADIUS)) {
            patterns.push(PriceActionPattern {
                kind: PriceActionKind::DoubleBottom,
                direction: Direction::Bullish,
                confidence: 70,
                target: hi,
                description: "Reversal pattern - consider buying",
            });
        }
    }

    let flat_top = population_std(&highs[n - TRIANGLE_FLAT_BARS..]).is_some_and(|s| s < last * 0.01);
    let rising_lows = linear_slope(&lows[n - TRIANGLE_WINDOW..]).is_some_and(|s| s > 0.0);
    if flat_top && rising_lows {
        patterns.push(PriceActionPattern {
            kind: PriceActionKind::AscendingTriangle,
            direction: Direction::Bullish,
            confidence: 65,
            target: last * 1.1,
            description: "Continuation pattern - breakout expected",
        });
    }

    let pole_return = (closes[n - 11] / closes[n - 20] - 1.0) * 100.0;
    let flag_volatility = population_std(&closes[n - 10..]).map(|s| s / closes[n - 10] * 100.0);
    if pole_return > 10.0 && flag_volatility.is_some_and(|v| v < 3.0) {
        patterns.push(PriceActionPattern {
            kind: PriceActionKind::BullFlag,
            direction: Direction::Bullish,
            confidence: 75,
            target: last * (1.0 + pole_return / 100.0),
            description: "Strong continuation pattern",
        });
    }

    Ok(PriceActionReport { patterns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PriceBar;

    fn series(closes: &[f64]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::new(i as i64 * 86_400, c, c * 1.002, c * 0.998, c, 1.0))
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn test_matching_pair_uses_last_two_swings() {
        let window = [100.0, 90.0, 101.5, 80.0, 103.0];
        assert!(matching_pair(&window, &[0, 2]));
        assert!(!matching_pair(&window, &[0, 2, 4, 3]));
        assert!(matching_pair(&window, &[3, 2, 4]));
        assert!(!matching_pair(&window, &[4]));
    }

    #[test]
    fn test_non_positive_closes_never_reach_detection() {
        let bars = vec![PriceBar::new(0, 1.0, 1.0, 1.0, 1.0, 1.0), PriceBar::new(1, 0.0, 0.0, 0.0, 0.0, 1.0)];
        assert!(PriceSeries::new(bars).is_err());
    }

    #[test]
    fn test_bull_flag() {
        // flat base, 20% pole over bars 30..=39, tight flag afterwards
        let mut closes = vec![100.0; 30];
        closes.extend((1..=10).map(|i| 100.0 + 2.0 * i as f64));
        closes.extend((0..10).map(|i| 120.0 + if i % 2 == 0 { 0.5 } else { -0.5 }));
        let report = detect_price_patterns(&series(&closes)).unwrap();
        assert!(report.patterns.iter().any(|p| p.kind == PriceActionKind::BullFlag));
        assert!(report.has_bullish());
    }

    #[test]
    fn test_double_top() {
        // two equal peaks inside the 60-bar window
        let closes: Vec<f64> = (0..60)
            .map(|i| {
                let phase = (i as f64) * std::f64::consts::PI / 20.0;
                100.0 + 10.0 * phase.sin()
            })
            .collect();
        let report = detect_price_patterns(&series(&closes)).unwrap();
        let top = report
            .patterns
            .iter()
            .find(|p| p.kind == PriceActionKind::DoubleTop)
            .unwrap();
        assert_eq!(top.direction, Direction::Bearish);
        assert!(report.has_bearish());
    }

    #[test]
    fn test_needs_fifty_bars() {
        assert!(detect_price_patterns(&series(&[100.0; 49])).is_err());
    }
}
