//! 52-week breakout scanner.

use serde::Serialize;

use super::helpers::{round_to, BARS_PER_YEAR};
use crate::indicators::IndicatorFrame;
use crate::math::{back, mean};
use crate::series::PriceSeries;
use crate::{AnalysisError, Direction, Result};

/// Close within 0.2% of the yearly extreme counts as a breakout
pub const BREAKOUT_TOLERANCE: f64 = 0.002;
const VOLUME_WINDOW: usize = 20;
const CONSOLIDATION_WINDOW: usize = 20;
/// Range below this percent over the consolidation window
const CONSOLIDATION_MAX_RANGE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BreakoutSignal {
    Strong,
    Moderate,
    Weak,
}

impl BreakoutSignal {
    pub fn from_score(score: u32) -> Self {
        if score > 70 {
            Self::Strong
        } else if score > 50 {
            Self::Moderate
        } else {
            Self::Weak
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreakoutReport {
    pub breakout: bool,
    /// Bullish above the yearly high, bearish below the yearly low
    pub direction: Option<Direction>,
    pub current_price: f64,
    pub high_52w: f64,
    pub low_52w: f64,
    pub distance_to_high: f64,
    pub distance_to_low: f64,
    pub volume_ratio: f64,
    pub consolidating: bool,
    pub consolidation_range: f64,
    /// ATR as percent of price; undefined when ATR is
    pub atr_percent: Option<f64>,
    pub strength_score: u32,
    pub signal: BreakoutSignal,
}

pub fn detect_breakout(series: &PriceSeries, frame: &IndicatorFrame) -> Result<BreakoutReport> {
    AnalysisError::require(BARS_PER_YEAR, series.len())?;
    tracing::debug!(bars = series.len(), "scanning for breakout");

    let bars = series.bars();
    let n = bars.len();
    let year = &bars[n - BARS_PER_YEAR..];
    let current_price = bars[n - 1].close;
    let current_volume = bars[n - 1].volume;

    let high_52w = year.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low_52w = year.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

    let recent_volumes: Vec<f64> = bars[n - VOLUME_WINDOW..].iter().map(|b| b.volume).collect();
    let avg_volume = mean(&recent_volumes).unwrap_or(0.0);
    let volume_ratio = if avg_volume > 0.0 { current_volume / avg_volume } else { 1.0 };

    let atr_percent = back(&frame.atr, 0).map(|atr| atr / current_price * 100.0);

    let up = current_price >= high_52w * (1.0 - BREAKOUT_TOLERANCE);
    let down = current_price <= low_52w * (1.0 + BREAKOUT_TOLERANCE);
    // A range narrower than the tolerance band satisfies both edges
    let direction = match (up, down) {
        (true, false) => Some(Direction::Bullish),
        (false, true) => Some(Direction::Bearish),
        _ => None,
    };

    let recent = &bars[n - CONSOLIDATION_WINDOW..];
    let recent_high = recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let recent_low = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let consolidation_range = (recent_high - recent_low) / recent_low * 100.0;
    let consolidating = consolidation_range < CONSOLIDATION_MAX_RANGE;

    let mut score = 0;
    if direction.is_some() {
        score += 30;
    }
    if volume_ratio > 1.5 {
        score += 30;
    }
    if atr_percent.is_some_and(|p| p > 2.0) {
        score += 20;
    }
    if consolidating {
        score += 20;
    }

    Ok(BreakoutReport {
        breakout: direction.is_some(),
        direction,
        current_price,
        high_52w,
        low_52w,
        distance_to_high: round_to((high_52w - current_price) / current_price * 100.0, 2),
        distance_to_low: round_to((current_price - low_52w) / low_52w * 100.0, 2),
        volume_ratio: round_to(volume_ratio, 2),
        consolidating,
        consolidation_range: round_to(consolidation_range, 2),
        atr_percent: atr_percent.map(|p| round_to(p, 2)),
        strength_score: score,
        signal: BreakoutSignal::from_score(score),
    })
}
