//! Technical setup finder: crossovers, RSI extremes, band breaks and volume
//! spikes on the last bar.

use serde::Serialize;

use crate::indicators::IndicatorFrame;
use crate::math::back;
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
/// Last volume over its moving average that counts as a spike
const VOLUME_SPIKE_RATIO: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetupKind {
    #[serde(rename = "Golden Cross")]
    GoldenCross,
    #[serde(rename = "Death Cross")]
    DeathCross,
    #[serde(rename = "RSI Oversold")]
    RsiOversold,
    #[serde(rename = "RSI Overbought")]
    RsiOverbought,
    #[serde(rename = "Bollinger Lower Break")]
    BollingerLowerBreak,
    #[serde(rename = "Bollinger Upper Break")]
    BollingerUpperBreak,
    #[serde(rename = "Volume Spike")]
    VolumeSpike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetupBias {
    #[serde(rename = "BULLISH")]
    Bullish,
    #[serde(rename = "BEARISH")]
    Bearish,
    #[serde(rename = "ATTENTION")]
    Attention,
}

impl SetupKind {
    pub fn bias(self) -> SetupBias {
        match self {
            Self::GoldenCross | Self::RsiOversold | Self::BollingerLowerBreak => SetupBias::Bullish,
            Self::DeathCross | Self::RsiOverbought | Self::BollingerUpperBreak => SetupBias::Bearish,
            Self::VolumeSpike => SetupBias::Attention,
        }
    }

    /// Fixed confidence of the setup, percent.
    pub fn confidence(self) -> u8 {
        match self {
            Self::GoldenCross | Self::DeathCross => 85,
            Self::VolumeSpike => 75,
            Self::RsiOversold | Self::RsiOverbought => 70,
            Self::BollingerLowerBreak | Self::BollingerUpperBreak => 65,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TechnicalSetup {
    pub kind: SetupKind,
    pub bias: SetupBias,
    pub confidence: u8,
    /// Indicator reading that triggered the setup
    pub value: f64,
}

impl From<(SetupKind, f64)> for TechnicalSetup {
    fn from((kind, value): (SetupKind, f64)) -> Self {
        Self {
            kind,
            bias: kind.bias(),
            confidence: kind.confidence(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupReport {
    pub setups: Vec<TechnicalSetup>,
    pub bullish_count: usize,
    pub bearish_count: usize,
}

impl SetupReport {
    #[inline]
    pub fn total_setups(&self) -> usize {
        self.setups.len()
    }
}

fn crossed(prev: (Option<f64>, Option<f64>), last: (Option<f64>, Option<f64>)) -> Option<(bool, bool)> {
    let (fast_prev, slow_prev) = (prev.0?, prev.1?);
    let (fast, slow) = (last.0?, last.1?);
    let up = fast_prev <= slow_prev && fast > slow;
    let down = fast_prev >= slow_prev && fast < slow;
    Some((up, down))
}

/// Setups active on the last bar. Undefined indicators simply contribute
/// nothing; the crossover needs two bars.
pub fn technical_setups(series: &PriceSeries, frame: &IndicatorFrame) -> Result<SetupReport> {
    AnalysisError::require(2, series.len())?;
    let last = series.last().ok_or(AnalysisError::InsufficientData { need: 2, got: 0 })?;
    let mut found: Vec<(SetupKind, f64)> = Vec::new();

    let prev = (back(&frame.sma_50, 1), back(&frame.sma_200, 1));
    let now = (back(&frame.sma_50, 0), back(&frame.sma_200, 0));
    if let (Some((up, down)), Some(fast)) = (crossed(prev, now), now.0) {
        if up {
            found.push((SetupKind::GoldenCross, fast));
        } else if down {
            found.push((SetupKind::DeathCross, fast));
        }
    }

    if let Some(rsi) = back(&frame.rsi, 0) {
        if rsi < RSI_OVERSOLD {
            found.push((SetupKind::RsiOversold, rsi));
        } else if rsi > RSI_OVERBOUGHT {
            found.push((SetupKind::RsiOverbought, rsi));
        }
    }

    match (back(&frame.bb_lower, 0), back(&frame.bb_upper, 0)) {
        (Some(lower), _) if last.close < lower => found.push((SetupKind::BollingerLowerBreak, lower)),
        (_, Some(upper)) if last.close > upper => found.push((SetupKind::BollingerUpperBreak, upper)),
        _ => {}
    }

    if let Some(avg) = back(&frame.volume_sma, 0).filter(|&v| v > 0.0) {
        let ratio = last.volume / avg;
        if ratio > VOLUME_SPIKE_RATIO {
            found.push((SetupKind::VolumeSpike, ratio));
        }
    }

    let setups: Vec<TechnicalSetup> = found.into_iter().map(TechnicalSetup::from).collect();
    let count = |bias: SetupBias| setups.iter().filter(|s| s.bias == bias).count();
    Ok(SetupReport {
        bullish_count: count(SetupBias::Bullish),
        bearish_count: count(SetupBias::Bearish),
        setups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossed_needs_both_bars() {
        assert_eq!(crossed((Some(1.0), None), (Some(2.0), Some(1.5))), None);
        assert_eq!(crossed((Some(1.0), Some(1.5)), (Some(2.0), Some(1.5))), Some((true, false)));
        assert_eq!(crossed((Some(2.0), Some(1.5)), (Some(1.0), Some(1.5))), Some((false, true)));
        assert_eq!(crossed((Some(2.0), Some(1.5)), (Some(2.1), Some(1.5))), Some((false, false)));
    }

    #[test]
    fn test_kind_metadata() {
        let s = TechnicalSetup::from((SetupKind::VolumeSpike, 3.0));
        assert_eq!(s.bias, SetupBias::Attention);
        assert_eq!(s.confidence, 75);
        assert_eq!(SetupKind::DeathCross.bias(), SetupBias::Bearish);
    }
}
