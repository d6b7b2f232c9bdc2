//! Averaged 0-100 technical score.

use serde::Serialize;

use super::Recommendation;
use crate::detectors::helpers::round_to;
use crate::indicators::IndicatorFrame;
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

/// Volume above this multiple of its average scores bullish
const VOLUME_HIGH: f64 = 1.5;
/// Volume below this multiple of its average scores bearish
const VOLUME_LOW: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreComponent {
    pub name: &'static str,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalScore {
    /// Mean of the available components, one decimal
    pub score: f64,
    pub recommendation: Recommendation,
    pub components: Vec<ScoreComponent>,
}

impl TechnicalScore {
    pub fn component(&self, name: &str) -> Option<f64> {
        self.components.iter().find(|c| c.name == name).map(|c| c.score)
    }
}

pub fn technical_recommendation(score: f64) -> Recommendation {
    if score >= 75.0 {
        Recommendation::StrongBuy
    } else if score >= 60.0 {
        Recommendation::Buy
    } else if score >= 40.0 {
        Recommendation::Neutral
    } else if score >= 25.0 {
        Recommendation::Sell
    } else {
        Recommendation::StrongSell
    }
}

fn rsi_score(rsi: f64) -> f64 {
    if rsi < 30.0 {
        100.0
    } else if rsi > 70.0 {
        0.0
    } else {
        50.0
    }
}

fn macd_score(macd: f64, signal: f64) -> f64 {
    if macd > signal {
        75.0
    } else if macd < signal {
        25.0
    } else {
        50.0
    }
}

fn trend_score(close: f64, sma_20: f64, sma_50: f64) -> f64 {
    if close > sma_20 && sma_20 > sma_50 {
        100.0
    } else if close < sma_20 && sma_20 < sma_50 {
        0.0
    } else {
        50.0
    }
}

fn volume_score(volume: f64, average: f64) -> f64 {
    if volume > average * VOLUME_HIGH {
        75.0
    } else if volume < average * VOLUME_LOW {
        25.0
    } else {
        50.0
    }
}

/// Score the last bar from RSI, MACD, moving-average order and volume.
pub fn technical_score(series: &PriceSeries, frame: &IndicatorFrame) -> Result<TechnicalScore> {
    let (Some(bar), Some(row)) = (series.last(), frame.last_row()) else {
        return Err(AnalysisError::InsufficientData { need: 1, got: 0 });
    };

    let mut components = Vec::with_capacity(4);
    if let Some(rsi) = row.rsi {
        components.push(ScoreComponent { name: "RSI", score: rsi_score(rsi) });
    }
    if let (Some(macd), Some(signal)) = (row.macd, row.macd_signal) {
        components.push(ScoreComponent { name: "MACD", score: macd_score(macd, signal) });
    }
    if let (Some(s20), Some(s50)) = (row.sma_20, row.sma_50) {
        components.push(ScoreComponent { name: "Trend", score: trend_score(bar.close, s20, s50) });
    }
    if let Some(avg) = row.volume_sma {
        components.push(ScoreComponent { name: "Volume", score: volume_score(bar.volume, avg) });
    }

    if components.is_empty() {
        return Err(AnalysisError::InsufficientData { need: 2, got: series.len() });
    }

    let mean = components.iter().map(|c| c.score).sum::<f64>() / components.len() as f64;
    let score = round_to(mean, 1);
    tracing::debug!(score, components = components.len(), "technical score");

    Ok(TechnicalScore {
        score,
        recommendation: technical_recommendation(score),
        components,
    })
}
