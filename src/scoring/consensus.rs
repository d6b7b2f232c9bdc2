//! Weighted multi-indicator vote.

use serde::Serialize;

use super::{Recommendation, Signal, SignalValue, Vote};
use crate::detectors::helpers::round_to;
use crate::indicators::IndicatorFrame;
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

/// Volume must exceed this multiple of its average before it votes
const VOLUME_SPIKE: f64 = 1.5;
/// Weight of a directional moving-average vote
const TREND_WEIGHT: u32 = 2;

/// Weighted vote counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub buy: u32,
    pub sell: u32,
    pub neutral: u32,
}

impl VoteTally {
    pub fn new(buy: u32, sell: u32, neutral: u32) -> Self {
        Self { buy, sell, neutral }
    }

    pub fn add(&mut self, vote: Vote, weight: u32) {
        match vote {
            Vote::Buy => self.buy += weight,
            Vote::Sell => self.sell += weight,
            Vote::Neutral => self.neutral += weight,
        }
    }

    #[inline]
    pub fn total(&self) -> u32 {
        self.buy + self.sell + self.neutral
    }

    /// BUY percentage minus SELL percentage, in [-100, 100]; 0 without votes.
    pub fn score(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.buy as f64 - self.sell as f64) / total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConsensusStrength {
    #[serde(rename = "STRONG")]
    Strong,
    #[serde(rename = "MODERATE")]
    Moderate,
    #[serde(rename = "WEAK")]
    Weak,
}

impl ConsensusStrength {
    pub fn from_score(score: f64) -> Self {
        let magnitude = score.abs();
        if magnitude > 40.0 {
            Self::Strong
        } else if magnitude > 15.0 {
            Self::Moderate
        } else {
            Self::Weak
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusReport {
    /// BUY% - SELL%, one decimal
    pub score: f64,
    pub recommendation: Recommendation,
    pub strength: ConsensusStrength,
    pub tally: VoteTally,
    pub signals: Vec<Signal>,
}

pub fn consensus_recommendation(score: f64) -> Recommendation {
    if score > 40.0 {
        Recommendation::StrongBuy
    } else if score > 15.0 {
        Recommendation::Buy
    } else if score > -15.0 {
        Recommendation::Hold
    } else if score > -40.0 {
        Recommendation::Sell
    } else {
        Recommendation::StrongSell
    }
}

fn signal(indicator: &'static str, vote: Vote, value: SignalValue, weight: u32) -> Signal {
    Signal { indicator, vote, value, weight }
}

/// Collect the votes of RSI, MACD cross, SMA order, Bollinger position and
/// volume confirmation at the last bar.
pub fn multi_indicator_consensus(
    series: &PriceSeries,
    frame: &IndicatorFrame,
) -> Result<ConsensusReport> {
    AnalysisError::require(2, series.len())?;
    let (Some(row), Some(prev_row)) = (frame.last_row(), frame.row_back(1)) else {
        return Err(AnalysisError::InsufficientData { need: 2, got: frame.len() });
    };
    let bars = series.bars();
    let last = bars[bars.len() - 1];
    let prev = bars[bars.len() - 2];
    let close = last.close;

    let mut signals = Vec::with_capacity(5);

    if let Some(rsi) = row.rsi {
        let vote = if rsi < 30.0 {
            Vote::Buy
        } else if rsi > 70.0 {
            Vote::Sell
        } else {
            Vote::Neutral
        };
        signals.push(signal("RSI", vote, SignalValue::Number(round_to(rsi, 2)), 1));
    }

    if let (Some(m), Some(s), Some(pm), Some(ps)) =
        (row.macd, row.macd_signal, prev_row.macd, prev_row.macd_signal)
    {
        let (vote, label) = if m > s && pm <= ps {
            (Vote::Buy, "bullish cross")
        } else if m < s && pm >= ps {
            (Vote::Sell, "bearish cross")
        } else {
            (Vote::Neutral, "no cross")
        };
        signals.push(signal("MACD", vote, SignalValue::Label(label), 1));
    }

    if let (Some(s20), Some(s50)) = (row.sma_20, row.sma_50) {
        let sig = if close > s20 && s20 > s50 {
            signal("SMA", Vote::Buy, SignalValue::Label("price > SMA20 > SMA50"), TREND_WEIGHT)
        } else if close < s20 && s20 < s50 {
            signal("SMA", Vote::Sell, SignalValue::Label("price < SMA20 < SMA50"), TREND_WEIGHT)
        } else {
            signal("SMA", Vote::Neutral, SignalValue::Label("mixed"), 1)
        };
        signals.push(sig);
    }

    if let (Some(upper), Some(lower)) = (row.bb_upper, row.bb_lower) {
        let (vote, label) = if close <= lower {
            (Vote::Buy, "at lower band")
        } else if close >= upper {
            (Vote::Sell, "at upper band")
        } else {
            (Vote::Neutral, "inside bands")
        };
        signals.push(signal("Bollinger", vote, SignalValue::Label(label), 1));
    }

    if let Some(avg) = row.volume_sma {
        if last.volume > avg * VOLUME_SPIKE {
            let vote = if close > prev.close { Vote::Buy } else { Vote::Sell };
            let ratio = if avg > 0.0 { round_to(last.volume / avg, 2) } else { 0.0 };
            signals.push(signal("Volume", vote, SignalValue::Number(ratio), 1));
        }
    }

    let mut tally = VoteTally::default();
    for s in &signals {
        tally.add(s.vote, s.weight);
    }
    let score = round_to(tally.score(), 1);
    tracing::debug!(score, votes = tally.total(), "indicator consensus");

    Ok(ConsensusReport {
        score,
        recommendation: consensus_recommendation(score),
        strength: ConsensusStrength::from_score(score),
        tally,
        signals,
    })
}
