//! Composite signals and scores
//!
//! Scorers read the last bar of a [`PriceSeries`](crate::series::PriceSeries)
//! together with its [`IndicatorFrame`](crate::indicators::IndicatorFrame).
//! An indicator that is undefined at the last bar never votes and never
//! contributes a sub-score; it is excluded rather than read as zero.
//!
//! # Scorers
//!
//! - **Technical score**: averaged 0-100 sub-scores
//! - **Consensus**: weighted BUY/SELL/NEUTRAL votes
//! - **Reversal**: additive reversal probability
//! - **Alignment**: moving-average stack checks, per series and across
//!   timeframes
//! - **Checklist**: entry checklist, trade plan, swing setup, position sizing
//!   and the risk/reward matrix
//! - **Setups**: crossovers, RSI extremes, band breaks and volume spikes

use serde::Serialize;

pub mod alignment;
pub mod checklist;
pub mod consensus;
pub mod reversal;
pub mod setups;
pub mod technical;

pub use alignment::*;
pub use checklist::*;
pub use consensus::*;
pub use reversal::*;
pub use setups::*;
pub use technical::*;

/// One indicator's opinion about the last bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Vote {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "NEUTRAL")]
    Neutral,
}

/// Reported value behind a vote: a reading or a short state label
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SignalValue {
    Number(f64),
    Label(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Signal {
    pub indicator: &'static str,
    pub vote: Vote,
    pub value: SignalValue,
    pub weight: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Recommendation {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "NEUTRAL")]
    Neutral,
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "STRONG SELL")]
    StrongSell,
}

impl Recommendation {
    pub fn label(self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG BUY",
            Self::Buy => "BUY",
            Self::Neutral => "NEUTRAL",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG SELL",
        }
    }

    #[inline]
    pub fn is_buy(self) -> bool {
        matches!(self, Self::StrongBuy | Self::Buy)
    }

    #[inline]
    pub fn is_sell(self) -> bool {
        matches!(self, Self::StrongSell | Self::Sell)
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
