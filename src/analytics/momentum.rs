//! Momentum across timeframes, rate-of-change derivatives, volume trend
//! and price velocity.

use serde::Serialize;

use crate::detectors::helpers::{percent_from, round_to};
use crate::math::{back, correlation, mean, pct_change, rolling_mean};
use crate::series::PriceSeries;
use crate::{AnalysisError, Direction, Result};

// ============================================================
// MULTI-TIMEFRAME MOMENTUM
// ============================================================

/// (label, lookback bars, weight)
pub const MOMENTUM_TIMEFRAMES: [(&str, usize, f64); 5] = [
    ("1_week", 5, 0.10),
    ("1_month", 20, 0.20),
    ("3_months", 60, 0.30),
    ("6_months", 120, 0.25),
    ("1_year", 252, 0.15),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeframeMomentum {
    pub label: &'static str,
    pub bars: usize,
    pub change_percent: f64,
    /// Twice the change, clamped to [-100, 100]
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MomentumClass {
    #[serde(rename = "VERY STRONG")]
    VeryStrong,
    #[serde(rename = "STRONG")]
    Strong,
    #[serde(rename = "NEUTRAL")]
    Neutral,
    #[serde(rename = "WEAK")]
    Weak,
    #[serde(rename = "VERY WEAK")]
    VeryWeak,
}

impl MomentumClass {
    pub fn from_score(score: f64) -> Self {
        if score > 50.0 {
            Self::VeryStrong
        } else if score > 20.0 {
            Self::Strong
        } else if score > -20.0 {
            Self::Neutral
        } else if score > -50.0 {
            Self::Weak
        } else {
            Self::VeryWeak
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiTimeframeMomentum {
    /// Only timeframes the history covers
    pub timeframes: Vec<TimeframeMomentum>,
    /// Sum of weighted scores of the covered timeframes
    pub weighted_score: f64,
    pub classification: MomentumClass,
    pub direction: Direction,
}

pub fn multi_timeframe_momentum(series: &PriceSeries) -> Result<MultiTimeframeMomentum> {
    AnalysisError::require(MOMENTUM_TIMEFRAMES[0].1, series.len())?;
    let closes = series.closes();
    let price = closes[closes.len() - 1];

    let mut timeframes = Vec::new();
    let mut weighted = 0.0;
    for &(label, bars, weight) in &MOMENTUM_TIMEFRAMES {
        let Some(past) = series.close_back(bars - 1) else {
            continue;
        };
        let change = percent_from(past, price);
        let score = (change * 2.0).clamp(-100.0, 100.0);
        weighted += score * weight;
        timeframes.push(TimeframeMomentum {
            label,
            bars,
            change_percent: round_to(change, 2),
            score: round_to(score, 1),
        });
    }

    let weighted_score = round_to(weighted, 1);
    let direction = if weighted_score > 0.0 {
        Direction::Bullish
    } else if weighted_score < 0.0 {
        Direction::Bearish
    } else {
        Direction::Neutral
    };

    Ok(MultiTimeframeMomentum {
        timeframes,
        weighted_score,
        classification: MomentumClass::from_score(weighted_score),
        direction,
    })
}

// ============================================================
// ACCELERATION
// ============================================================

const ACCELERATION_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccelerationTrend {
    #[serde(rename = "ACCELERATING FAST")]
    AcceleratingFast,
    #[serde(rename = "ACCELERATING")]
    Accelerating,
    #[serde(rename = "DECELERATING FAST")]
    DeceleratingFast,
    #[serde(rename = "STABLE")]
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Acceleration {
    /// Last one-bar change, percent
    pub velocity: f64,
    /// Change of velocity
    pub acceleration: f64,
    /// Change of acceleration
    pub jerk: f64,
    pub avg_velocity: f64,
    pub avg_acceleration: f64,
    pub trend: AccelerationTrend,
}

/// First, second and third differences of the close, compared with their
/// recent averages.
pub fn acceleration(series: &PriceSeries) -> Result<Acceleration> {
    AnalysisError::require(4, series.len())?;
    let roc: Vec<Option<f64>> = pct_change(&series.closes(), 1)
        .into_iter()
        .map(|r| r.map(|r| r * 100.0))
        .collect();
    let accel = diff_opt(&roc);
    let jerk = diff_opt(&accel);

    let recent_mean = |col: &[Option<f64>]| {
        let start = col.len().saturating_sub(ACCELERATION_WINDOW);
        let defined: Vec<f64> = col[start..].iter().flatten().copied().collect();
        mean(&defined).unwrap_or(0.0)
    };
    let undefined = AnalysisError::Undefined("acceleration");
    let velocity = back(&roc, 0).ok_or(undefined.clone())?;
    let current = back(&accel, 0).ok_or(undefined.clone())?;
    let current_jerk = back(&jerk, 0).ok_or(undefined)?;
    let avg_velocity = recent_mean(&roc);
    let avg_acceleration = recent_mean(&accel);

    let trend = if current > avg_acceleration * 2.0 {
        AccelerationTrend::AcceleratingFast
    } else if current > avg_acceleration {
        AccelerationTrend::Accelerating
    } else if current < avg_acceleration * -2.0 {
        AccelerationTrend::DeceleratingFast
    } else {
        AccelerationTrend::Stable
    };

    Ok(Acceleration {
        velocity: round_to(velocity, 3),
        acceleration: round_to(current, 3),
        jerk: round_to(current_jerk, 3),
        avg_velocity: round_to(avg_velocity, 3),
        avg_acceleration: round_to(avg_acceleration, 3),
        trend,
    })
}

fn diff_opt(values: &[Option<f64>]) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if i == 0 {
                return None;
            }
            Some(values[i]? - values[i - 1]?)
        })
        .collect()
}

// ============================================================
// VOLUME MOMENTUM
// ============================================================

pub const VOLUME_MOMENTUM_MIN_BARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VolumeTrend {
    /// SMA5 > SMA20 > SMA50
    #[serde(rename = "INCREASING")]
    Increasing,
    /// SMA5 > SMA20 only
    #[serde(rename = "RISING")]
    Rising,
    /// SMA5 < SMA20 < SMA50
    #[serde(rename = "DECREASING")]
    Decreasing,
    #[serde(rename = "MIXED")]
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeMomentum {
    pub current_volume: f64,
    pub avg_volume: f64,
    /// Current over whole-series mean; undefined for zero average
    pub volume_ratio: Option<f64>,
    pub trend: VolumeTrend,
    /// Correlation of the last 20 returns with their volumes
    pub price_volume_correlation: Option<f64>,
}

pub fn volume_momentum(series: &PriceSeries) -> Result<VolumeMomentum> {
    AnalysisError::require(VOLUME_MOMENTUM_MIN_BARS, series.len())?;
    let volumes = series.volumes();
    let n = volumes.len();
    let current = volumes[n - 1];
    let last_mean = |w: usize| back(&rolling_mean(&volumes, w), 0).unwrap_or(0.0);
    let (s5, s20, s50) = (last_mean(5), last_mean(20), last_mean(50));

    let trend = if s5 > s20 && s20 > s50 {
        VolumeTrend::Increasing
    } else if s5 > s20 {
        VolumeTrend::Rising
    } else if s5 < s20 && s20 < s50 {
        VolumeTrend::Decreasing
    } else {
        VolumeTrend::Mixed
    };

    let avg_volume = mean(&volumes).unwrap_or(0.0);
    let returns = pct_change(&series.closes(), 1);
    let recent_returns: Vec<f64> = returns[n - 20..].iter().map(|r| r.unwrap_or(0.0)).collect();
    let price_volume_correlation = correlation(&recent_returns, &volumes[n - 20..]).map(|c| round_to(c, 3));

    Ok(VolumeMomentum {
        current_volume: current,
        avg_volume,
        volume_ratio: (avg_volume > 0.0).then(|| round_to(current / avg_volume, 2)),
        trend,
        price_volume_correlation,
    })
}

// ============================================================
// PRICE VELOCITY
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Speed {
    #[serde(rename = "PARABOLIC")]
    Parabolic,
    #[serde(rename = "FAST")]
    Fast,
    #[serde(rename = "ABOVE AVERAGE")]
    AboveAverage,
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "SLOW")]
    Slow,
}

impl Speed {
    pub fn from_ratio(ratio: f64) -> Self {
        let r = ratio.abs();
        if r > 3.0 {
            Self::Parabolic
        } else if r > 2.0 {
            Self::Fast
        } else if r > 1.5 {
            Self::AboveAverage
        } else if r > 0.5 {
            Self::Normal
        } else {
            Self::Slow
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceVelocity {
    pub return_1d: f64,
    pub return_1w: f64,
    /// Undefined below 31 bars
    pub return_1m: Option<f64>,
    pub avg_daily_return: f64,
    pub avg_weekly_return: f64,
    /// Recent return over its average; 1 when the average is 0
    pub daily_velocity_ratio: f64,
    pub weekly_velocity_ratio: f64,
    pub speed: Speed,
}

/// Recent returns measured against the average return of the same horizon.
pub fn price_velocity(series: &PriceSeries) -> Result<PriceVelocity> {
    AnalysisError::require(8, series.len())?;
    let closes = series.closes();
    let price = closes[closes.len() - 1];
    let change_since = |lag: usize| series.close_back(lag).map(|past| percent_from(past, price));
    let undefined = AnalysisError::Undefined("price velocity");
    let return_1d = change_since(1).ok_or(undefined.clone())?;
    let return_1w = change_since(7).ok_or(undefined.clone())?;
    let return_1m = change_since(30);

    let average = |lag: usize| {
        let changes: Vec<f64> = pct_change(&closes, lag).into_iter().flatten().map(|r| r * 100.0).collect();
        mean(&changes)
    };
    let avg_daily = average(1).ok_or(undefined.clone())?;
    let avg_weekly = average(7).ok_or(undefined)?;
    let ratio = |r: f64, avg: f64| if avg != 0.0 { r / avg } else { 1.0 };
    let weekly_ratio = ratio(return_1w, avg_weekly);

    Ok(PriceVelocity {
        return_1d: round_to(return_1d, 2),
        return_1w: round_to(return_1w, 2),
        return_1m: return_1m.map(|r| round_to(r, 2)),
        avg_daily_return: round_to(avg_daily, 3),
        avg_weekly_return: round_to(avg_weekly, 3),
        daily_velocity_ratio: round_to(ratio(return_1d, avg_daily), 2),
        weekly_velocity_ratio: round_to(weekly_ratio, 2),
        speed: Speed::from_ratio(weekly_ratio),
    })
}
