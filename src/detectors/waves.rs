//! Wave structure heuristics: a five-swing Elliott count and a Wyckoff
//! effort-versus-result phase read.

use serde::Serialize;

use super::helpers::{is_swing_high, is_swing_low, round_to};
use crate::math::{mean, rolling_mean};
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

// ============================================================
// ELLIOTT WAVE COUNT
// ============================================================

const WAVE_RADIUS: usize = 5;
const IMPULSE_SWINGS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SwingPoint {
    pub kind: SwingKind,
    pub index: usize,
    pub timestamp: i64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveCount {
    /// 5 once enough swings exist, otherwise 0
    pub waves_detected: usize,
    /// The last five swings, oldest first
    pub swings: Vec<SwingPoint>,
    /// Highs and lows strictly alternate across `swings`
    pub alternating: bool,
}

impl WaveCount {
    /// Five alternating swings, the shape of an impulse.
    #[inline]
    pub fn is_impulse_candidate(&self) -> bool {
        self.waves_detected == IMPULSE_SWINGS && self.alternating
    }
}

/// Close swings over a radius of 5 bars; a bar that is both high and low (a
/// flat stretch) counts as a high.
pub fn elliott_waves(series: &PriceSeries) -> Result<WaveCount> {
    AnalysisError::require(2 * WAVE_RADIUS + 1, series.len())?;
    let closes = series.closes();
    let bars = series.bars();

    let swings: Vec<SwingPoint> = (WAVE_RADIUS..closes.len() - WAVE_RADIUS)
        .filter_map(|i| {
            let kind = if is_swing_high(&closes, i, WAVE_RADIUS) {
                SwingKind::High
            } else if is_swing_low(&closes, i, WAVE_RADIUS) {
                SwingKind::Low
            } else {
                return None;
            };
            Some(SwingPoint {
                kind,
                index: i,
                timestamp: bars[i].timestamp,
                price: closes[i],
            })
        })
        .collect();

    if swings.len() < IMPULSE_SWINGS {
        return Ok(WaveCount {
            waves_detected: 0,
            swings: Vec::new(),
            alternating: false,
        });
    }
    let last = swings[swings.len() - IMPULSE_SWINGS..].to_vec();
    let alternating = last.windows(2).all(|w| w[0].kind != w[1].kind);
    Ok(WaveCount {
        waves_detected: IMPULSE_SWINGS,
        swings: last,
        alternating,
    })
}

// ============================================================
// WYCKOFF PHASE
// ============================================================

const WYCKOFF_WINDOW: usize = 20;
const EFFORT_WINDOW: usize = 10;
const RECENT_BARS: usize = 5;
/// Volume over its 20-bar mean that counts as heavy effort
const HEAVY_VOLUME: f64 = 1.5;
/// Tolerance above the 20-bar low for a spring test
const SPRING_TOLERANCE: f64 = 1.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WyckoffPhase {
    #[serde(rename = "Potential Distribution/Accumulation")]
    DistributionOrAccumulation,
    #[serde(rename = "Markup Phase")]
    Markup,
    #[serde(rename = "Markdown Phase")]
    Markdown,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WyckoffSignal {
    #[serde(rename = "CAUTION")]
    Caution,
    #[serde(rename = "BULLISH")]
    Bullish,
    #[serde(rename = "BEARISH")]
    Bearish,
    #[serde(rename = "WAIT")]
    Wait,
}

impl WyckoffPhase {
    pub fn signal(self) -> WyckoffSignal {
        match self {
            Self::DistributionOrAccumulation => WyckoffSignal::Caution,
            Self::Markup => WyckoffSignal::Bullish,
            Self::Markdown => WyckoffSignal::Bearish,
            Self::Neutral => WyckoffSignal::Wait,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WyckoffReport {
    pub phase: WyckoffPhase,
    pub signal: WyckoffSignal,
    /// Heavy volume in the last 5 bars without a 10-bar move larger than the
    /// mean bar range
    pub high_effort_low_result: bool,
    /// New 20-bar low tested on a volume surge
    pub spring_detected: bool,
    pub volume_ratio: f64,
    pub avg_spread: f64,
}

fn max_of(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, f64::max)
}

fn min_of(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::INFINITY, f64::min)
}

/// Wyckoff phase of the last bar. Needs the 20-bar volume mean defined for
/// each of the last five bars.
pub fn wyckoff_phase(series: &PriceSeries) -> Result<WyckoffReport> {
    AnalysisError::require(WYCKOFF_WINDOW + RECENT_BARS - 1, series.len())?;
    let bars = series.bars();
    let n = bars.len();
    let volumes = series.volumes();
    let spreads: Vec<f64> = bars.iter().map(|b| b.high - b.low).collect();
    let avg_volume = rolling_mean(&volumes, WYCKOFF_WINDOW);
    let avg_spread = rolling_mean(&spreads, WYCKOFF_WINDOW);

    let recent_avg_volume: Vec<f64> = avg_volume[n - RECENT_BARS..].iter().flatten().copied().collect();
    if recent_avg_volume.len() < RECENT_BARS || recent_avg_volume.iter().any(|&v| v <= 0.0) {
        return Err(AnalysisError::Undefined("volume average"));
    }
    let ratios: Vec<f64> = volumes[n - RECENT_BARS..]
        .iter()
        .zip(&recent_avg_volume)
        .map(|(v, avg)| v / avg)
        .collect();
    let volume_ratio = ratios[RECENT_BARS - 1];

    let recent_spread = mean(&spreads[n - EFFORT_WINDOW..]).unwrap_or(0.0);
    let progress = (bars[n - 1].close - bars[n - EFFORT_WINDOW].close).abs();
    let high_effort_low_result = ratios.iter().any(|&r| r > HEAVY_VOLUME) && progress < recent_spread;

    let (last, prev) = (bars[n - 1].close, bars[n - 2].close);
    let phase = if high_effort_low_result {
        WyckoffPhase::DistributionOrAccumulation
    } else if volume_ratio > HEAVY_VOLUME && last > prev {
        WyckoffPhase::Markup
    } else if volume_ratio > HEAVY_VOLUME && last < prev {
        WyckoffPhase::Markdown
    } else {
        WyckoffPhase::Neutral
    };

    let low_20 = min_of(bars[n - WYCKOFF_WINDOW..].iter().map(|b| b.low));
    let low_5 = min_of(bars[n - RECENT_BARS..].iter().map(|b| b.low));
    let volume_peak = max_of(volumes[n - RECENT_BARS..].iter().copied());
    let avg_peak = max_of(recent_avg_volume.iter().copied());
    let spring_detected = low_5 <= low_20 * SPRING_TOLERANCE && volume_peak > avg_peak * HEAVY_VOLUME;

    Ok(WyckoffReport {
        phase,
        signal: phase.signal(),
        high_effort_low_result,
        spring_detected,
        volume_ratio: round_to(volume_ratio, 2),
        avg_spread: round_to(avg_spread[n - 1].unwrap_or(0.0), 2),
    })
}
