//! Support/resistance and reference price levels
//!
//! Several independent level finders, each with its own tolerance:
//!
//! - **Clusters**: histogram of highs and lows in 1%-of-price bins
//! - **Zones**: pivot highs/lows over a configurable window with touch and dedup bands
//! - **Confluence**: SMAs, Fibonacci levels of the yearly range and recent swings
//!   that sit within 2% of each other
//! - **Fibonacci**, **Camarilla** and classic **pivot points**
//! - **Volume profile** with point of control

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::helpers::{is_swing_high, is_swing_low, percent_from, round_to, swing_highs, swing_lows, BARS_PER_YEAR};
use crate::indicators::IndicatorFrame;
use crate::math::{back, mean};
use crate::params::{get_period, get_ratio, impl_validated_serde, ParamMeta, Parameterized};
use crate::series::{PriceBar, PriceSeries};
use crate::{AnalysisError, OHLCVExt, Period, Ratio, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelKind {
    Support,
    Resistance,
}

fn current_close(series: &PriceSeries) -> Result<f64> {
    series
        .last()
        .map(|b| b.close)
        .ok_or(AnalysisError::InsufficientData { need: 1, got: 0 })
}

fn extremes(bars: &[PriceBar]) -> (f64, f64) {
    bars.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
        (lo.min(b.low), hi.max(b.high))
    })
}

// ============================================================
// CLUSTER SUPPORT / RESISTANCE
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct SupportResistanceParams {
    /// Levels reported on each side of the price
    pub num_levels: Period,
}

impl Default for SupportResistanceParams {
    fn default() -> Self {
        Self {
            num_levels: Period::new_const(5),
        }
    }
}

const SR_PARAMS: &[ParamMeta] = &[ParamMeta::period(
    "num_levels",
    5.0,
    (1.0, 20.0, 1.0),
    "Levels reported per side",
)];

impl Parameterized for SupportResistanceParams {
    fn param_meta() -> &'static [ParamMeta] {
        SR_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let p = Self {
            num_levels: get_period(params, "num_levels", 5)?,
        };
        p.validate()?;
        Ok(p)
    }

    fn param_values(&self) -> Vec<f64> {
        vec![self.num_levels.get() as f64]
    }
}

impl_validated_serde!(SupportResistanceParams);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceLevel {
    pub price: f64,
    pub kind: LevelKind,
    pub touches: usize,
    /// `min(touches * 10, 100)`
    pub strength: f64,
    pub distance_percent: f64,
    /// Mean volume of bars whose range spans the level; 0 when none do
    pub avg_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportResistanceReport {
    pub current_price: f64,
    /// Highest first
    pub supports: Vec<PriceLevel>,
    /// Lowest first
    pub resistances: Vec<PriceLevel>,
    pub psychological_levels: Vec<f64>,
    pub nearest_support: Option<PriceLevel>,
    pub nearest_resistance: Option<PriceLevel>,
}

/// Bin width as a fraction of the current price
const CLUSTER_BIN: f64 = 0.01;
/// Upper bound on histogram bins; wider bins are used past it
pub const MAX_CLUSTER_BINS: usize = 2_000;
/// Round numbers further than this fraction from the price are ignored
const PSYCHOLOGICAL_BAND: f64 = 0.2;
const PSYCHOLOGICAL_MAX: usize = 5;

pub fn support_resistance_clusters(
    series: &PriceSeries,
    params: &SupportResistanceParams,
) -> Result<SupportResistanceReport> {
    let current_price = current_close(series)?;
    let bars = series.bars();
    tracing::debug!(bars = bars.len(), "clustering support/resistance");

    let (min, max) = extremes(bars);
    // A price far below the historical range would otherwise need a bin per 1% of a tiny number
    let bin = (current_price * CLUSTER_BIN).max((max - min) / MAX_CLUSTER_BINS as f64);
    let n_bins = (((max - min) / bin).ceil() as usize).clamp(1, MAX_CLUSTER_BINS);
    let mut counts = vec![0usize; n_bins];
    for price in bars.iter().flat_map(|b| [b.high, b.low]) {
        let idx = (((price - min) / bin).floor() as usize).min(n_bins - 1);
        counts[idx] += 1;
    }

    let mut ranked: Vec<usize> = (0..n_bins).filter(|&i| counts[i] > 0).collect();
    ranked.sort_by(|&a, &b| counts[b].cmp(&counts[a]).then(a.cmp(&b)));
    ranked.truncate(params.num_levels.get() * 2);

    let levels: Vec<PriceLevel> = ranked
        .into_iter()
        .map(|idx| {
            let price = min + (idx as f64 + 0.5) * bin;
            let touches = counts[idx];
            let spanning: Vec<f64> = bars
                .iter()
                .filter(|b| b.low <= price && price <= b.high)
                .map(|b| b.volume)
                .collect();
            PriceLevel {
                price,
                kind: if price < current_price { LevelKind::Support } else { LevelKind::Resistance },
                touches,
                strength: (touches as f64 * 10.0).min(100.0),
                distance_percent: round_to(percent_from(current_price, price), 2),
                avg_volume: mean(&spanning).unwrap_or(0.0),
            }
        })
        .collect();

    let by_price = |a: &PriceLevel, b: &PriceLevel| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal);
    let mut supports: Vec<PriceLevel> = levels.iter().filter(|l| l.kind == LevelKind::Support).copied().collect();
    supports.sort_by(|a, b| by_price(b, a));
    supports.truncate(params.num_levels.get());
    let mut resistances: Vec<PriceLevel> = levels.iter().filter(|l| l.kind == LevelKind::Resistance).copied().collect();
    resistances.sort_by(by_price);
    resistances.truncate(params.num_levels.get());

    Ok(SupportResistanceReport {
        current_price,
        nearest_support: supports.first().copied(),
        nearest_resistance: resistances.first().copied(),
        supports,
        resistances,
        psychological_levels: psychological_levels(min, max, current_price),
    })
}

/// Round numbers `{1, 2, 5} x 10^k` strictly inside the traded range and close to the price.
pub fn psychological_levels(low: f64, high: f64, current_price: f64) -> Vec<f64> {
    [1.0, 10.0, 100.0, 1_000.0, 10_000.0]
        .iter()
        .flat_map(|m| [1.0, 2.0, 5.0].map(|base| base * m))
        .filter(|&level| low < level && level < high)
        .filter(|&level| ((level - current_price) / current_price).abs() < PSYCHOLOGICAL_BAND)
        .take(PSYCHOLOGICAL_MAX)
        .collect()
}

// ============================================================
// PIVOT ZONES
// ============================================================

const ZONE_WINDOW: usize = 10;
const ZONES_REPORTED: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct ZoneParams {
    /// Pivot neighbourhood radius in bars
    pub window: Period,
    /// Relative distance within which a high or low touches a level
    pub touch_tolerance: Ratio,
    /// Relative distance within which two pivots are the same zone
    pub dedup_tolerance: Ratio,
}

impl Default for ZoneParams {
    fn default() -> Self {
        Self {
            window: Period::new_const(ZONE_WINDOW),
            touch_tolerance: Ratio::new_const(0.02),
            dedup_tolerance: Ratio::new_const(0.01),
        }
    }
}

const ZONE_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("window", 10.0, (2.0, 50.0, 1.0), "Pivot neighbourhood radius"),
    ParamMeta::ratio("touch_tolerance", 0.02, (0.005, 0.1, 0.005), "Touch band around a level"),
    ParamMeta::ratio("dedup_tolerance", 0.01, (0.001, 0.05, 0.001), "Merge band for nearby pivots"),
];

impl Parameterized for ZoneParams {
    fn param_meta() -> &'static [ParamMeta] {
        ZONE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let p = Self {
            window: get_period(params, "window", ZONE_WINDOW)?,
            touch_tolerance: get_ratio(params, "touch_tolerance", 0.02)?,
            dedup_tolerance: get_ratio(params, "dedup_tolerance", 0.01)?,
        };
        p.validate()?;
        Ok(p)
    }

    fn param_values(&self) -> Vec<f64> {
        vec![self.window.get() as f64, self.touch_tolerance.get(), self.dedup_tolerance.get()]
    }
}

impl_validated_serde!(ZoneParams);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Zone {
    pub kind: LevelKind,
    pub price: f64,
    pub touches: usize,
    /// `min(touches * 20, 100)`
    pub strength: f64,
    pub index: usize,
    pub timestamp: i64,
    pub distance_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneReport {
    /// Nearest to the price first
    pub zones: Vec<Zone>,
    pub nearest_support: Option<Zone>,
    pub nearest_resistance: Option<Zone>,
    pub current_price: f64,
}

fn touches(values: &[f64], level: f64, tolerance: f64) -> usize {
    values
        .iter()
        .filter(|&&v| ((v - level) / level).abs() < tolerance)
        .count()
}

pub fn support_resistance_zones(series: &PriceSeries, params: &ZoneParams) -> Result<ZoneReport> {
    params.validate()?;
    let current_price = current_close(series)?;
    let window = params.window.get();
    let touch = params.touch_tolerance.get();
    let dedup = params.dedup_tolerance.get();
    let bars = series.bars();
    let highs = series.highs();
    let lows = series.lows();

    let mut candidates = Vec::new();
    for i in window..bars.len().saturating_sub(window) {
        if is_swing_high(&highs, i, window) {
            candidates.push((LevelKind::Resistance, highs[i], touches(&highs, highs[i], touch), i));
        }
        if is_swing_low(&lows, i, window) {
            candidates.push((LevelKind::Support, lows[i], touches(&lows, lows[i], touch), i));
        }
    }

    let mut zones: Vec<Zone> = Vec::new();
    for (kind, price, count, i) in candidates {
        let duplicate = zones
            .iter()
            .position(|z| z.kind == kind && ((z.price - price) / price).abs() < dedup);
        match duplicate {
            Some(pos) => {
                let z = &mut zones[pos];
                if count > z.touches {
                    z.touches = count;
                    z.strength = (count as f64 * 20.0).min(100.0);
                }
            },
            None => zones.push(Zone {
                kind,
                price,
                touches: count,
                strength: (count as f64 * 20.0).min(100.0),
                index: i,
                timestamp: bars[i].timestamp,
                distance_percent: round_to(percent_from(current_price, price), 2),
            }),
        }
    }

    zones.sort_by(|a, b| {
        a.distance_percent
            .abs()
            .partial_cmp(&b.distance_percent.abs())
            .unwrap_or(Ordering::Equal)
    });
    let nearest_support = zones
        .iter()
        .find(|z| z.kind == LevelKind::Support && z.price < current_price)
        .copied();
    let nearest_resistance = zones
        .iter()
        .find(|z| z.kind == LevelKind::Resistance && z.price > current_price)
        .copied();
    zones.truncate(ZONES_REPORTED);

    Ok(ZoneReport {
        zones,
        nearest_support,
        nearest_resistance,
        current_price,
    })
}

// ============================================================
// CONFLUENCE
// ============================================================

const CONFLUENCE_THRESHOLD: f64 = 0.02;
const CONFLUENCE_MIN_NEIGHBOURS: usize = 2;
const CONFLUENCE_SWINGS: usize = 5;
const CONFLUENCE_REPORTED: usize = 5;

/// Retracement ratios measured up from the low of a range
pub const FIB_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Confluence {
    /// Mean of the clustered levels, two decimals
    pub price: f64,
    pub count: usize,
    pub distance_percent: f64,
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfluenceReport {
    /// Highest count first
    pub confluences: Vec<Confluence>,
    pub current_price: f64,
    pub strongest: Option<Confluence>,
}

/// Yearly (or full-history) high and low.
fn yearly_range(bars: &[PriceBar]) -> (f64, f64) {
    let start = bars.len().saturating_sub(BARS_PER_YEAR);
    extremes(&bars[start..])
}

pub fn detect_confluence(series: &PriceSeries, frame: &IndicatorFrame) -> Result<ConfluenceReport> {
    let current_price = current_close(series)?;
    let bars = series.bars();
    tracing::debug!(bars = bars.len(), "detecting level confluence");

    let sma_50 = back(&frame.sma_50, 0);
    let mut levels: Vec<f64> = [back(&frame.sma_20, 0), sma_50, back(&frame.sma_200, 0).or(sma_50)]
        .into_iter()
        .flatten()
        .collect();

    let (low, high) = yearly_range(bars);
    levels.extend(FIB_RATIOS.iter().map(|r| low + (high - low) * r));

    let highs = series.highs();
    let lows = series.lows();
    let swing_h = swing_highs(&highs, ZONE_WINDOW);
    let swing_l = swing_lows(&lows, ZONE_WINDOW);
    let recent = |swings: &[usize]| swings.len().saturating_sub(CONFLUENCE_SWINGS);
    levels.extend(swing_h[recent(&swing_h)..].iter().map(|&i| highs[i]));
    levels.extend(swing_l[recent(&swing_l)..].iter().map(|&i| lows[i]));

    let threshold = current_price * CONFLUENCE_THRESHOLD;
    let mut unique: Vec<Confluence> = Vec::new();
    for &level in &levels {
        let nearby: Vec<f64> = levels
            .iter()
            .copied()
            .filter(|&other| (level - other).abs() < threshold && level != other)
            .collect();
        if nearby.len() < CONFLUENCE_MIN_NEIGHBOURS {
            continue;
        }
        let avg = (level + nearby.iter().sum::<f64>()) / (nearby.len() + 1) as f64;
        let candidate = Confluence {
            price: round_to(avg, 2),
            count: nearby.len() + 1,
            distance_percent: round_to(percent_from(current_price, avg), 2),
            strength: (nearby.len() as f64 * 25.0).min(100.0),
        };

        match unique.iter().position(|c| (c.price - candidate.price).abs() < threshold) {
            Some(pos) if candidate.count > unique[pos].count => {
                unique.remove(pos);
                unique.push(candidate);
            },
            Some(_) => {},
            None => unique.push(candidate),
        }
    }

    unique.sort_by(|a, b| b.count.cmp(&a.count));
    unique.truncate(CONFLUENCE_REPORTED);

    Ok(ConfluenceReport {
        strongest: unique.first().copied(),
        confluences: unique,
        current_price,
    })
}

// ============================================================
// FIBONACCI / CAMARILLA / PIVOTS
// ============================================================

/// Extension ratios, expressed as multiples of the full range above the low
pub const FIB_EXTENSIONS: [f64; 3] = [1.618, 2.618, 4.236];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Camarilla {
    pub r4: f64,
    pub r3: f64,
    pub r2: f64,
    pub r1: f64,
    pub pp: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
    pub s4: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FibonacciReport {
    /// Measured down from the high; ratio 0 is the high, 1 the low
    pub retracements: Vec<FibLevel>,
    pub extensions: Vec<FibLevel>,
    pub camarilla: Camarilla,
    pub max_price: f64,
    pub min_price: f64,
    pub current_price: f64,
}

pub fn fibonacci_levels(series: &PriceSeries) -> Result<FibonacciReport> {
    AnalysisError::require(2, series.len())?;
    let bars = series.bars();
    let (min_price, max_price) = extremes(bars);
    let diff = max_price - min_price;

    let retracements = FIB_RATIOS
        .iter()
        .map(|&ratio| FibLevel {
            ratio,
            price: max_price - diff * ratio,
        })
        .collect();
    let extensions = FIB_EXTENSIONS
        .iter()
        .map(|&ratio| FibLevel {
            ratio,
            price: max_price + diff * (ratio - 1.0),
        })
        .collect();

    let last = bars[bars.len() - 1];
    Ok(FibonacciReport {
        retracements,
        extensions,
        camarilla: camarilla(&last),
        max_price,
        min_price,
        current_price: last.close,
    })
}

pub fn camarilla(bar: &PriceBar) -> Camarilla {
    let c = bar.close;
    let span = bar.range() * 1.1;
    Camarilla {
        r4: c + span / 2.0,
        r3: c + span / 4.0,
        r2: c + span / 6.0,
        r1: c + span / 12.0,
        pp: bar.typical_price(),
        s1: c - span / 12.0,
        s2: c - span / 6.0,
        s3: c - span / 4.0,
        s4: c - span / 2.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PivotPoints {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

/// Classic floor pivots from the last bar.
pub fn pivot_points(series: &PriceSeries) -> Result<PivotPoints> {
    let bar = series.last().ok_or(AnalysisError::InsufficientData { need: 1, got: 0 })?;
    let (h, l) = (bar.high, bar.low);
    let p = bar.typical_price();
    Ok(PivotPoints {
        pivot: p,
        r1: 2.0 * p - l,
        r2: p + (h - l),
        r3: h + 2.0 * (p - l),
        s1: 2.0 * p - h,
        s2: p - (h - l),
        s3: l - 2.0 * (h - p),
    })
}

// ============================================================
// VOLUME PROFILE
// ============================================================

pub const VOLUME_PROFILE_BINS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeBin {
    pub price_min: f64,
    pub price_max: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeProfile {
    pub profile: Vec<VolumeBin>,
    /// Centre of the highest-volume bin
    pub poc: f64,
    pub total_volume: f64,
}

/// Volume bucketed by each bar's typical price over `bins` equal-width bins
/// spanning the traded range. Bins are half-open, so a typical price sitting
/// exactly on the top edge is not counted.
pub fn volume_profile(series: &PriceSeries, bins: usize) -> Result<VolumeProfile> {
    AnalysisError::require(1, series.len())?;
    if bins == 0 {
        return Err(AnalysisError::InvalidValue("volume profile needs at least one bin"));
    }
    let bars = series.bars();
    let (min, max) = extremes(bars);
    if max <= min {
        return Err(AnalysisError::Undefined("volume profile of a zero price range"));
    }

    let width = (max - min) / bins as f64;
    let mut volumes = vec![0.0; bins];
    for bar in bars {
        let idx = ((bar.typical_price() - min) / width).floor();
        if idx >= 0.0 && (idx as usize) < bins {
            volumes[idx as usize] += bar.volume;
        }
    }

    let poc_idx = volumes
        .iter()
        .enumerate()
        .fold(0, |best, (i, &v)| if v > volumes[best] { i } else { best });
    let edge = |i: usize| min + width * i as f64;

    Ok(VolumeProfile {
        profile: (0..bins)
            .map(|i| VolumeBin {
                price_min: edge(i),
                price_max: edge(i + 1),
                volume: volumes[i],
            })
            .collect(),
        poc: (edge(poc_idx) + edge(poc_idx + 1)) / 2.0,
        total_volume: bars.iter().map(|b| b.volume).sum(),
    })
}

// ============================================================
// TESTS
// ============================================================
