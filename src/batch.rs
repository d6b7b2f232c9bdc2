//! Multi-ticker operations.
//!
//! Every ticker is analysed on its own rayon task. A ticker that fails is
//! logged and returned in the error list; the rest of the batch carries on.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::detectors::helpers::{percent_from, round_to};
use crate::indicators::IndicatorEngine;
use crate::math::mean;
use crate::scoring::{technical_score, Recommendation};
use crate::series::{PriceBar, PriceSeries};
use crate::{AnalysisError, Result};

/// Minimum history for fast movers and the watchlist
pub const BATCH_MIN_BARS: usize = 20;
/// Minimum history for the screener
pub const SCREEN_MIN_BARS: usize = 50;
/// Minimum history for the 30-bar performance ranking
pub const TOP_MOVERS_MIN_BARS: usize = 31;
/// Minimum history for a sector in the rotation ranking
pub const SECTOR_MIN_BARS: usize = 5;

const VOLUME_WINDOW: usize = 20;

/// Error from analysing a single ticker
#[derive(Debug, Clone, PartialEq)]
pub struct ScanError {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Run `analyse` over every ticker in parallel. `Ok(None)` drops the ticker
/// without recording an error.
fn run_batch<'a, I, R, F>(instruments: I, analyse: F) -> (Vec<R>, Vec<ScanError>)
where
    I: IntoParallelIterator<Item = (&'a str, &'a PriceSeries)>,
    R: Send,
    F: Fn(&str, &PriceSeries) -> Result<Option<R>> + Sync + Send,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, series)| {
            analyse(symbol, series).map_err(|error| {
                tracing::warn!(symbol, %error, "ticker analysis failed");
                ScanError {
                    symbol: symbol.to_string(),
                    error,
                }
            })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(Some(r)) => successes.push(r),
            Ok(None) => {},
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

/// Last volume over the mean of the last 20 volumes; 1 when the mean is zero.
fn volume_ratio(series: &PriceSeries) -> f64 {
    let volumes = series.volumes();
    let start = volumes.len().saturating_sub(VOLUME_WINDOW);
    match (mean(&volumes[start..]), volumes.last()) {
        (Some(avg), Some(&v)) if avg > 0.0 => v / avg,
        _ => 1.0,
    }
}

/// Last volume over the mean volume of the whole series.
fn relative_volume(series: &PriceSeries) -> Option<f64> {
    let volumes = series.volumes();
    match (mean(&volumes), volumes.last()) {
        (Some(avg), Some(&v)) if avg > 0.0 => Some(v / avg),
        _ => None,
    }
}

fn change_over(series: &PriceSeries, lag: usize) -> Result<f64> {
    match (series.close_back(lag), series.close_back(0)) {
        (Some(from), Some(to)) => Ok(percent_from(from, to)),
        _ => Err(AnalysisError::InsufficientData { need: lag + 1, got: series.len() }),
    }
}

fn last_bar(series: &PriceSeries) -> Result<&PriceBar> {
    series.last().ok_or(AnalysisError::InsufficientData { need: 1, got: 0 })
}

fn by_desc(a: f64, b: f64) -> std::cmp::Ordering {
    b.total_cmp(&a)
}

// ============================================================
// SCREENER
// ============================================================

/// Inclusive bounds; `None` leaves the dimension unfiltered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenFilter {
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub rsi_min: Option<f64>,
    pub rsi_max: Option<f64>,
    /// Minimum ratio of the last volume to the series mean volume
    pub volume_ratio_min: Option<f64>,
    pub score_min: Option<f64>,
}

impl ScreenFilter {
    fn has_rsi_bound(&self) -> bool {
        self.rsi_min.is_some() || self.rsi_max.is_some()
    }

    fn accepts_price(&self, price: f64) -> bool {
        self.price_min.map_or(true, |min| price >= min) && self.price_max.map_or(true, |max| price <= max)
    }

    /// An undefined RSI fails any RSI bound.
    fn accepts_rsi(&self, rsi: Option<f64>) -> bool {
        match rsi {
            Some(r) => self.rsi_min.map_or(true, |min| r >= min) && self.rsi_max.map_or(true, |max| r <= max),
            None => !self.has_rsi_bound(),
        }
    }

    /// An undefined ratio (zero mean volume) fails a volume bound.
    fn accepts_volume_ratio(&self, ratio: Option<f64>) -> bool {
        match (self.volume_ratio_min, ratio) {
            (None, _) => true,
            (Some(min), Some(r)) => r >= min,
            (Some(_), None) => false,
        }
    }

    fn accepts_score(&self, score: f64) -> bool {
        self.score_min.map_or(true, |min| score >= min)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenMatch {
    pub symbol: String,
    pub price: f64,
    pub rsi: Option<f64>,
    pub volume: f64,
    pub volume_ratio: Option<f64>,
    pub score: f64,
    pub recommendation: Recommendation,
}

/// Tickers passing every bound of `filter`, best technical score first.
pub fn screen_parallel<'a, I>(
    engine: &IndicatorEngine,
    filter: &ScreenFilter,
    instruments: I,
) -> (Vec<ScreenMatch>, Vec<ScanError>)
where
    I: IntoParallelIterator<Item = (&'a str, &'a PriceSeries)>,
{
    let (mut matches, errors) = run_batch(instruments, |symbol, series| {
        AnalysisError::require(SCREEN_MIN_BARS, series.len())?;
        let frame = engine.compute(series);
        let row = frame.last_row().ok_or(AnalysisError::Undefined("indicator row"))?;
        let bar = last_bar(series)?;
        let (price, volume) = (bar.close, bar.volume);
        let ratio = relative_volume(series);

        if !filter.accepts_price(price) || !filter.accepts_rsi(row.rsi) || !filter.accepts_volume_ratio(ratio) {
            return Ok(None);
        }
        let score = technical_score(series, &frame)?;
        if !filter.accepts_score(score.score) {
            return Ok(None);
        }
        Ok(Some(ScreenMatch {
            symbol: symbol.to_string(),
            price,
            rsi: row.rsi.map(|r| round_to(r, 2)),
            volume,
            volume_ratio: ratio.map(|r| round_to(r, 2)),
            score: score.score,
            recommendation: score.recommendation,
        }))
    });
    matches.sort_by(|a, b| by_desc(a.score, b.score));
    (matches, errors)
}

// ============================================================
// FAST MOVERS
// ============================================================

pub const FAST_MOVER_MIN_CHANGE: f64 = 5.0;
pub const FAST_MOVER_MIN_VOLUME_RATIO: f64 = 1.5;
pub const FAST_MOVER_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertLevel {
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "MEDIUM")]
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FastMover {
    pub symbol: String,
    pub price: f64,
    /// Last-bar change, percent
    pub change: f64,
    pub volume_ratio: f64,
    /// Change over the last 5 bars, percent
    pub momentum_5: f64,
    pub alert_level: AlertLevel,
}

/// Tickers whose last bar moved at least 5% on at least 1.5x average volume,
/// largest absolute move first, at most ten.
pub fn fast_movers<'a, I>(instruments: I) -> (Vec<FastMover>, Vec<ScanError>)
where
    I: IntoParallelIterator<Item = (&'a str, &'a PriceSeries)>,
{
    let (mut movers, errors) = run_batch(instruments, |symbol, series| {
        AnalysisError::require(BATCH_MIN_BARS, series.len())?;
        let change = change_over(series, 1)?;
        let ratio = volume_ratio(series);
        if change.abs() < FAST_MOVER_MIN_CHANGE || ratio < FAST_MOVER_MIN_VOLUME_RATIO {
            return Ok(None);
        }
        Ok(Some(FastMover {
            symbol: symbol.to_string(),
            price: last_bar(series)?.close,
            change: round_to(change, 2),
            volume_ratio: round_to(ratio, 2),
            momentum_5: round_to(change_over(series, 4)?, 2),
            alert_level: if change.abs() >= 10.0 { AlertLevel::High } else { AlertLevel::Medium },
        }))
    });
    movers.sort_by(|a, b| by_desc(a.change.abs(), b.change.abs()));
    movers.truncate(FAST_MOVER_LIMIT);
    (movers, errors)
}

// ============================================================
// WATCHLIST
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MacdBias {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
    #[serde(rename = "-")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VolumeClass {
    High,
    Med,
    Low,
}

impl VolumeClass {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio > 1.5 {
            Self::High
        } else if ratio > 0.8 {
            Self::Med
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub price: f64,
    pub rsi: Option<f64>,
    pub macd: MacdBias,
    /// Change over the last 20 bars, percent
    pub momentum: f64,
    pub volume: VolumeClass,
    /// Simplified score in 0..=100
    pub score: f64,
}

/// Simplified watchlist score: 50, +/-20 for oversold/overbought RSI,
/// +/-15 for the MACD side, +/-15 for the 20-bar momentum sign.
pub fn watchlist_score(rsi: Option<f64>, macd: MacdBias, momentum: f64) -> f64 {
    let mut score: f64 = 50.0;
    match rsi {
        Some(r) if r < 30.0 => score += 20.0,
        Some(r) if r > 70.0 => score -= 20.0,
        _ => {},
    }
    match macd {
        MacdBias::Up => score += 15.0,
        MacdBias::Down => score -= 15.0,
        MacdBias::Unavailable => {},
    }
    score += if momentum > 0.0 { 15.0 } else { -15.0 };
    score.clamp(0.0, 100.0)
}

/// Side-by-side summary of every ticker, best score first.
pub fn compare_watchlist<'a, I>(engine: &IndicatorEngine, instruments: I) -> (Vec<WatchlistEntry>, Vec<ScanError>)
where
    I: IntoParallelIterator<Item = (&'a str, &'a PriceSeries)>,
{
    let (mut entries, errors) = run_batch(instruments, |symbol, series| {
        AnalysisError::require(BATCH_MIN_BARS, series.len())?;
        let frame = engine.compute(series);
        let row = frame.last_row().ok_or(AnalysisError::Undefined("indicator row"))?;
        let macd = match (row.macd, row.macd_signal) {
            (Some(m), Some(s)) if m > s => MacdBias::Up,
            (Some(_), Some(_)) => MacdBias::Down,
            _ => MacdBias::Unavailable,
        };
        let momentum = change_over(series, BATCH_MIN_BARS - 1)?;
        Ok(Some(WatchlistEntry {
            symbol: symbol.to_string(),
            price: last_bar(series)?.close,
            rsi: row.rsi.map(|r| round_to(r, 1)),
            macd,
            momentum: round_to(momentum, 2),
            volume: VolumeClass::from_ratio(volume_ratio(series)),
            score: watchlist_score(row.rsi, macd, momentum),
        }))
    });
    entries.sort_by(|a, b| by_desc(a.score, b.score));
    (entries, errors)
}

// ============================================================
// TOP MOVERS
// ============================================================

pub const TOP_MOVERS_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performance {
    pub symbol: String,
    pub price: f64,
    /// Percent change over 1, 7 and 30 bars
    pub perf_1: f64,
    pub perf_7: f64,
    pub perf_30: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopMovers {
    pub top_1: Vec<Performance>,
    pub top_7: Vec<Performance>,
    pub top_30: Vec<Performance>,
    pub bottom_1: Vec<Performance>,
}

fn ranked(rows: &[Performance], key: impl Fn(&Performance) -> f64, descending: bool) -> Vec<Performance> {
    let mut out = rows.to_vec();
    if descending {
        out.sort_by(|a, b| by_desc(key(a), key(b)));
    } else {
        out.sort_by(|a, b| key(a).total_cmp(&key(b)));
    }
    out.truncate(TOP_MOVERS_LIMIT);
    out
}

/// Five best performers over 1, 7 and 30 bars, plus the five worst over 1 bar.
pub fn top_movers<'a, I>(instruments: I) -> (TopMovers, Vec<ScanError>)
where
    I: IntoParallelIterator<Item = (&'a str, &'a PriceSeries)>,
{
    let (rows, errors) = run_batch(instruments, |symbol, series| {
        AnalysisError::require(TOP_MOVERS_MIN_BARS, series.len())?;
        Ok(Some(Performance {
            symbol: symbol.to_string(),
            price: last_bar(series)?.close,
            perf_1: round_to(change_over(series, 1)?, 2),
            perf_7: round_to(change_over(series, 7)?, 2),
            perf_30: round_to(change_over(series, 30)?, 2),
        }))
    });

    let movers = TopMovers {
        top_1: ranked(&rows, |p| p.perf_1, true),
        top_7: ranked(&rows, |p| p.perf_7, true),
        top_30: ranked(&rows, |p| p.perf_30, true),
        bottom_1: ranked(&rows, |p| p.perf_1, false),
    };
    (movers, errors)
}

// ============================================================
// SECTOR ROTATION
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VolumeFlow {
    #[serde(rename = "INCREASING")]
    Increasing,
    #[serde(rename = "DECREASING")]
    Decreasing,
    #[serde(rename = "STABLE")]
    Stable,
}

impl VolumeFlow {
    /// Mean of the last 5 volumes against the 10 before them. Shorter
    /// series compare the last 5 with themselves.
    fn of(volumes: &[f64]) -> Self {
        let n = volumes.len();
        let recent = mean(&volumes[n.saturating_sub(5)..]).unwrap_or(0.0);
        let older = if n >= 15 {
            mean(&volumes[n - 15..n - 5]).unwrap_or(recent)
        } else {
            recent
        };
        if recent > older * 1.1 {
            Self::Increasing
        } else if recent < older * 0.9 {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorPerformance {
    pub sector: String,
    /// Percent change over 1, 7 and 30 bars; 0 when the series is too short
    pub perf_1: f64,
    pub perf_7: f64,
    pub perf_30: f64,
    pub volume_flow: VolumeFlow,
    /// Even blend of the 7- and 30-bar changes
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectorRotation {
    /// Best score first
    pub rankings: Vec<SectorPerformance>,
    pub hot_sector: Option<String>,
    pub cold_sector: Option<String>,
}

/// Rank sectors, each given as one representative series, by momentum.
pub fn sector_rotation<'a, I>(sectors: I) -> (SectorRotation, Vec<ScanError>)
where
    I: IntoParallelIterator<Item = (&'a str, &'a PriceSeries)>,
{
    let (mut rankings, errors) = run_batch(sectors, |sector, series| {
        AnalysisError::require(SECTOR_MIN_BARS, series.len())?;
        let change_or_zero = |lag| change_over(series, lag).unwrap_or(0.0);
        let (perf_7, perf_30) = (change_or_zero(7), change_or_zero(30));
        Ok(Some(SectorPerformance {
            sector: sector.to_string(),
            perf_1: round_to(change_over(series, 1)?, 2),
            perf_7: round_to(perf_7, 2),
            perf_30: round_to(perf_30, 2),
            volume_flow: VolumeFlow::of(&series.volumes()),
            score: round_to(perf_7 * 0.5 + perf_30 * 0.5, 2),
        }))
    });
    rankings.sort_by(|a, b| by_desc(a.score, b.score));

    let rotation = SectorRotation {
        hot_sector: rankings.first().map(|s| s.sector.clone()),
        cold_sector: rankings.last().map(|s| s.sector.clone()),
        rankings,
    };
    (rotation, errors)
}
