//! Fibonacci time zones projected forward from a recent swing low.

use serde::Serialize;

use super::helpers::{is_swing_low, percent_from, SECONDS_PER_DAY};
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

pub const TIME_ZONE_MIN_BARS: usize = 60;
/// Bar offsets from the anchor at which a zone falls
pub const FIB_TIME_SEQUENCE: [usize; 7] = [8, 13, 21, 34, 55, 89, 144];
/// Anchor search window, counted back from the last bar
const ANCHOR_SEARCH: (usize, usize) = (40, 10);
const ANCHOR_RADIUS: usize = 10;
/// Move from the anchor low (percent) that marks a past zone as significant
const SIGNIFICANT_MOVE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FibTimeZone {
    Past {
        offset: usize,
        index: usize,
        timestamp: i64,
        price: f64,
        /// Close moved more than 5% away from the anchor low
        significant_move: bool,
    },
    Future {
        offset: usize,
        bars_ahead: usize,
        /// Projected with one bar per day
        timestamp: i64,
    },
}

impl FibTimeZone {
    pub fn offset(&self) -> usize {
        match *self {
            Self::Past { offset, .. } | Self::Future { offset, .. } => offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeZoneReport {
    pub anchor_index: usize,
    pub anchor_timestamp: i64,
    pub anchor_price: f64,
    pub zones: Vec<FibTimeZone>,
    /// First zone still ahead of the last bar
    pub next_zone: Option<FibTimeZone>,
}

/// Zones at Fibonacci bar offsets from the first swing low (lows, radius 10)
/// found between 40 and 10 bars before the last bar.
pub fn fibonacci_time_zones(series: &PriceSeries) -> Result<TimeZoneReport> {
    AnalysisError::require(TIME_ZONE_MIN_BARS, series.len())?;
    let bars = series.bars();
    let n = bars.len();
    let lows = series.lows();

    let anchor = (n - ANCHOR_SEARCH.0..n - ANCHOR_SEARCH.1)
        .find(|&i| is_swing_low(&lows, i, ANCHOR_RADIUS))
        .ok_or(AnalysisError::Undefined("no swing low to anchor time zones"))?;
    let anchor_price = lows[anchor];
    let last_ts = bars[n - 1].timestamp;
    tracing::debug!(anchor, "projecting fibonacci time zones");

    let zones: Vec<FibTimeZone> = FIB_TIME_SEQUENCE
        .iter()
        .map(|&offset| {
            let target = anchor + offset;
            if target < n {
                let bar = &bars[target];
                FibTimeZone::Past {
                    offset,
                    index: target,
                    timestamp: bar.timestamp,
                    price: bar.close,
                    significant_move: percent_from(anchor_price, bar.close).abs() > SIGNIFICANT_MOVE,
                }
            } else {
                let bars_ahead = target - n + 1;
                FibTimeZone::Future {
                    offset,
                    bars_ahead,
                    timestamp: last_ts + bars_ahead as i64 * SECONDS_PER_DAY,
                }
            }
        })
        .collect();

    Ok(TimeZoneReport {
        anchor_index: anchor,
        anchor_timestamp: bars[anchor].timestamp,
        anchor_price,
        next_zone: zones.iter().copied().find(|z| matches!(z, FibTimeZone::Future { .. })),
        zones,
    })
}
