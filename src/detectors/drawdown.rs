//! Drawdown episodes measured against the running maximum close.

use std::cmp::Ordering;

use serde::Serialize;

use super::helpers::round_to;
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

/// Drawdown (percent) below which an episode opens
pub const EPISODE_OPEN: f64 = -1.0;
/// Drawdown (percent) at or above which an open episode closes
pub const EPISODE_CLOSE: f64 = -0.1;
/// Current drawdown below this reports `InDrawdown`
const STATUS_THRESHOLD: f64 = -5.0;
const MAX_REPORTED: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DrawdownStatus {
    InDrawdown,
    NearPeak,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawdownEpisode {
    /// First bar below the open threshold
    pub start_index: usize,
    pub start_timestamp: i64,
    /// Recovery bar; `None` while the episode is still open
    pub end_index: Option<usize>,
    pub end_timestamp: Option<i64>,
    /// Running maximum when the episode opened
    pub peak_price: f64,
    /// Lowest close from the start up to (excluding) the recovery bar
    pub trough_price: f64,
    pub drawdown_percent: f64,
    /// Bars from start to recovery, or to the last bar when still open
    pub duration_bars: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawdownReport {
    pub current_drawdown: f64,
    pub max_drawdown: f64,
    /// Completed episodes, most severe first, at most 10
    pub episodes: Vec<DrawdownEpisode>,
    pub ongoing: Option<DrawdownEpisode>,
    /// Mean duration of the reported episodes; 0 without any
    pub avg_recovery_bars: f64,
    pub status: DrawdownStatus,
}

impl DrawdownReport {
    #[inline]
    pub fn total_drawdowns(&self) -> usize {
        self.episodes.len()
    }
}

/// Percent distance of each close below its running maximum (always <= 0).
pub fn drawdown_series(closes: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    closes
        .iter()
        .map(|&c| {
            peak = peak.max(c);
            (c - peak) / peak * 100.0
        })
        .collect()
}

pub fn analyze_drawdowns(series: &PriceSeries) -> Result<DrawdownReport> {
    AnalysisError::require(1, series.len())?;
    tracing::debug!(bars = series.len(), "analyzing drawdowns");
    let bars = series.bars();
    let closes = series.closes();
    let dd = drawdown_series(&closes);

    let episode = |start: usize, end: usize, recovered: bool| {
        let peak_price = closes[..=start].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let trough_price = closes[start..end].iter().copied().fold(f64::INFINITY, f64::min);
        DrawdownEpisode {
            start_index: start,
            start_timestamp: bars[start].timestamp,
            end_index: recovered.then_some(end),
            end_timestamp: recovered.then(|| bars[end].timestamp),
            peak_price,
            trough_price,
            drawdown_percent: round_to((trough_price - peak_price) / peak_price * 100.0, 2),
            duration_bars: if recovered { end - start } else { end - 1 - start },
        }
    };

    let mut episodes = Vec::new();
    let mut open: Option<usize> = None;
    for (i, &d) in dd.iter().enumerate() {
        match open {
            None if d < EPISODE_OPEN => open = Some(i),
            Some(start) if d >= EPISODE_CLOSE => {
                episodes.push(episode(start, i, true));
                open = None;
            },
            _ => {},
        }
    }
    let ongoing = open.map(|start| episode(start, dd.len(), false));

    episodes.sort_by(|a, b| {
        a.drawdown_percent
            .partial_cmp(&b.drawdown_percent)
            .unwrap_or(Ordering::Equal)
    });
    episodes.truncate(MAX_REPORTED);

    let avg_recovery_bars = if episodes.is_empty() {
        0.0
    } else {
        round_to(
            episodes.iter().map(|e| e.duration_bars as f64).sum::<f64>() / episodes.len() as f64,
            1,
        )
    };
    let current_drawdown = dd[dd.len() - 1];
    let max_drawdown = dd.iter().copied().fold(0.0, f64::min);

    Ok(DrawdownReport {
        current_drawdown: round_to(current_drawdown, 2),
        max_drawdown: round_to(max_drawdown, 2),
        episodes,
        ongoing,
        avg_recovery_bars,
        status: if current_drawdown < STATUS_THRESHOLD {
            DrawdownStatus::InDrawdown
        } else {
            DrawdownStatus::NearPeak
        },
    })
}
