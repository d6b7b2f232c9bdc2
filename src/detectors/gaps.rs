//! Opening gap analysis with fill tracking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::helpers::{days_between, percent_from, round_to};
use crate::params::{get_amount, impl_validated_serde, ParamMeta, Parameterized};
use crate::series::PriceSeries;
use crate::{Result, OHLCV};

const MAX_REPORTED: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct GapParams {
    /// Minimum absolute open-vs-prior-close move, in percent
    pub min_gap_percent: f64,
}

impl Default for GapParams {
    fn default() -> Self {
        Self { min_gap_percent: 2.0 }
    }
}

const GAP_PARAMS: &[ParamMeta] = &[ParamMeta::amount(
    "min_gap_percent",
    2.0,
    (0.1, 50.0, 0.5),
    "Minimum gap size in percent",
)];

impl Parameterized for GapParams {
    fn param_meta() -> &'static [ParamMeta] {
        GAP_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let p = Self {
            min_gap_percent: get_amount(params, "min_gap_percent", 2.0)?,
        };
        p.validate()?;
        Ok(p)
    }

    fn param_values(&self) -> Vec<f64> {
        vec![self.min_gap_percent]
    }
}

impl_validated_serde!(GapParams);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GapKind {
    GapUp,
    GapDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gap {
    pub kind: GapKind,
    pub index: usize,
    pub timestamp: i64,
    /// Rounded to two decimals
    pub gap_percent: f64,
    pub prev_close: f64,
    pub open: f64,
    pub filled: bool,
    pub fill_index: Option<usize>,
    pub fill_timestamp: Option<i64>,
    pub days_to_fill: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapReport {
    /// Newest first, at most 20
    pub all_gaps: Vec<Gap>,
    /// Every unfilled gap, newest first
    pub unfilled_gaps: Vec<Gap>,
    pub total_gaps: usize,
    pub unfilled_count: usize,
    /// Percent of gaps filled, one decimal; 0 without gaps
    pub fill_rate: f64,
}

/// Find every gap at or above the threshold. A gap up is filled by the first bar,
/// starting with the gap bar itself, whose low reaches the prior close; a gap
/// down by the first bar whose high does.
pub fn analyze_gaps(series: &PriceSeries, params: &GapParams) -> Result<GapReport> {
    params.validate()?;
    let bars = series.bars();
    tracing::debug!(bars = bars.len(), threshold = params.min_gap_percent, "analyzing gaps");

    let mut gaps = Vec::new();
    for i in 1..bars.len() {
        let prev_close = bars[i - 1].close();
        let open = bars[i].open();
        let gap_percent = percent_from(prev_close, open);
        if gap_percent.abs() < params.min_gap_percent {
            continue;
        }

        let kind = if gap_percent > 0.0 { GapKind::GapUp } else { GapKind::GapDown };
        let fill_index = (i..bars.len()).find(|&j| match kind {
            GapKind::GapUp => bars[j].low() <= prev_close,
            GapKind::GapDown => bars[j].high() >= prev_close,
        });
        let fill_timestamp = fill_index.map(|j| bars[j].timestamp);

        gaps.push(Gap {
            kind,
            index: i,
            timestamp: bars[i].timestamp,
            gap_percent: round_to(gap_percent, 2),
            prev_close,
            open,
            filled: fill_index.is_some(),
            fill_index,
            fill_timestamp,
            days_to_fill: fill_timestamp.map(|t| days_between(bars[i].timestamp, t)),
        });
    }

    gaps.reverse();
    let unfilled_gaps: Vec<Gap> = gaps.iter().filter(|g| !g.filled).copied().collect();
    let total_gaps = gaps.len();
    let unfilled_count = unfilled_gaps.len();
    let fill_rate = if total_gaps > 0 {
        round_to((total_gaps - unfilled_count) as f64 / total_gaps as f64 * 100.0, 1)
    } else {
        0.0
    };
    gaps.truncate(MAX_REPORTED);

    Ok(GapReport {
        all_gaps: gaps,
        unfilled_gaps,
        total_gaps,
        unfilled_count,
        fill_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PriceBar;

    const DAY: i64 = 86_400;

    #[test]
    fn test_gap_down_unfilled() {
        let bars = vec![
            PriceBar::new(0, 100.0, 101.0, 99.0, 100.0, 1.0),
            PriceBar::new(DAY, 95.0, 96.0, 94.0, 95.0, 1.0),
            PriceBar::new(2 * DAY, 95.0, 97.0, 94.0, 96.0, 1.0),
        ];
        let s = PriceSeries::new(bars).unwrap();
        let report = analyze_gaps(&s, &GapParams::default()).unwrap();
        assert_eq!(report.total_gaps, 1);
        assert_eq!(report.unfilled_count, 1);
        assert_eq!(report.fill_rate, 0.0);
        let gap = report.all_gaps[0];
        assert_eq!(gap.kind, GapKind::GapDown);
        assert_eq!(gap.gap_percent, -5.0);
        assert!(!gap.filled);
        assert!(gap.days_to_fill.is_none());
    }

    #[test]
    fn test_gap_filled_on_gap_bar() {
        // Opens 3% up but trades back to the prior close the same day
        let bars = vec![
            PriceBar::new(0, 100.0, 101.0, 99.0, 100.0, 1.0),
            PriceBar::new(DAY, 103.0, 104.0, 99.5, 101.0, 1.0),
        ];
        let s = PriceSeries::new(bars).unwrap();
        let report = analyze_gaps(&s, &GapParams::default()).unwrap();
        assert_eq!(report.all_gaps[0].fill_index, Some(1));
        assert_eq!(report.all_gaps[0].days_to_fill, Some(0));
        assert_eq!(report.fill_rate, 100.0);
    }

    #[test]
    fn test_empty_series_has_no_gaps() {
        let s = PriceSeries::new(Vec::new()).unwrap();
        let report = analyze_gaps(&s, &GapParams::default()).unwrap();
        assert_eq!(report.total_gaps, 0);
        assert_eq!(report.fill_rate, 0.0);
    }
}
