//! Return distribution statistics and calendar seasonality.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::detectors::helpers::round_to;
use crate::math::{excess_kurtosis, mean, median, percentile, sample_std, skewness};
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

pub const HISTOGRAM_BINS: usize = 20;

// ============================================================
// RETURN STATISTICS
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub from: f64,
    pub to: f64,
    pub count: usize,
}

/// Distribution of one-bar returns, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnStatistics {
    pub mean_return: f64,
    pub median_return: f64,
    pub std_deviation: f64,
    /// Undefined at zero variance
    pub skewness: Option<f64>,
    /// Excess kurtosis; undefined at zero variance
    pub kurtosis: Option<f64>,
    /// 5th percentile return
    pub var_95: f64,
    /// 1st percentile return
    pub var_99: f64,
    pub max_return: f64,
    pub min_return: f64,
    pub positive_days: usize,
    pub negative_days: usize,
    pub win_rate: f64,
    pub histogram: Vec<HistogramBin>,
}

/// Equal-width bins over `[min, max]`, the last bin closed on the right.
/// A degenerate range is widened to `[v - 0.5, v + 0.5]`.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let (Some(lo), Some(hi)) = (
        values.iter().copied().reduce(f64::min),
        values.iter().copied().reduce(f64::max),
    ) else {
        return Vec::new();
    };
    if bins == 0 {
        return Vec::new();
    }
    let (lo, hi) = if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) };
    let width = (hi - lo) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|b| HistogramBin {
            from: lo + width * b as f64,
            to: if b + 1 == bins { hi } else { lo + width * (b + 1) as f64 },
            count: 0,
        })
        .collect();
    for &v in values {
        let b = (((v - lo) / width) as usize).min(bins - 1);
        out[b].count += 1;
    }
    out
}

pub fn return_statistics(series: &PriceSeries) -> Result<ReturnStatistics> {
    AnalysisError::require(3, series.len())?;
    let returns: Vec<f64> = series.returns().into_iter().map(|r| r * 100.0).collect();
    let undefined = AnalysisError::Undefined("return statistics");

    let mean_return = mean(&returns).ok_or(undefined.clone())?;
    let median_return = median(&returns).ok_or(undefined.clone())?;
    let std_deviation = sample_std(&returns).ok_or(undefined.clone())?;
    let var_95 = percentile(&returns, 5.0).ok_or(undefined.clone())?;
    let var_99 = percentile(&returns, 1.0).ok_or(undefined)?;
    let max_return = returns.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_return = returns.iter().copied().fold(f64::INFINITY, f64::min);
    let positive_days = returns.iter().filter(|&&r| r > 0.0).count();
    let negative_days = returns.iter().filter(|&&r| r < 0.0).count();

    Ok(ReturnStatistics {
        mean_return: round_to(mean_return, 3),
        median_return: round_to(median_return, 3),
        std_deviation: round_to(std_deviation, 3),
        skewness: skewness(&returns).map(|v| round_to(v, 3)),
        kurtosis: excess_kurtosis(&returns).map(|v| round_to(v, 3)),
        var_95: round_to(var_95, 3),
        var_99: round_to(var_99, 3),
        max_return: round_to(max_return, 2),
        min_return: round_to(min_return, 2),
        positive_days,
        negative_days,
        win_rate: round_to(positive_days as f64 / returns.len() as f64 * 100.0, 1),
        histogram: histogram(&returns, HISTOGRAM_BINS),
    })
}

// ============================================================
// SEASONALITY
// ============================================================

pub const SEASONALITY_MIN_BARS: usize = 365;

pub(crate) const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
pub(crate) const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodReturn {
    pub label: &'static str,
    /// Mean one-bar return in percent; `None` when no bar falls in the bucket
    pub avg_return: Option<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Seasonality {
    pub monthly: Vec<PeriodReturn>,
    pub weekday: Vec<PeriodReturn>,
    pub best_month: &'static str,
    pub worst_month: &'static str,
    pub best_day: &'static str,
    pub worst_day: &'static str,
}

/// Calendar date of a bar's unix timestamp.
pub(crate) fn utc_date(timestamp: i64, index: usize) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp, 0).ok_or(AnalysisError::InvalidBar {
        index,
        reason: "timestamp outside the calendar range",
    })
}

pub(crate) fn bucket_means(labels: &[&'static str], sums: &[(f64, usize)]) -> Vec<PeriodReturn> {
    labels
        .iter()
        .zip(sums)
        .map(|(&label, &(sum, count))| PeriodReturn {
            label,
            avg_return: (count > 0).then(|| round_to(sum / count as f64, 2)),
            count,
        })
        .collect()
}

pub(crate) fn extremes(buckets: &[PeriodReturn]) -> Option<(&'static str, &'static str)> {
    let with_data = buckets.iter().filter_map(|b| Some((b.label, b.avg_return?)));
    let best = with_data.clone().max_by(|a, b| a.1.total_cmp(&b.1))?;
    let worst = with_data.min_by(|a, b| a.1.total_cmp(&b.1))?;
    Some((best.0, worst.0))
}

/// Mean return grouped by calendar month and weekday (UTC) of the bar the
/// return ends on.
pub fn seasonality(series: &PriceSeries) -> Result<Seasonality> {
    AnalysisError::require(SEASONALITY_MIN_BARS, series.len())?;
    let bars = series.bars();
    let mut months = [(0.0, 0usize); 12];
    let mut weekdays = [(0.0, 0usize); 7];

    for (i, pair) in bars.windows(2).enumerate() {
        let date = utc_date(pair[1].timestamp, i + 1)?;
        let r = (pair[1].close - pair[0].close) / pair[0].close * 100.0;
        let m = &mut months[date.month0() as usize];
        m.0 += r;
        m.1 += 1;
        let d = &mut weekdays[date.weekday().num_days_from_monday() as usize];
        d.0 += r;
        d.1 += 1;
    }

    let monthly = bucket_means(&MONTHS, &months);
    let weekday = bucket_means(&WEEKDAYS, &weekdays);
    let undefined = AnalysisError::Undefined("seasonality buckets");
    let (best_month, worst_month) = extremes(&monthly).ok_or(undefined.clone())?;
    let (best_day, worst_day) = extremes(&weekday).ok_or(undefined)?;

    Ok(Seasonality {
        monthly,
        weekday,
        best_month,
        worst_month,
        best_day,
        worst_day,
    })
}
