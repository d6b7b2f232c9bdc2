//! Win rate by weekday and hour, and the monthly performance calendar.
//!
//! Returns are one-bar close-to-close percentages bucketed by the UTC date of
//! the bar they end on, the same convention [`seasonality`](super::seasonality)
//! uses.

use std::collections::BTreeMap;

use chrono::{Datelike, Timelike};
use serde::Serialize;

use super::statistics::{bucket_means, extremes, utc_date, PeriodReturn, MONTHS, WEEKDAYS};
use crate::detectors::helpers::round_to;
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

// ============================================================
// WIN RATE BY TIME
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WinStats {
    /// Share of positive returns, percent
    pub win_rate: f64,
    pub avg_return: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayWinRate {
    pub day: &'static str,
    #[serde(flatten)]
    pub stats: WinStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourWinRate {
    /// UTC hour, 0-23
    pub hour: u32,
    #[serde(flatten)]
    pub stats: WinStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinRateByTime {
    /// Weekdays with at least one return, Monday first
    pub by_day: Vec<DayWinRate>,
    /// Hours with at least one return, ascending
    pub by_hour: Vec<HourWinRate>,
    pub best_day: Option<DayWinRate>,
    pub worst_day: Option<DayWinRate>,
    pub best_hour: Option<HourWinRate>,
    pub worst_hour: Option<HourWinRate>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    wins: usize,
    sum: f64,
    count: usize,
}

impl Tally {
    fn push(&mut self, r: f64) {
        self.wins += usize::from(r > 0.0);
        self.sum += r;
        self.count += 1;
    }

    fn stats(&self) -> Option<WinStats> {
        (self.count > 0).then(|| WinStats {
            win_rate: round_to(self.wins as f64 / self.count as f64 * 100.0, 2),
            avg_return: round_to(self.sum / self.count as f64, 3),
            count: self.count,
        })
    }
}

fn best_and_worst<T: Copy>(items: &[T], key: impl Fn(&T) -> f64) -> (Option<T>, Option<T>) {
    let best = items.iter().copied().max_by(|a, b| key(a).total_cmp(&key(b)));
    let worst = items.iter().copied().min_by(|a, b| key(a).total_cmp(&key(b)));
    (best, worst)
}

/// Win rate and mean return per weekday and per UTC hour.
pub fn win_rate_by_time(series: &PriceSeries) -> Result<WinRateByTime> {
    AnalysisError::require(2, series.len())?;
    let mut days = [Tally::default(); 7];
    let mut hours = [Tally::default(); 24];

    for (i, pair) in series.bars().windows(2).enumerate() {
        let date = utc_date(pair[1].timestamp, i + 1)?;
        let r = (pair[1].close - pair[0].close) / pair[0].close * 100.0;
        days[date.weekday().num_days_from_monday() as usize].push(r);
        hours[date.hour() as usize].push(r);
    }

    let by_day: Vec<DayWinRate> = WEEKDAYS
        .iter()
        .zip(&days)
        .filter_map(|(&day, t)| Some(DayWinRate { day, stats: t.stats()? }))
        .collect();
    let by_hour: Vec<HourWinRate> = (0u32..)
        .zip(&hours)
        .filter_map(|(hour, t)| Some(HourWinRate { hour, stats: t.stats()? }))
        .collect();
    let (best_day, worst_day) = best_and_worst(&by_day, |d| d.stats.avg_return);
    let (best_hour, worst_hour) = best_and_worst(&by_hour, |h| h.stats.avg_return);

    Ok(WinRateByTime {
        by_day,
        by_hour,
        best_day,
        worst_day,
        best_hour,
        worst_hour,
    })
}

// ============================================================
// PERFORMANCE CALENDAR
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: &'static str,
    /// Sum of the month's one-bar returns, percent
    pub return_percent: f64,
    pub bars: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceCalendar {
    /// Chronological
    pub months: Vec<MonthlyReturn>,
    /// Mean monthly return per calendar month across years; `count` is the
    /// number of years with data
    pub monthly_averages: Vec<PeriodReturn>,
    pub best_month: Option<&'static str>,
    pub worst_month: Option<&'static str>,
}

/// Summed returns per calendar month. The first bar has no return, so a
/// month holding only that bar does not appear.
pub fn performance_calendar(series: &PriceSeries) -> Result<PerformanceCalendar> {
    AnalysisError::require(2, series.len())?;
    let mut by_month: BTreeMap<(i32, usize), (f64, usize)> = BTreeMap::new();

    for (i, pair) in series.bars().windows(2).enumerate() {
        let date = utc_date(pair[1].timestamp, i + 1)?;
        let r = (pair[1].close - pair[0].close) / pair[0].close * 100.0;
        let entry = by_month.entry((date.year(), date.month0() as usize)).or_default();
        entry.0 += r;
        entry.1 += 1;
    }

    let mut per_name = [(0.0, 0usize); 12];
    let months: Vec<MonthlyReturn> = by_month
        .into_iter()
        .map(|((year, m), (sum, bars))| {
            per_name[m].0 += sum;
            per_name[m].1 += 1;
            MonthlyReturn {
                year,
                month: MONTHS[m],
                return_percent: round_to(sum, 2),
                bars,
            }
        })
        .collect();

    let monthly_averages = bucket_means(&MONTHS, &per_name);
    let (best_month, worst_month) = extremes(&monthly_averages).unzip();

    Ok(PerformanceCalendar {
        months,
        monthly_averages,
        best_month,
        worst_month,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PriceBar;

    #[test]
    fn test_tally_rounds() {
        let mut t = Tally::default();
        for r in [1.0, -0.5, 2.0] {
            t.push(r);
        }
        let stats = t.stats().unwrap();
        assert_eq!(stats.win_rate, 66.67);
        assert_eq!(stats.avg_return, 0.833);
        assert!(Tally::default().stats().is_none());
    }

    #[test]
    fn test_hours_bucket_intraday_bars() {
        // Hourly bars from midnight; every return ends on hours 1..=5
        let bars = (0..6)
            .map(|i| {
                let c = 100.0 + i as f64;
                PriceBar::new(i * 3_600, c, c, c, c, 1.0)
            })
            .collect();
        let report = win_rate_by_time(&PriceSeries::new(bars).unwrap()).unwrap();
        assert_eq!(report.by_hour.iter().map(|h| h.hour).collect::<Vec<_>>(), [1, 2, 3, 4, 5]);
        assert_eq!(report.by_day.len(), 1);
        assert_eq!(report.by_day[0].day, "Thu");
        assert_eq!(report.by_day[0].stats.count, 5);
        assert_eq!(report.best_hour.map(|h| h.hour), Some(1));
    }
}
