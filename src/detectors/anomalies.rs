//! Statistical anomaly scoring and last-bar alerts.

use serde::Serialize;

use super::helpers::{percent_from, round_to};
use crate::math::{back, mean, pct_change, rolling_mean, rolling_std_opt, sample_std};
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

/// Points for a return beyond mean + 3 sigma
pub const RETURN_POINTS: u32 = 40;
/// Points for volume beyond mean + 3 sigma
pub const VOLUME_POINTS: u32 = 30;
/// Points for an opening gap beyond 3%
pub const GAP_POINTS: u32 = 30;
pub const REPORT_THRESHOLD: u32 = 50;
const GAP_PERCENT: f64 = 3.0;
const SIGMAS: f64 = 3.0;
const MAX_REPORTED: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum AnomalyReason {
    ExtremeMove { change_percent: f64 },
    AbnormalVolume { multiple_of_average: f64 },
    SignificantGap { gap_percent: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub index: usize,
    pub timestamp: i64,
    pub score: u32,
    pub price: f64,
    /// Close-to-close change in percent, two decimals; undefined on the first bar
    pub change_percent: Option<f64>,
    pub volume: f64,
    pub reasons: Vec<AnomalyReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    /// Newest first, at most 20
    pub anomalies: Vec<Anomaly>,
}

impl AnomalyReport {
    #[inline]
    pub fn total(&self) -> usize {
        self.anomalies.len()
    }
}

/// Score every bar against whole-series return and volume statistics.
/// Thresholds that cannot be computed (fewer than two returns or volumes)
/// never fire.
pub fn detect_anomalies(series: &PriceSeries) -> Result<AnomalyReport> {
    tracing::debug!(bars = series.len(), "scoring anomalies");
    let bars = series.bars();
    let returns: Vec<Option<f64>> = pct_change(&series.closes(), 1)
        .into_iter()
        .map(|r| r.map(|r| r * 100.0))
        .collect();
    let defined: Vec<f64> = returns.iter().flatten().copied().collect();
    let volumes = series.volumes();

    let return_limit = mean(&defined)
        .zip(sample_std(&defined))
        .map(|(m, s)| m + SIGMAS * s);
    let volume_mean = mean(&volumes);
    let volume_limit = volume_mean.zip(sample_std(&volumes)).map(|(m, s)| m + SIGMAS * s);

    let mut anomalies = Vec::new();
    for (i, bar) in bars.iter().enumerate() {
        let mut score = 0;
        let mut reasons = Vec::new();

        if let (Some(r), Some(limit)) = (returns[i], return_limit) {
            if r.abs() > limit {
                score += RETURN_POINTS;
                reasons.push(AnomalyReason::ExtremeMove {
                    change_percent: round_to(r, 1),
                });
            }
        }
        if let (Some(limit), Some(avg)) = (volume_limit, volume_mean) {
            if bar.volume > limit {
                score += VOLUME_POINTS;
                reasons.push(AnomalyReason::AbnormalVolume {
                    multiple_of_average: round_to(bar.volume / avg, 1),
                });
            }
        }
        if i > 0 {
            let gap = percent_from(bars[i - 1].close, bar.open);
            if gap.abs() > GAP_PERCENT {
                score += GAP_POINTS;
                reasons.push(AnomalyReason::SignificantGap {
                    gap_percent: round_to(gap, 1),
                });
            }
        }

        if score >= REPORT_THRESHOLD {
            anomalies.push(Anomaly {
                index: i,
                timestamp: bar.timestamp,
                score,
                price: bar.close,
                change_percent: returns[i].map(|r| round_to(r, 2)),
                volume: bar.volume,
                reasons,
            });
        }
    }

    anomalies.reverse();
    anomalies.truncate(MAX_REPORTED);
    Ok(AnomalyReport { anomalies })
}

// ============================================================
// LAST-BAR ALERTS
// ============================================================

pub const ALERT_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertSeverity {
    High,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum AlertKind {
    /// Volume above 3x the prior 20-bar mean
    HighVolume { volume: f64, average: f64 },
    /// Opening gap above 5%
    Gap { gap_percent: f64 },
    /// Absolute return above 3x the prior 20-bar return deviation
    Volatility { return_percent: f64 },
    /// High-low range above 10% of the low
    IntradayVariation { range_percent: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
}

/// Alerts on the most recent bar, measured against statistics that end one bar earlier.
pub fn latest_alerts(series: &PriceSeries) -> Result<Vec<Alert>> {
    AnalysisError::require(ALERT_WINDOW, series.len())?;
    let bars = series.bars();
    let last = bars[bars.len() - 1];
    let prev = bars[bars.len() - 2];
    let mut alerts = Vec::new();

    if let Some(average) = back(&rolling_mean(&series.volumes(), ALERT_WINDOW), 1) {
        if last.volume > average * 3.0 {
            alerts.push(Alert {
                kind: AlertKind::HighVolume {
                    volume: last.volume,
                    average,
                },
                severity: AlertSeverity::High,
            });
        }
    }

    let gap = percent_from(prev.close, last.open).abs();
    if gap > 5.0 {
        alerts.push(Alert {
            kind: AlertKind::Gap { gap_percent: round_to(gap, 1) },
            severity: AlertSeverity::High,
        });
    }

    let returns = pct_change(&series.closes(), 1);
    let deviation = back(&rolling_std_opt(&returns, ALERT_WINDOW), 1);
    if let (Some(r), Some(dev)) = (back(&returns, 0), deviation) {
        if r.abs() > dev * 3.0 {
            alerts.push(Alert {
                kind: AlertKind::Volatility {
                    return_percent: round_to(r * 100.0, 2),
                },
                severity: AlertSeverity::Medium,
            });
        }
    }

    let range_percent = (last.high - last.low) / last.low * 100.0;
    if range_percent > 10.0 {
        alerts.push(Alert {
            kind: AlertKind::IntradayVariation {
                range_percent: round_to(range_percent, 1),
            },
            severity: AlertSeverity::Medium,
        });
    }

    Ok(alerts)
}
