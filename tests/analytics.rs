//! Integration tests for calendar analytics and sector rotation.

use coinsight::analytics::{performance_calendar, win_rate_by_time};
use coinsight::batch::{sector_rotation, VolumeFlow};
use coinsight::prelude::{AnalysisError, PriceBar, PriceSeries};

const DAY: i64 = 86_400;
/// 1970-01-05, a Monday
const FIRST_MONDAY: i64 = 4 * DAY;
/// 2023-12-31 00:00 UTC
const NEW_YEARS_EVE_2023: i64 = 1_703_980_800;

fn daily(start: i64, closes: &[f64], volumes: &[f64]) -> PriceSeries {
    let bars = closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&c, &v))| PriceBar::new(start + i as i64 * DAY, c, c, c, c, v))
        .collect();
    PriceSeries::new(bars).unwrap()
}

// ============================================================
// WIN RATE BY TIME
// ============================================================

#[test]
fn test_win_rate_by_weekday() {
    // Two weeks from a Monday; only the second Monday closes higher
    let mut closes = vec![100.0; 14];
    for c in &mut closes[7..] {
        *c = 110.0;
    }
    let report = win_rate_by_time(&daily(FIRST_MONDAY, &closes, &[1.0; 14])).unwrap();

    let days: Vec<&str> = report.by_day.iter().map(|d| d.day).collect();
    assert_eq!(days, ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
    let monday = report.by_day[0].stats;
    assert_eq!((monday.win_rate, monday.avg_return, monday.count), (100.0, 10.0, 1));
    let tuesday = report.by_day[1].stats;
    assert_eq!((tuesday.win_rate, tuesday.count), (0.0, 2));

    assert_eq!(report.best_day.map(|d| d.day), Some("Mon"));
    // Daily bars all close at midnight
    assert_eq!(report.by_hour.len(), 1);
    assert_eq!(report.by_hour[0].hour, 0);
    assert_eq!(report.by_hour[0].stats.count, 13);
}

#[test]
fn test_win_rate_needs_a_return() {
    let s = daily(0, &[100.0], &[1.0]);
    assert_eq!(win_rate_by_time(&s), Err(AnalysisError::InsufficientData { need: 2, got: 1 }));
}

// ============================================================
// PERFORMANCE CALENDAR
// ============================================================

#[test]
fn test_calendar_sums_monthly_returns() {
    // Dec 31 through Feb 29 2024, growing 1% a day
    let closes: Vec<f64> = (0..61).map(|i| 100.0 * 1.01f64.powi(i)).collect();
    let calendar = performance_calendar(&daily(NEW_YEARS_EVE_2023, &closes, &[1.0; 61])).unwrap();

    // December holds only the first bar, which has no return
    assert_eq!(calendar.months.len(), 2);
    let (jan, feb) = (calendar.months[0], calendar.months[1]);
    assert_eq!((jan.year, jan.month, jan.bars), (2024, "Jan", 31));
    assert_eq!((feb.year, feb.month, feb.bars), (2024, "Feb", 29));
    assert_eq!(jan.return_percent, 31.0);
    assert_eq!(feb.return_percent, 29.0);

    assert_eq!(calendar.monthly_averages.len(), 12);
    assert_eq!(calendar.monthly_averages[0].avg_return, Some(31.0));
    assert_eq!(calendar.monthly_averages[0].count, 1);
    assert_eq!(calendar.monthly_averages[11].avg_return, None);
    assert_eq!(calendar.best_month, Some("Jan"));
    assert_eq!(calendar.worst_month, Some("Feb"));
}

// ============================================================
// SECTOR ROTATION
// ============================================================

#[test]
fn test_sector_rotation_hot_and_cold() {
    let mut volumes = vec![100.0; 40];
    for v in &mut volumes[35..] {
        *v = 200.0;
    }
    let layer_1: Vec<f64> = (0..40).map(|i| 100.0 * 1.02f64.powi(i)).collect();
    let gaming: Vec<f64> = (0..40).map(|i| 100.0 * 0.99f64.powi(i)).collect();
    let (l1, games) = (daily(0, &layer_1, &volumes), daily(0, &gaming, &[100.0; 40]));

    let (rotation, errors) = sector_rotation(vec![("Gaming", &games), ("Layer 1", &l1)]);
    assert!(errors.is_empty());
    assert_eq!(rotation.hot_sector.as_deref(), Some("Layer 1"));
    assert_eq!(rotation.cold_sector.as_deref(), Some("Gaming"));
    assert_eq!(rotation.rankings[0].volume_flow, VolumeFlow::Increasing);
    assert_eq!(rotation.rankings[1].volume_flow, VolumeFlow::Stable);
    assert!(rotation.rankings[0].score > 0.0 && rotation.rankings[1].score < 0.0);
}
