//! Integration tests for pattern and level detectors.

use coinsight::detectors::{
    analyze_drawdowns, analyze_gaps, detect_breakout, detect_divergences, elliott_waves, fibonacci_levels,
    fibonacci_time_zones, pivot_points, scan_latest, support_resistance_clusters, volume_profile, wyckoff_phase,
    DivergenceParams, FibTimeZone, GapKind, GapParams, SupportResistanceParams, SwingKind, WyckoffPhase,
    WyckoffSignal, MAX_CLUSTER_BINS,
};
use coinsight::indicators::IndicatorFrame;
use coinsight::prelude::{AnalysisError, PriceBar, PriceSeries};

const DAY: i64 = 86_400;

fn bar(i: usize, o: f64, h: f64, l: f64, c: f64) -> PriceBar {
    PriceBar::new(i as i64 * DAY, o, h, l, c, 1_000.0)
}

fn closes_only(closes: &[f64]) -> PriceSeries {
    let bars = closes.iter().enumerate().map(|(i, &c)| bar(i, c, c, c, c)).collect();
    PriceSeries::new(bars).unwrap()
}

// ============================================================
// GAPS
// ============================================================

/// Flat at 100, 5% gap up at bar 10 that holds until bar 15
fn gap_up_series() -> PriceSeries {
    let mut bars: Vec<PriceBar> = (0..10).map(|i| bar(i, 100.0, 100.0, 100.0, 100.0)).collect();
    bars.push(bar(10, 105.0, 106.0, 104.0, 105.0));
    for (i, c) in [(11, 104.0), (12, 103.0), (13, 102.5), (14, 102.0)] {
        bars.push(bar(i, c, c, c, c));
    }
    bars.push(bar(15, 101.5, 101.5, 99.5, 100.0));
    bars.extend((16..20).map(|i| bar(i, 100.0, 100.0, 100.0, 100.0)));
    PriceSeries::new(bars).unwrap()
}

#[test]
fn test_gap_up_filled_five_bars_later() {
    let report = analyze_gaps(&gap_up_series(), &GapParams::default()).unwrap();
    assert_eq!(report.total_gaps, 1);
    let gap = report.all_gaps[0];
    assert_eq!(gap.kind, GapKind::GapUp);
    assert_eq!(gap.index, 10);
    assert_eq!(gap.gap_percent, 5.0);
    assert!(gap.filled);
    assert_eq!(gap.fill_index, Some(15));
    assert_eq!(gap.fill_timestamp, Some(15 * DAY));
    assert_eq!(gap.days_to_fill, Some(5));
    assert_eq!(report.fill_rate, 100.0);
    assert!(report.unfilled_gaps.is_empty());
}

#[test]
fn test_gap_threshold_is_configurable() {
    let params = GapParams { min_gap_percent: 6.0 };
    let report = analyze_gaps(&gap_up_series(), &params).unwrap();
    assert_eq!(report.total_gaps, 0);
    assert_eq!(report.fill_rate, 0.0);
}

// ============================================================
// DRAWDOWN
// ============================================================

#[test]
fn test_rise_fall_recover_is_one_episode() {
    let mut closes: Vec<f64> = (0..=20).map(|i| 100.0 + i as f64).collect();
    closes.extend((1..=30).map(|i| 120.0 - i as f64));
    closes.extend((1..=35).map(|i| 90.0 + i as f64));
    let report = analyze_drawdowns(&closes_only(&closes)).unwrap();

    assert_eq!(report.total_drawdowns(), 1);
    assert!(report.ongoing.is_none());
    let episode = report.episodes[0];
    assert_eq!(episode.peak_price, 120.0);
    assert_eq!(episode.trough_price, 90.0);
    assert_eq!(episode.drawdown_percent, -25.0);
    assert_eq!(episode.start_index, 22);
    assert_eq!(episode.end_index, Some(80));
    assert_eq!(report.max_drawdown, -25.0);
    assert_eq!(report.current_drawdown, 0.0);
}

// ============================================================
// BREAKOUT
// ============================================================

#[test]
fn test_flat_year_has_no_breakout() {
    let bars = (0..300).map(|i| bar(i, 100.0, 100.5, 99.5, 100.0)).collect();
    let s = PriceSeries::new(bars).unwrap();
    let report = detect_breakout(&s, &IndicatorFrame::compute(&s)).unwrap();
    assert!(!report.breakout);
    assert!(report.direction.is_none());
}

#[test]
fn test_breakout_needs_a_year() {
    let s = closes_only(&[100.0; 100]);
    let err = detect_breakout(&s, &IndicatorFrame::compute(&s)).unwrap_err();
    assert_eq!(err, AnalysisError::InsufficientData { need: 252, got: 100 });
}

// ============================================================
// LEVELS
// ============================================================

#[test]
fn test_pivot_points_from_last_bar() {
    let s = PriceSeries::new(vec![bar(0, 100.0, 110.0, 90.0, 100.0)]).unwrap();
    let p = pivot_points(&s).unwrap();
    assert_eq!(p.pivot, 100.0);
    assert_eq!(p.r1, 110.0);
    assert_eq!(p.s1, 90.0);
    assert_eq!(p.r2, 120.0);
    assert_eq!(p.s2, 80.0);
}

#[test]
fn test_fibonacci_spans_range() {
    let s = closes_only(&[100.0, 150.0, 200.0, 180.0]);
    let fib = fibonacci_levels(&s).unwrap();
    assert_eq!(fib.max_price, 200.0);
    assert_eq!(fib.min_price, 100.0);
    assert_eq!(fib.retracements.first().unwrap().price, 200.0);
    assert_eq!(fib.retracements.last().unwrap().price, 100.0);
    assert!(fib.extensions.iter().all(|e| e.price > 200.0));
}

#[test]
fn test_volume_profile_of_flat_range_is_undefined() {
    assert!(matches!(
        volume_profile(&closes_only(&[50.0; 10]), 20),
        Err(AnalysisError::Undefined(_))
    ));
}

#[test]
fn test_volume_profile_total() {
    let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i % 10) as f64).collect();
    let profile = volume_profile(&closes_only(&closes), 20).unwrap();
    assert_eq!(profile.profile.len(), 20);
    assert!(profile.poc >= 100.0 && profile.poc <= 109.0);
}

#[test]
fn test_support_resistance_on_range() {
    let closes: Vec<f64> = (0..120).map(|i| 100.0 + 10.0 * ((i as f64) * 0.3).sin()).collect();
    let report = support_resistance_clusters(&closes_only(&closes), &SupportResistanceParams::default());
    assert!(report.is_ok());
}

#[test]
fn test_clusters_after_collapse_use_bounded_bins() {
    // Price falls from 10_000 to 0.01: 1% bins of the last price would cover
    // the range with about 10^8 buckets
    let closes: Vec<f64> = (0..200).map(|i| 10_000.0 * 0.933f64.powi(i)).chain([0.01]).collect();
    let s = closes_only(&closes);
    let report = support_resistance_clusters(&s, &SupportResistanceParams::default()).unwrap();
    let width = (10_000.0 - 0.01) / MAX_CLUSTER_BINS as f64;
    assert!(report.supports.is_empty());
    assert!(!report.resistances.is_empty());
    for level in &report.resistances {
        assert!(level.price > 0.01 && level.price < 10_000.0);
        // Centres sit on the capped grid
        let slot = (level.price - 0.01) / width - 0.5;
        assert!((slot - slot.round()).abs() < 1e-6);
    }
}

// ============================================================
// CANDLES & DIVERGENCE
// ============================================================

#[test]
fn test_candle_scan_needs_three_bars() {
    let err = scan_latest(&closes_only(&[1.0, 2.0])).unwrap_err();
    assert_eq!(err, AnalysisError::InsufficientData { need: 3, got: 2 });
}

#[test]
fn test_candle_scan_reports_doji() {
    let mut bars: Vec<PriceBar> = (0..5).map(|i| bar(i, 100.0 - i as f64, 101.0 - i as f64, 98.0 - i as f64, 99.0 - i as f64)).collect();
    bars.push(bar(5, 95.0, 98.0, 92.0, 95.0));
    let report = scan_latest(&PriceSeries::new(bars).unwrap()).unwrap();
    assert!(report.patterns.iter().any(|m| m.pattern.0 == "DOJI"));
    assert!(report.most_significant.is_some());
}

#[test]
fn test_divergence_needs_two_lookbacks() {
    let s = closes_only(&[100.0; 30]);
    let err = detect_divergences(&s, &IndicatorFrame::compute(&s), &DivergenceParams::default()).unwrap_err();
    assert_eq!(err, AnalysisError::InsufficientData { need: 40, got: 30 });
}

// ============================================================
// TIME ZONES
// ============================================================

#[test]
fn test_time_zones_project_from_swing_low() {
    // Lows fall to 60 at bar 60 and recover; 100 bars in total
    let bars = (0..100)
        .map(|i| {
            let low = 60.0 + (i as f64 - 60.0).abs();
            bar(i, low + 1.0, low + 2.0, low, low + 1.0)
        })
        .collect();
    let report = fibonacci_time_zones(&PriceSeries::new(bars).unwrap()).unwrap();
    assert_eq!(report.anchor_index, 60);
    assert_eq!(report.anchor_timestamp, 60 * DAY);

    let past: Vec<usize> = report
        .zones
        .iter()
        .filter_map(|z| match z {
            FibTimeZone::Past { index, .. } => Some(*index),
            FibTimeZone::Future { .. } => None,
        })
        .collect();
    assert_eq!(past, [68, 73, 81, 94]);
    match report.next_zone {
        Some(FibTimeZone::Future { offset, bars_ahead, timestamp }) => {
            assert_eq!(offset, 55);
            assert_eq!(bars_ahead, 16);
            assert_eq!(timestamp, 99 * DAY + 16 * DAY);
        },
        other => panic!("expected a future zone, got {other:?}"),
    }
}

#[test]
fn test_time_zones_need_sixty_bars() {
    let s = closes_only(&[100.0; 59]);
    assert_eq!(fibonacci_time_zones(&s), Err(AnalysisError::InsufficientData { need: 60, got: 59 }));
}

// ============================================================
// WAVES
// ============================================================

#[test]
fn test_elliott_count_keeps_last_five_swings() {
    // Triangle wave: peaks at 10, 30, 50, 70, 90 and troughs in between
    let closes: Vec<f64> = (0..100).map(|i| 100.0 + (10 - (i % 20 - 10i32).abs()) as f64).collect();
    let count = elliott_waves(&closes_only(&closes)).unwrap();
    assert_eq!(count.waves_detected, 5);
    assert!(count.alternating);
    let idx: Vec<usize> = count.swings.iter().map(|s| s.index).collect();
    assert_eq!(idx, [50, 60, 70, 80, 90]);
    assert_eq!(count.swings[0].kind, SwingKind::High);
    assert_eq!(count.swings[1].price, 100.0);
}

#[test]
fn test_wyckoff_markdown_and_absorption() {
    let ranged = |closes: &[f64], volumes: &[f64]| {
        let bars = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&c, &v))| PriceBar::new(i as i64 * DAY, c, c + 2.0, c - 2.0, c, v))
            .collect();
        PriceSeries::new(bars).unwrap()
    };

    let mut closes = vec![100.0; 30];
    closes[29] = 90.0;
    let mut volumes = vec![100.0; 30];
    volumes[29] = 400.0;
    let report = wyckoff_phase(&ranged(&closes, &volumes)).unwrap();
    assert_eq!(report.phase, WyckoffPhase::Markdown);
    assert_eq!(report.signal, WyckoffSignal::Bearish);

    // Heavy volume two bars ago that failed to move price
    let mut volumes = vec![100.0; 30];
    volumes[27] = 400.0;
    let report = wyckoff_phase(&ranged(&[100.0; 30], &volumes)).unwrap();
    assert!(report.high_effort_low_result);
    assert_eq!(report.phase, WyckoffPhase::DistributionOrAccumulation);
    assert_eq!(report.signal, WyckoffSignal::Caution);
    assert!(report.spring_detected);
}

#[test]
fn test_wyckoff_needs_volume() {
    let s = closes_only(&[100.0; 30]);
    let mut bars = s.bars().to_vec();
    bars.iter_mut().for_each(|b| b.volume = 0.0);
    let s = PriceSeries::new(bars).unwrap();
    assert!(matches!(wyckoff_phase(&s), Err(AnalysisError::Undefined(_))));
}
