//! Integration tests for composite scores and trade planning.

use coinsight::indicators::IndicatorFrame;
use coinsight::prelude::{PriceBar, PriceSeries};
use coinsight::scoring::{
    consensus_recommendation, entry_checklist, multi_indicator_consensus, multi_timeframe_alignment,
    position_sizing, reversal_probability, risk_reward_matrix, technical_score, technical_setups, trade_plan,
    trend_alignment, AlignmentSignal, PositionSizingParams, Recommendation, SetupBias, SetupKind, TradeQuality,
    TradeSide, Vote, VoteTally,
};

fn series(closes: &[f64]) -> PriceSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar::new(i as i64 * 86_400, c, c * 1.01, c * 0.99, c, 1_000.0))
        .collect();
    PriceSeries::new(bars).unwrap()
}

fn with_volumes(closes: &[f64], volumes: &[f64]) -> PriceSeries {
    let bars = closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&c, &v))| PriceBar::new(i as i64 * 86_400, c, c, c, c, v))
        .collect();
    PriceSeries::new(bars).unwrap()
}

fn uptrend(n: usize) -> PriceSeries {
    series(&(0..n).map(|i| 100.0 + i as f64).collect::<Vec<_>>())
}

fn downtrend(n: usize) -> PriceSeries {
    series(&(0..n).map(|i| 400.0 - i as f64).collect::<Vec<_>>())
}

// ============================================================
// TECHNICAL SCORE
// ============================================================

#[test]
fn test_flat_series_scores_fifty() {
    let s = series(&[100.0; 300]);
    let score = technical_score(&s, &IndicatorFrame::compute(&s)).unwrap();
    assert_eq!(score.score, 50.0);
    assert_eq!(score.recommendation, Recommendation::Neutral);
    assert!(score.component("RSI").is_none());
}

#[test]
fn test_score_stays_in_bounds() {
    for s in [uptrend(250), downtrend(250), series(&[100.0; 5])] {
        let score = technical_score(&s, &IndicatorFrame::compute(&s)).unwrap();
        assert!((0.0..=100.0).contains(&score.score));
    }
}

// ============================================================
// CONSENSUS
// ============================================================

#[test]
fn test_consensus_score_monotone_in_buy_votes() {
    let mut previous = f64::NEG_INFINITY;
    for buy in 0..10 {
        let score = VoteTally::new(buy, 3, 2).score();
        assert!((-100.0..=100.0).contains(&score));
        assert!(score > previous);
        previous = score;
    }
}

#[test]
fn test_consensus_tally_matches_signals() {
    let s = downtrend(120);
    let report = multi_indicator_consensus(&s, &IndicatorFrame::compute(&s)).unwrap();
    let weights: u32 = report.signals.iter().map(|sig| sig.weight).sum();
    assert_eq!(report.tally.total(), weights);
    let sma = report.signals.iter().find(|sig| sig.indicator == "SMA").unwrap();
    assert_eq!(sma.vote, Vote::Sell);
    assert!(report.score < 0.0);
    assert!(report.recommendation.is_sell() || report.recommendation == Recommendation::Hold);
}

#[test]
fn test_consensus_recommendation_bands() {
    assert_eq!(consensus_recommendation(41.0), Recommendation::StrongBuy);
    assert_eq!(consensus_recommendation(20.0), Recommendation::Buy);
    assert_eq!(consensus_recommendation(0.0), Recommendation::Hold);
    assert_eq!(consensus_recommendation(-20.0), Recommendation::Sell);
    assert_eq!(consensus_recommendation(-41.0), Recommendation::StrongSell);
}

#[test]
fn test_consensus_report_serializes_labels() {
    let s = uptrend(60);
    let report = multi_indicator_consensus(&s, &IndicatorFrame::compute(&s)).unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"indicator\":\"SMA\""));
    assert!(json.contains("BUY"));
}

// ============================================================
// ALIGNMENT, REVERSAL, CHECKLIST
// ============================================================

#[test]
fn test_uptrend_is_aligned() {
    let s = uptrend(250);
    let report = trend_alignment(&s, &IndicatorFrame::compute(&s)).unwrap();
    assert_eq!(report.signal, AlignmentSignal::StrongBullish);
    assert_eq!(report.aligned, report.total);
}

#[test]
fn test_reversal_probability_bounded() {
    for s in [uptrend(300), downtrend(300), series(&[100.0; 300])] {
        let report = reversal_probability(&s, &IndicatorFrame::compute(&s)).unwrap();
        assert!((5.0..=95.0).contains(&report.probability));
    }
}

#[test]
fn test_checklist_counts() {
    let s = uptrend(120);
    let list = entry_checklist(&s, &IndicatorFrame::compute(&s)).unwrap();
    assert_eq!(list.total, list.checks.len());
    assert!(list.passed <= list.total);
}

#[test]
fn test_trade_plan_direction_follows_trend() {
    let up = uptrend(80);
    let plan = trade_plan(&up, &IndicatorFrame::compute(&up)).unwrap();
    assert_eq!(plan.side, TradeSide::Long);
    assert!(plan.stop_loss < plan.current_price);
    assert!(plan.target_1 > plan.current_price && plan.target_2 > plan.target_1);

    let down = downtrend(80);
    let plan = trade_plan(&down, &IndicatorFrame::compute(&down)).unwrap();
    assert_eq!(plan.side, TradeSide::Short);
    assert!(plan.stop_loss > plan.current_price);
}

// ============================================================
// POSITION SIZING
// ============================================================

#[test]
fn test_position_size_risks_two_percent() {
    let s = uptrend(30);
    let size = position_sizing(&s, &IndicatorFrame::compute(&s), &PositionSizingParams::default()).unwrap();
    assert_eq!(size.current_price, 129.0);
    assert_eq!(size.risk_amount, 200.0);
    // 2% risk at a 5% stop commits 40% of the account
    assert!((size.position_value - 4_000.0).abs() < 1e-9);
    assert!((size.position_percent - 40.0).abs() < 1e-9);
    assert!((size.units * (size.current_price - size.stop_loss_price) - 200.0).abs() < 1e-9);
    let profits: Vec<f64> = size.scenarios.iter().map(|s| s.potential_profit).collect();
    assert_eq!(profits, [200.0, 400.0, 600.0]);
    assert_eq!(size.scenarios[1].target_percent, 10.0);
    assert!(size.atr_stop.is_some_and(|stop| stop < size.current_price));
}

#[test]
fn test_position_sizing_params_from_json_are_checked() {
    let params: PositionSizingParams =
        serde_json::from_str(r#"{"account_size":5000.0,"risk_percent":1.0,"stop_loss_percent":2.5}"#).unwrap();
    assert_eq!(params.account_size, 5_000.0);
    let bad = r#"{"account_size":5000.0,"risk_percent":0.0,"stop_loss_percent":2.5}"#;
    assert!(serde_json::from_str::<PositionSizingParams>(bad).is_err());
}

#[test]
fn test_risk_reward_matrix_grid() {
    let matrix = risk_reward_matrix(&series(&[100.0; 3])).unwrap();
    assert_eq!(matrix.rows.len(), 5);
    assert!(matrix.rows.iter().all(|row| row.len() == 6));

    let tight_far = matrix.rows[0][5];
    assert_eq!((tight_far.stop_percent, tight_far.target_percent), (2.0, 30.0));
    assert_eq!(tight_far.risk_reward, 15.0);
    assert_eq!(tight_far.quality, TradeQuality::Excellent);

    let even = matrix.rows[2][0];
    assert_eq!(even.risk_reward, 1.0);
    assert_eq!(even.quality, TradeQuality::Fair);
    assert_eq!(matrix.rows[3][1].risk_reward, 1.43);

    let wide_near = matrix.rows[4][0];
    assert_eq!(wide_near.quality, TradeQuality::Poor);
    assert!((wide_near.stop_price - 90.0).abs() < 1e-9);
    assert!((wide_near.target_price - 105.0).abs() < 1e-9);
}

// ============================================================
// SETUPS
// ============================================================

#[test]
fn test_golden_and_death_cross_on_last_bar() {
    let mut closes = vec![100.0; 200];
    closes.push(102.0);
    let s = series(&closes);
    let report = technical_setups(&s, &IndicatorFrame::compute(&s)).unwrap();
    let golden = report.setups.iter().find(|x| x.kind == SetupKind::GoldenCross).unwrap();
    assert_eq!(golden.bias, SetupBias::Bullish);
    assert_eq!(golden.confidence, 85);
    assert!(report.bullish_count >= 1);

    *closes.last_mut().unwrap() = 98.0;
    let s = series(&closes);
    let report = technical_setups(&s, &IndicatorFrame::compute(&s)).unwrap();
    assert!(report.setups.iter().any(|x| x.kind == SetupKind::DeathCross));
    assert!(report.setups.iter().all(|x| x.kind != SetupKind::GoldenCross));
}

#[test]
fn test_volume_spike_alone_on_flat_tape() {
    let mut volumes = vec![1_000.0; 60];
    volumes[59] = 5_000.0;
    let s = with_volumes(&[100.0; 60], &volumes);
    let report = technical_setups(&s, &IndicatorFrame::compute(&s)).unwrap();
    assert_eq!(report.total_setups(), 1);
    assert_eq!(report.setups[0].kind, SetupKind::VolumeSpike);
    assert_eq!(report.setups[0].bias, SetupBias::Attention);
    assert_eq!((report.bullish_count, report.bearish_count), (0, 0));
}

// ============================================================
// MULTI-TIMEFRAME
// ============================================================

#[test]
fn test_multi_timeframe_share() {
    let (hourly, daily, weekly) = (uptrend(60), downtrend(60), uptrend(20));
    let report = multi_timeframe_alignment(&[("1h", &hourly), ("1d", &daily), ("1w", &weekly)]).unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.aligned, 1);
    assert_eq!(report.score, 50.0);
    assert_eq!(report.signal, AlignmentSignal::Bullish);
    assert_eq!(report.skipped, ["1w"]);
    assert!(report.timeframes[0].aligned && !report.timeframes[1].bullish_trend);
}
