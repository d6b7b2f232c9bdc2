//! Entry checklist and position planning.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::detectors::helpers::{percent_from, round_to};
use crate::indicators::IndicatorFrame;
use crate::math::back;
use crate::params::{get_amount, impl_validated_serde, ParamMeta, Parameterized};
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

/// Bars in the recent range used for support, resistance and stops
const RANGE_WINDOW: usize = 20;

// ============================================================
// ENTRY CHECKLIST
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "FAIL")]
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistItem {
    pub check: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryDecision {
    #[serde(rename = "GO")]
    Go,
    #[serde(rename = "GO WITH CAUTION")]
    GoWithCaution,
    #[serde(rename = "NO GO")]
    NoGo,
}

impl EntryDecision {
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 70.0 {
            Self::Go
        } else if percent >= 50.0 {
            Self::GoWithCaution
        } else {
            Self::NoGo
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryChecklist {
    pub checks: Vec<ChecklistItem>,
    pub passed: usize,
    pub total: usize,
    pub score_percent: f64,
    pub decision: EntryDecision,
}

fn item(check: &'static str, status: CheckStatus, detail: String) -> ChecklistItem {
    ChecklistItem { check, status, detail }
}

/// Pre-trade checks on trend, momentum, volume, RSI and room to the recent range.
pub fn entry_checklist(series: &PriceSeries, frame: &IndicatorFrame) -> Result<EntryChecklist> {
    AnalysisError::require(1, series.len())?;
    let bars = series.bars();
    let last = bars[bars.len() - 1];
    let price = last.close;
    let recent = &bars[bars.len().saturating_sub(RANGE_WINDOW)..];
    let mut checks = Vec::with_capacity(6);

    if let (Some(s20), Some(s50)) = (back(&frame.sma_20, 0), back(&frame.sma_50, 0)) {
        checks.push(if s20 > s50 {
            item("Trend", CheckStatus::Pass, "Bullish (SMA20 > SMA50)".into())
        } else {
            item("Trend", CheckStatus::Fail, "Bearish (SMA20 <= SMA50)".into())
        });
    }

    if let Some(start) = series.close_back(RANGE_WINDOW - 1) {
        let momentum = percent_from(start, price);
        checks.push(if momentum > 0.0 {
            item("Momentum", CheckStatus::Pass, format!("Positive (+{momentum:.1}%)"))
        } else {
            item("Momentum", CheckStatus::Fail, format!("Negative ({momentum:.1}%)"))
        });
    }

    if let Some(avg) = back(&frame.volume_sma, 0) {
        checks.push(if last.volume > avg {
            item("Volume", CheckStatus::Pass, "Above average".into())
        } else {
            item("Volume", CheckStatus::Warning, "Below average".into())
        });
    }

    if let Some(rsi) = back(&frame.rsi, 0) {
        checks.push(if rsi > 30.0 && rsi < 70.0 {
            item("RSI", CheckStatus::Pass, format!("Neutral ({rsi:.1})"))
        } else if rsi >= 70.0 {
            item("RSI", CheckStatus::Warning, format!("Overbought ({rsi:.1})"))
        } else {
            item("RSI", CheckStatus::Warning, format!("Oversold ({rsi:.1})"))
        });
    }

    let recent_low = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let to_support = (price - recent_low) / price * 100.0;
    checks.push(if to_support < 10.0 {
        item("Support", CheckStatus::Pass, format!("Nearby at {recent_low} (-{to_support:.1}%)"))
    } else {
        item("Support", CheckStatus::Warning, format!("Far at {recent_low} (-{to_support:.1}%)"))
    });

    let recent_high = recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let to_resistance = (recent_high - price) / price * 100.0;
    checks.push(if to_resistance > 5.0 {
        item("Resistance", CheckStatus::Pass, format!("Room to {recent_high} (+{to_resistance:.1}%)"))
    } else {
        item("Resistance", CheckStatus::Fail, format!("Too close at {recent_high} (+{to_resistance:.1}%)"))
    });

    let passed = checks.iter().filter(|c| c.status == CheckStatus::Pass).count();
    let total = checks.len();
    let score_percent = round_to(passed as f64 / total as f64 * 100.0, 1);

    Ok(EntryChecklist {
        checks,
        passed,
        total,
        score_percent,
        decision: EntryDecision::from_percent(score_percent),
    })
}

// ============================================================
// TRADE PLANNER
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeSide {
    #[serde(rename = "LONG")]
    Long,
    #[serde(rename = "SHORT")]
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradePlan {
    pub side: TradeSide,
    pub current_price: f64,
    pub entry_low: f64,
    pub entry_high: f64,
    pub stop_loss: f64,
    /// 1.5R
    pub target_1: f64,
    /// 2.5R
    pub target_2: f64,
    pub risk: f64,
    pub reward_1: f64,
    pub reward_2: f64,
    /// Reward over risk, two decimals; 0 when risk is 0
    pub risk_reward_1: f64,
    pub risk_reward_2: f64,
    pub atr: Option<f64>,
}

fn reward_ratio(reward: f64, risk: f64) -> f64 {
    if risk > 0.0 {
        round_to(reward / risk, 2)
    } else {
        0.0
    }
}

/// Long when SMA20 is above SMA50 (SMA20 stands in for a missing SMA50),
/// short otherwise. Stops sit 2% beyond the 20-bar range.
pub fn trade_plan(series: &PriceSeries, frame: &IndicatorFrame) -> Result<TradePlan> {
    AnalysisError::require(RANGE_WINDOW, series.len())?;
    let bars = series.bars();
    let price = bars[bars.len() - 1].close;
    let recent = &bars[bars.len() - RANGE_WINDOW..];
    let recent_low = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let recent_high = recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);

    let sma_20 = back(&frame.sma_20, 0).ok_or(AnalysisError::Undefined("SMA20"))?;
    let sma_50 = back(&frame.sma_50, 0).unwrap_or(sma_20);

    let (side, entry_low, entry_high, stop_loss) = if sma_20 > sma_50 {
        (TradeSide::Long, recent_low * 1.01, price, recent_low * 0.98)
    } else {
        (TradeSide::Short, price, recent_high * 0.99, recent_high * 1.02)
    };
    let step = price - stop_loss;
    let target_1 = price + step * 1.5;
    let target_2 = price + step * 2.5;

    let risk = step.abs();
    let reward_1 = (target_1 - price).abs();
    let reward_2 = (target_2 - price).abs();

    Ok(TradePlan {
        side,
        current_price: price,
        entry_low,
        entry_high,
        stop_loss,
        target_1,
        target_2,
        risk,
        reward_1,
        reward_2,
        risk_reward_1: reward_ratio(reward_1, risk),
        risk_reward_2: reward_ratio(reward_2, risk),
        atr: back(&frame.atr, 0),
    })
}

// ============================================================
// SWING SETUP
// ============================================================

pub const SWING_MIN_BARS: usize = 50;
const SWING_WINDOW: usize = 10;
const SWING_VALIDITY_BARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetupConfidence {
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "MODERATE")]
    Moderate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SwingSetup {
    pub side: TradeSide,
    pub entry: f64,
    pub stop_loss: f64,
    /// 2R
    pub take_profit: f64,
    pub risk: f64,
    pub reward: f64,
    pub risk_reward: f64,
    pub validity_bars: usize,
    pub confidence: SetupConfidence,
}

/// Pullback inside an established trend with RSI in the 40-60 band.
/// Undefined RSI reads as 50. `Ok(None)` when no setup is present.
pub fn swing_setup(series: &PriceSeries, frame: &IndicatorFrame) -> Result<Option<SwingSetup>> {
    AnalysisError::require(SWING_MIN_BARS, series.len())?;
    let bars = series.bars();
    let price = bars[bars.len() - 1].close;
    let (Some(sma_20), Some(sma_50)) = (back(&frame.sma_20, 0), back(&frame.sma_50, 0)) else {
        return Err(AnalysisError::Undefined("SMA20/SMA50"));
    };
    let rsi = back(&frame.rsi, 0).unwrap_or(50.0);
    let recent = &bars[bars.len() - SWING_WINDOW..];
    let recent_low = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let recent_high = recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let neutral_rsi = rsi > 40.0 && rsi < 60.0;

    let (side, stop_loss, confidence) =
        if price > sma_20 && sma_20 > sma_50 && neutral_rsi && price < recent_high * 0.98 {
            let confidence = if rsi < 50.0 { SetupConfidence::High } else { SetupConfidence::Moderate };
            (TradeSide::Long, recent_low * 0.98, confidence)
        } else if price < sma_20 && sma_20 < sma_50 && neutral_rsi && price > recent_low * 1.02 {
            let confidence = if rsi > 50.0 { SetupConfidence::High } else { SetupConfidence::Moderate };
            (TradeSide::Short, recent_high * 1.02, confidence)
        } else {
            return Ok(None);
        };

    let risk = (price - stop_loss).abs();
    let take_profit = price + (price - stop_loss) * 2.0;
    let reward = (take_profit - price).abs();

    Ok(Some(SwingSetup {
        side,
        entry: price,
        stop_loss,
        take_profit,
        risk,
        reward,
        risk_reward: reward_ratio(reward, risk),
        validity_bars: SWING_VALIDITY_BARS,
        confidence,
    }))
}

// ============================================================
// POSITION SIZING
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct PositionSizingParams {
    /// Account equity in quote currency
    pub account_size: f64,
    /// Share of the account lost if the stop is hit, percent
    pub risk_percent: f64,
    /// Stop distance below the entry, percent of price
    pub stop_loss_percent: f64,
}

impl Default for PositionSizingParams {
    fn default() -> Self {
        Self {
            account_size: 10_000.0,
            risk_percent: 2.0,
            stop_loss_percent: 5.0,
        }
    }
}

const POSITION_PARAMS: &[ParamMeta] = &[
    ParamMeta::amount("account_size", 10_000.0, (1.0, 1e12, 1_000.0), "Account equity"),
    ParamMeta::amount("risk_percent", 2.0, (0.1, 100.0, 0.5), "Account share at risk per trade"),
    ParamMeta::amount("stop_loss_percent", 5.0, (0.1, 99.0, 0.5), "Stop distance from entry"),
];

impl Parameterized for PositionSizingParams {
    fn param_meta() -> &'static [ParamMeta] {
        POSITION_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let p = Self {
            account_size: get_amount(params, "account_size", 10_000.0)?,
            risk_percent: get_amount(params, "risk_percent", 2.0)?,
            stop_loss_percent: get_amount(params, "stop_loss_percent", 5.0)?,
        };
        p.validate()?;
        Ok(p)
    }

    fn param_values(&self) -> Vec<f64> {
        vec![self.account_size, self.risk_percent, self.stop_loss_percent]
    }
}

impl_validated_serde!(PositionSizingParams);

/// Reward multiples of the risked amount shown with every position size
const SIZING_MULTIPLES: [u32; 3] = [1, 2, 3];
/// ATR multiple for the volatility stop suggestion
const ATR_STOP_MULTIPLE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizingScenario {
    /// Reward as a multiple of risk (`1:n`)
    pub multiple: u32,
    pub target_price: f64,
    pub target_percent: f64,
    pub potential_profit: f64,
    /// Profit as a percentage of the account
    pub potential_profit_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSize {
    pub current_price: f64,
    pub risk_amount: f64,
    pub stop_loss_price: f64,
    /// Units to buy so that hitting the stop loses exactly `risk_amount`
    pub units: f64,
    pub position_value: f64,
    pub position_percent: f64,
    pub scenarios: Vec<SizingScenario>,
    /// Price two ATRs below the last close; `None` while ATR warms up
    pub atr_stop: Option<f64>,
    pub atr_stop_percent: Option<f64>,
    pub params: PositionSizingParams,
}

/// Long position size that risks `risk_percent` of the account at a fixed
/// percentage stop.
pub fn position_sizing(
    series: &PriceSeries,
    frame: &IndicatorFrame,
    params: &PositionSizingParams,
) -> Result<PositionSize> {
    params.validate()?;
    let price = series.last().ok_or(AnalysisError::InsufficientData { need: 1, got: 0 })?.close;

    let risk_amount = params.account_size * params.risk_percent / 100.0;
    let stop_distance = price * params.stop_loss_percent / 100.0;
    let units = risk_amount / stop_distance;
    let position_value = units * price;

    let scenarios = SIZING_MULTIPLES
        .iter()
        .map(|&multiple| {
            let target_percent = params.stop_loss_percent * multiple as f64;
            let potential_profit = risk_amount * multiple as f64;
            SizingScenario {
                multiple,
                target_price: price * (1.0 + target_percent / 100.0),
                target_percent,
                potential_profit,
                potential_profit_percent: potential_profit / params.account_size * 100.0,
            }
        })
        .collect();

    let atr_distance = back(&frame.atr, 0).map(|atr| atr * ATR_STOP_MULTIPLE);

    Ok(PositionSize {
        current_price: price,
        risk_amount,
        stop_loss_price: price - stop_distance,
        units,
        position_value,
        position_percent: position_value / params.account_size * 100.0,
        scenarios,
        atr_stop: atr_distance.map(|d| price - d),
        atr_stop_percent: atr_distance.map(|d| round_to(d / price * 100.0, 2)),
        params: *params,
    })
}

// ============================================================
// RISK / REWARD MATRIX
// ============================================================

pub const MATRIX_STOP_PERCENTS: [f64; 5] = [2.0, 3.0, 5.0, 7.0, 10.0];
pub const MATRIX_TARGET_PERCENTS: [f64; 6] = [5.0, 10.0, 15.0, 20.0, 25.0, 30.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeQuality {
    #[serde(rename = "EXCELLENT")]
    Excellent,
    #[serde(rename = "GOOD")]
    Good,
    #[serde(rename = "FAIR")]
    Fair,
    #[serde(rename = "POOR")]
    Poor,
}

impl TradeQuality {
    pub fn from_ratio(risk_reward: f64) -> Self {
        if risk_reward >= 3.0 {
            Self::Excellent
        } else if risk_reward >= 2.0 {
            Self::Good
        } else if risk_reward >= 1.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskRewardCell {
    pub stop_percent: f64,
    pub target_percent: f64,
    pub risk_reward: f64,
    pub quality: TradeQuality,
    pub stop_price: f64,
    pub target_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskRewardMatrix {
    pub current_price: f64,
    /// One row per stop in `MATRIX_STOP_PERCENTS`, one column per target
    pub rows: Vec<Vec<RiskRewardCell>>,
}

/// Long stop/target grid around the last close.
pub fn risk_reward_matrix(series: &PriceSeries) -> Result<RiskRewardMatrix> {
    let price = series.last().ok_or(AnalysisError::InsufficientData { need: 1, got: 0 })?.close;
    let rows = MATRIX_STOP_PERCENTS
        .iter()
        .map(|&stop| {
            MATRIX_TARGET_PERCENTS
                .iter()
                .map(|&target| {
                    let ratio = target / stop;
                    RiskRewardCell {
                        stop_percent: stop,
                        target_percent: target,
                        risk_reward: round_to(ratio, 2),
                        quality: TradeQuality::from_ratio(ratio),
                        stop_price: price * (1.0 - stop / 100.0),
                        target_price: price * (1.0 + target / 100.0),
                    }
                })
                .collect()
        })
        .collect();
    Ok(RiskRewardMatrix {
        current_price: price,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PriceBar;

    fn series_from(closes: &[f64], volumes: &[f64]) -> PriceSeries {
        let bars = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&c, &v))| PriceBar::new(i as i64 * 86_400, c, c * 1.01, c * 0.99, c, v))
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    fn uptrend(n: usize) -> PriceSeries {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        series_from(&closes, &vec![1_000.0; n])
    }

    #[test]
    fn test_decision_bands() {
        assert_eq!(EntryDecision::from_percent(70.0), EntryDecision::Go);
        assert_eq!(EntryDecision::from_percent(50.0), EntryDecision::GoWithCaution);
        assert_eq!(EntryDecision::from_percent(49.9), EntryDecision::NoGo);
    }

    #[test]
    fn test_checklist_on_uptrend() {
        let s = uptrend(60);
        let frame = IndicatorFrame::compute(&s);
        let list = entry_checklist(&s, &frame).unwrap();
        assert_eq!(list.total, 6);
        let status = |name: &str| list.checks.iter().find(|c| c.check == name).unwrap().status;
        assert_eq!(status("Trend"), CheckStatus::Pass);
        assert_eq!(status("Momentum"), CheckStatus::Pass);
        assert_eq!(status("Volume"), CheckStatus::Warning);
        assert_eq!(status("RSI"), CheckStatus::Warning);
        assert_eq!(status("Resistance"), CheckStatus::Fail);
        assert_eq!(list.passed, list.checks.iter().filter(|c| c.status == CheckStatus::Pass).count());
    }

    #[test]
    fn test_checklist_skips_undefined_inputs() {
        let s = uptrend(5);
        let frame = IndicatorFrame::compute(&s);
        let list = entry_checklist(&s, &frame).unwrap();
        let names: Vec<_> = list.checks.iter().map(|c| c.check).collect();
        assert_eq!(names, vec!["Support", "Resistance"]);
    }

    #[test]
    fn test_long_plan_targets() {
        let s = uptrend(60);
        let frame = IndicatorFrame::compute(&s);
        let plan = trade_plan(&s, &frame).unwrap();
        assert_eq!(plan.side, TradeSide::Long);
        assert!(plan.stop_loss < plan.current_price);
        assert!(plan.target_1 > plan.current_price);
        assert!(plan.target_2 > plan.target_1);
        assert_eq!(plan.risk_reward_1, 1.5);
        assert_eq!(plan.risk_reward_2, 2.5);
        assert!(plan.atr.is_some());
    }

    #[test]
    fn test_short_plan_on_downtrend() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let s = series_from(&closes, &[1_000.0; 60]);
        let plan = trade_plan(&s, &IndicatorFrame::compute(&s)).unwrap();
        assert_eq!(plan.side, TradeSide::Short);
        assert!(plan.stop_loss > plan.current_price);
        assert!(plan.target_1 < plan.current_price);
    }

    #[test]
    fn test_plan_needs_twenty_bars() {
        let s = uptrend(19);
        assert!(trade_plan(&s, &IndicatorFrame::compute(&s)).is_err());
    }

    #[test]
    fn test_quality_bands() {
        assert_eq!(TradeQuality::from_ratio(3.0), TradeQuality::Excellent);
        assert_eq!(TradeQuality::from_ratio(2.5), TradeQuality::Good);
        assert_eq!(TradeQuality::from_ratio(1.0), TradeQuality::Fair);
        assert_eq!(TradeQuality::from_ratio(0.7), TradeQuality::Poor);
    }

    #[test]
    fn test_sizing_rejects_out_of_range_risk() {
        let s = uptrend(30);
        let params = PositionSizingParams {
            risk_percent: 150.0,
            ..Default::default()
        };
        assert!(matches!(
            position_sizing(&s, &IndicatorFrame::compute(&s), &params),
            Err(AnalysisError::OutOfRange { field: "risk_percent", .. })
        ));
    }

    #[test]
    fn test_no_swing_setup_when_overbought() {
        let s = uptrend(60);
        let frame = IndicatorFrame::compute(&s);
        assert_eq!(swing_setup(&s, &frame).unwrap(), None);
    }

    #[test]
    fn test_bullish_swing_setup_on_pullback() {
        // steady advance, then a pullback that keeps price above SMA20
        let mut closes: Vec<f64> = (0..55).map(|i| 100.0 + i as f64).collect();
        closes.extend([153.5, 152.5, 153.0, 152.0, 152.5, 151.5, 152.0, 151.0, 151.5, 151.0]);
        let s = series_from(&closes, &vec![1_000.0; closes.len()]);
        let frame = IndicatorFrame::compute(&s);
        let rsi = back(&frame.rsi, 0).unwrap();
        let s20 = back(&frame.sma_20, 0).unwrap();
        assert!(rsi > 40.0 && rsi < 60.0, "rsi = {rsi}");
        assert!(151.0 > s20, "sma20 = {s20}");

        let setup = swing_setup(&s, &frame).unwrap().unwrap();
        assert_eq!(setup.side, TradeSide::Long);
        assert_eq!(setup.risk_reward, 2.0);
        assert_eq!(setup.validity_bars, 3);
    }
}
