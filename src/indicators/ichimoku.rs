//! Ichimoku cloud lines and a summary signal.

use serde::Serialize;

use crate::math::{back, rolling_max, rolling_min};
use crate::series::PriceSeries;
use crate::{AnalysisError, Result, Series};

pub const TENKAN_PERIOD: usize = 9;
pub const KIJUN_PERIOD: usize = 26;
pub const SENKOU_B_PERIOD: usize = 52;
/// Forward shift of both leading spans
pub const DISPLACEMENT: usize = 26;
const HISTORY_POINTS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IchimokuLines {
    pub tenkan: Series,
    pub kijun: Series,
    pub senkou_a: Series,
    pub senkou_b: Series,
    /// Close shifted back by the displacement; undefined for the final bars
    pub chikou: Series,
}

fn midpoint(highs: &[f64], lows: &[f64], period: usize) -> Series {
    rolling_max(highs, period)
        .into_iter()
        .zip(rolling_min(lows, period))
        .map(|(h, l)| Some((h? + l?) / 2.0))
        .collect()
}

fn shift_forward(values: &Series, by: usize) -> Series {
    let n = values.len();
    (0..n).map(|i| if i >= by { values[i - by] } else { None }).collect()
}

pub fn ichimoku_lines(series: &PriceSeries) -> IchimokuLines {
    let highs = series.highs();
    let lows = series.lows();
    let closes = series.closes();
    let n = closes.len();

    let tenkan = midpoint(&highs, &lows, TENKAN_PERIOD);
    let kijun = midpoint(&highs, &lows, KIJUN_PERIOD);
    let base_a: Series = tenkan
        .iter()
        .zip(&kijun)
        .map(|(t, k)| Some(((*t)? + (*k)?) / 2.0))
        .collect();
    let senkou_a = shift_forward(&base_a, DISPLACEMENT);
    let senkou_b = shift_forward(&midpoint(&highs, &lows, SENKOU_B_PERIOD), DISPLACEMENT);
    let chikou = (0..n).map(|i| closes.get(i + DISPLACEMENT).copied()).collect();

    IchimokuLines {
        tenkan,
        kijun,
        senkou_a,
        senkou_b,
        chikou,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IchimokuSignal {
    StrongBuy,
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IchimokuPoint {
    pub timestamp: i64,
    pub price: f64,
    pub tenkan: f64,
    pub kijun: Option<f64>,
    pub span_a: Option<f64>,
    pub span_b: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IchimokuReport {
    pub current_price: f64,
    pub tenkan_sen: Option<f64>,
    pub kijun_sen: Option<f64>,
    pub senkou_span_a: Option<f64>,
    pub senkou_span_b: Option<f64>,
    pub tk_cross_bullish: bool,
    pub price_above_cloud: bool,
    pub cloud_bullish: bool,
    pub signal: IchimokuSignal,
    /// Number of bullish conditions, 0..=3
    pub strength: u8,
    pub history: Vec<IchimokuPoint>,
}

/// Summarize the cloud at the last bar. Needs the full span-B window.
pub fn ichimoku(series: &PriceSeries) -> Result<IchimokuReport> {
    AnalysisError::require(SENKOU_B_PERIOD, series.len())?;
    let lines = ichimoku_lines(series);
    let current_price = series.last().map(|b| b.close).ok_or(AnalysisError::InsufficientData {
        need: SENKOU_B_PERIOD,
        got: 0,
    })?;

    let tenkan = back(&lines.tenkan, 0);
    let kijun = back(&lines.kijun, 0);
    let span_a = back(&lines.senkou_a, 0);
    let span_b = back(&lines.senkou_b, 0);

    let tk_cross_bullish = matches!((tenkan, kijun), (Some(t), Some(k)) if t > k);
    let (price_above_cloud, cloud_bullish) = match (span_a, span_b) {
        (Some(a), Some(b)) => (current_price > a.max(b), a > b),
        _ => (false, false),
    };
    let strength = [tk_cross_bullish, price_above_cloud, cloud_bullish]
        .iter()
        .filter(|b| **b)
        .count() as u8;
    let signal = match strength {
        0 => IchimokuSignal::Sell,
        1 => IchimokuSignal::Buy,
        _ => IchimokuSignal::StrongBuy,
    };

    let bars = series.bars();
    let start = bars.len().saturating_sub(HISTORY_POINTS);
    let history = (start..bars.len())
        .filter_map(|i| {
            Some(IchimokuPoint {
                timestamp: bars[i].timestamp,
                price: bars[i].close,
                tenkan: lines.tenkan[i]?,
                kijun: lines.kijun[i],
                span_a: lines.senkou_a[i],
                span_b: lines.senkou_b[i],
            })
        })
        .collect();

    Ok(IchimokuReport {
        current_price,
        tenkan_sen: tenkan,
        kijun_sen: kijun,
        senkou_span_a: span_a,
        senkou_span_b: span_b,
        tk_cross_bullish,
        price_above_cloud,
        cloud_bullish,
        signal,
        strength,
        history,
    })
}
