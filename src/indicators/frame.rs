//! Indicator frame: one named column per derived series, aligned to the bar index.

use serde::Serialize;

use crate::Series;

/// Full set of derived columns for one price series.
///
/// Every column has exactly `len()` entries. Rolling columns are `None`
/// through their warm-up period; a column whose window exceeds the history
/// is `None` throughout.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorFrame {
    pub timestamps: Vec<i64>,

    pub rsi: Series,
    pub sma_20: Series,
    pub sma_50: Series,
    pub sma_100: Series,
    pub sma_200: Series,

    pub macd: Series,
    pub macd_signal: Series,
    pub macd_histogram: Series,

    pub bb_upper: Series,
    pub bb_middle: Series,
    pub bb_lower: Series,

    /// Annualized close-to-close volatility, percent
    pub volatility: Series,
    pub volume_sma: Series,
    pub vwap: Series,
    pub obv: Series,
    pub mfi: Series,
    pub force_index: Series,
    pub ad: Series,
    pub roc: Series,
    pub momentum: Series,
    pub atr: Series,
    pub adx: Series,

    pub doji: Vec<bool>,
    pub hammer: Vec<bool>,
    pub bullish_engulfing: Vec<bool>,
    pub bearish_engulfing: Vec<bool>,
}

/// Snapshot of every column at one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IndicatorRow {
    pub index: usize,
    pub timestamp: i64,
    pub rsi: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_100: Option<f64>,
    pub sma_200: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub volatility: Option<f64>,
    pub volume_sma: Option<f64>,
    pub vwap: Option<f64>,
    pub obv: Option<f64>,
    pub mfi: Option<f64>,
    pub force_index: Option<f64>,
    pub ad: Option<f64>,
    pub roc: Option<f64>,
    pub momentum: Option<f64>,
    pub atr: Option<f64>,
    pub adx: Option<f64>,
    pub doji: bool,
    pub hammer: bool,
    pub bullish_engulfing: bool,
    pub bearish_engulfing: bool,
}

impl IndicatorFrame {
    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<IndicatorRow> {
        if i >= self.len() {
            return None;
        }
        let at = |col: &Series| col.get(i).copied().flatten();
        let flag = |col: &Vec<bool>| col.get(i).copied().unwrap_or(false);
        Some(IndicatorRow {
            index: i,
            timestamp: self.timestamps[i],
            rsi: at(&self.rsi),
            sma_20: at(&self.sma_20),
            sma_50: at(&self.sma_50),
            sma_100: at(&self.sma_100),
            sma_200: at(&self.sma_200),
            macd: at(&self.macd),
            macd_signal: at(&self.macd_signal),
            macd_histogram: at(&self.macd_histogram),
            bb_upper: at(&self.bb_upper),
            bb_middle: at(&self.bb_middle),
            bb_lower: at(&self.bb_lower),
            volatility: at(&self.volatility),
            volume_sma: at(&self.volume_sma),
            vwap: at(&self.vwap),
            obv: at(&self.obv),
            mfi: at(&self.mfi),
            force_index: at(&self.force_index),
            ad: at(&self.ad),
            roc: at(&self.roc),
            momentum: at(&self.momentum),
            atr: at(&self.atr),
            adx: at(&self.adx),
            doji: flag(&self.doji),
            hammer: flag(&self.hammer),
            bullish_engulfing: flag(&self.bullish_engulfing),
            bearish_engulfing: flag(&self.bearish_engulfing),
        })
    }

    pub fn last_row(&self) -> Option<IndicatorRow> {
        self.len().checked_sub(1).and_then(|i| self.row(i))
    }

    /// Row `lag` bars before the last one
    pub fn row_back(&self, lag: usize) -> Option<IndicatorRow> {
        self.len().checked_sub(1 + lag).and_then(|i| self.row(i))
    }
}

/// True when at least one entry of the column is defined.
#[inline]
pub fn is_available(column: &[Option<f64>]) -> bool {
    column.iter().any(Option::is_some)
}
