//! Indicator engine
//!
//! Computes the full indicator set from one [`PriceSeries`] into an
//! [`IndicatorFrame`]. The engine never fails on short input: columns whose
//! window exceeds the history come back entirely undefined.
//!
//! # Column groups
//!
//! - **Trend**: SMA 20/50/100/200, MACD/Signal/Histogram, Bollinger Bands, ADX
//! - **Oscillators**: RSI, MFI, ROC, Momentum
//! - **Volume**: VWAP, OBV, Force Index, Accumulation/Distribution, Volume SMA
//! - **Volatility**: annualized volatility, ATR
//! - **Flags**: Doji, Hammer, Bullish/Bearish Engulfing

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::params::{get_amount, get_period, impl_validated_serde, ParamMeta, Parameterized};
use crate::series::PriceSeries;
use crate::{AnalysisError, Period, Result};

pub mod flags;
pub mod frame;
pub mod ichimoku;
pub mod oscillators;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use flags::*;
pub use frame::{is_available, IndicatorFrame, IndicatorRow};
pub use ichimoku::{ichimoku, ichimoku_lines, IchimokuLines, IchimokuPoint, IchimokuReport, IchimokuSignal};
pub use oscillators::{mfi, momentum, roc, rsi};
pub use trend::{adx, bollinger, macd, sma, Adx, Bollinger, Macd};
pub use volatility::{annualized_volatility, atr, true_range};
pub use volume::{accumulation_distribution, force_index, obv, vwap};

// ============================================================
// CONFIGURATION
// ============================================================

/// Periods for every configurable indicator. SMA column periods are fixed
/// by their names and not part of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct IndicatorConfig {
    pub rsi_period: Period,
    pub macd_fast: Period,
    pub macd_slow: Period,
    pub macd_signal: Period,
    pub bb_period: Period,
    pub bb_std_dev: f64,
    pub volatility_window: Period,
    /// Sampling periods per year used to annualize volatility
    pub periods_per_year: f64,
    pub volume_window: Period,
    pub mfi_period: Period,
    pub force_period: Period,
    pub roc_period: Period,
    pub momentum_period: Period,
    pub atr_period: Period,
    pub adx_period: Period,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: Period::new_const(14),
            macd_fast: Period::new_const(12),
            macd_slow: Period::new_const(26),
            macd_signal: Period::new_const(9),
            bb_period: Period::new_const(20),
            bb_std_dev: 2.0,
            volatility_window: Period::new_const(20),
            periods_per_year: 365.0,
            volume_window: Period::new_const(20),
            mfi_period: Period::new_const(14),
            force_period: Period::new_const(13),
            roc_period: Period::new_const(12),
            momentum_period: Period::new_const(10),
            atr_period: Period::new_const(14),
            adx_period: Period::new_const(14),
        }
    }
}

const INDICATOR_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("rsi_period", 14.0, (2.0, 100.0, 1.0), "RSI averaging window"),
    ParamMeta::period("macd_fast", 12.0, (2.0, 100.0, 1.0), "MACD fast EMA span"),
    ParamMeta::period("macd_slow", 26.0, (2.0, 200.0, 1.0), "MACD slow EMA span"),
    ParamMeta::period("macd_signal", 9.0, (2.0, 100.0, 1.0), "MACD signal EMA span"),
    ParamMeta::period("bb_period", 20.0, (2.0, 200.0, 1.0), "Bollinger window"),
    ParamMeta::amount("bb_std_dev", 2.0, (0.5, 5.0, 0.5), "Bollinger band width in deviations"),
    ParamMeta::period("volatility_window", 20.0, (2.0, 365.0, 1.0), "Return deviation window"),
    ParamMeta::amount("periods_per_year", 365.0, (1.0, 525_600.0, 1.0), "Annualization factor"),
    ParamMeta::period("volume_window", 20.0, (2.0, 200.0, 1.0), "Volume average window"),
    ParamMeta::period("mfi_period", 14.0, (2.0, 100.0, 1.0), "Money flow window"),
    ParamMeta::period("force_period", 13.0, (1.0, 100.0, 1.0), "Force index EMA span"),
    ParamMeta::period("roc_period", 12.0, (1.0, 365.0, 1.0), "Rate of change lookback"),
    ParamMeta::period("momentum_period", 10.0, (1.0, 365.0, 1.0), "Momentum lookback"),
    ParamMeta::period("atr_period", 14.0, (1.0, 100.0, 1.0), "ATR window"),
    ParamMeta::period("adx_period", 14.0, (2.0, 100.0, 1.0), "ADX smoothing window"),
];

impl Parameterized for IndicatorConfig {
    fn param_meta() -> &'static [ParamMeta] {
        INDICATOR_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let config = Self {
            rsi_period: get_period(params, "rsi_period", 14)?,
            macd_fast: get_period(params, "macd_fast", 12)?,
            macd_slow: get_period(params, "macd_slow", 26)?,
            macd_signal: get_period(params, "macd_signal", 9)?,
            bb_period: get_period(params, "bb_period", 20)?,
            bb_std_dev: get_amount(params, "bb_std_dev", 2.0)?,
            volatility_window: get_period(params, "volatility_window", 20)?,
            periods_per_year: get_amount(params, "periods_per_year", 365.0)?,
            volume_window: get_period(params, "volume_window", 20)?,
            mfi_period: get_period(params, "mfi_period", 14)?,
            force_period: get_period(params, "force_period", 13)?,
            roc_period: get_period(params, "roc_period", 12)?,
            momentum_period: get_period(params, "momentum_period", 10)?,
            atr_period: get_period(params, "atr_period", 14)?,
            adx_period: get_period(params, "adx_period", 14)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn param_values(&self) -> Vec<f64> {
        vec![
            self.rsi_period.get() as f64,
            self.macd_fast.get() as f64,
            self.macd_slow.get() as f64,
            self.macd_signal.get() as f64,
            self.bb_period.get() as f64,
            self.bb_std_dev,
            self.volatility_window.get() as f64,
            self.periods_per_year,
            self.volume_window.get() as f64,
            self.mfi_period.get() as f64,
            self.force_period.get() as f64,
            self.roc_period.get() as f64,
            self.momentum_period.get() as f64,
            self.atr_period.get() as f64,
            self.adx_period.get() as f64,
        ]
    }

    fn validate(&self) -> Result<()> {
        Self::param_meta()
            .iter()
            .zip(self.param_values())
            .try_for_each(|(meta, value)| meta.validate(value))?;
        if self.macd_fast >= self.macd_slow {
            return Err(AnalysisError::InvalidConfig(format!(
                "macd_fast ({}) must be shorter than macd_slow ({})",
                self.macd_fast.get(),
                self.macd_slow.get()
            )));
        }
        Ok(())
    }
}

impl_validated_serde!(IndicatorConfig);

// ============================================================
// ENGINE
// ============================================================

/// Stateless indicator engine. Construct per call or share freely; it holds
/// only its configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Compute every column in one pass over the series.
    pub fn compute(&self, series: &PriceSeries) -> IndicatorFrame {
        let c = &self.config;
        let bars = series.bars();
        let closes = series.closes();
        let volumes = series.volumes();
        tracing::debug!(bars = bars.len(), symbol = series.symbol(), "computing indicator frame");

        // Column groups are independent of each other
        let ((m, bb, directional), (smas, (oscillators, volume_cols))) = rayon::join(
            || {
                (
                    macd(&closes, c.macd_fast.get(), c.macd_slow.get(), c.macd_signal.get()),
                    bollinger(&closes, c.bb_period.get(), c.bb_std_dev),
                    adx(bars, c.adx_period.get()),
                )
            },
            || {
                rayon::join(
                    || [sma(&closes, 20), sma(&closes, 50), sma(&closes, 100), sma(&closes, 200)],
                    || {
                        rayon::join(
                            || {
                                (
                                    rsi(&closes, c.rsi_period.get()),
                                    mfi(bars, c.mfi_period.get()),
                                    roc(&closes, c.roc_period.get()),
                                    momentum(&closes, c.momentum_period.get()),
                                )
                            },
                            || {
                                (
                                    vwap(bars),
                                    obv(bars),
                                    force_index(bars, c.force_period.get()),
                                    accumulation_distribution(bars),
                                )
                            },
                        )
                    },
                )
            },
        );
        let [sma_20, sma_50, sma_100, sma_200] = smas;
        let ((rsi, mfi, roc, momentum), (vwap, obv, force_index, ad)) = (oscillators, volume_cols);

        IndicatorFrame {
            timestamps: series.timestamps(),
            rsi,
            sma_20,
            sma_50,
            sma_100,
            sma_200,
            macd: m.macd,
            macd_signal: m.signal,
            macd_histogram: m.histogram,
            bb_upper: bb.upper,
            bb_middle: bb.middle,
            bb_lower: bb.lower,
            volatility: annualized_volatility(&closes, c.volatility_window.get(), c.periods_per_year),
            volume_sma: sma(&volumes, c.volume_window.get()),
            vwap,
            obv,
            mfi,
            force_index,
            ad,
            roc,
            momentum,
            atr: atr(bars, c.atr_period.get()),
            adx: directional.adx,
            doji: single_bar_flags(bars, is_doji),
            hammer: single_bar_flags(bars, is_hammer),
            bullish_engulfing: two_bar_flags(bars, is_bullish_engulfing),
            bearish_engulfing: two_bar_flags(bars, is_bearish_engulfing),
        }
    }
}

impl IndicatorFrame {
    /// Frame with the default configuration.
    pub fn compute(series: &PriceSeries) -> Self {
        IndicatorEngine::default().compute(series)
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PriceBar;

    fn make_series(n: usize) -> PriceSeries {
        let bars = (0..n)
            .map(|i| {
                let c = 100.0 + (i as f64 * 0.2).sin() * 10.0 + i as f64 * 0.1;
                PriceBar::new(i as i64 * 3_600, c, c + 1.5, c - 1.5, c, 500.0 + (i % 7) as f64 * 50.0)
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn test_frame_columns_aligned() {
        let series = make_series(250);
        let frame = IndicatorFrame::compute(&series);
        assert_eq!(frame.len(), 250);
        for col in [&frame.rsi, &frame.sma_200, &frame.macd, &frame.adx, &frame.vwap, &frame.mfi] {
            assert_eq!(col.len(), 250);
        }
        assert_eq!(frame.doji.len(), 250);
        assert!(frame.sma_200[199].is_some());
        assert!(frame.sma_200[198].is_none());
    }

    #[test]
    fn test_short_series_gives_partial_frame() {
        let series = make_series(30);
        let frame = IndicatorFrame::compute(&series);
        assert!(!is_available(&frame.sma_50));
        assert!(!is_available(&frame.sma_200));
        assert!(is_available(&frame.sma_20));
        assert!(is_available(&frame.rsi));
        let last = frame.last_row().unwrap();
        assert!(last.sma_50.is_none());
        assert!(last.sma_20.is_some());
    }

    #[test]
    fn test_empty_series() {
        let series = PriceSeries::new(Vec::new()).unwrap();
        let frame = IndicatorFrame::compute(&series);
        assert!(frame.is_empty());
        assert!(frame.last_row().is_none());
    }

    #[test]
    fn test_row_back() {
        let series = make_series(40);
        let frame = IndicatorFrame::compute(&series);
        assert_eq!(frame.row_back(0).unwrap().index, 39);
        assert_eq!(frame.row_back(1).unwrap().index, 38);
        assert!(frame.row_back(40).is_none());
    }

    #[test]
    fn test_config_rejects_inverted_macd() {
        let mut params = HashMap::new();
        params.insert("macd_fast", 30.0);
        assert!(matches!(
            IndicatorConfig::with_params(&params),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_custom_config_changes_columns() {
        let mut params = HashMap::new();
        params.insert("rsi_period", 7.0);
        let config = IndicatorConfig::with_params(&params).unwrap();
        let engine = IndicatorEngine::new(config).unwrap();
        let frame = engine.compute(&make_series(20));
        assert!(frame.rsi[5].is_none());
        assert!(frame.rsi[6].is_some());
    }
}
