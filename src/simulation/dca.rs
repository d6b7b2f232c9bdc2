//! Dollar-cost averaging backtest.
//!
//! One purchase per 21-bar month, the last purchase landing 21 bars before
//! the final bar. The same capital invested at the first purchase price is
//! reported alongside as the lump-sum alternative.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::detectors::helpers::round_to;
use crate::params::{get_amount, get_period, impl_validated_serde, ParamMeta, Parameterized};
use crate::series::PriceSeries;
use crate::{AnalysisError, Period, Result};

/// Trading bars per calendar month
pub const BARS_PER_MONTH: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct DcaParams {
    /// Quote-currency amount spent on each purchase
    pub monthly_investment: f64,
    pub months: Period,
}

impl Default for DcaParams {
    fn default() -> Self {
        Self {
            monthly_investment: 100.0,
            months: Period::new_const(12),
        }
    }
}

const DCA_PARAMS: &[ParamMeta] = &[
    ParamMeta::amount(
        "monthly_investment",
        100.0,
        (0.01, 1_000_000.0, 50.0),
        "Amount invested each month",
    ),
    ParamMeta::period("months", 12.0, (1.0, 120.0, 1.0), "Number of monthly purchases"),
];

impl Parameterized for DcaParams {
    fn param_meta() -> &'static [ParamMeta] {
        DCA_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let p = Self {
            monthly_investment: get_amount(params, "monthly_investment", 100.0)?,
            months: get_period(params, "months", 12)?,
        };
        p.validate()?;
        Ok(p)
    }

    fn param_values(&self) -> Vec<f64> {
        vec![self.monthly_investment, self.months.get() as f64]
    }
}

impl_validated_serde!(DcaParams);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DcaPurchase {
    pub index: usize,
    pub timestamp: i64,
    pub price: f64,
    pub units: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DcaStrategy {
    #[serde(rename = "DCA")]
    Dca,
    #[serde(rename = "Lump Sum")]
    LumpSum,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DcaReport {
    pub total_invested: f64,
    pub total_units: f64,
    pub avg_price: f64,
    pub current_price: f64,
    pub current_value: f64,
    pub profit: f64,
    /// Percent of capital invested
    pub return_percent: f64,
    pub lump_sum_value: f64,
    pub lump_sum_return: f64,
    pub better_strategy: DcaStrategy,
    pub purchases: Vec<DcaPurchase>,
}

pub fn dca_simulation(series: &PriceSeries, params: &DcaParams) -> Result<DcaReport> {
    params.validate()?;
    let months = params.months.get();
    AnalysisError::require(months * BARS_PER_MONTH, series.len())?;

    let bars = series.bars();
    let n = bars.len();
    let purchases: Vec<DcaPurchase> = (0..months)
        .map(|i| {
            let index = n - (months - i) * BARS_PER_MONTH;
            let bar = &bars[index];
            DcaPurchase {
                index,
                timestamp: bar.timestamp,
                price: bar.close,
                units: params.monthly_investment / bar.close,
            }
        })
        .collect();

    let total_invested = params.monthly_investment * months as f64;
    let total_units: f64 = purchases.iter().map(|p| p.units).sum();
    let current_price = bars[n - 1].close;
    let current_value = total_units * current_price;
    let profit = current_value - total_invested;

    let lump_sum_value = total_invested / purchases[0].price * current_price;
    let lump_sum_return = (lump_sum_value - total_invested) / total_invested * 100.0;
    let return_percent = profit / total_invested * 100.0;
    let better_strategy = if current_value > lump_sum_value {
        DcaStrategy::Dca
    } else {
        DcaStrategy::LumpSum
    };
    tracing::debug!(months, ?better_strategy, "dca simulation complete");

    Ok(DcaReport {
        total_invested: round_to(total_invested, 2),
        total_units: round_to(total_units, 6),
        avg_price: round_to(total_invested / total_units, 2),
        current_price,
        current_value: round_to(current_value, 2),
        profit: round_to(profit, 2),
        return_percent: round_to(return_percent, 2),
        lump_sum_value: round_to(lump_sum_value, 2),
        lump_sum_return: round_to(lump_sum_return, 2),
        better_strategy,
        purchases,
    })
}
