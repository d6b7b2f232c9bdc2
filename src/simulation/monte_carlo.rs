//! Monte Carlo terminal-price distribution.
//!
//! Each path compounds `days` draws of `r ~ Normal(mean, std)` as
//! `price * (1 + r)`. Path `k` owns an RNG seeded with `seed + k`, so a
//! seeded run is reproducible regardless of how rayon schedules the paths.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::detectors::helpers::round_to;
use crate::math::{mean, percentile, sample_std};
use crate::params::{get_period, impl_validated_serde, ParamMeta, Parameterized};
use crate::series::PriceSeries;
use crate::{AnalysisError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct MonteCarloParams {
    /// Bars simulated forward
    pub days: usize,
    pub simulations: usize,
    /// Base seed; `None` draws one from the thread RNG
    pub seed: Option<u64>,
}

impl Default for MonteCarloParams {
    fn default() -> Self {
        Self {
            days: 30,
            simulations: 1000,
            seed: None,
        }
    }
}

impl MonteCarloParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

const MONTE_CARLO_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("days", 30.0, (1.0, 3650.0, 1.0), "Bars simulated forward"),
    ParamMeta::period("simulations", 1000.0, (1.0, 100_000.0, 1.0), "Number of paths"),
];

impl Parameterized for MonteCarloParams {
    fn param_meta() -> &'static [ParamMeta] {
        MONTE_CARLO_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let p = Self {
            days: get_period(params, "days", 30)?.get(),
            simulations: get_period(params, "simulations", 1000)?.get(),
            seed: None,
        };
        p.validate()?;
        Ok(p)
    }

    fn param_values(&self) -> Vec<f64> {
        vec![self.days as f64, self.simulations as f64]
    }
}

impl_validated_serde!(MonteCarloParams);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePercentiles {
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloReport {
    pub current_price: f64,
    pub simulations: usize,
    pub days: usize,
    /// Mean one-bar return, percent
    pub mean_return: f64,
    /// One-bar return deviation, percent
    pub std_return: f64,
    pub percentiles: PricePercentiles,
    /// Median terminal price
    pub expected_price: f64,
    /// 5th percentile terminal price
    pub worst_case: f64,
    /// 95th percentile terminal price
    pub best_case: f64,
    /// Median versus current price, percent
    pub potential_gain: f64,
    /// 5th percentile versus current price, percent
    pub potential_loss: f64,
}

/// Terminal prices of `params.simulations` independent paths.
pub fn simulate_terminal_prices(
    price: f64,
    mean_return: f64,
    std_return: f64,
    params: &MonteCarloParams,
) -> Result<Vec<f64>> {
    params.validate()?;
    if !price.is_finite() || price <= 0.0 {
        return Err(AnalysisError::InvalidValue("start price must be positive"));
    }
    let normal = Normal::new(mean_return, std_return)
        .map_err(|_| AnalysisError::InvalidValue("return deviation must be finite and non-negative"))?;
    let base = params.seed.unwrap_or_else(|| rand::thread_rng().gen());
    let days = params.days;

    Ok((0..params.simulations as u64)
        .into_par_iter()
        .map(|k| {
            let mut rng = StdRng::seed_from_u64(base.wrapping_add(k));
            (0..days).fold(price, |p, _| p * (1.0 + normal.sample(&mut rng)))
        })
        .collect())
}

pub fn percentiles_of(values: &[f64]) -> Option<PricePercentiles> {
    Some(PricePercentiles {
        p5: percentile(values, 5.0)?,
        p25: percentile(values, 25.0)?,
        p50: percentile(values, 50.0)?,
        p75: percentile(values, 75.0)?,
        p95: percentile(values, 95.0)?,
    })
}

/// Simulate forward from the last close using the historical return mean
/// and deviation.
pub fn monte_carlo(series: &PriceSeries, params: &MonteCarloParams) -> Result<MonteCarloReport> {
    AnalysisError::require(3, series.len())?;
    let returns = series.returns();
    let undefined = AnalysisError::Undefined("return distribution");
    let mean_return = mean(&returns).ok_or(undefined.clone())?;
    let std_return = sample_std(&returns).ok_or(undefined.clone())?;
    let price = series.closes()[series.len() - 1];
    tracing::debug!(
        simulations = params.simulations,
        days = params.days,
        seeded = params.seed.is_some(),
        "running monte carlo"
    );

    let terminal = simulate_terminal_prices(price, mean_return, std_return, params)?;
    let pct = percentiles_of(&terminal).ok_or(undefined)?;
    let change = |target: f64| round_to((target - price) / price * 100.0, 2);

    Ok(MonteCarloReport {
        current_price: price,
        simulations: params.simulations,
        days: params.days,
        mean_return: round_to(mean_return * 100.0, 4),
        std_return: round_to(std_return * 100.0, 4),
        percentiles: pct,
        expected_price: pct.p50,
        worst_case: pct.p5,
        best_case: pct.p95,
        potential_gain: change(pct.p50),
        potential_loss: change(pct.p5),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PriceBar;

    fn series(closes: &[f64]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::new(i as i64 * 86_400, c, c, c, c, 1.0))
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn test_zero_deviation_is_deterministic() {
        let params = MonteCarloParams { days: 10, simulations: 1, seed: None };
        let prices = simulate_terminal_prices(100.0, 0.01, 0.0, &params).unwrap();
        let expected = 100.0 * 1.01f64.powi(10);
        assert_eq!(prices.len(), 1);
        assert!((prices[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_seed_reproducibility() {
        let params = MonteCarloParams::default().with_seed(42);
        let a = simulate_terminal_prices(100.0, 0.001, 0.02, &params).unwrap();
        let b = simulate_terminal_prices(100.0, 0.001, 0.02, &params).unwrap();
        assert_eq!(a, b);
        let c = simulate_terminal_prices(100.0, 0.001, 0.02, &params.with_seed(7)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_report_percentiles_are_ordered() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + 3.0 * ((i as f64) * 0.9).sin()).collect();
        let report = monte_carlo(&series(&closes), &MonteCarloParams::default().with_seed(1)).unwrap();
        let p = report.percentiles;
        assert!(p.p5 <= p.p25 && p.p25 <= p.p50 && p.p50 <= p.p75 && p.p75 <= p.p95);
        assert_eq!(report.expected_price, p.p50);
        assert!(report.potential_loss <= report.potential_gain);
    }

    #[test]
    fn test_parameter_bounds() {
        let too_many = MonteCarloParams { simulations: 100_001, ..Default::default() };
        assert!(simulate_terminal_prices(100.0, 0.0, 0.01, &too_many).is_err());
        let no_days = MonteCarloParams { days: 0, ..Default::default() };
        assert!(simulate_terminal_prices(100.0, 0.0, 0.01, &no_days).is_err());
        assert!(simulate_terminal_prices(100.0, 0.0, -1.0, &MonteCarloParams::default()).is_err());
        assert!(MonteCarloParams::with_params(&HashMap::from([("days", 4000.0)])).is_err());
    }

    #[test]
    fn test_needs_return_history() {
        assert!(monte_carlo(&series(&[100.0, 101.0]), &MonteCarloParams::default()).is_err());
    }
}
