//! Cross-series performance: relative strength, comparison metrics and
//! return correlations.

use serde::Serialize;

use super::annualize;
use crate::detectors::drawdown_series;
use crate::detectors::helpers::{round_to, BARS_PER_YEAR};
use crate::math::{correlation, mean, sample_std};
use crate::series::{PriceBar, PriceSeries};
use crate::{AnalysisError, Result};

/// Annual risk-free rate used by the Sharpe ratio
pub const RISK_FREE_RATE: f64 = 0.04;
pub const RELATIVE_MIN_BARS: usize = 20;
const RS_LINE_BARS: usize = 60;
const MAX_PAIRS: usize = 5;

/// Pairs of bars sharing a timestamp, in time order.
fn align<'a>(a: &'a [PriceBar], b: &'a [PriceBar]) -> Vec<(&'a PriceBar, &'a PriceBar)> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    while i < a.len() && j < b.len() {
        match a[i].timestamp.cmp(&b[j].timestamp) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push((&a[i], &b[j]));
                i += 1;
                j += 1;
            },
        }
    }
    out
}

fn label(series: &PriceSeries, position: usize) -> String {
    series
        .symbol()
        .map_or_else(|| format!("#{position}"), str::to_owned)
}

// ============================================================
// RELATIVE STRENGTH
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelativeStrengthClass {
    Strong,
    Neutral,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RsPoint {
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelativeStrength {
    /// 100 * asset / benchmark at the last common bar
    pub rs_current: f64,
    /// RS-line change over 20 common bars, percent
    pub rs_change_1m: Option<f64>,
    /// RS-line change over 60 common bars, percent
    pub rs_change_3m: Option<f64>,
    /// Asset return minus benchmark return over the common span
    pub outperformance: f64,
    pub is_outperforming: bool,
    pub strength: RelativeStrengthClass,
    /// Last 60 points of the RS line
    pub rs_line: Vec<RsPoint>,
}

pub fn relative_strength(asset: &PriceSeries, benchmark: &PriceSeries) -> Result<RelativeStrength> {
    AnalysisError::require(RELATIVE_MIN_BARS, asset.len())?;
    AnalysisError::require(RELATIVE_MIN_BARS, benchmark.len())?;
    let common = align(asset.bars(), benchmark.bars());
    AnalysisError::require(2, common.len())?;

    let line: Vec<RsPoint> = common
        .iter()
        .map(|(a, b)| RsPoint {
            timestamp: a.timestamp,
            value: a.close / b.close * 100.0,
        })
        .collect();
    let n = line.len();
    let current = line[n - 1].value;
    let change = |bars: usize| (n >= bars).then(|| (current / line[n - bars].value - 1.0) * 100.0);
    let rs_change_1m = change(20);
    let rs_change_3m = change(60);

    let (first_a, first_b) = common[0];
    let (last_a, last_b) = common[n - 1];
    let asset_return = (last_a.close / first_a.close - 1.0) * 100.0;
    let bench_return = (last_b.close / first_b.close - 1.0) * 100.0;
    let outperformance = asset_return - bench_return;

    let strength = match rs_change_1m {
        Some(c) if c > 5.0 => RelativeStrengthClass::Strong,
        Some(c) if c < -5.0 => RelativeStrengthClass::Weak,
        _ => RelativeStrengthClass::Neutral,
    };

    Ok(RelativeStrength {
        rs_current: round_to(current, 2),
        rs_change_1m: rs_change_1m.map(|c| round_to(c, 2)),
        rs_change_3m: rs_change_3m.map(|c| round_to(c, 2)),
        outperformance: round_to(outperformance, 2),
        is_outperforming: outperformance > 0.0,
        strength,
        rs_line: line[n.saturating_sub(RS_LINE_BARS)..]
            .iter()
            .map(|p| RsPoint { value: round_to(p.value, 2), ..*p })
            .collect(),
    })
}

// ============================================================
// COMPARISON METRICS
// ============================================================

/// Annualized Sharpe ratio of one-bar returns; 0 when it cannot be computed.
pub fn sharpe_ratio(returns: &[f64], risk_free: f64) -> f64 {
    let periods = BARS_PER_YEAR as f64;
    let (Some(m), Some(s)) = (mean(returns), sample_std(returns)) else {
        return 0.0;
    };
    let vol = annualize(s);
    if vol <= 0.0 {
        return 0.0;
    }
    let sharpe = (m * periods - risk_free) / vol;
    if sharpe.is_finite() {
        sharpe
    } else {
        0.0
    }
}

/// Covariance of the two return series over the variance of the second.
pub fn beta(returns: &[f64], market: &[f64]) -> Option<f64> {
    if returns.len() != market.len() || returns.len() < 2 {
        return None;
    }
    let mr = mean(returns)?;
    let mm = mean(market)?;
    let (mut cov, mut var) = (0.0, 0.0);
    for (r, m) in returns.iter().zip(market) {
        cov += (r - mr) * (m - mm);
        var += (m - mm) * (m - mm);
    }
    (var > 0.0).then(|| cov / var)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonMetrics {
    pub symbol: Option<String>,
    /// First to last close, percent
    pub total_return: f64,
    /// Annualized, percent
    pub volatility: f64,
    pub sharpe_ratio: f64,
    /// Largest drop below the running maximum, as a positive percent
    pub max_drawdown: f64,
    pub current_price: f64,
}

pub fn compare_metrics(series: &PriceSeries) -> Result<ComparisonMetrics> {
    AnalysisError::require(RELATIVE_MIN_BARS, series.len())?;
    let closes = series.closes();
    let returns = series.returns();
    let first = closes[0];
    let last = closes[closes.len() - 1];
    let max_drawdown = -drawdown_series(&closes).into_iter().fold(0.0, f64::min);

    Ok(ComparisonMetrics {
        symbol: series.symbol().map(str::to_owned),
        total_return: (last / first - 1.0) * 100.0,
        volatility: sample_std(&returns).map_or(0.0, |s| annualize(s) * 100.0),
        sharpe_ratio: sharpe_ratio(&returns, RISK_FREE_RATE),
        max_drawdown,
        current_price: last,
    })
}

// ============================================================
// CORRELATION MATRIX
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationPair {
    pub first: String,
    pub second: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    /// Symbol of each row/column; `#i` for unnamed series
    pub symbols: Vec<String>,
    /// Pairwise correlation of one-bar returns on common timestamps
    pub matrix: Vec<Vec<Option<f64>>>,
    /// Strongest absolute correlations, at most 5
    pub top_correlated: Vec<CorrelationPair>,
    /// Weakest absolute correlations, at most 5
    pub least_correlated: Vec<CorrelationPair>,
}

/// Correlation of returns over the timestamps two series share.
pub fn return_correlation(a: &PriceSeries, b: &PriceSeries) -> Option<f64> {
    let common = align(a.bars(), b.bars());
    let (ra, rb): (Vec<f64>, Vec<f64>) = common
        .windows(2)
        .map(|w| {
            let ((a0, b0), (a1, b1)) = (w[0], w[1]);
            ((a1.close - a0.close) / a0.close, (b1.close - b0.close) / b0.close)
        })
        .unzip();
    correlation(&ra, &rb)
}

pub fn correlation_matrix(universe: &[PriceSeries]) -> Result<CorrelationMatrix> {
    AnalysisError::require(2, universe.len()).map_err(|_| {
        AnalysisError::InvalidConfig("correlation matrix needs at least two series".into())
    })?;
    let n = universe.len();
    let symbols: Vec<String> = universe.iter().enumerate().map(|(i, s)| label(s, i)).collect();

    let mut matrix = vec![vec![None; n]; n];
    let mut pairs = Vec::new();
    for i in 0..n {
        matrix[i][i] = Some(1.0);
        for j in i + 1..n {
            let c = return_correlation(&universe[i], &universe[j]).map(|c| round_to(c, 3));
            matrix[i][j] = c;
            matrix[j][i] = c;
            if let Some(correlation) = c {
                pairs.push(CorrelationPair {
                    first: symbols[i].clone(),
                    second: symbols[j].clone(),
                    correlation,
                });
            }
        }
    }

    pairs.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
    let top_correlated = pairs.iter().take(MAX_PAIRS).cloned().collect();
    let least_correlated = pairs.iter().rev().take(MAX_PAIRS).cloned().collect();

    Ok(CorrelationMatrix {
        symbols,
        matrix,
        top_correlated,
        least_correlated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(symbol: &str, closes: &[f64], offset: i64) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::new((i as i64 + offset) * 86_400, c, c, c, c, 1.0))
            .collect();
        PriceSeries::new(bars).unwrap().with_symbol(symbol)
    }

    fn wave(n: usize, amp: f64) -> Vec<f64> {
        (0..n).map(|i| 100.0 + amp * ((i as f64) * 0.7).sin()).collect()
    }

    #[test]
    fn test_outperforming_asset() {
        let asset: Vec<f64> = (0..40).map(|i| 100.0 * 1.02f64.powi(i)).collect();
        let bench: Vec<f64> = (0..40).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let rs = relative_strength(&series("ETH", &asset, 0), &series("BTC", &bench, 0)).unwrap();
        assert!(rs.is_outperforming);
        assert_eq!(rs.strength, RelativeStrengthClass::Strong);
        assert!(rs.rs_change_1m.is_some());
        assert!(rs.rs_change_3m.is_none());
        assert_eq!(rs.rs_line.len(), 40);
    }

    #[test]
    fn test_alignment_uses_common_timestamps() {
        let a = series("A", &[100.0; 30], 0);
        let b = series("B", &[50.0; 30], 10);
        let rs = relative_strength(&a, &b).unwrap();
        assert_eq!(rs.rs_line.len(), 20);
        assert_eq!(rs.rs_line[0].timestamp, 10 * 86_400);
        assert_eq!(rs.rs_current, 200.0);
    }

    #[test]
    fn test_sharpe_and_beta() {
        assert_eq!(sharpe_ratio(&[0.0; 10], RISK_FREE_RATE), 0.0);
        assert_eq!(sharpe_ratio(&[], RISK_FREE_RATE), 0.0);
        assert!(sharpe_ratio(&[0.01, 0.02, 0.015, 0.012], RISK_FREE_RATE) > 0.0);

        let market = [0.01, -0.02, 0.03, -0.01];
        let doubled: Vec<f64> = market.iter().map(|r| r * 2.0).collect();
        assert!((beta(&doubled, &market).unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(beta(&market, &[0.0; 4]), None);
    }

    #[test]
    fn test_compare_metrics() {
        let mut closes = vec![100.0; 10];
        closes.extend([120.0, 90.0, 110.0, 110.0, 110.0, 110.0, 110.0, 110.0, 110.0, 110.0]);
        let m = compare_metrics(&series("SOL", &closes, 0)).unwrap();
        assert_eq!(m.symbol.as_deref(), Some("SOL"));
        assert!((m.total_return - 10.0).abs() < 1e-9);
        assert!((m.max_drawdown - 25.0).abs() < 1e-9);
        assert!(m.volatility > 0.0);
        assert_eq!(m.current_price, 110.0);
    }

    #[test]
    fn test_correlation_matrix() {
        let a = series("A", &wave(50, 5.0), 0);
        let b = series("B", &wave(50, 10.0), 0);
        let inverse: Vec<f64> = wave(50, 5.0).iter().map(|c| 200.0 - c).collect();
        let c = series("C", &inverse, 0);
        let m = correlation_matrix(&[a, b, c]).unwrap();
        assert_eq!(m.symbols, vec!["A", "B", "C"]);
        assert_eq!(m.matrix[0][0], Some(1.0));
        assert!(m.matrix[0][1].unwrap() > 0.9);
        assert!(m.matrix[0][2].unwrap() < -0.9);
        assert_eq!(m.matrix[1][2], m.matrix[2][1]);
        assert_eq!(m.top_correlated.len(), 3);
    }

    #[test]
    fn test_correlation_matrix_needs_two_series() {
        assert!(correlation_matrix(&[series("A", &[1.0; 5], 0)]).is_err());
    }
}
