//! Parameter metadata for configurable analyses
//!
//! Every tunable analysis (gap threshold, divergence lookback, Monte Carlo
//! cost knobs, indicator periods) describes its parameters with [`ParamMeta`].
//! This gives one place for:
//! - Range validation of caller-supplied values
//! - Parameter documentation
//! - Grid generation for sweeps
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use coinsight::params::Parameterized;
//! use coinsight::simulation::MonteCarloParams;
//!
//! for param in MonteCarloParams::param_meta() {
//!   println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut values = HashMap::new();
//! values.insert("simulations", 500.0);
//! let params = MonteCarloParams::with_params(&values).unwrap();
//! assert_eq!(params.simulations, 500);
//! ```

use std::collections::HashMap;

use crate::{AnalysisError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value in 0.0..=1.0 (tolerances)
  Ratio,
  /// Period value (positive integer: windows, counts, horizons)
  Period,
  /// Non-negative real amount (percent thresholds, currency amounts)
  Amount,
}

/// Metadata for a single parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "min_gap_percent")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Accepted range and sweep step: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn amount(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Amount, default, range, description }
  }

  /// Generate all values for a parameter sweep
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    if step <= 0.0 {
      return vec![min];
    }
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    if !value.is_finite() {
      return Err(AnalysisError::InvalidValue("parameter must be finite"));
    }
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(AnalysisError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(AnalysisError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Amount => {
        if value < 0.0 {
          return Err(AnalysisError::InvalidValue("Amount must be non-negative"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED TRAIT
// ============================================================

/// Analyses whose behaviour is driven by a validated parameter set
pub trait Parameterized: Sized {
  /// Metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Build from a name/value map. Missing parameters use their defaults.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Current values, in `param_meta()` order
  fn param_values(&self) -> Vec<f64>;

  /// Check every current value against its metadata
  fn validate(&self) -> Result<()> {
    Self::param_meta()
      .iter()
      .zip(self.param_values())
      .try_for_each(|(meta, value)| meta.validate(value))
  }
}

/// Serde impls that run `Parameterized::validate` after deserializing.
///
/// The type derives `Serialize`/`Deserialize` with `#[serde(remote = "Self")]`,
/// which turns the derived code into inherent functions; this macro wires
/// them into the traits.
macro_rules! impl_validated_serde {
  ($($ty:ty),* $(,)?) => {
    $(
      impl serde::Serialize for $ty {
        fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
          <$ty>::serialize(self, s)
        }
      }

      impl<'de> serde::Deserialize<'de> for $ty {
        fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
          let value = <$ty>::deserialize(d)?;
          $crate::params::Parameterized::validate(&value).map_err(serde::de::Error::custom)?;
          Ok(value)
        }
      }
    )*
  };
}

pub(crate) use impl_validated_serde;

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

fn lookup(params: &HashMap<&str, f64>, key: &str, default: f64) -> f64 {
  params.get(key).copied().unwrap_or(default)
}

/// Get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  Ratio::new(lookup(params, key, default))
}

/// Get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = lookup(params, key, default as f64);
  if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
    return Err(AnalysisError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Get a non-negative finite amount from params with default fallback
pub fn get_amount(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<f64> {
  let value = lookup(params, key, default);
  if !value.is_finite() || value < 0.0 {
    return Err(AnalysisError::InvalidValue("Amount must be finite and non-negative"));
  }
  Ok(value)
}

// ============================================================
// TESTS
// ============================================================
