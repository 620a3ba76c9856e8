//! Parameter metadata for indicators
//!
//! This module provides metadata about indicator parameters, enabling:
//! - Parameter documentation
//! - Construction from loosely-typed key/value maps
//! - A static `(name, value)` description logged when an indicator starts
//!
//! # Example
//!
//! ```rust
//! use pinscan::params::ParameterizedIndicator;
//! use pinscan::prelude::*;
//!
//! for param in GroupPinBarConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::{PatternError, Percent, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Whole number
  Int,
  /// On/off flag (0 or 1)
  Bool,
}

/// Metadata for a single indicator parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name as shown to users (e.g., "GroupSize")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Accepted range: (min, max)
  pub range: (f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn int(name: &'static str, default: f64, range: (f64, f64), description: &'static str) -> Self {
    Self { name, param_type: ParamType::Int, default, range, description }
  }

  pub const fn flag(name: &'static str, default: bool, description: &'static str) -> Self {
    let default = if default { 1.0 } else { 0.0 };
    Self { name, param_type: ParamType::Bool, default, range: (0.0, 1.0), description }
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(PatternError::OutOfRange { field: self.name, value, min, max });
    }
    if value.fract() != 0.0 {
      return Err(PatternError::InvalidValue("parameter must be a whole number"));
    }
    Ok(())
  }
}

// ============================================================
// PARAMETER VALUES
// ============================================================

/// A concrete parameter value, as listed in the start record
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
  Int(i64),
  Float(f64),
  Bool(bool),
  Text(String),
}

impl fmt::Display for ParamValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ParamValue::Int(v) => write!(f, "{v}"),
      ParamValue::Float(v) => write!(f, "{v}"),
      ParamValue::Bool(v) => write!(f, "{v}"),
      ParamValue::Text(v) => write!(f, "\"{v}\""),
    }
  }
}

// ============================================================
// PARAMETERIZED INDICATOR TRAIT
// ============================================================

/// Trait for indicator configurations that support parameterization
pub trait ParameterizedIndicator: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a configuration from a key/value map
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Indicator name used in log handles
  fn indicator_name() -> &'static str;

  /// Active parameter values, in declaration order
  fn describe(&self) -> Vec<(&'static str, ParamValue)>;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

fn lookup(params: &HashMap<&str, f64>, meta: &ParamMeta) -> Result<f64> {
  let value = params.get(meta.name).copied().unwrap_or(meta.default);
  meta.validate(value)?;
  Ok(value)
}

/// Read a whole-number parameter, falling back to its default
pub fn get_int(params: &HashMap<&str, f64>, meta: &ParamMeta) -> Result<i64> {
  lookup(params, meta).map(|v| v as i64)
}

/// Read a count parameter (non-negative whole number)
pub fn get_count(params: &HashMap<&str, f64>, meta: &ParamMeta) -> Result<usize> {
  let value = lookup(params, meta)?;
  if value < 0.0 {
    return Err(PatternError::InvalidValue("count parameter cannot be negative"));
  }
  Ok(value as usize)
}

/// Read a percent parameter
pub fn get_percent(params: &HashMap<&str, f64>, meta: &ParamMeta) -> Result<Percent> {
  let value = get_count(params, meta)?;
  Percent::new(value.min(u32::MAX as usize) as u32)
}

/// Read an on/off parameter
pub fn get_flag(params: &HashMap<&str, f64>, meta: &ParamMeta) -> Result<bool> {
  lookup(params, meta).map(|v| v != 0.0)
}

/// Find a parameter's metadata by name
pub fn find_meta(metas: &'static [ParamMeta], name: &str) -> Result<&'static ParamMeta> {
  metas
    .iter()
    .find(|m| m.name == name)
    .ok_or_else(|| PatternError::InvalidConfig(format!("unknown parameter {name}")))
}

/// Reject keys that none of `metas` declares
pub fn check_known(params: &HashMap<&str, f64>, metas: &'static [ParamMeta]) -> Result<()> {
  for key in params.keys() {
    find_meta(metas, key)?;
  }
  Ok(())
}

// ============================================================
// TESTS
// ============================================================
