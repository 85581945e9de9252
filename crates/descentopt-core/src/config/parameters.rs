//! String-keyed parameter lists.
//!
//! A [`ParameterList`] is the untyped entry point for configuring a step:
//! keys are human-readable option names such as `"Descent Type"` and values
//! are booleans, integers, reals or strings. Typed getters fall back to a
//! default when the key is missing, mirroring how options files are usually
//! sparse.

use crate::error::{OptimizerError, Result};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParameterValue {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Real value
    Real(f64),
    /// String value, typically the name of an enumerated option
    Str(String),
}

impl ParameterValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Str(_) => "string",
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Ordered map from option names to values.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ParameterList {
    entries: BTreeMap<String, ParameterValue>,
}

impl ParameterList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous entry.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParameterValue>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Builder-style variant of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Raw access to an entry.
    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.entries.get(key)
    }

    /// Whether the list has an entry for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Boolean entry, or `default` when absent.
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.entries.get(key) {
            None => Ok(default),
            Some(ParameterValue::Bool(b)) => Ok(*b),
            Some(other) => Err(type_error(key, "bool", other)),
        }
    }

    /// Integer entry, or `default` when absent.
    pub fn get_int(&self, key: &str, default: i64) -> Result<i64> {
        match self.entries.get(key) {
            None => Ok(default),
            Some(ParameterValue::Int(i)) => Ok(*i),
            Some(other) => Err(type_error(key, "int", other)),
        }
    }

    /// Non-negative integer entry, or `default` when absent.
    pub fn get_usize(&self, key: &str, default: usize) -> Result<usize> {
        match self.entries.get(key) {
            None => Ok(default),
            Some(ParameterValue::Int(i)) => usize::try_from(*i).map_err(|_| {
                OptimizerError::invalid_configuration("must be non-negative", key, i.to_string())
            }),
            Some(other) => Err(type_error(key, "int", other)),
        }
    }

    /// Real entry, or `default` when absent. Integers are widened.
    pub fn get_real(&self, key: &str, default: f64) -> Result<f64> {
        match self.entries.get(key) {
            None => Ok(default),
            Some(ParameterValue::Real(r)) => Ok(*r),
            #[allow(clippy::cast_precision_loss)]
            Some(ParameterValue::Int(i)) => Ok(*i as f64),
            Some(other) => Err(type_error(key, "real", other)),
        }
    }

    /// String entry, or `default` when absent.
    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> Result<&'a str> {
        match self.entries.get(key) {
            None => Ok(default),
            Some(ParameterValue::Str(s)) => Ok(s.as_str()),
            Some(other) => Err(type_error(key, "string", other)),
        }
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn type_error(key: &str, expected: &str, found: &ParameterValue) -> OptimizerError {
    OptimizerError::invalid_configuration(
        format!("expected {expected}, found {}", found.kind()),
        key,
        found.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let list = ParameterList::new();
        assert!(list.is_empty());
        assert!(!list.get_bool("Use Inexact Gradient", false).unwrap());
        assert_eq!(list.get_int("Maximum Secant Storage", 10).unwrap(), 10);
        assert_eq!(list.get_real("Backtracking Rate", 0.5).unwrap(), 0.5);
        assert_eq!(
            list.get_str("Descent Type", "Quasi-Newton Method").unwrap(),
            "Quasi-Newton Method"
        );
    }

    #[test]
    fn test_set_and_get() {
        let mut list = ParameterList::new();
        list.set("Descent Type", "Newton-Krylov")
            .set("Maximum Number of Krylov Iterations", 5)
            .set("Relative Krylov Tolerance", 1e-3)
            .set("Use Secant Preconditioning", true);

        assert_eq!(list.len(), 4);
        assert_eq!(list.get_str("Descent Type", "").unwrap(), "Newton-Krylov");
        assert_eq!(list.get_usize("Maximum Number of Krylov Iterations", 20).unwrap(), 5);
        assert_eq!(list.get_real("Relative Krylov Tolerance", 1e-2).unwrap(), 1e-3);
        assert!(list.get_bool("Use Secant Preconditioning", false).unwrap());
    }

    #[test]
    fn test_integers_widen_to_reals() {
        let list = ParameterList::new().with("Initial Linesearch Parameter", 2);
        assert_eq!(list.get_real("Initial Linesearch Parameter", 1.0).unwrap(), 2.0);
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let list = ParameterList::new().with("Use Inexact Gradient", "yes");
        let err = list.get_bool("Use Inexact Gradient", false).unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("expected bool, found string"));

        let list = ParameterList::new().with("Maximum Secant Storage", -3);
        assert!(list.get_usize("Maximum Secant Storage", 10).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_round_trip() {
        let json = r#"{
            "Descent Type": "Nonlinear CG",
            "Nonlinear CG Type": "Fletcher-Reeves",
            "Function Evaluation Limit": 30,
            "Sufficient Decrease Parameter": 0.001,
            "Use Inexact Objective Function": false
        }"#;
        let list: ParameterList = serde_json::from_str(json).unwrap();
        assert_eq!(list.get_str("Descent Type", "").unwrap(), "Nonlinear CG");
        assert_eq!(list.get_usize("Function Evaluation Limit", 20).unwrap(), 30);
        assert_eq!(list.get_real("Sufficient Decrease Parameter", 1e-4).unwrap(), 0.001);

        let back: ParameterList =
            serde_json::from_str(&serde_json::to_string(&list).unwrap()).unwrap();
        assert_eq!(back, list);
    }
}
