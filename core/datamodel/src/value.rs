//! FILENAME: core/datamodel/src/value.rs
//! PURPOSE: The scalar values that populate axes and cells of a pivot.
//! CONTEXT: Every axis entry (object name, parameter name, index) and every
//! stored parameter value is a `ScalarValue`. Values must be hashable and
//! totally ordered so they can key maps and sort headers.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Wrapper around f64 that implements Eq, Ord and Hash.
/// NaN values are treated as equal to each other and sort last.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            u64::MAX.hash(state);
        } else if self.0 == 0.0 {
            // -0.0 and 0.0 compare equal, so they must hash alike
            0u64.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.is_nan(), other.0.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal),
        }
    }
}

impl OrderedFloat {
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

/// A single scalar: an axis entry or a stored value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Integer(i64),
    Number(OrderedFloat),
    Text(String),
    Boolean(bool),
}

impl ScalarValue {
    pub fn number(n: f64) -> Self {
        ScalarValue::Number(OrderedFloat(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        ScalarValue::Text(s.into())
    }

    /// True for text that is empty once trimmed. Such values count as a cleared cell.
    pub fn is_blank(&self) -> bool {
        matches!(self, ScalarValue::Text(s) if s.trim().is_empty())
    }

    /// Integer view used by index axes. Integral floats qualify.
    pub fn as_index(&self) -> Option<i64> {
        match self {
            ScalarValue::Integer(i) => Some(*i),
            ScalarValue::Number(n) if n.0.fract() == 0.0 && n.0.abs() < i64::MAX as f64 => {
                Some(n.0 as i64)
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Integer(i) => Some(*i as f64),
            ScalarValue::Number(n) => Some(n.0),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parses user-typed or pasted text. Returns None for an empty string.
    pub fn parse(input: &str) -> Option<ScalarValue> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Some(ScalarValue::Integer(i));
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Some(ScalarValue::number(f));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => Some(ScalarValue::Boolean(true)),
            "false" => Some(ScalarValue::Boolean(false)),
            _ => Some(ScalarValue::Text(input.to_string())),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ScalarValue::Integer(i) => serde_json::Value::from(*i),
            ScalarValue::Number(n) => serde_json::Number::from_f64(n.0)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ScalarValue::Text(s) => serde_json::Value::String(s.clone()),
            ScalarValue::Boolean(b) => serde_json::Value::Bool(*b),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Result<ScalarValue, ValueError> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ScalarValue::Integer(i))
                } else {
                    n.as_f64()
                        .map(ScalarValue::number)
                        .ok_or_else(|| ValueError::Json(format!("unrepresentable number {}", n)))
                }
            }
            serde_json::Value::String(s) => Ok(ScalarValue::Text(s.clone())),
            serde_json::Value::Bool(b) => Ok(ScalarValue::Boolean(*b)),
            other => Err(ValueError::Json(format!("{} is not a scalar", other))),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ScalarValue::Integer(_) | ScalarValue::Number(_) => 0,
            ScalarValue::Text(_) => 1,
            ScalarValue::Boolean(_) => 2,
        }
    }
}

impl PartialOrd for ScalarValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Numbers sort before text, text before booleans. Integers and floats compare
/// numerically; an integer sorts before a float of the same magnitude so that
/// the ordering stays consistent with `Eq`.
impl Ord for ScalarValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use ScalarValue::*;
        match (self, other) {
            (Integer(a), Integer(b)) => a.cmp(b),
            (Number(a), Number(b)) => a.cmp(b),
            (Integer(a), Number(b)) => OrderedFloat(*a as f64).cmp(b).then(Ordering::Less),
            (Number(a), Integer(b)) => a.cmp(&OrderedFloat(*b as f64)).then(Ordering::Greater),
            (Text(a), Text(b)) => a.cmp(b),
            (Boolean(a), Boolean(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Integer(i) => write!(f, "{}", i),
            ScalarValue::Number(n) => write!(f, "{}", n.0),
            ScalarValue::Text(s) => f.write_str(s),
            ScalarValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Integer(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::number(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_ordering_groups_numbers_text_booleans() {
        let mut values = vec![
            ScalarValue::Boolean(false),
            ScalarValue::text("b"),
            ScalarValue::number(2.5),
            ScalarValue::Integer(3),
            ScalarValue::text("a"),
            ScalarValue::Integer(1),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                ScalarValue::Integer(1),
                ScalarValue::number(2.5),
                ScalarValue::Integer(3),
                ScalarValue::text("a"),
                ScalarValue::text("b"),
                ScalarValue::Boolean(false),
            ]
        );
    }

    #[test]
    fn test_integer_and_float_of_same_magnitude_are_distinct() {
        let set: BTreeSet<ScalarValue> =
            [ScalarValue::Integer(1), ScalarValue::number(1.0)].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_ne!(ScalarValue::Integer(1), ScalarValue::number(1.0));
    }

    #[test]
    fn test_parse_user_input() {
        assert_eq!(ScalarValue::parse("  "), None);
        assert_eq!(ScalarValue::parse("12"), Some(ScalarValue::Integer(12)));
        assert_eq!(ScalarValue::parse("1.5"), Some(ScalarValue::number(1.5)));
        assert_eq!(ScalarValue::parse("TRUE"), Some(ScalarValue::Boolean(true)));
        assert_eq!(ScalarValue::parse("unit"), Some(ScalarValue::text("unit")));
    }

    #[test]
    fn test_as_index_accepts_integral_floats() {
        assert_eq!(ScalarValue::number(4.0).as_index(), Some(4));
        assert_eq!(ScalarValue::number(4.5).as_index(), None);
        assert_eq!(ScalarValue::text("4").as_index(), None);
    }

    #[test]
    fn test_json_scalars() {
        let json = serde_json::json!(3);
        assert_eq!(ScalarValue::from_json(&json).unwrap(), ScalarValue::Integer(3));
        assert!(ScalarValue::from_json(&serde_json::json!([1, 2])).is_err());
        assert_eq!(ScalarValue::text("x").to_json(), serde_json::json!("x"));
    }
}
