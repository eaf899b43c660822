//! FILENAME: core/datamodel/src/json_index.rs
//! PURPOSE: Converts between json array parameter values and 1-based indexed entries.
//! CONTEXT: In json value mode each array element becomes its own data point
//! along the json index axis. Saving packs the entries back into one array.

use std::collections::BTreeMap;

use crate::error::ValueError;
use crate::value::ScalarValue;

/// Longest json array `pack_json_array` will build.
pub const MAX_JSON_ARRAY_LEN: i64 = 1_000_000;

/// Packs 1-based indexed entries into a json array.
///
/// Element `i - 1` holds the value at index `i`. Indices missing between 1 and
/// the largest index are filled with `0`, not `null`. Indices below 1 are
/// ignored. An index above `MAX_JSON_ARRAY_LEN` is an error.
pub fn pack_json_array(entries: &BTreeMap<i64, ScalarValue>) -> Result<serde_json::Value, ValueError> {
    let last = entries.keys().next_back().copied().unwrap_or(0);
    if last < 1 {
        return Ok(serde_json::Value::Array(Vec::new()));
    }
    if last > MAX_JSON_ARRAY_LEN {
        return Err(ValueError::Json(format!(
            "index {} exceeds the array limit of {}",
            last, MAX_JSON_ARRAY_LEN
        )));
    }
    let mut array = vec![serde_json::Value::from(0); last as usize];
    for (index, value) in entries.range(1..) {
        array[(*index - 1) as usize] = value.to_json();
    }
    Ok(serde_json::Value::Array(array))
}

/// Explodes a json array into `(index, value)` pairs with 1-based indices.
pub fn unpack_json_array(value: &serde_json::Value) -> Result<Vec<(i64, ScalarValue)>, ValueError> {
    let array = value
        .as_array()
        .ok_or_else(|| ValueError::Json(format!("{} is not an array", value)))?;
    array
        .iter()
        .enumerate()
        .map(|(i, element)| Ok((i as i64 + 1, ScalarValue::from_json(element)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gaps_are_filled_with_zero() {
        let entries: BTreeMap<i64, ScalarValue> =
            [(1, ScalarValue::Integer(10)), (3, ScalarValue::Integer(30))].into_iter().collect();
        assert_eq!(pack_json_array(&entries).unwrap(), json!([10, 0, 30]));
    }

    #[test]
    fn test_leading_gap_and_non_positive_indices() {
        let entries: BTreeMap<i64, ScalarValue> = [
            (0, ScalarValue::Integer(99)),
            (2, ScalarValue::number(2.5)),
        ]
        .into_iter()
        .collect();
        assert_eq!(pack_json_array(&entries).unwrap(), json!([0, 2.5]));
        assert_eq!(pack_json_array(&BTreeMap::new()).unwrap(), json!([]));
    }

    #[test]
    fn test_index_past_limit_is_an_error() {
        let at_limit: BTreeMap<i64, ScalarValue> =
            [(MAX_JSON_ARRAY_LEN, ScalarValue::Integer(1))].into_iter().collect();
        let packed = pack_json_array(&at_limit).unwrap();
        assert_eq!(packed.as_array().map(Vec::len), Some(MAX_JSON_ARRAY_LEN as usize));

        let huge: BTreeMap<i64, ScalarValue> =
            [(1, ScalarValue::Integer(1)), (1i64 << 60, ScalarValue::Integer(2))].into_iter().collect();
        assert!(matches!(pack_json_array(&huge), Err(ValueError::Json(_))));
    }

    #[test]
    fn test_unpack_is_one_based() {
        let entries = unpack_json_array(&json!([5, "a"])).unwrap();
        assert_eq!(
            entries,
            vec![(1, ScalarValue::Integer(5)), (2, ScalarValue::text("a"))]
        );
        assert!(unpack_json_array(&json!({"a": 1})).is_err());
        assert!(unpack_json_array(&json!([[1]])).is_err());
    }
}
