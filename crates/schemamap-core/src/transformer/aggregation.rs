//! Aggregation of list-valued slot values
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::spec::{AggregationOperation, AggregationOperator, NullHandling};
use serde_json::{Number, Value};
use tracing::warn;

/// Reduce a list value with an aggregation operator
///
/// Non-list values are returned unchanged.
pub fn aggregate(operation: &AggregationOperation, value: &Value) -> Result<Value> {
    let Value::Array(items) = value else {
        return Ok(value.clone());
    };

    let items: Vec<Value> = match operation.null_handling.unwrap_or_default() {
        NullHandling::IgnoreNulls => items.iter().filter(|v| !v.is_null()).cloned().collect(),
        NullHandling::PropagateNulls => {
            if items.iter().any(Value::is_null) {
                return Ok(Value::Null);
            }
            items.clone()
        }
        NullHandling::TreatAsZero => items
            .iter()
            .map(|v| if v.is_null() { Value::from(0) } else { v.clone() })
            .collect(),
    };

    match operation.operator {
        AggregationOperator::Count => Ok(Value::from(items.len())),
        AggregationOperator::Sum => Ok(sum(&items)),
        AggregationOperator::Avg => Ok(float(mean(&numbers(&items)))),
        AggregationOperator::Min => Ok(extreme(&items, |a, b| a < b)),
        AggregationOperator::Max => Ok(extreme(&items, |a, b| a > b)),
        AggregationOperator::StdDev => Ok(float(variance(&numbers(&items)).map(f64::sqrt))),
        AggregationOperator::Variance => Ok(float(variance(&numbers(&items)))),
        AggregationOperator::Median => Ok(median(&items)),
        AggregationOperator::Mode => Ok(mode(&items)),
        AggregationOperator::Set => {
            let mut unique: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                if !unique.contains(&item) {
                    unique.push(item);
                }
            }
            Ok(Value::Array(unique))
        }
        AggregationOperator::List | AggregationOperator::Array => Ok(Value::Array(items)),
        AggregationOperator::Custom => Err(Error::specification(
            "custom aggregation requires a backend",
        )),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn numbers(items: &[Value]) -> Vec<f64> {
    items
        .iter()
        .filter_map(|item| {
            let n = as_number(item);
            if n.is_none() {
                warn!(value = %item, "Skipping non-numeric value in aggregation");
            }
            n
        })
        .collect()
}

fn float(value: Option<f64>) -> Value {
    value
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn sum(items: &[Value]) -> Value {
    if items.iter().all(|v| v.as_i64().is_some()) {
        let total = items.iter().filter_map(Value::as_i64).fold(0i64, i64::saturating_add);
        return Value::from(total);
    }
    float(Some(numbers(items).iter().sum()))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(squares / (values.len() - 1) as f64)
}

fn extreme(items: &[Value], better: fn(f64, f64) -> bool) -> Value {
    let mut best: Option<(f64, &Value)> = None;
    for item in items {
        let Some(n) = as_number(item) else {
            warn!(value = %item, "Skipping non-numeric value in aggregation");
            continue;
        };
        if best.map_or(true, |(current, _)| better(n, current)) {
            best = Some((n, item));
        }
    }
    best.map(|(_, item)| item.clone()).unwrap_or(Value::Null)
}

fn median(items: &[Value]) -> Value {
    let mut pairs: Vec<(f64, &Value)> = items
        .iter()
        .filter_map(|item| as_number(item).map(|n| (n, item)))
        .collect();
    if pairs.is_empty() {
        return Value::Null;
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mid = pairs.len() / 2;
    if pairs.len() % 2 == 1 {
        pairs[mid].1.clone()
    } else {
        float(Some((pairs[mid - 1].0 + pairs[mid].0) / 2.0))
    }
}

fn mode(items: &[Value]) -> Value {
    let mut counts: Vec<(&Value, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(seen, _)| *seen == item) {
            Some((_, count)) => *count += 1,
            None => counts.push((item, 1)),
        }
    }
    // ties resolve to the first value seen
    let mut best: Option<(&Value, usize)> = None;
    for (item, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((item, count));
        }
    }
    best.map(|(item, _)| item.clone()).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(operator: AggregationOperator, null_handling: Option<NullHandling>) -> AggregationOperation {
        AggregationOperation {
            operator,
            null_handling,
        }
    }

    #[test]
    fn test_numeric_operators() {
        let values = json!([3, 1, null, 4, 1, 5]);
        assert_eq!(aggregate(&op(AggregationOperator::Sum, None), &values).unwrap(), json!(14));
        assert_eq!(aggregate(&op(AggregationOperator::Count, None), &values).unwrap(), json!(5));
        assert_eq!(aggregate(&op(AggregationOperator::Avg, None), &values).unwrap(), json!(2.8));
        assert_eq!(aggregate(&op(AggregationOperator::Min, None), &values).unwrap(), json!(1));
        assert_eq!(aggregate(&op(AggregationOperator::Max, None), &values).unwrap(), json!(5));
        assert_eq!(aggregate(&op(AggregationOperator::Median, None), &values).unwrap(), json!(3));
        assert_eq!(aggregate(&op(AggregationOperator::Mode, None), &values).unwrap(), json!(1));
    }

    #[test]
    fn test_sample_variance() {
        let values = json!([2, 4, 4, 4, 5, 5, 7, 9]);
        let variance = aggregate(&op(AggregationOperator::Variance, None), &values).unwrap();
        assert!((variance.as_f64().unwrap() - 32.0 / 7.0).abs() < 1e-9);
        let single = aggregate(&op(AggregationOperator::StdDev, None), &json!([1])).unwrap();
        assert_eq!(single, Value::Null);
    }

    #[test]
    fn test_null_handling() {
        let values = json!([1, null, 2]);
        assert_eq!(
            aggregate(&op(AggregationOperator::Sum, Some(NullHandling::PropagateNulls)), &values).unwrap(),
            Value::Null
        );
        assert_eq!(
            aggregate(&op(AggregationOperator::Count, Some(NullHandling::TreatAsZero)), &values).unwrap(),
            json!(3)
        );
    }

    #[test]
    fn test_collection_operators() {
        let values = json!(["a", "b", "a", "c"]);
        assert_eq!(aggregate(&op(AggregationOperator::Set, None), &values).unwrap(), json!(["a", "b", "c"]));
        assert_eq!(aggregate(&op(AggregationOperator::List, None), &values).unwrap(), values);
        assert_eq!(aggregate(&op(AggregationOperator::Sum, None), &json!(7)).unwrap(), json!(7));
        assert!(aggregate(&op(AggregationOperator::Custom, None), &values).is_err());
    }
}
