use serde_json::{Map, Value};

use crate::error::Error;
use crate::filter::{Condition, Filter};

/// Recursively lower a filter tree into the nested mapping expected at the
/// output boundary:
///
/// - `And`/`Or` become `{"AND"|"OR": [child, ...]}` with every child lowered
///   on its own
/// - `Not` becomes `{"NOT": child}`
/// - a condition leaf becomes `{field: {operator: value}}`
///
/// Strict mode rejects empty AND/OR combinators and conditions without a
/// field. Permissive mode drops them instead: `Ok(None)` means the filter
/// contributed nothing and its facet must be left untouched.
pub fn canonical_filter(filter: &Filter, permissive: bool) -> Result<Option<Value>, Error> {
    match filter {
        Filter::And(children) => canonical_logical("AND", children, permissive),
        Filter::Or(children) => canonical_logical("OR", children, permissive),
        Filter::Not(child) => {
            let inner = canonical_filter(child, permissive)?;
            Ok(inner.map(|inner| single_entry("NOT", inner)))
        }
        Filter::Condition(condition) => canonical_condition(condition, permissive),
    }
}

fn canonical_logical(
    operator: &'static str,
    children: &[Filter],
    permissive: bool,
) -> Result<Option<Value>, Error> {
    if children.is_empty() {
        if permissive {
            return Ok(None);
        }
        return Err(Error::EmptyLogicalFilter(operator));
    }

    let mut lowered = Vec::with_capacity(children.len());
    for child in children {
        if let Some(value) = canonical_filter(child, permissive)? {
            lowered.push(value);
        }
    }
    if lowered.is_empty() {
        // Every child was dropped; only reachable in permissive mode.
        return Ok(None);
    }
    Ok(Some(single_entry(operator, Value::Array(lowered))))
}

fn canonical_condition(condition: &Condition, permissive: bool) -> Result<Option<Value>, Error> {
    if condition.field.is_empty() {
        if permissive {
            return Ok(None);
        }
        return Err(Error::MissingFilterField);
    }
    let comparison = single_entry(condition.operator.as_str(), condition.value.clone());
    Ok(Some(single_entry(&condition.field, comparison)))
}

fn single_entry(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}
