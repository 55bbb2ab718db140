use std::collections::BTreeMap;

use serde::de;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A single field identifier, possibly a dotted path for joined relations.
pub type Field = String;

/// Ordered list of field identifiers. Converts from a single field or a
/// list so mutators accept either.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(pub Vec<Field>);

impl Fields {
    pub fn into_inner(self) -> Vec<Field> {
        self.0
    }
}

impl From<&str> for Fields {
    fn from(field: &str) -> Self {
        Fields(vec![field.to_string()])
    }
}

impl From<String> for Fields {
    fn from(field: String) -> Self {
        Fields(vec![field])
    }
}

impl From<Vec<String>> for Fields {
    fn from(fields: Vec<String>) -> Self {
        Fields(fields)
    }
}

impl From<Vec<&str>> for Fields {
    fn from(fields: Vec<&str>) -> Self {
        Fields(fields.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Fields {
    fn from(fields: [&str; N]) -> Self {
        Fields(fields.into_iter().map(str::to_string).collect())
    }
}

/// Comparison operators, named as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOperator {
    #[serde(rename = "equals")]
    Equals,
    #[serde(rename = "not")]
    NotEquals,
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "lt")]
    LowerThan,
    #[serde(rename = "gte")]
    GreaterThanEquals,
    #[serde(rename = "lte")]
    LowerThanEquals,
    #[serde(rename = "startsWith")]
    StartsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "notIn")]
    NotIn,
}

impl CompareOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOperator::Equals => "equals",
            CompareOperator::NotEquals => "not",
            CompareOperator::GreaterThan => "gt",
            CompareOperator::LowerThan => "lt",
            CompareOperator::GreaterThanEquals => "gte",
            CompareOperator::LowerThanEquals => "lte",
            CompareOperator::StartsWith => "startsWith",
            CompareOperator::EndsWith => "endsWith",
            CompareOperator::Contains => "contains",
            CompareOperator::In => "in",
            CompareOperator::NotIn => "notIn",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let operator = match s {
            "equals" => CompareOperator::Equals,
            "not" => CompareOperator::NotEquals,
            "gt" => CompareOperator::GreaterThan,
            "lt" => CompareOperator::LowerThan,
            "gte" => CompareOperator::GreaterThanEquals,
            "lte" => CompareOperator::LowerThanEquals,
            "startsWith" => CompareOperator::StartsWith,
            "endsWith" => CompareOperator::EndsWith,
            "contains" => CompareOperator::Contains,
            "in" => CompareOperator::In,
            "notIn" => CompareOperator::NotIn,
            _ => return None,
        };
        Some(operator)
    }
}

/// A single field/operator/value predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: Field,
    pub operator: CompareOperator,
    pub value: Value,
}

impl Condition {
    pub fn new(
        field: impl Into<Field>,
        operator: CompareOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOperator::Equals, value)
    }

    pub fn ne(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOperator::NotEquals, value)
    }

    pub fn gt(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOperator::GreaterThan, value)
    }

    pub fn gte(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOperator::GreaterThanEquals, value)
    }

    pub fn lt(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOperator::LowerThan, value)
    }

    pub fn lte(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOperator::LowerThanEquals, value)
    }

    pub fn starts_with(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOperator::StartsWith, value)
    }

    pub fn ends_with(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOperator::EndsWith, value)
    }

    pub fn contains(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::new(field, CompareOperator::Contains, value)
    }

    pub fn is_in(
        field: impl Into<Field>,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::new(field, CompareOperator::In, values)
    }

    pub fn not_in(
        field: impl Into<Field>,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::new(field, CompareOperator::NotIn, values)
    }
}

/// Filter tree: a leaf condition, a logical combination, or a negation.
/// Children are owned by value, so a well-formed tree is always finite.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Condition(Condition),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Build an AND of filters.
    pub fn all_of(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// Build an OR of filters.
    pub fn any_of(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    /// Wrap a filter in a logical NOT.
    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }
}

impl From<Condition> for Filter {
    fn from(condition: Condition) -> Self {
        Filter::Condition(condition)
    }
}

// A bare list of filters is an implicit AND over its elements.
impl From<Vec<Filter>> for Filter {
    fn from(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }
}

impl From<Vec<Condition>> for Filter {
    fn from(conditions: Vec<Condition>) -> Self {
        Filter::And(conditions.into_iter().map(Filter::Condition).collect())
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Filter::Condition(condition) => {
                let len = if condition.value.is_null() { 2 } else { 3 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("field", &condition.field)?;
                map.serialize_entry("operator", condition.operator.as_str())?;
                if !condition.value.is_null() {
                    map.serialize_entry("value", &condition.value)?;
                }
                map.end()
            }
            Filter::And(children) => serialize_logical(serializer, "AND", children),
            Filter::Or(children) => serialize_logical(serializer, "OR", children),
            Filter::Not(child) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("operator", "NOT")?;
                map.serialize_entry("value", child.as_ref())?;
                map.end()
            }
        }
    }
}

fn serialize_logical<S: Serializer>(
    serializer: S,
    operator: &str,
    children: &[Filter],
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(2))?;
    map.serialize_entry("operator", operator)?;
    map.serialize_entry("value", children)?;
    map.end()
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        filter_from_value(raw).map_err(de::Error::custom)
    }
}

// Filters are discriminated by the `operator` string, so the tree is read
// through `Value` first. A bare array reads as an AND over its elements.
fn filter_from_value(value: Value) -> Result<Filter, String> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err("AND filter has no children".to_string());
            }
            let children = items
                .into_iter()
                .map(filter_from_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Filter::And(children))
        }
        Value::Object(mut map) => {
            let operator = match map.remove("operator") {
                Some(Value::String(operator)) => operator,
                _ => return Err("filter has no operator".to_string()),
            };
            match operator.as_str() {
                "AND" | "OR" => {
                    let children = match map.remove("value") {
                        Some(Value::Array(items)) => items
                            .into_iter()
                            .map(filter_from_value)
                            .collect::<Result<Vec<_>, _>>()?,
                        _ => return Err(format!("{operator} filter value must be a list")),
                    };
                    if children.is_empty() {
                        return Err(format!("{operator} filter has no children"));
                    }
                    if operator == "AND" {
                        Ok(Filter::And(children))
                    } else {
                        Ok(Filter::Or(children))
                    }
                }
                "NOT" => {
                    let child = map
                        .remove("value")
                        .ok_or_else(|| "NOT filter has no child".to_string())?;
                    Ok(Filter::not(filter_from_value(child)?))
                }
                other => {
                    let operator = CompareOperator::parse(other)
                        .ok_or_else(|| format!("unknown filter operator: {other}"))?;
                    let field = match map.remove("field") {
                        Some(Value::String(field)) if !field.is_empty() => field,
                        _ => return Err("condition filter has no field".to_string()),
                    };
                    let value = map.remove("value").unwrap_or(Value::Null);
                    Ok(Filter::Condition(Condition {
                        field,
                        operator,
                        value,
                    }))
                }
            }
        }
        _ => Err("filter must be an object or a list of filters".to_string()),
    }
}

/// Sort direction for one order-by entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Field-to-direction mapping, serialized as a plain map like `{"name": "asc"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderBy(pub BTreeMap<Field, SortDirection>);

impl OrderBy {
    pub fn asc(field: impl Into<Field>) -> Self {
        Self::default().with(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<Field>) -> Self {
        Self::default().with(field, SortDirection::Desc)
    }

    pub fn with(mut self, field: impl Into<Field>, direction: SortDirection) -> Self {
        self.0.insert(field.into(), direction);
        self
    }
}

/// Ordered sequence of sort entries; converts from one entry or a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderByList(pub Vec<OrderBy>);

impl From<OrderBy> for OrderByList {
    fn from(order_by: OrderBy) -> Self {
        OrderByList(vec![order_by])
    }
}

impl From<Vec<OrderBy>> for OrderByList {
    fn from(sorts: Vec<OrderBy>) -> Self {
        OrderByList(sorts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_simple_trees() {
        let f1 = Filter::from(Condition::eq("status", "active"));
        let f2 = Filter::from(Condition::gt("age", 18));
        let all = Filter::all_of(vec![f1.clone(), f2.clone()]);
        let not_all = Filter::not(all);
        match not_all {
            Filter::Not(inner) => match *inner {
                Filter::And(children) => assert_eq!(children.len(), 2),
                _ => panic!("expected And inside Not"),
            },
            _ => panic!("expected Not"),
        }
    }

    #[test]
    fn list_converts_to_and() {
        let filter = Filter::from(vec![Condition::eq("a", 1), Condition::eq("b", 2)]);
        match filter {
            Filter::And(children) => assert_eq!(children.len(), 2),
            _ => panic!("expected And"),
        }
    }

    #[test]
    fn operator_wire_names() {
        assert_eq!(CompareOperator::NotEquals.as_str(), "not");
        assert_eq!(CompareOperator::StartsWith.as_str(), "startsWith");
        assert_eq!(CompareOperator::NotIn.as_str(), "notIn");
        for operator in [
            CompareOperator::Equals,
            CompareOperator::NotEquals,
            CompareOperator::GreaterThan,
            CompareOperator::LowerThan,
            CompareOperator::GreaterThanEquals,
            CompareOperator::LowerThanEquals,
            CompareOperator::StartsWith,
            CompareOperator::EndsWith,
            CompareOperator::Contains,
            CompareOperator::In,
            CompareOperator::NotIn,
        ] {
            assert_eq!(CompareOperator::parse(operator.as_str()), Some(operator));
        }
    }

    #[test]
    fn condition_serializes_with_operator_tag() {
        let filter = Filter::from(Condition::gt("age", 18));
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({ "field": "age", "operator": "gt", "value": 18 })
        );
    }

    #[test]
    fn logical_serializes_children_in_order() {
        let filter = Filter::any_of(vec![
            Condition::eq("a", 1).into(),
            Filter::not(Condition::eq("b", 2).into()),
        ]);
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({
                "operator": "OR",
                "value": [
                    { "field": "a", "operator": "equals", "value": 1 },
                    { "operator": "NOT", "value": { "field": "b", "operator": "equals", "value": 2 } },
                ],
            })
        );
    }

    #[test]
    fn deserialize_discriminates_on_operator() {
        let filter: Filter = serde_json::from_value(json!({
            "operator": "AND",
            "value": [
                { "field": "age", "operator": "gte", "value": 21 },
                { "operator": "NOT", "value": { "field": "banned", "operator": "equals", "value": true } },
            ],
        }))
        .unwrap();

        assert_eq!(
            filter,
            Filter::And(vec![
                Condition::gte("age", 21).into(),
                Filter::not(Condition::eq("banned", true).into()),
            ])
        );
    }

    #[test]
    fn deserialize_wraps_bare_list_as_and() {
        let filter: Filter = serde_json::from_value(json!([
            { "field": "a", "operator": "equals", "value": 1 },
            { "field": "b", "operator": "equals", "value": 2 },
        ]))
        .unwrap();
        match filter {
            Filter::And(children) => assert_eq!(children.len(), 2),
            _ => panic!("expected And"),
        }
    }

    #[test]
    fn deserialize_rejects_malformed_filters() {
        assert!(serde_json::from_value::<Filter>(json!({ "operator": "AND", "value": [] })).is_err());
        assert!(serde_json::from_value::<Filter>(json!({ "operator": "equals" })).is_err());
        assert!(
            serde_json::from_value::<Filter>(json!({ "field": "a", "operator": "almost" }))
                .is_err()
        );
        assert!(serde_json::from_value::<Filter>(json!(42)).is_err());
    }

    #[test]
    fn condition_without_value_omits_it() {
        let filter = Filter::from(Condition::new("name", CompareOperator::Equals, Value::Null));
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({ "field": "name", "operator": "equals" })
        );
    }

    #[test]
    fn order_by_serializes_as_single_entry_map() {
        assert_eq!(
            serde_json::to_value(OrderBy::asc("name")).unwrap(),
            json!({ "name": "asc" })
        );
        assert_eq!(
            serde_json::to_value(OrderBy::desc("createdAt")).unwrap(),
            json!({ "createdAt": "desc" })
        );
    }
}
