use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::trace;

use crate::canonical::canonical_filter;
use crate::error::Error;
use crate::filter::{Fields, Filter, OrderBy, OrderByList};
use crate::options::{self, BuilderOptions, Facet, ParamNamesMap};

/// Resolved output keys, one per facet, frozen at builder construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamNames {
    r#where: String,
    joins: String,
    select: String,
    order_by: String,
    page: String,
    page_size: String,
}

impl ParamNames {
    /// Resolve each facet to its output key: a single name is used as-is, a
    /// list resolves to its first alias. Unresolvable entries fall back to
    /// the default facet name; validated paths never reach that fallback.
    pub fn resolve(map: &ParamNamesMap) -> Self {
        Self {
            r#where: resolve_one(map, Facet::Where),
            joins: resolve_one(map, Facet::Joins),
            select: resolve_one(map, Facet::Select),
            order_by: resolve_one(map, Facet::OrderBy),
            page: resolve_one(map, Facet::Page),
            page_size: resolve_one(map, Facet::PageSize),
        }
    }

    pub fn get(&self, facet: Facet) -> &str {
        match facet {
            Facet::Where => &self.r#where,
            Facet::Joins => &self.joins,
            Facet::Select => &self.select,
            Facet::OrderBy => &self.order_by,
            Facet::Page => &self.page,
            Facet::PageSize => &self.page_size,
        }
    }
}

fn resolve_one(map: &ParamNamesMap, facet: Facet) -> String {
    map.get(facet)
        .resolved()
        .unwrap_or(facet.default_name())
        .to_string()
}

/// Aggregate input for [`QueryBuilder::create`]. Every field is optional;
/// absent fields leave the output mapping untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateQueryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#where: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joins: Option<Fields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_fields: Option<Fields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_fields: Option<Fields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<OrderBy>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<Number>,
}

/// Stateful accumulator for one request query.
///
/// Mutators consume and return the builder, so calls chain; fallible ones
/// return `Result` and chain with `?`. Facet keys are resolved once, at
/// construction; later registry changes never affect an existing builder.
/// A builder is a single-owner value: share it across threads only behind
/// external synchronization.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query_object: Map<String, Value>,
    param_names: ParamNames,
    permissive: bool,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Fresh builder with names snapshotted from the process-wide registry.
    pub fn new() -> Self {
        let options = options::get_options();
        trace!("query builder constructed");
        Self {
            query_object: Map::new(),
            param_names: ParamNames::resolve(&options.param_names_map),
            permissive: options.permissive,
        }
    }

    /// Fresh builder with an explicit configuration, bypassing the registry.
    pub fn with_options(options: &BuilderOptions) -> Result<Self, Error> {
        options.param_names_map.validate()?;
        Ok(Self {
            query_object: Map::new(),
            param_names: ParamNames::resolve(&options.param_names_map),
            permissive: options.permissive,
        })
    }

    /// Construct a builder and apply an aggregate of query parameters.
    /// With no params the builder stays empty.
    pub fn create(params: Option<CreateQueryParams>) -> Result<Self, Error> {
        match params {
            Some(params) => Self::new().apply_params(params),
            None => Ok(Self::new()),
        }
    }

    /// [`QueryBuilder::create`] with an explicit configuration.
    pub fn create_with_options(
        options: &BuilderOptions,
        params: Option<CreateQueryParams>,
    ) -> Result<Self, Error> {
        let qb = Self::with_options(options)?;
        match params {
            Some(params) => qb.apply_params(params),
            None => Ok(qb),
        }
    }

    // Fixed application order: select, where, joins, page, pageSize, orderBy.
    fn apply_params(self, params: CreateQueryParams) -> Result<Self, Error> {
        let mut qb = self.select(params.include_fields, params.exclude_fields);
        if let Some(filter) = params.r#where {
            qb = qb.set_where(filter)?;
        }
        if let Some(joins) = params.joins {
            qb = qb.set_join(joins);
        }
        if let Some(page) = params.page {
            qb = qb.set_page(page)?;
        }
        if let Some(page_size) = params.page_size {
            qb = qb.set_page_size(page_size)?;
        }
        if let Some(order_by) = params.order_by {
            qb = qb.sort_by(order_by);
        }
        Ok(qb)
    }

    /// Set the `only`/`except` sub-keys of the select facet. A `None`
    /// argument leaves the corresponding sub-key untouched, so repeated
    /// calls are last-writer-wins per sub-key, not per call.
    pub fn select(self, include: Option<Fields>, exclude: Option<Fields>) -> Self {
        let qb = match include {
            Some(fields) => self.set_include(fields),
            None => self,
        };
        match exclude {
            Some(fields) => qb.set_exclude(fields),
            None => qb,
        }
    }

    pub fn set_include(mut self, fields: impl Into<Fields>) -> Self {
        self.merge_select("only", fields.into());
        self
    }

    pub fn set_exclude(mut self, fields: impl Into<Fields>) -> Self {
        self.merge_select("except", fields.into());
        self
    }

    /// Canonicalize and store a filter under the `where` key, replacing any
    /// previous value. A `Vec<Filter>` input wraps as a single AND. In
    /// permissive mode a filter that lowers to nothing leaves the mapping
    /// untouched.
    pub fn set_where(mut self, filter: impl Into<Filter>) -> Result<Self, Error> {
        let filter = filter.into();
        if let Some(canonical) = canonical_filter(&filter, self.permissive)? {
            let key = self.param_names.get(Facet::Where).to_string();
            self.query_object.insert(key, canonical);
        }
        Ok(self)
    }

    /// Append join fields. Multiple calls accumulate in insertion order,
    /// without deduplication.
    pub fn set_join(mut self, fields: impl Into<Fields>) -> Self {
        let fields: Fields = fields.into();
        self.append(Facet::Joins, fields.0.into_iter().map(Value::String));
        self
    }

    /// Append sort entries; same accumulation semantics as `set_join`.
    pub fn sort_by(mut self, sorts: impl Into<OrderByList>) -> Self {
        let sorts: OrderByList = sorts.into();
        self.append(Facet::OrderBy, sorts.0.into_iter().map(order_by_value));
        self
    }

    /// Store the page number, overwriting any previous value. `0` is a
    /// valid, present value and is stored.
    pub fn set_page(self, n: impl Into<Number>) -> Result<Self, Error> {
        self.set_numeric(Facet::Page, n.into())
    }

    /// Store the page size, overwriting any previous value.
    pub fn set_page_size(self, n: impl Into<Number>) -> Result<Self, Error> {
        self.set_numeric(Facet::PageSize, n.into())
    }

    fn set_numeric(mut self, facet: Facet, n: Number) -> Result<Self, Error> {
        // Strict mode only accepts non-negative integers; permissive mode
        // stores whatever number it was given.
        if !self.permissive && n.as_u64().is_none() {
            return Err(Error::NonFiniteNumeric(facet, n));
        }
        let key = self.param_names.get(facet).to_string();
        self.query_object.insert(key, Value::Number(n));
        Ok(self)
    }

    fn merge_select(&mut self, sub_key: &str, fields: Fields) {
        let key = self.param_names.get(Facet::Select).to_string();
        let entry = self
            .query_object
            .entry(key)
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            // An aliased key collision left a non-mapping here; start over.
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(select) = entry {
            select.insert(
                sub_key.to_string(),
                Value::Array(fields.0.into_iter().map(Value::String).collect()),
            );
        }
    }

    fn append(&mut self, facet: Facet, values: impl IntoIterator<Item = Value>) {
        let key = self.param_names.get(facet).to_string();
        let entry = self
            .query_object
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(list) = entry {
            list.extend(values);
        }
    }

    /// The accumulated mapping, keyed by resolved facet names. A facet that
    /// was never set has no key. Treat the mapping as read-only once handed
    /// to a consumer.
    pub fn query_object(&self) -> &Map<String, Value> {
        &self.query_object
    }

    pub fn into_query_object(self) -> Map<String, Value> {
        self.query_object
    }

    /// The name snapshot this builder resolves facets through.
    pub fn param_names(&self) -> &ParamNames {
        &self.param_names
    }
}

fn order_by_value(order_by: OrderBy) -> Value {
    let mut map = Map::new();
    for (field, direction) in order_by.0 {
        map.insert(field, Value::String(direction.as_str().to_string()));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Condition;
    use serde_json::json;

    fn explicit() -> BuilderOptions {
        BuilderOptions::default()
    }

    #[test]
    fn fresh_builder_has_empty_mapping() {
        let qb = QueryBuilder::with_options(&explicit()).unwrap();
        assert!(qb.query_object().is_empty());
    }

    #[test]
    fn select_merges_per_sub_key() {
        let qb = QueryBuilder::with_options(&explicit())
            .unwrap()
            .select(Some(Fields::from(["a"])), Some(Fields::from(["b"])))
            .select(None, Some(Fields::from(["c"])));

        assert_eq!(
            Value::Object(qb.into_query_object()),
            json!({ "select": { "only": ["a"], "except": ["c"] } })
        );
    }

    #[test]
    fn select_with_nothing_leaves_mapping_untouched() {
        let qb = QueryBuilder::with_options(&explicit()).unwrap().select(None, None);
        assert!(qb.query_object().is_empty());
    }

    #[test]
    fn joins_and_sorts_accumulate_in_call_order() {
        let qb = QueryBuilder::with_options(&explicit())
            .unwrap()
            .set_join("profile")
            .set_join(vec!["posts", "posts.comments"])
            .set_join("profile")
            .sort_by(OrderBy::asc("name"))
            .sort_by(vec![OrderBy::desc("createdAt"), OrderBy::asc("id")]);

        assert_eq!(
            Value::Object(qb.into_query_object()),
            json!({
                "joins": ["profile", "posts", "posts.comments", "profile"],
                "orderBy": [{ "name": "asc" }, { "createdAt": "desc" }, { "id": "asc" }],
            })
        );
    }

    #[test]
    fn where_replaces_previous_value() {
        let qb = QueryBuilder::with_options(&explicit())
            .unwrap()
            .set_where(Condition::eq("a", 1))
            .unwrap()
            .set_where(Condition::eq("b", 2))
            .unwrap();

        assert_eq!(
            Value::Object(qb.into_query_object()),
            json!({ "where": { "b": { "equals": 2 } } })
        );
    }

    #[test]
    fn zero_page_is_stored() {
        let qb = QueryBuilder::with_options(&explicit())
            .unwrap()
            .set_page(0u64)
            .unwrap()
            .set_page_size(0u64)
            .unwrap();

        assert_eq!(
            Value::Object(qb.into_query_object()),
            json!({ "page": 0, "pageSize": 0 })
        );
    }

    #[test]
    fn strict_rejects_non_integer_page() {
        let half = Number::from_f64(2.5).unwrap();
        let err = QueryBuilder::with_options(&explicit())
            .unwrap()
            .set_page(half.clone())
            .unwrap_err();
        assert_eq!(err, Error::NonFiniteNumeric(Facet::Page, half));

        let err = QueryBuilder::with_options(&explicit())
            .unwrap()
            .set_page_size(-1)
            .unwrap_err();
        assert_eq!(
            err,
            Error::NonFiniteNumeric(Facet::PageSize, Number::from(-1))
        );
    }

    #[test]
    fn permissive_stores_numbers_as_given() {
        let options = BuilderOptions {
            permissive: true,
            ..BuilderOptions::default()
        };
        let qb = QueryBuilder::with_options(&options)
            .unwrap()
            .set_page(Number::from_f64(2.5).unwrap())
            .unwrap();
        assert_eq!(Value::Object(qb.into_query_object()), json!({ "page": 2.5 }));
    }

    #[test]
    fn with_options_rejects_invalid_alias() {
        let mut options = BuilderOptions::default();
        options.param_names_map.page = crate::options::ParamAlias::Aliases(vec![]);
        assert_eq!(
            QueryBuilder::with_options(&options).unwrap_err(),
            Error::InvalidAlias(Facet::Page)
        );
    }

    #[test]
    fn aliased_names_resolve_to_first_entry() {
        let mut options = BuilderOptions::default();
        options.param_names_map.r#where = crate::options::ParamAlias::from(vec!["filter", "f"]);
        options.param_names_map.page_size = crate::options::ParamAlias::from("perPage");

        let qb = QueryBuilder::with_options(&options)
            .unwrap()
            .set_where(Condition::eq("a", 1))
            .unwrap()
            .set_page_size(25)
            .unwrap();

        assert_eq!(
            Value::Object(qb.into_query_object()),
            json!({ "filter": { "a": { "equals": 1 } }, "perPage": 25 })
        );
    }
}
