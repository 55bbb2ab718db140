//! # Quarry
//!
//! Quarry builds the *representation* of a data query — filter predicates,
//! joins, field selection, sort order, and pagination — as a canonical
//! nested mapping ready to hand to a remote data-access API. It never talks
//! to storage and never serializes a transport string; it only produces the
//! mapping (and carries the delimiter configuration) that an external
//! serializer consumes.
//!
//! ## What's inside
//!
//! ### Typed filter trees
//! Predicates are a closed sum type: leaf conditions, AND/OR combinators,
//! and NOT negations. The tree lowers recursively into the nested mapping
//! the remote side expects:
//!
//! ```rust
//! use quarry::{Condition, Filter, QueryBuilder};
//! use serde_json::json;
//!
//! let qb = QueryBuilder::create(None)
//!     .unwrap()
//!     .set_where(Filter::all_of(vec![
//!         Condition::gt("age", 18).into(),
//!         Filter::not(Condition::eq("banned", true).into()),
//!     ]))
//!     .unwrap()
//!     .set_page(2)
//!     .unwrap();
//!
//! assert_eq!(
//!     serde_json::Value::Object(qb.into_query_object()),
//!     json!({
//!         "where": { "AND": [
//!             { "age": { "gt": 18 } },
//!             { "NOT": { "banned": { "equals": true } } },
//!         ]},
//!         "page": 2,
//!     })
//! );
//! ```
//!
//! ### Aliasable parameter names
//! Every facet key (`where`, `joins`, `select`, `orderBy`, `page`,
//! `pageSize`) can be renamed through the options registry, globally or per
//! builder. A builder snapshots its resolved names at construction; later
//! registry changes never affect it.
//!
//! ### Strict by default, permissive on request
//! Malformed input — an empty AND/OR, a condition without a field, a
//! fractional page number — fails fast at the offending call. The
//! `permissive` option restores the legacy behavior of silently dropping or
//! coercing instead.

pub mod builder;
pub mod canonical;
pub mod error;
pub mod filter;
pub mod options;

pub use crate::builder::{CreateQueryParams, ParamNames, QueryBuilder};
pub use crate::canonical::canonical_filter;
pub use crate::error::Error;
pub use crate::filter::{
    CompareOperator, Condition, Field, Fields, Filter, OrderBy, OrderByList, SortDirection,
};
pub use crate::options::{
    BuilderOptions, BuilderOptionsPatch, Facet, ParamAlias, ParamNamesMap, ParamNamesPatch,
    get_options, set_options,
};
