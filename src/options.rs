use std::sync::RwLock;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;

/// One named concern of a query: the key it is emitted under is resolved
/// through the alias table at builder construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facet {
    Where,
    Joins,
    Select,
    OrderBy,
    Page,
    PageSize,
}

impl Facet {
    pub const ALL: [Facet; 6] = [
        Facet::Where,
        Facet::Joins,
        Facet::Select,
        Facet::OrderBy,
        Facet::Page,
        Facet::PageSize,
    ];

    /// The identity output key used when no alias is configured.
    pub fn default_name(self) -> &'static str {
        match self {
            Facet::Where => "where",
            Facet::Joins => "joins",
            Facet::Select => "select",
            Facet::OrderBy => "orderBy",
            Facet::Page => "page",
            Facet::PageSize => "pageSize",
        }
    }
}

/// A parameter name override: a single name, or an ordered list of aliases.
/// Only the first alias is ever used as the resolved key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamAlias {
    Name(String),
    Aliases(Vec<String>),
}

impl ParamAlias {
    /// The output key this alias resolves to, if it is well formed.
    pub fn resolved(&self) -> Option<&str> {
        match self {
            ParamAlias::Name(name) if !name.is_empty() => Some(name),
            ParamAlias::Aliases(names) => names
                .first()
                .filter(|name| !name.is_empty())
                .map(String::as_str),
            ParamAlias::Name(_) => None,
        }
    }

    fn validate(&self, facet: Facet) -> Result<(), Error> {
        match self.resolved() {
            Some(_) => Ok(()),
            None => Err(Error::InvalidAlias(facet)),
        }
    }
}

impl From<&str> for ParamAlias {
    fn from(name: &str) -> Self {
        ParamAlias::Name(name.to_string())
    }
}

impl From<String> for ParamAlias {
    fn from(name: String) -> Self {
        ParamAlias::Name(name)
    }
}

impl From<Vec<&str>> for ParamAlias {
    fn from(names: Vec<&str>) -> Self {
        ParamAlias::Aliases(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for ParamAlias {
    fn from(names: Vec<String>) -> Self {
        ParamAlias::Aliases(names)
    }
}

/// Full alias table: one entry per facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamNamesMap {
    pub r#where: ParamAlias,
    pub joins: ParamAlias,
    pub select: ParamAlias,
    pub order_by: ParamAlias,
    pub page: ParamAlias,
    pub page_size: ParamAlias,
}

impl Default for ParamNamesMap {
    fn default() -> Self {
        Self {
            r#where: ParamAlias::from(Facet::Where.default_name()),
            joins: ParamAlias::from(Facet::Joins.default_name()),
            select: ParamAlias::from(Facet::Select.default_name()),
            order_by: ParamAlias::from(Facet::OrderBy.default_name()),
            page: ParamAlias::from(Facet::Page.default_name()),
            page_size: ParamAlias::from(Facet::PageSize.default_name()),
        }
    }
}

impl ParamNamesMap {
    pub fn get(&self, facet: Facet) -> &ParamAlias {
        match facet {
            Facet::Where => &self.r#where,
            Facet::Joins => &self.joins,
            Facet::Select => &self.select,
            Facet::OrderBy => &self.order_by,
            Facet::Page => &self.page,
            Facet::PageSize => &self.page_size,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        for facet in Facet::ALL {
            self.get(facet).validate(facet)?;
        }
        Ok(())
    }

    fn merge(&mut self, patch: ParamNamesPatch) {
        if let Some(alias) = patch.r#where {
            self.r#where = alias;
        }
        if let Some(alias) = patch.joins {
            self.joins = alias;
        }
        if let Some(alias) = patch.select {
            self.select = alias;
        }
        if let Some(alias) = patch.order_by {
            self.order_by = alias;
        }
        if let Some(alias) = patch.page {
            self.page = alias;
        }
        if let Some(alias) = patch.page_size {
            self.page_size = alias;
        }
    }
}

/// Partial alias override; absent entries keep the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParamNamesPatch {
    pub r#where: Option<ParamAlias>,
    pub joins: Option<ParamAlias>,
    pub select: Option<ParamAlias>,
    pub order_by: Option<ParamAlias>,
    pub page: Option<ParamAlias>,
    pub page_size: Option<ParamAlias>,
}

impl ParamNamesPatch {
    pub fn with(mut self, facet: Facet, alias: impl Into<ParamAlias>) -> Self {
        let slot = match facet {
            Facet::Where => &mut self.r#where,
            Facet::Joins => &mut self.joins,
            Facet::Select => &mut self.select,
            Facet::OrderBy => &mut self.order_by,
            Facet::Page => &mut self.page,
            Facet::PageSize => &mut self.page_size,
        };
        *slot = Some(alias.into());
        self
    }

    fn validate(&self) -> Result<(), Error> {
        for facet in Facet::ALL {
            let slot = match facet {
                Facet::Where => &self.r#where,
                Facet::Joins => &self.joins,
                Facet::Select => &self.select,
                Facet::OrderBy => &self.order_by,
                Facet::Page => &self.page,
                Facet::PageSize => &self.page_size,
            };
            if let Some(alias) = slot {
                alias.validate(facet)?;
            }
        }
        Ok(())
    }
}

/// Builder configuration. `delim` and `delim_str` are carried for the
/// external query-string serializer; this crate never consumes them.
/// `permissive` restores the legacy silent-coercion behavior: malformed
/// filters are dropped instead of rejected and numeric facets are stored
/// as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderOptions {
    pub delim: String,
    pub delim_str: String,
    pub param_names_map: ParamNamesMap,
    pub permissive: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            delim: "||".to_string(),
            delim_str: ",".to_string(),
            param_names_map: ParamNamesMap::default(),
            permissive: false,
        }
    }
}

/// Partial configuration override for `set_options`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuilderOptionsPatch {
    pub delim: Option<String>,
    pub delim_str: Option<String>,
    pub param_names_map: ParamNamesPatch,
    pub permissive: Option<bool>,
}

static OPTIONS: Lazy<RwLock<BuilderOptions>> =
    Lazy::new(|| RwLock::new(BuilderOptions::default()));

/// Merge a partial override into the process-wide registry.
///
/// Alias entries are validated before anything is applied, so a failed call
/// leaves the registry unchanged. Builders constructed before this call keep
/// their resolved names; only builders constructed afterwards observe the
/// new configuration. Configure once at startup, or serialize reconfiguration
/// and builder construction through an external lock.
pub fn set_options(patch: BuilderOptionsPatch) -> Result<(), Error> {
    patch.param_names_map.validate()?;

    let mut options = OPTIONS.write().unwrap_or_else(|e| e.into_inner());
    if let Some(delim) = patch.delim {
        options.delim = delim;
    }
    if let Some(delim_str) = patch.delim_str {
        options.delim_str = delim_str;
    }
    if let Some(permissive) = patch.permissive {
        options.permissive = permissive;
    }
    options.param_names_map.merge(patch.param_names_map);
    debug!("query builder options updated");
    Ok(())
}

/// The current full registry state.
pub fn get_options() -> BuilderOptions {
    OPTIONS.read().unwrap_or_else(|e| e.into_inner()).clone()
}
