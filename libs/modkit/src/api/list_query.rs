//! Query-string extractor for list endpoints.
//!
//! Recognised parameters:
//! - `page`, `itemsPerPage` (also `items_per_page` / `items-per-page`)
//! - `sortBy`, `sortDesc`: comma separated or repeated; `sortDesc` entries
//!   pair with `sortBy` by position
//! - `fields`: comma separated projection
//! - `filters`: advanced filter JSON, passed through untouched
//! - `simpleSearch`: JSON `{"search": "...", "fields": [...]}`
//!
//! Nothing here rejects a request. Unparseable values are dropped and the
//! pagination layer clamps what is left.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use query_core::path::is_valid_field_path;
use query_core::{PageRequest, QueryOptions};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

pub const MAX_SIMPLE_SEARCH_LEN: usize = 256;

/// Page-size bounds an endpoint applies before the query reaches storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListLimits {
    pub default_items_per_page: u64,
    pub max_items_per_page: u64,
}

impl Default for ListLimits {
    fn default() -> Self {
        Self {
            default_items_per_page: query_core::DEFAULT_ITEMS_PER_PAGE,
            max_items_per_page: 100,
        }
    }
}

/// Free-text search over a set of fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SimpleSearch {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl SimpleSearch {
    /// `{"$or": [{field: {"$regex": <escaped>, "$options": "i"}}, ...]}`, or
    /// `None` when there is nothing to search for.
    pub fn to_filter(&self) -> Option<Value> {
        let term = self.search.trim();
        if term.is_empty() || term.len() > MAX_SIMPLE_SEARCH_LEN {
            return None;
        }
        let pattern = regex::escape(term);
        let terms: Vec<Value> = self
            .fields
            .iter()
            .filter(|f| is_valid_field_path(f))
            .map(|f| {
                let mut term = Map::new();
                term.insert(f.clone(), json!({"$regex": pattern, "$options": "i"}));
                Value::Object(term)
            })
            .collect();
        if terms.is_empty() {
            return None;
        }
        Some(json!({ "$or": terms }))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    pub page: PageRequest,
    pub options: QueryOptions,
    pub filters: Option<String>,
    pub simple_search: Option<SimpleSearch>,
}

impl ListQuery {
    pub fn from_query_str(raw: &str) -> Self {
        let mut out = ListQuery::default();
        let mut projection: Vec<String> = Vec::new();

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "page" => out.page.page = parse_int(&key, &value),
                "itemsPerPage" | "items_per_page" | "items-per-page" => {
                    out.page.items_per_page = parse_int(&key, &value)
                }
                "sortBy" => out.options.sort_by.extend(split_list(&value)),
                "sortDesc" => out
                    .options
                    .sort_desc
                    .extend(split_list(&value).map(|v| parse_bool(&v))),
                "fields" => projection.extend(split_list(&value)),
                "filters" => {
                    let v = value.trim();
                    out.filters = (!v.is_empty()).then(|| v.to_string());
                }
                "simpleSearch" => match serde_json::from_str::<SimpleSearch>(&value) {
                    Ok(search) => out.simple_search = Some(search),
                    Err(e) => warn!(error = %e, "ignoring malformed simpleSearch"),
                },
                _ => {}
            }
        }

        if !projection.is_empty() {
            out.options.projection = Some(projection);
        }
        out
    }

    /// Page request with the endpoint's default size filled in and its
    /// maximum applied.
    pub fn page_request(&self, limits: &ListLimits) -> PageRequest {
        let max = i64::try_from(limits.max_items_per_page).unwrap_or(i64::MAX);
        let default = i64::try_from(limits.default_items_per_page).unwrap_or(max);
        let items_per_page = match self.page.items_per_page {
            Some(n) => n.min(max),
            None => default.min(max),
        };
        PageRequest {
            page: self.page.page,
            items_per_page: Some(items_per_page),
        }
    }

    /// The advanced filter string to hand to the list executor.
    ///
    /// A simple search becomes a `$or` of regex terms. When `filters` is
    /// also given and is a JSON object, both are AND-ed; a malformed
    /// `filters` string is dropped in favour of the search alone.
    pub fn advanced_filter(&self) -> Option<String> {
        let search = self.simple_search.as_ref().and_then(SimpleSearch::to_filter);
        let Some(search) = search else {
            return self.filters.clone();
        };

        let user = self
            .filters
            .as_deref()
            .and_then(|raw| match serde_json::from_str::<Map<String, Value>>(raw) {
                Ok(map) => Some(map),
                Err(e) => {
                    debug!(error = %e, "filters not combinable with simpleSearch; using search only");
                    None
                }
            })
            .filter(|map| !map.is_empty());

        let combined = match user {
            Some(map) => json!({ "$and": [Value::Object(map), search] }),
            None => search,
        };
        Some(combined.to_string())
    }
}

impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ListQuery::from_query_str(parts.uri.query().unwrap_or("")))
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_int(key: &str, raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            debug!(param = key, value = raw, "ignoring non-integer pagination parameter");
            None
        }
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}
