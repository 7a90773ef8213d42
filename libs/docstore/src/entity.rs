//! Per-entity query configuration.

use std::collections::HashSet;

use query_core::{FilterDocument, FilterParser, FilterSanitizer, SanitizeOptions, DEFAULT_MAX_FILTER_DEPTH};
use serde_json::Value;

pub const DEFAULT_SOFT_DELETE_FIELD: &str = "isDeleted";
pub const DEFAULT_DELETED_AT_FIELD: &str = "deletedAt";

/// How one entity is stored and which parts of it users may filter on.
///
/// Keys of the permanent filter are always treated as protected, so an
/// advanced filter can never loosen the entity invariant.
#[derive(Clone, Debug)]
pub struct EntityConfig {
    pub collection: String,
    pub permanent_filter: FilterDocument,
    pub protected_fields: HashSet<String>,
    pub allowed_fields: Option<HashSet<String>>,
    pub soft_delete_field: String,
    pub deleted_at_field: String,
    pub max_filter_depth: usize,
}

impl EntityConfig {
    /// A soft-deletable entity: permanent filter `{isDeleted: false}`.
    pub fn new(collection: impl Into<String>) -> Self {
        let mut permanent_filter = FilterDocument::new();
        permanent_filter.insert(DEFAULT_SOFT_DELETE_FIELD.to_string(), Value::Bool(false));
        Self {
            collection: collection.into(),
            permanent_filter,
            protected_fields: HashSet::new(),
            allowed_fields: None,
            soft_delete_field: DEFAULT_SOFT_DELETE_FIELD.to_string(),
            deleted_at_field: DEFAULT_DELETED_AT_FIELD.to_string(),
            max_filter_depth: DEFAULT_MAX_FILTER_DEPTH,
        }
    }

    pub fn with_permanent_filter(mut self, filter: FilterDocument) -> Self {
        self.permanent_filter = filter;
        self
    }

    pub fn with_protected_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_allowed_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_filter_depth(mut self, depth: usize) -> Self {
        self.max_filter_depth = depth;
        self
    }

    pub fn sanitize_options(&self) -> SanitizeOptions {
        let mut protected_fields = self.protected_fields.clone();
        protected_fields.extend(self.permanent_filter.keys().cloned());
        SanitizeOptions {
            allowed_fields: self.allowed_fields.clone(),
            protected_fields,
            max_depth: self.max_filter_depth,
        }
    }

    pub fn parser(&self) -> FilterParser {
        FilterParser::new(FilterSanitizer::new(self.sanitize_options()))
    }
}
