use serde::{Deserialize, Serialize};

use crate::ast::{SortDir, SortKey};

pub const DEFAULT_ITEMS_PER_PAGE: u64 = 10;

/// Requested page, as received. Values below 1 are clamped on resolve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: Option<i64>,
    pub items_per_page: Option<i64>,
}

impl PageRequest {
    pub fn new(page: i64, items_per_page: i64) -> Self {
        Self {
            page: Some(page),
            items_per_page: Some(items_per_page),
        }
    }

    pub fn resolve(&self, default_items_per_page: u64) -> ResolvedPage {
        ResolvedPage {
            page: clamp(self.page, 1),
            items_per_page: clamp(self.items_per_page, default_items_per_page),
        }
    }
}

fn clamp(requested: Option<i64>, default: u64) -> u64 {
    match requested {
        Some(v) if v >= 1 => v as u64,
        Some(_) => 1,
        None => default.max(1),
    }
}

/// Page numbers after clamping; both are at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedPage {
    pub page: u64,
    pub items_per_page: u64,
}

impl ResolvedPage {
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.items_per_page)
    }
}

/// Projection and ordering for a list query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub projection: Option<Vec<String>>,
    pub sort_by: Vec<String>,
    /// Parallel to `sort_by`; a missing entry means ascending.
    pub sort_desc: Vec<bool>,
}

impl QueryOptions {
    pub fn sort_keys(&self) -> Vec<SortKey> {
        self.sort_by
            .iter()
            .enumerate()
            .map(|(i, field)| SortKey {
                field: field.clone(),
                dir: SortDir::from_desc(self.sort_desc.get(i).copied().unwrap_or(false)),
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub items_per_page: u64,
    pub total_filtered_rows: u64,
    pub total_rows: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: ResolvedPage, total_filtered_rows: u64, total_rows: u64) -> Self {
        Self {
            page: page.page,
            items_per_page: page.items_per_page,
            total_filtered_rows,
            total_rows,
            pages: total_filtered_rows.div_ceil(page.items_per_page),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}
