use modkit::ListLimits;
use serde::{Deserialize, Serialize};

/// Configuration for the catalog module (`modules.catalog` in the app config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    #[serde(default = "default_max_filter_depth")]
    pub max_filter_depth: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_filter_depth: default_max_filter_depth(),
        }
    }
}

impl CatalogConfig {
    pub fn list_limits(&self) -> ListLimits {
        ListLimits {
            default_items_per_page: self.default_page_size.max(1),
            max_items_per_page: self.max_page_size.max(1),
        }
    }
}

fn default_page_size() -> u64 {
    10
}

fn default_max_page_size() -> u64 {
    100
}

fn default_max_filter_depth() -> usize {
    query_core::DEFAULT_MAX_FILTER_DEPTH
}
