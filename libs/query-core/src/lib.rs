//! Filter and pagination primitives for document-store list queries.
//!
//! Pipeline: a user filter string is parsed ([`FilterParser`]), optionally
//! sanitized ([`FilterSanitizer`]), translated to the native dialect, merged
//! with the entity's permanent filter ([`merge_filters`]) and compiled to an
//! [`ast::Expr`] that storage backends execute.

pub mod ast;
pub mod dialect;
pub mod error;
pub mod merge;
pub mod page;
pub mod parse;
pub mod path;
pub mod sanitize;

pub use ast::{CompareOperator, Expr, SortDir, SortKey};
pub use dialect::{to_expr, translate, FilterDocument};
pub use error::Error;
pub use merge::{merge_filters, merge_layers};
pub use page::{
    PageRequest, Paginated, Pagination, QueryOptions, ResolvedPage, DEFAULT_ITEMS_PER_PAGE,
};
pub use parse::FilterParser;
pub use sanitize::{FilterSanitizer, SanitizeOptions, Sanitized, Violation, DEFAULT_MAX_FILTER_DEPTH};
