//! Request and response types shared by REST handlers.

pub mod list_query;
pub mod problem;
pub mod response;

pub use list_query::{ListLimits, ListQuery, SimpleSearch};
pub use problem::{Problem, ProblemResponse, ValidationError, APPLICATION_PROBLEM_JSON};
pub use response::{created_json, no_content, ok_json, JsonPage};
