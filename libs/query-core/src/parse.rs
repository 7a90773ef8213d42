//! Turns an optional JSON filter string into a native-dialect document.

use serde_json::Value;
use tracing::{debug, error};

use crate::dialect::{self, FilterDocument};
use crate::sanitize::FilterSanitizer;

/// Parses advanced and contextual filter strings.
///
/// Every failure degrades to an empty filter: malformed input never fails
/// the request, it just stops constraining it.
#[derive(Clone, Debug, Default)]
pub struct FilterParser {
    sanitizer: FilterSanitizer,
}

impl FilterParser {
    pub fn new(sanitizer: FilterSanitizer) -> Self {
        Self { sanitizer }
    }

    pub fn sanitizer(&self) -> &FilterSanitizer {
        &self.sanitizer
    }

    pub fn parse(&self, raw: Option<&str>, should_sanitize: bool) -> FilterDocument {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return FilterDocument::new();
        };

        // The raw text is user input; log its size, never its content.
        let doc = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                error!(
                    kind = json_kind(&other),
                    len = raw.len(),
                    "filter must be a JSON object; ignoring it"
                );
                return FilterDocument::new();
            }
            Err(e) => {
                error!(error = %e, len = raw.len(), "failed to parse filter JSON; ignoring it");
                return FilterDocument::new();
            }
        };

        let doc = if should_sanitize {
            self.sanitizer.sanitize(&doc).filter
        } else {
            doc
        };

        let native = match dialect::translate(&doc) {
            Ok(native) => native,
            Err(e) => {
                error!(error = %e, "failed to translate filter operators; ignoring filter");
                return FilterDocument::new();
            }
        };

        if let Err(e) = dialect::to_expr(&native) {
            error!(error = %e, "filter does not compile; ignoring filter");
            return FilterDocument::new();
        }

        debug!(keys = native.len(), sanitized = should_sanitize, "parsed filter");
        native
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
