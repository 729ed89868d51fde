//! Field filters: small text transformations applied to every extracted value.
//!
//! A filter never fails on content. When it cannot do anything useful with its
//! input it hands the original text to the next filter. Only gates
//! (`eq`, `blank`, `not_blank`) can stop a chain, in which case the field is
//! treated as absent.

mod text;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Every filter kind understood by [`Filter`], as written in site configs.
pub const FILTER_KINDS: &[&str] = &[
    "re_search",
    "regex",
    "split",
    "replace",
    "strip",
    "append_left",
    "querystring",
    "eq",
    "case",
    "not_blank",
    "blank",
    "constant",
    "byte_size",
    "timestamp",
];

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("unknown filter: {0}")]
    UnknownKind(String),

    #[error("invalid config for filter {kind}: {source}")]
    InvalidConfig {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Filter {
    /// Selects capture `group` (0 = whole match) of the first match.
    ReSearch {
        pattern: String,
        #[serde(default)]
        group: usize,
    },
    /// First capture group when the pattern has one, else the whole match.
    Regex { pattern: String },
    /// Negative indexes count from the end.
    Split {
        separator: String,
        #[serde(default)]
        index: i64,
    },
    Replace {
        pattern: String,
        #[serde(default)]
        replacement: String,
    },
    Strip {
        #[serde(default)]
        chars: Option<String>,
    },
    AppendLeft { value: String },
    #[serde(rename = "querystring")]
    QueryString { field: String },
    Eq { value: String },
    Case {
        cases: BTreeMap<String, String>,
        #[serde(default)]
        default: Option<String>,
    },
    NotBlank,
    Blank,
    Constant { value: String },
    ByteSize,
    Timestamp {
        #[serde(default)]
        format: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Value(String),
    Stop,
}

impl Filter {
    /// Builds a filter from a loose `name` + argument object, as found in
    /// hand-written or generated site definitions.
    pub fn from_descriptor(name: &str, args: Map<String, Value>) -> Result<Self, FilterError> {
        if !FILTER_KINDS.contains(&name) {
            return Err(FilterError::UnknownKind(name.to_string()));
        }
        let mut object = args;
        object.insert("name".to_string(), Value::String(name.to_string()));
        serde_json::from_value(Value::Object(object)).map_err(|source| {
            FilterError::InvalidConfig {
                kind: name.to_string(),
                source,
            }
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReSearch { .. } => "re_search",
            Self::Regex { .. } => "regex",
            Self::Split { .. } => "split",
            Self::Replace { .. } => "replace",
            Self::Strip { .. } => "strip",
            Self::AppendLeft { .. } => "append_left",
            Self::QueryString { .. } => "querystring",
            Self::Eq { .. } => "eq",
            Self::Case { .. } => "case",
            Self::NotBlank => "not_blank",
            Self::Blank => "blank",
            Self::Constant { .. } => "constant",
            Self::ByteSize => "byte_size",
            Self::Timestamp { .. } => "timestamp",
        }
    }

    pub fn apply(&self, input: &str) -> FilterOutcome {
        let value = match self {
            Self::ReSearch { pattern, group } => text::re_search(input, pattern, *group),
            Self::Regex { pattern } => text::regex(input, pattern),
            Self::Split { separator, index } => text::split(input, separator, *index),
            Self::Replace {
                pattern,
                replacement,
            } => text::replace(input, pattern, replacement),
            Self::Strip { chars } => text::strip(input, chars.as_deref()),
            Self::AppendLeft { value } => format!("{value}{input}"),
            Self::QueryString { field } => text::query_string(input, field),
            Self::Eq { value } if input == value.as_str() => input.to_string(),
            Self::Eq { .. } => return FilterOutcome::Stop,
            Self::Case { cases, default } => cases
                .get(input)
                .or(default.as_ref())
                .cloned()
                .unwrap_or_else(|| input.to_string()),
            Self::NotBlank if !input.trim().is_empty() => input.to_string(),
            Self::Blank if input.trim().is_empty() => input.to_string(),
            Self::NotBlank | Self::Blank => return FilterOutcome::Stop,
            Self::Constant { value } => value.clone(),
            Self::ByteSize => crate::util::byte_size(input).to_string(),
            Self::Timestamp { format } => text::timestamp(input, format.as_deref()).to_string(),
        };
        FilterOutcome::Value(value)
    }
}

/// Ordered list of filters applied to one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterChain(Vec<Filter>);

impl FilterChain {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self(filters)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.0
    }

    /// Runs every filter in order. `None` means a gate stopped the chain.
    pub fn apply(&self, input: &str) -> Option<String> {
        let mut current = input.to_string();
        for filter in &self.0 {
            match filter.apply(&current) {
                FilterOutcome::Value(next) => current = next,
                FilterOutcome::Stop => return None,
            }
        }
        Some(current)
    }
}

impl From<Vec<Filter>> for FilterChain {
    fn from(filters: Vec<Filter>) -> Self {
        Self::new(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain(value: Value) -> FilterChain {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_deserialize_filters_by_name() {
        let filters = chain(json!([
            {"name": "split", "separator": "/", "index": -1},
            {"name": "querystring", "field": "id"},
            {"name": "not_blank"},
            {"name": "timestamp"},
        ]));
        assert_eq!(
            filters.filters()[0],
            Filter::Split {
                separator: "/".to_string(),
                index: -1
            }
        );
        assert_eq!(filters.filters()[1].kind(), "querystring");
        assert_eq!(filters.filters()[2], Filter::NotBlank);
        assert_eq!(filters.filters()[3], Filter::Timestamp { format: None });
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let err = serde_json::from_value::<Filter>(json!({"name": "rot13"})).unwrap_err();
        assert!(err.to_string().contains("rot13"));

        let err = Filter::from_descriptor("rot13", Map::new()).unwrap_err();
        assert!(matches!(err, FilterError::UnknownKind(ref k) if k == "rot13"));
        assert_eq!(err.to_string(), "unknown filter: rot13");
    }

    #[test]
    fn test_from_descriptor() {
        let args = json!({"value": "https://example.com"});
        let filter = Filter::from_descriptor("append_left", args.as_object().unwrap().clone())
            .unwrap();
        assert_eq!(
            filter.apply("/a"),
            FilterOutcome::Value("https://example.com/a".to_string())
        );

        let err = Filter::from_descriptor("split", Map::new()).unwrap_err();
        assert!(matches!(err, FilterError::InvalidConfig { ref kind, .. } if kind == "split"));
    }

    #[test]
    fn test_every_kind_round_trips_its_name() {
        for kind in FILTER_KINDS {
            let args = match *kind {
                "re_search" | "regex" => json!({"pattern": "x"}),
                "split" => json!({"separator": ","}),
                "replace" => json!({"pattern": "x"}),
                "append_left" | "eq" | "constant" => json!({"value": "x"}),
                "querystring" => json!({"field": "x"}),
                "case" => json!({"cases": {}}),
                _ => json!({}),
            };
            let filter = Filter::from_descriptor(kind, args.as_object().unwrap().clone()).unwrap();
            assert_eq!(filter.kind(), *kind);
        }
    }

    #[test]
    fn test_chain_runs_in_order() {
        let filters = chain(json!([
            {"name": "re_search", "pattern": r"size: (\S+)", "group": 1},
            {"name": "byte_size"},
        ]));
        assert_eq!(filters.apply("size: 2KB"), Some("2048".to_string()));
    }

    #[test]
    fn test_chain_degrades_instead_of_failing() {
        let filters = chain(json!([
            {"name": "regex", "pattern": r"id=(\d+)"},
            {"name": "strip"},
        ]));
        // No match: the original text reaches the next filter untouched.
        assert_eq!(filters.apply("  no id here "), Some("no id here".to_string()));

        let byte_size = chain(json!([{"name": "byte_size"}]));
        assert_eq!(byte_size.apply("garbage"), Some("0".to_string()));

        let timestamp = chain(json!([{"name": "timestamp"}]));
        assert_eq!(timestamp.apply(""), Some("0".to_string()));
    }

    #[test]
    fn test_gates_stop_the_chain() {
        let not_blank = chain(json!([{"name": "not_blank"}, {"name": "append_left", "value": "#"}]));
        assert_eq!(not_blank.apply("   "), None);
        assert_eq!(not_blank.apply("1"), Some("#1".to_string()));

        let blank_default = chain(json!([{"name": "blank"}, {"name": "constant", "value": "0"}]));
        assert_eq!(blank_default.apply(""), Some("0".to_string()));
        assert_eq!(blank_default.apply("5"), None);

        let eq = chain(json!([{"name": "eq", "value": "free"}, {"name": "constant", "value": "1"}]));
        assert_eq!(eq.apply("free"), Some("1".to_string()));
        assert_eq!(eq.apply("paid"), None);
    }

    #[test]
    fn test_case_lookup() {
        let filters = chain(json!([
            {"name": "case", "cases": {"Free": "1", "Half": "0.5"}, "default": "0"}
        ]));
        assert_eq!(filters.apply("Half"), Some("0.5".to_string()));
        assert_eq!(filters.apply("Other"), Some("0".to_string()));

        let without_default = chain(json!([{"name": "case", "cases": {"a": "b"}}]));
        assert_eq!(without_default.apply("z"), Some("z".to_string()));
    }

    #[test]
    fn test_empty_chain_is_identity() {
        assert!(FilterChain::default().is_empty());
        assert_eq!(FilterChain::default().apply("as is"), Some("as is".to_string()));
    }
}
