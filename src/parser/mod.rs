//! Turning a response body into extracted fields.
//!
//! The adaptor only talks to the [`ResponseParser`] trait. [`FieldParser`] is
//! the stock implementation driven by a definition's `response` section; it
//! pulls raw values out of JSON (pointer paths) or HTML (CSS selectors) and
//! passes each one through its filter chain.

mod html;
mod json;

use crate::filter::FilterChain;
use crate::site::{RequestDefinition, SiteConfig};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Reserved top-level keys of a parser result.
pub const KEY_LIST: &str = "list";
pub const KEY_RAW: &str = "raw";
pub const KEY_NEXT_PAGE: &str = "next_page";

pub type FieldMap = Map<String, Value>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("unexpected shape: {0}")]
    Shape(String),
}

pub trait ResponseParser: Send + Sync {
    fn parse(
        &self,
        body: &[u8],
        site: &SiteConfig,
        definition: &RequestDefinition,
    ) -> Result<ParsedFields, ParseError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    #[default]
    Json,
    Html,
    Raw,
}

/// Extraction rules attached to a request definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseSpec {
    pub kind: ResponseKind,
    /// Selector of the repeated item. When set the result is a list.
    pub list: Option<String>,
    pub fields: BTreeMap<String, FieldRule>,
    pub next_page: Option<FieldRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRule {
    /// JSON pointer / dotted path, or CSS selector. Empty selects the scope itself.
    pub selector: String,
    /// HTML only: read this attribute instead of the text content.
    pub attribute: Option<String>,
    pub filters: FilterChain,
    pub default: Option<String>,
}

impl FieldRule {
    /// Runs the filter chain over a raw value, falling back to `default`.
    pub fn resolve(&self, raw: Option<String>) -> Option<String> {
        raw.and_then(|text| self.filters.apply(&text))
            .or_else(|| self.default.clone())
    }
}

/// Parser output, already split by reserved key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFields {
    pub list: Option<Vec<FieldMap>>,
    pub raw: Option<Bytes>,
    pub next_page: Option<String>,
    pub data: FieldMap,
}

impl ParsedFields {
    /// Splits a map using the reserved keys `list`, `raw` and `next_page`;
    /// every other key belongs to the flat data object.
    pub fn from_map(mut map: FieldMap) -> Result<Self, ParseError> {
        let list = match map.remove(KEY_LIST) {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(fields) => Ok(fields),
                        other => Err(ParseError::Shape(format!(
                            "list entries must be objects, got {other}"
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(other) => {
                return Err(ParseError::Shape(format!("'list' must be an array, got {other}")));
            }
        };

        let raw = match map.remove(KEY_RAW) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(Bytes::from(text)),
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .map(Bytes::from)
                    .ok_or_else(|| ParseError::Shape("'raw' must be a byte array".to_string()))?,
            ),
            Some(other) => {
                return Err(ParseError::Shape(format!("'raw' must be bytes, got {other}")));
            }
        };

        let next_page = match map.remove(KEY_NEXT_PAGE) {
            None | Some(Value::Null) => None,
            Some(Value::String(token)) => Some(token),
            Some(other) => Some(other.to_string()),
        };

        Ok(Self {
            list,
            raw,
            next_page,
            data: map,
        })
    }
}

/// Default parser driven by [`ResponseSpec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldParser;

impl ResponseParser for FieldParser {
    fn parse(
        &self,
        body: &[u8],
        _site: &SiteConfig,
        definition: &RequestDefinition,
    ) -> Result<ParsedFields, ParseError> {
        let spec = &definition.response;
        match spec.kind {
            ResponseKind::Raw => Ok(ParsedFields {
                raw: Some(Bytes::copy_from_slice(body)),
                ..ParsedFields::default()
            }),
            ResponseKind::Json => json::parse(body, spec),
            ResponseKind::Html => html::parse(body, spec),
        }
    }
}

/// Adapts a parser that returns a single reserved-key map (`list`, `raw`,
/// `next_page`, everything else is data) into a [`ResponseParser`].
pub struct MapParser<F>(pub F);

impl<F> ResponseParser for MapParser<F>
where
    F: Fn(&[u8], &SiteConfig, &RequestDefinition) -> Result<FieldMap, ParseError> + Send + Sync,
{
    fn parse(
        &self,
        body: &[u8],
        site: &SiteConfig,
        definition: &RequestDefinition,
    ) -> Result<ParsedFields, ParseError> {
        ParsedFields::from_map((self.0)(body, site, definition)?)
    }
}

/// Applies every rule of `fields` using `lookup` to read the raw value.
fn extract_fields<F>(fields: &BTreeMap<String, FieldRule>, mut lookup: F) -> FieldMap
where
    F: FnMut(&FieldRule) -> Option<String>,
{
    fields
        .iter()
        .filter_map(|(name, rule)| {
            rule.resolve(lookup(rule))
                .map(|value| (name.clone(), Value::String(value)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> FieldMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_map_parser_splits_reserved_keys() {
        let parser = MapParser(
            |body: &[u8], _: &SiteConfig, _: &RequestDefinition| -> Result<FieldMap, ParseError> {
                let rows: Value = serde_json::from_slice(body)?;
                Ok(map(json!({"list": rows, "next_page": "p2"})))
            },
        );
        let parsed = parser
            .parse(
                br#"[{"id": "1"}]"#,
                &SiteConfig::default(),
                &RequestDefinition::default(),
            )
            .unwrap();
        assert_eq!(parsed.list, Some(vec![map(json!({"id": "1"}))]));
        assert_eq!(parsed.next_page.as_deref(), Some("p2"));

        let bad = MapParser(
            |_: &[u8], _: &SiteConfig, _: &RequestDefinition| -> Result<FieldMap, ParseError> {
                Ok(map(json!({"raw": 7})))
            },
        );
        assert!(matches!(
            bad.parse(b"", &SiteConfig::default(), &RequestDefinition::default()),
            Err(ParseError::Shape(_))
        ));
    }

    #[test]
    fn test_from_map_reserved_keys() {
        let parsed = ParsedFields::from_map(map(json!({
            "list": [{"title": "a"}, {"title": "b"}],
            "raw": "bytes",
            "next_page": "2",
            "total": "9",
        })))
        .unwrap();
        assert_eq!(parsed.list.as_ref().unwrap().len(), 2);
        assert_eq!(parsed.raw, Some(Bytes::from_static(b"bytes")));
        assert_eq!(parsed.next_page.as_deref(), Some("2"));
        assert_eq!(parsed.data, map(json!({"total": "9"})));
    }

    #[test]
    fn test_from_map_plain_data() {
        let parsed = ParsedFields::from_map(map(json!({"id": 1, "next_page": 3}))).unwrap();
        assert!(parsed.list.is_none());
        assert!(parsed.raw.is_none());
        assert_eq!(parsed.next_page.as_deref(), Some("3"));
        assert_eq!(parsed.data, map(json!({"id": 1})));
    }

    #[test]
    fn test_from_map_rejects_bad_shapes() {
        assert!(matches!(
            ParsedFields::from_map(map(json!({"list": {"a": 1}}))),
            Err(ParseError::Shape(_))
        ));
        assert!(matches!(
            ParsedFields::from_map(map(json!({"list": [1, 2]}))),
            Err(ParseError::Shape(_))
        ));
        assert!(matches!(
            ParsedFields::from_map(map(json!({"raw": [1, 300]}))),
            Err(ParseError::Shape(_))
        ));
    }

    #[test]
    fn test_field_rule_default() {
        let rule: FieldRule = serde_json::from_value(json!({
            "selector": "/size",
            "filters": [{"name": "not_blank"}],
            "default": "0"
        }))
        .unwrap();
        assert_eq!(rule.resolve(Some("  ".to_string())), Some("0".to_string()));
        assert_eq!(rule.resolve(None), Some("0".to_string()));
        assert_eq!(rule.resolve(Some("5".to_string())), Some("5".to_string()));
    }

    #[test]
    fn test_raw_kind_returns_body() {
        let definition = RequestDefinition {
            response: ResponseSpec {
                kind: ResponseKind::Raw,
                ..ResponseSpec::default()
            },
            ..RequestDefinition::get("/file")
        };
        let parsed = FieldParser
            .parse(b"\x00\x01", &SiteConfig::default(), &definition)
            .unwrap();
        assert_eq!(parsed.raw.as_deref(), Some(&b"\x00\x01"[..]));
    }
}
