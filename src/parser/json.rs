use super::{FieldMap, ParseError, ParsedFields, ResponseSpec, extract_fields};
use serde_json::Value;
use tracing::debug;

/// Resolves a JSON pointer (`/a/0/b`) or dotted path (`a.0.b`).
fn lookup<'a>(value: &'a Value, selector: &str) -> Option<&'a Value> {
    if selector.is_empty() {
        Some(value)
    } else if selector.starts_with('/') {
        value.pointer(selector)
    } else {
        value.pointer(&format!("/{}", selector.replace('.', "/")))
    }
}

fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn extract(scope: &Value, spec: &ResponseSpec) -> FieldMap {
    extract_fields(&spec.fields, |rule| {
        lookup(scope, &rule.selector).and_then(to_text)
    })
}

pub(super) fn parse(body: &[u8], spec: &ResponseSpec) -> Result<ParsedFields, ParseError> {
    let document: Value = serde_json::from_slice(body)?;

    let next_page = spec.next_page.as_ref().and_then(|rule| {
        rule.resolve(lookup(&document, &rule.selector).and_then(to_text))
    });

    if let Some(list_selector) = &spec.list {
        let list = match lookup(&document, list_selector) {
            Some(Value::Array(items)) if spec.fields.is_empty() => items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map.clone()),
                    other => Err(ParseError::Shape(format!(
                        "list item is not a json object: {other}"
                    ))),
                })
                .collect::<Result<_, _>>()?,
            Some(Value::Array(items)) => items.iter().map(|item| extract(item, spec)).collect(),
            None | Some(Value::Null) => {
                debug!(selector = %list_selector, "list selector matched nothing");
                Vec::new()
            }
            Some(_) => {
                return Err(ParseError::Shape(format!(
                    "list selector '{list_selector}' does not point at an array"
                )));
            }
        };
        return Ok(ParsedFields {
            list: Some(list),
            next_page,
            ..ParsedFields::default()
        });
    }

    // Without rules the whole object passes through as data.
    let data = if spec.fields.is_empty() {
        match document {
            Value::Object(map) => map,
            other => {
                return Err(ParseError::Shape(format!(
                    "expected a json object, got {other}"
                )));
            }
        }
    } else {
        extract(&document, spec)
    };

    Ok(ParsedFields {
        next_page,
        data,
        ..ParsedFields::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> ResponseSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_lookup_pointer_and_dotted() {
        let doc = json!({"data": {"items": [{"id": 7}]}});
        assert_eq!(lookup(&doc, "/data/items/0/id"), Some(&json!(7)));
        assert_eq!(lookup(&doc, "data.items.0.id"), Some(&json!(7)));
        assert_eq!(lookup(&doc, ""), Some(&doc));
        assert_eq!(lookup(&doc, "data.missing"), None);
    }

    #[test]
    fn test_parse_list_with_filters() {
        let body = br#"{
            "data": {
                "torrents": [
                    {"title": " First ", "size": "1.5GB", "link": "/dl?id=1"},
                    {"title": "Second", "size": 2048, "link": "/dl?id=2"}
                ],
                "next": "cursor-2"
            }
        }"#;
        let spec = spec(json!({
            "list": "/data/torrents",
            "fields": {
                "title": {"selector": "title", "filters": [{"name": "strip"}]},
                "size": {"selector": "size", "filters": [{"name": "byte_size"}]},
                "id": {"selector": "link", "filters": [{"name": "querystring", "field": "id"}]},
                "missing": {"selector": "nope"}
            },
            "next_page": {"selector": "/data/next"}
        }));

        let parsed = parse(body, &spec).unwrap();
        let list = parsed.list.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["title"], json!("First"));
        assert_eq!(list[0]["size"], json!("1610612736"));
        assert_eq!(list[1]["size"], json!("2048"));
        assert_eq!(list[1]["id"], json!("2"));
        assert!(!list[0].contains_key("missing"));
        assert_eq!(parsed.next_page.as_deref(), Some("cursor-2"));
    }

    #[test]
    fn test_parse_missing_list_is_empty() {
        let parsed = parse(br#"{"data": {}}"#, &spec(json!({"list": "/data/rows"}))).unwrap();
        assert_eq!(parsed.list, Some(Vec::new()));
    }

    #[test]
    fn test_parse_list_items_pass_through_without_fields() {
        let parsed = parse(
            br#"{"rows": [{"id": 1}, {"id": 2, "name": "b"}]}"#,
            &spec(json!({"list": "/rows"})),
        )
        .unwrap();
        let list = parsed.list.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["id"], json!(1));
        assert_eq!(list[1]["name"], json!("b"));

        let result = parse(br#"{"rows": [1, 2]}"#, &spec(json!({"list": "/rows"})));
        assert!(matches!(result, Err(ParseError::Shape(_))));
    }

    #[test]
    fn test_parse_list_wrong_shape() {
        let result = parse(br#"{"rows": {"a": 1}}"#, &spec(json!({"list": "/rows"})));
        assert!(matches!(result, Err(ParseError::Shape(_))));
    }

    #[test]
    fn test_parse_data_passthrough_and_invalid_json() {
        let parsed = parse(br#"{"uid": 3, "ratio": "1.2"}"#, &ResponseSpec::default()).unwrap();
        assert_eq!(parsed.data["uid"], json!(3));
        assert!(parsed.list.is_none());

        assert!(matches!(
            parse(b"<html>", &ResponseSpec::default()),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(
            parse(b"[1]", &ResponseSpec::default()),
            Err(ParseError::Shape(_))
        ));
    }
}
