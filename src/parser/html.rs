use super::{FieldMap, FieldRule, ParseError, ParsedFields, ResponseSpec, extract_fields};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::Selector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

/// Pre-compiled selectors keyed by their source text.
struct Selectors(HashMap<String, Selector>);

impl Selectors {
    fn compile<'a>(rules: impl Iterator<Item = &'a FieldRule>) -> Result<Self, ParseError> {
        let mut selectors = HashMap::new();
        for rule in rules {
            if !rule.selector.is_empty() && !selectors.contains_key(&rule.selector) {
                selectors.insert(rule.selector.clone(), compile(&rule.selector)?);
            }
        }
        Ok(Self(selectors))
    }

    fn read(&self, scope: ElementRef<'_>, rule: &FieldRule) -> Option<String> {
        let element = if rule.selector.is_empty() {
            scope
        } else {
            scope.select(self.0.get(&rule.selector)?).next()?
        };
        match &rule.attribute {
            Some(attribute) => element.value().attr(attribute).map(str::to_string),
            None => Some(element.text().collect::<String>().trim().to_string()),
        }
    }
}

fn extract(scope: ElementRef<'_>, spec: &ResponseSpec, selectors: &Selectors) -> FieldMap {
    extract_fields(&spec.fields, |rule| selectors.read(scope, rule))
}

pub(super) fn parse(body: &[u8], spec: &ResponseSpec) -> Result<ParsedFields, ParseError> {
    let html = String::from_utf8_lossy(body);
    let document = Html::parse_document(&html);
    let root = document.root_element();
    let selectors = Selectors::compile(spec.fields.values().chain(spec.next_page.iter()))?;

    let next_page = spec
        .next_page
        .as_ref()
        .and_then(|rule| rule.resolve(selectors.read(root, rule)));

    if let Some(list_selector) = &spec.list {
        let items = compile(list_selector)?;
        let list = root
            .select(&items)
            .map(|item| extract(item, spec, &selectors))
            .collect();
        return Ok(ParsedFields {
            list: Some(list),
            next_page,
            ..ParsedFields::default()
        });
    }

    Ok(ParsedFields {
        next_page,
        data: extract(root, spec, &selectors),
        ..ParsedFields::default()
    })
}
