use crate::util;
use regex::Regex;
use tracing::warn;

fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .inspect_err(|e| warn!(pattern, error = %e, "invalid filter pattern, passing text through"))
        .ok()
}

pub(super) fn re_search(input: &str, pattern: &str, group: usize) -> String {
    compile(pattern)
        .and_then(|re| {
            re.captures(input)
                .and_then(|caps| caps.get(group))
                .map(|m| m.as_str().to_string())
        })
        .unwrap_or_else(|| input.to_string())
}

pub(super) fn regex(input: &str, pattern: &str) -> String {
    compile(pattern)
        .and_then(|re| {
            let caps = re.captures(input)?;
            let m = if caps.len() > 1 { caps.get(1) } else { caps.get(0) };
            m.map(|m| m.as_str().to_string())
        })
        .unwrap_or_else(|| input.to_string())
}

pub(super) fn split(input: &str, separator: &str, index: i64) -> String {
    if separator.is_empty() {
        return input.to_string();
    }
    let parts: Vec<&str> = input.split(separator).collect();
    let position = if index < 0 {
        parts.len() as i64 + index
    } else {
        index
    };
    usize::try_from(position)
        .ok()
        .and_then(|i| parts.get(i))
        .map(|part| part.to_string())
        .unwrap_or_else(|| input.to_string())
}

pub(super) fn replace(input: &str, pattern: &str, replacement: &str) -> String {
    if pattern.is_empty() {
        return input.to_string();
    }
    input.replace(pattern, replacement)
}

pub(super) fn strip(input: &str, chars: Option<&str>) -> String {
    match chars {
        Some(chars) if !chars.is_empty() => input.trim_matches(|c| chars.contains(c)).to_string(),
        _ => input.trim().to_string(),
    }
}

/// Accepts a full URL, a relative link or a bare `a=1&b=2` query string.
pub(super) fn query_string(input: &str, field: &str) -> String {
    let query = input.split_once('?').map_or(input, |(_, query)| query);
    let query = query.split_once('#').map_or(query, |(query, _)| query);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == field)
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| input.to_string())
}

pub(super) fn timestamp(input: &str, format: Option<&str>) -> i64 {
    match format {
        Some(format) if !input.trim().is_empty() => util::try_timestamp_with_format(input, format)
            .unwrap_or_else(|| {
                warn!(input, format, "could not parse timestamp, using 0");
                0
            }),
        _ => util::timestamp(input),
    }
}
