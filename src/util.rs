//! Best-effort text conversions shared by the filters and the decoder.
//!
//! Every conversion comes in two flavours: a `try_*` function that reports
//! failure as `None`, and a plain function that logs the failure and falls
//! back to the type's zero value. Field extraction uses the plain flavour so
//! one malformed value never aborts a whole page.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static UNIT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[KMGTPI]*B?").unwrap());

const KIB: f64 = 1024.0;

/// Naive layouts tried in order by [`try_timestamp`]; interpreted in local time.
const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y%m%d%H%M%S",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

pub fn is_full_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Converts a human readable size such as `1.5 GiB` or `2,048KB` to bytes.
pub fn try_byte_size(text: &str) -> Option<i64> {
    let normalized: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\n' | '\r' | '\t'))
        .collect::<String>()
        .to_uppercase();
    if normalized.is_empty() {
        return None;
    }

    let numeral = UNIT_REGEX.replace_all(&normalized, "");
    let size: f64 = numeral.parse().ok().filter(|v: &f64| v.is_finite())?;

    // Longest unit first so "PB" is never read as a smaller unit.
    let multiplier = if normalized.contains('P') {
        KIB.powi(5)
    } else if normalized.contains('T') {
        KIB.powi(4)
    } else if normalized.contains('G') {
        KIB.powi(3)
    } else if normalized.contains('M') {
        KIB.powi(2)
    } else if normalized.contains('K') {
        KIB
    } else {
        1.0
    };

    Some((size * multiplier + 0.5) as i64)
}

pub fn byte_size(text: &str) -> i64 {
    if text.is_empty() {
        return 0;
    }
    try_byte_size(text).unwrap_or_else(|| {
        warn!(input = %text, "could not parse byte size, using 0");
        0
    })
}

fn strip_separators(text: &str) -> String {
    text.trim().replace(',', "")
}

pub fn try_parse_int(text: &str) -> Option<i64> {
    strip_separators(text).parse().ok()
}

pub fn parse_int(text: &str) -> i64 {
    if text.is_empty() {
        return 0;
    }
    try_parse_int(text).unwrap_or_else(|| {
        warn!(input = %text, "could not parse integer, using 0");
        0
    })
}

pub fn try_parse_f64(text: &str) -> Option<f64> {
    strip_separators(text).parse().ok()
}

pub fn parse_f64(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    try_parse_f64(text).unwrap_or_else(|| {
        warn!(input = %text, "could not parse float, using 0");
        0.0
    })
}

pub fn try_parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

pub fn parse_bool(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    try_parse_bool(text).unwrap_or_else(|| {
        warn!(input = %text, "could not parse bool, using false");
        false
    })
}

fn local_timestamp(naive: NaiveDateTime) -> Option<i64> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
}

/// Parses a date/time string into a Unix timestamp (seconds).
pub fn try_timestamp(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.bytes().all(|b| b.is_ascii_digit()) {
        match text.len() {
            10 => return text.parse().ok(),
            13 => return text.parse::<i64>().ok().map(|ms| ms / 1000),
            _ => {}
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.timestamp());
    }
    for layout in DATETIME_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return local_timestamp(naive);
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(text, layout) {
            return local_timestamp(date.and_hms_opt(0, 0, 0)?);
        }
    }
    None
}

/// Like [`try_timestamp`] but with an explicit chrono layout. Layouts carrying
/// an offset (`%z`, `%:z`) are honoured, anything else is read as local time.
pub fn try_timestamp_with_format(text: &str, format: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_str(text, format) {
        return Some(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
        return local_timestamp(naive);
    }
    NaiveDate::parse_from_str(text, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(local_timestamp)
}

pub fn timestamp(text: &str) -> i64 {
    if text.trim().is_empty() {
        return 0;
    }
    try_timestamp(text).unwrap_or_else(|| {
        warn!(input = %text, "could not parse timestamp, using 0");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_byte_size_units() {
        assert_eq!(byte_size("1.5GB"), 1_610_612_736);
        assert_eq!(byte_size("2KB"), 2048);
        assert_eq!(byte_size("2k"), 2048);
        assert_eq!(byte_size("1 MiB"), 1_048_576);
        assert_eq!(byte_size("1,024 B"), 1024);
        assert_eq!(byte_size("3\n TB"), 3 * 1024_i64.pow(4));
        assert_eq!(byte_size("1PIB"), 1024_i64.pow(5));
        assert_eq!(byte_size("512"), 512);
    }

    #[test]
    fn test_byte_size_rounds_half_up() {
        // 0.0005 KB = 0.512 bytes
        assert_eq!(byte_size("0.0005KB"), 1);
        assert_eq!(byte_size("0.0004KB"), 0);
    }

    #[test]
    fn test_byte_size_garbage_degrades_to_zero() {
        assert_eq!(byte_size("garbage"), 0);
        assert_eq!(byte_size(""), 0);
        assert_eq!(try_byte_size("garbage"), None);
        assert_eq!(try_byte_size("NaN"), None);
        // A genuine zero is distinguishable from a failed parse.
        assert_eq!(try_byte_size("0 KB"), Some(0));
    }

    #[test]
    fn test_parse_numbers_with_separators() {
        assert_eq!(parse_int("12,345"), 12345);
        assert_eq!(parse_int("-1,000"), -1000);
        assert_eq!(parse_int("12a"), 0);
        assert_eq!(try_parse_int("12a"), None);
        assert_eq!(parse_f64("1,234.5"), 1234.5);
        assert_eq!(parse_f64("x"), 0.0);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("False"));
        assert!(!parse_bool("yes"));
        assert_eq!(try_parse_bool("yes"), None);
        assert_eq!(try_parse_bool("F"), Some(false));
    }

    #[test]
    fn test_is_full_url() {
        assert!(is_full_url("http://x"));
        assert!(is_full_url("https://x"));
        assert!(!is_full_url("/x"));
        assert!(!is_full_url("ftp://x"));
    }

    #[test]
    fn test_timestamp_formats() {
        assert_eq!(timestamp("2024-01-02T03:04:05Z"), 1_704_164_645);
        assert_eq!(timestamp("2024-01-02T05:04:05+02:00"), 1_704_164_645);
        assert_eq!(timestamp("Tue, 02 Jan 2024 03:04:05 +0000"), 1_704_164_645);
        assert_eq!(timestamp("1704164645"), 1_704_164_645);
        assert_eq!(timestamp("1704164645123"), 1_704_164_645);

        let naive = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let expected = Local.from_local_datetime(&naive).earliest().unwrap().timestamp();
        assert_eq!(timestamp("2024-01-02 03:04:05"), expected);
    }

    #[test]
    fn test_timestamp_degrades_to_zero() {
        assert_eq!(timestamp(""), 0);
        assert_eq!(timestamp("yesterday-ish"), 0);
        assert_eq!(try_timestamp("yesterday-ish"), None);
    }

    #[test]
    fn test_timestamp_with_format() {
        assert_eq!(
            try_timestamp_with_format("02/01/2024 03:04:05 +0000", "%d/%m/%Y %H:%M:%S %z"),
            Some(1_704_164_645)
        );
        assert_eq!(try_timestamp_with_format("nope", "%d/%m/%Y"), None);
    }

    proptest! {
        #[test]
        fn prop_byte_size_matches_multiplier(
            whole in 0u32..100_000,
            unit_index in 0usize..5,
            suffix in prop::sample::select(vec!["", "B", "IB"]),
            lower in any::<bool>(),
        ) {
            let units = ["K", "M", "G", "T", "P"];
            let unit = format!("{}{}", units[unit_index], suffix);
            let unit = if lower { unit.to_lowercase() } else { unit };
            let expected = (whole as f64 * KIB.powi(unit_index as i32 + 1) + 0.5) as i64;
            prop_assert_eq!(byte_size(&format!("{whole}{unit}")), expected);
            prop_assert_eq!(byte_size(&format!("{whole} {unit}")), expected);
        }
    }
}
