// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use regex::Regex;

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("markup pattern is valid"));

/// Strip markup tags, decode `&lt;`, `&gt;` and `&amp;`, and trim
pub fn clean_text(text: &str) -> String {
    let stripped = MARKUP_TAG.replace_all(text, "");

    // &amp; last so "&amp;lt;" decodes to a literal "&lt;"
    stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Parse a feed date, returning `None` when it is not understood
///
/// Handles RFC 2822 dates as used by RSS, RFC 3339 timestamps as used by
/// JSON APIs, and a few relaxed variants of both.
pub fn parse_pub_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc2822(text)
        .or_else(|_| DateTime::parse_from_rfc3339(text))
        .ok()
        .or_else(|| parse_relaxed_date(text))
}

/// Try to parse dates that don't strictly conform to RFC 2822 or RFC 3339
fn parse_relaxed_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let formats = [
        "%a, %d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S %z",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S %z",
    ];

    for format in formats {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    // Timestamps without an offset are taken as UTC
    let naive_formats = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];
    naive_formats.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(text, format)
            .ok()
            .map(|naive| naive.and_utc().fixed_offset())
    })
}

/// Parse an iTunes-style duration (`SS`, `MM:SS` or `HH:MM:SS`) into milliseconds
pub fn parse_duration_ms(text: &str) -> Option<u64> {
    let parts: Vec<u64> = text
        .trim()
        .split(':')
        .map(|part| part.trim().parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;

    let seconds = match parts.as_slice() {
        [s] => Some(*s),
        [m, s] => m.checked_mul(60)?.checked_add(*s),
        [h, m, s] => h
            .checked_mul(3600)?
            .checked_add(m.checked_mul(60)?)?
            .checked_add(*s),
        _ => None,
    }?;

    seconds.checked_mul(1000)
}

/// Parse a numeric seconds value (integer or decimal) into milliseconds
pub fn parse_seconds_ms(text: &str) -> Option<u64> {
    let text = text.trim();
    if let Ok(seconds) = text.parse::<u64>() {
        return seconds.checked_mul(1000);
    }

    text.parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| (s * 1000.0).round() as u64)
}
