// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// A feed body classified by its structure, carrying the parsed document
#[derive(Debug, Clone)]
pub enum Format {
    /// RSS document whose channel has at least one item
    Xml(Box<rss::Channel>),
    /// JSON object with an `items` list
    Json(Value),
    /// Neither of the above
    Unknown,
}

/// The shape of a [`Format`] without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Xml,
    Json,
    Unknown,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Xml => "xml",
            Self::Json => "json",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl Format {
    pub fn kind(&self) -> FormatKind {
        match self {
            Self::Xml(_) => FormatKind::Xml,
            Self::Json(_) => FormatKind::Json,
            Self::Unknown => FormatKind::Unknown,
        }
    }
}

/// Which structure to try first when classifying a feed body
///
/// Comes from the source's declared format or the response content type.
/// It only orders the attempts; the bytes must still have the structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatHint {
    #[serde(alias = "rss")]
    Xml,
    Json,
    #[default]
    Auto,
}

impl FormatHint {
    /// Derive a hint from an HTTP `Content-Type` value
    pub fn from_content_type(content_type: &str) -> Self {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("json") {
            Self::Json
        } else if content_type.contains("xml") || content_type.contains("rss") {
            Self::Xml
        } else {
            Self::Auto
        }
    }

    /// `Accept` header value to send when fetching a source with this hint
    pub fn accept_header(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/rss+xml, application/xml, text/xml",
            Self::Auto => "application/rss+xml, application/xml, text/xml, application/json, */*",
        }
    }
}

/// Classify raw feed bytes, trying RSS before JSON
pub fn detect(raw: &[u8]) -> Format {
    detect_with_hint(raw, FormatHint::Auto)
}

/// Classify raw feed bytes, trying the hinted structure first
pub fn detect_with_hint(raw: &[u8], hint: FormatHint) -> Format {
    let detected = match hint {
        FormatHint::Json => try_json(raw).or_else(|| try_rss(raw)),
        FormatHint::Xml | FormatHint::Auto => try_rss(raw).or_else(|| try_json(raw)),
    };
    detected.unwrap_or(Format::Unknown)
}

fn try_rss(raw: &[u8]) -> Option<Format> {
    let channel = rss::Channel::read_from(raw).ok()?;
    if channel.items().is_empty() {
        return None;
    }
    Some(Format::Xml(Box::new(channel)))
}

fn try_json(raw: &[u8]) -> Option<Format> {
    let raw = raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw);
    let value: Value = serde_json::from_slice(raw).ok()?;
    if !value.get("items").is_some_and(Value::is_array) {
        return None;
    }
    Some(Format::Json(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>News</title>
    <link>https://example.com</link>
    <description>Hourly news</description>
    <item>
      <title>09:00</title>
      <enclosure url="https://example.com/0900.mp3" length="1" type="audio/mpeg"/>
    </item>
  </channel>
</rss>"#;

    const JSON_FEED: &str = r#"{"items":[{"title":"A"}]}"#;

    #[test]
    fn detects_rss() {
        assert_eq!(detect(RSS_FEED.as_bytes()).kind(), FormatKind::Xml);
    }

    #[test]
    fn detects_json_with_items() {
        assert_eq!(detect(JSON_FEED.as_bytes()).kind(), FormatKind::Json);
    }

    #[test]
    fn detects_json_with_byte_order_mark() {
        let mut raw = b"\xEF\xBB\xBF".to_vec();
        raw.extend_from_slice(JSON_FEED.as_bytes());
        assert_eq!(detect(&raw).kind(), FormatKind::Json);
    }

    #[test]
    fn json_without_items_is_unknown() {
        assert_eq!(detect(br#"{"results":[]}"#).kind(), FormatKind::Unknown);
        assert_eq!(detect(br#"{"items":"nope"}"#).kind(), FormatKind::Unknown);
        assert_eq!(detect(br#"[1,2,3]"#).kind(), FormatKind::Unknown);
    }

    #[test]
    fn rss_without_items_is_unknown() {
        let empty = r#"<rss version="2.0"><channel><title>t</title><link>l</link><description>d</description></channel></rss>"#;
        assert_eq!(detect(empty.as_bytes()).kind(), FormatKind::Unknown);
    }

    #[test]
    fn non_rss_xml_is_unknown() {
        let atom = r#"<?xml version="1.0"?><feed xmlns="http://www.w3.org/2005/Atom"><title>x</title></feed>"#;
        assert_eq!(detect(atom.as_bytes()).kind(), FormatKind::Unknown);
    }

    #[test]
    fn malformed_input_is_unknown() {
        assert_eq!(detect(b"").kind(), FormatKind::Unknown);
        assert_eq!(detect(b"<rss><channel>").kind(), FormatKind::Unknown);
        assert_eq!(detect(b"{\"items\": [").kind(), FormatKind::Unknown);
        assert_eq!(detect(b"\x00\xff\xfe garbage").kind(), FormatKind::Unknown);
        assert_eq!(detect(b"<html><body>Bad gateway</body></html>").kind(), FormatKind::Unknown);
    }

    #[test]
    fn hint_does_not_force_a_format() {
        assert_eq!(
            detect_with_hint(RSS_FEED.as_bytes(), FormatHint::Json).kind(),
            FormatKind::Xml
        );
        assert_eq!(
            detect_with_hint(JSON_FEED.as_bytes(), FormatHint::Xml).kind(),
            FormatKind::Json
        );
        assert_eq!(
            detect_with_hint(b"plain text", FormatHint::Json).kind(),
            FormatKind::Unknown
        );
    }

    #[test]
    fn hint_from_content_type() {
        assert_eq!(
            FormatHint::from_content_type("application/json; charset=utf-8"),
            FormatHint::Json
        );
        assert_eq!(
            FormatHint::from_content_type("application/rss+xml"),
            FormatHint::Xml
        );
        assert_eq!(FormatHint::from_content_type("text/XML"), FormatHint::Xml);
        assert_eq!(FormatHint::from_content_type("text/plain"), FormatHint::Auto);
    }

    #[test]
    fn hint_deserializes_config_spellings() {
        let hints: Vec<FormatHint> = serde_json::from_str(r#"["rss","xml","json","auto"]"#).unwrap();
        assert_eq!(
            hints,
            vec![FormatHint::Xml, FormatHint::Xml, FormatHint::Json, FormatHint::Auto]
        );
    }
}
