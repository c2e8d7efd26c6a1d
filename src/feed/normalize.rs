// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::episode::audio::resolve_mime_type;
use crate::error::NormalizationFailure;

use super::detect::{Format, FormatHint, detect_with_hint};
use super::extract::{
    JsonItem, RawFields, extract_from_json_item, extract_from_xml_item,
    extract_from_xml_item_with_enclosures, first_item_enclosures, xml_item_has_content,
};
use super::text::{clean_text, parse_pub_date};

/// Title used when a feed item has none
pub const UNTITLED: &str = "Untitled";

/// The latest episode of one source, in normalized form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Episode {
    pub source_label: String,
    pub title: String,
    pub link: String,
    pub description: String,
    /// `None` when the feed gave no date we understand
    pub published_at: Option<DateTime<FixedOffset>>,
    pub enclosure: Enclosure,
    pub duration_ms: Option<u64>,
}

/// The playable audio of an episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: String,
    pub length: Option<u64>,
}

/// How an episode title is rendered for output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TitleStyle {
    /// `[label] title`
    #[default]
    Prefixed,
    /// The title alone
    Plain,
}

impl Episode {
    /// Title with the source label in front, e.g. `[Denmark] Radioavisen`
    pub fn prefixed_title(&self) -> String {
        format!("[{}] {}", self.source_label, self.title)
    }

    pub fn display_title(&self, style: TitleStyle) -> String {
        match style {
            TitleStyle::Prefixed => self.prefixed_title(),
            TitleStyle::Plain => self.title.clone(),
        }
    }

    /// Duration as `H:MM:SS` or `M:SS`
    pub fn formatted_duration(&self) -> Option<String> {
        let total = self.duration_ms? / 1000;
        if total == 0 {
            return None;
        }

        let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
        if hours > 0 {
            Some(format!("{hours}:{minutes:02}:{seconds:02}"))
        } else {
            Some(format!("{minutes}:{seconds:02}"))
        }
    }
}

/// Turn one source's raw feed body into its latest episode
pub fn normalize(label: &str, raw: &[u8]) -> Result<Episode, NormalizationFailure> {
    normalize_with_hint(label, raw, FormatHint::Auto)
}

/// Like [`normalize`], trying the hinted format first
///
/// A blank label is rejected before the body is looked at.
pub fn normalize_with_hint(
    label: &str,
    raw: &[u8],
    hint: FormatHint,
) -> Result<Episode, NormalizationFailure> {
    if label.trim().is_empty() {
        return Err(NormalizationFailure::EmptyLabel);
    }

    let fields = match detect_with_hint(raw, hint) {
        Format::Xml(channel) => latest_xml_fields(label, &channel, raw)?,
        Format::Json(value) => latest_json_fields(label, &value)?,
        Format::Unknown => {
            return Err(NormalizationFailure::UnrecognizedFormat {
                label: label.to_string(),
            });
        }
    };

    build_episode(label, fields)
}

fn latest_xml_fields(
    label: &str,
    channel: &rss::Channel,
    raw: &[u8],
) -> Result<RawFields, NormalizationFailure> {
    let item = channel
        .items()
        .first()
        .ok_or_else(|| malformed(label, "feed has no items"))?;

    if !xml_item_has_content(item) {
        return Err(malformed(label, "latest item is empty"));
    }

    let enclosures = first_item_enclosures(raw);
    if enclosures.is_empty() {
        return Ok(extract_from_xml_item(item));
    }
    Ok(extract_from_xml_item_with_enclosures(item, &enclosures))
}

fn latest_json_fields(label: &str, value: &Value) -> Result<RawFields, NormalizationFailure> {
    let first = value
        .get("items")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .ok_or_else(|| malformed(label, "feed has no items"))?;

    if !first.is_object() {
        return Err(malformed(label, "latest item is not an object"));
    }

    let item = JsonItem::deserialize(first).map_err(|e| malformed(label, &e.to_string()))?;
    if !item.has_content() {
        return Err(malformed(label, "latest item has no known fields"));
    }
    Ok(extract_from_json_item(&item))
}

fn build_episode(label: &str, fields: RawFields) -> Result<Episode, NormalizationFailure> {
    let url = fields
        .enclosure_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| NormalizationFailure::NoAudioFound {
            label: label.to_string(),
        })?;

    let title = clean_text(&fields.title);
    let title = if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    };

    Ok(Episode {
        source_label: label.to_string(),
        title,
        link: fields.link.trim().to_string(),
        description: clean_text(&fields.description),
        published_at: parse_pub_date(&fields.pub_date_text),
        enclosure: Enclosure {
            mime_type: resolve_mime_type(fields.enclosure_type.as_deref(), &url),
            url,
            length: fields.enclosure_length,
        },
        duration_ms: fields.duration_ms,
    })
}

fn malformed(label: &str, reason: &str) -> NormalizationFailure {
    NormalizationFailure::MalformedItem {
        label: label.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rss_with_items(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
     xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"
     xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>News</title>
    <link>https://example.com</link>
    <description>News</description>
    {items}
  </channel>
</rss>"#
        )
    }

    // === RSS ===

    #[test]
    fn standard_enclosure_is_kept_verbatim() {
        let feed = rss_with_items(
            r#"<item>
                 <title>Nine o'clock news</title>
                 <pubDate>Tue, 03 Jun 2025 09:00:00 GMT</pubDate>
                 <enclosure url="https://cdn.example.com/news/0900.mp3?token=a%20b" length="1000" type="audio/mpeg"/>
               </item>"#,
        );

        let episode = normalize("UK", feed.as_bytes()).unwrap();

        assert_eq!(episode.source_label, "UK");
        assert_eq!(
            episode.enclosure.url,
            "https://cdn.example.com/news/0900.mp3?token=a%20b"
        );
        assert_eq!(episode.enclosure.mime_type, "audio/mpeg");
        assert_eq!(episode.enclosure.length, Some(1000));
        assert!(episode.published_at.is_some());
    }

    #[test]
    fn only_the_first_item_is_used() {
        let feed = rss_with_items(
            r#"<item><title>Newest</title><enclosure url="http://x/1.mp3" type="audio/mpeg"/></item>
               <item><title>Older</title><enclosure url="http://x/2.mp3" type="audio/mpeg"/></item>"#,
        );

        let episode = normalize("UK", feed.as_bytes()).unwrap();
        assert_eq!(episode.title, "Newest");
    }

    #[test]
    fn media_content_fallback() {
        let feed = rss_with_items(
            r#"<item>
                 <title>Bulletin</title>
                 <media:content url="http://x/b.mp3" type="audio/mpeg" fileSize="12345"/>
               </item>"#,
        );

        let episode = normalize("SE", feed.as_bytes()).unwrap();
        assert_eq!(episode.enclosure.url, "http://x/b.mp3");
        assert_eq!(episode.enclosure.length, Some(12345));
    }

    #[test]
    fn empty_enclosure_url_is_no_audio() {
        let feed = rss_with_items(
            r#"<item><title>Broken</title><enclosure url="" type="audio/mpeg"/></item>"#,
        );

        let failure = normalize("DE", feed.as_bytes()).unwrap_err();
        assert_eq!(
            failure,
            NormalizationFailure::NoAudioFound {
                label: "DE".to_string()
            }
        );
    }

    #[test]
    fn title_and_description_are_cleaned() {
        let feed = rss_with_items(
            r#"<item>
                 <title><![CDATA[ <b>Evening</b> &amp;amp; night ]]></title>
                 <description><![CDATA[<p>Top &lt;stories&gt;</p>]]></description>
                 <enclosure url="http://x/e.mp3" type="audio/mpeg"/>
               </item>"#,
        );

        let episode = normalize("UK", feed.as_bytes()).unwrap();
        assert_eq!(episode.title, "Evening &amp; night");
        assert_eq!(episode.description, "Top <stories>");
    }

    #[test]
    fn missing_title_becomes_untitled() {
        let feed = rss_with_items(r#"<item><enclosure url="http://x/e.mp3" type="audio/mpeg"/></item>"#);

        let episode = normalize("UK", feed.as_bytes()).unwrap();
        assert_eq!(episode.title, UNTITLED);
        assert_eq!(episode.prefixed_title(), "[UK] Untitled");
    }

    #[test]
    fn unparseable_date_is_unknown() {
        let feed = rss_with_items(
            r#"<item>
                 <pubDate>sometime last week</pubDate>
                 <enclosure url="http://x/e.mp3" type="audio/mpeg"/>
               </item>"#,
        );

        let episode = normalize("UK", feed.as_bytes()).unwrap();
        assert_eq!(episode.published_at, None);
    }

    #[test]
    fn empty_latest_item_is_malformed() {
        let feed = rss_with_items("<item></item>");

        let failure = normalize("UK", feed.as_bytes()).unwrap_err();
        assert!(matches!(failure, NormalizationFailure::MalformedItem { .. }));
    }

    #[test]
    fn mime_type_derived_from_extension() {
        let feed = rss_with_items(
            r#"<item><description>Listen: https://cdn.example.com/a.m4a</description></item>"#,
        );

        let episode = normalize("US", feed.as_bytes()).unwrap();
        assert_eq!(episode.enclosure.url, "https://cdn.example.com/a.m4a");
        assert_eq!(episode.enclosure.mime_type, "audio/mp4");
    }

    #[test]
    fn audio_enclosure_before_an_image_enclosure() {
        let feed = rss_with_items(
            r#"<item>
                 <title>Six o'clock news</title>
                 <enclosure url="http://x/six.mp3" length="2048" type="audio/mpeg"/>
                 <enclosure url="http://x/six.jpg" length="64" type="image/jpeg"/>
               </item>"#,
        );

        let episode = normalize("UK", feed.as_bytes()).unwrap();
        assert_eq!(episode.enclosure.url, "http://x/six.mp3");
        assert_eq!(episode.enclosure.mime_type, "audio/mpeg");
        assert_eq!(episode.enclosure.length, Some(2048));
    }

    // === JSON ===

    #[test]
    fn json_feed_with_audio_asset() {
        let raw = br#"{"items":[{"title":"A","publishTime":"2025-01-01T00:00:00Z",
                        "assets":[{"kind":"Audio","url":"http://x/a.mp3"}]}]}"#;

        let episode = normalize("DK", raw).unwrap();

        assert_eq!(episode.prefixed_title(), "[DK] A");
        assert_eq!(episode.title, "A");
        assert_eq!(episode.enclosure.url, "http://x/a.mp3");
        assert_eq!(episode.enclosure.mime_type, "audio/mpeg");
        assert_eq!(
            episode.published_at.map(|d| d.timestamp()),
            Some(1_735_689_600)
        );
    }

    #[test]
    fn json_without_audio_is_no_audio() {
        let raw = br#"{"items":[{"title":"A","assets":[{"kind":"Image","url":"http://x/a.jpg"}]}]}"#;

        let failure = normalize("DK", raw).unwrap_err();
        assert!(matches!(failure, NormalizationFailure::NoAudioFound { .. }));
    }

    #[test]
    fn json_with_empty_items_is_malformed() {
        let failure = normalize("DK", br#"{"items":[]}"#).unwrap_err();
        assert!(matches!(failure, NormalizationFailure::MalformedItem { .. }));
    }

    #[test]
    fn json_with_non_object_item_is_malformed() {
        let failure = normalize("DK", br#"{"items":["just a string"]}"#).unwrap_err();
        assert!(matches!(failure, NormalizationFailure::MalformedItem { .. }));

        let failure = normalize("DK", br#"{"items":[{"title":42}]}"#).unwrap_err();
        assert!(matches!(failure, NormalizationFailure::MalformedItem { .. }));
    }

    #[test]
    fn json_with_mistyped_optional_fields_still_normalizes() {
        let raw = br#"{"items":[{"title":"A","duration":"00:05:00",
                        "assets":[{"kind":"Audio","url":"http://x/a.mp3","fileSize":"12345"}]}]}"#;

        let episode = normalize("DK", raw).unwrap();
        assert_eq!(episode.enclosure.url, "http://x/a.mp3");
        assert_eq!(episode.enclosure.length, None);
        assert_eq!(episode.duration_ms, None);
    }

    #[test]
    fn json_skips_audio_assets_without_url() {
        let raw = br#"{"items":[{"title":"A",
                        "assets":[{"kind":"Audio","url":""},{"kind":"Audio","url":"http://x/b.mp3"}]}]}"#;

        let episode = normalize("DK", raw).unwrap();
        assert_eq!(episode.enclosure.url, "http://x/b.mp3");
    }

    #[test]
    fn blank_label_is_rejected() {
        let raw = br#"{"items":[{"title":"A","assets":[{"kind":"Audio","url":"http://x/a.mp3"}]}]}"#;

        for label in ["", "   "] {
            assert_eq!(
                normalize(label, raw).unwrap_err(),
                NormalizationFailure::EmptyLabel
            );
        }
    }

    // === Format and purity ===

    #[test]
    fn unknown_format_is_unrecognized() {
        for raw in [&b""[..], b"<html></html>", b"\xff\xfe\x00", b"{\"results\":[]}"] {
            let failure = normalize("XX", raw).unwrap_err();
            assert_eq!(
                failure,
                NormalizationFailure::UnrecognizedFormat {
                    label: "XX".to_string()
                }
            );
        }
    }

    #[test]
    fn normalize_is_deterministic() {
        let feed = rss_with_items(
            r#"<item>
                 <title>Same</title>
                 <pubDate>Mon, 01 Jan 2024 08:00:00 GMT</pubDate>
                 <enclosure url="http://x/s.mp3" type="audio/mpeg"/>
                 <itunes:duration>05:00</itunes:duration>
               </item>"#,
        );

        let first = normalize("UK", feed.as_bytes()).unwrap();
        let second = normalize("UK", feed.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    // === Rendering helpers ===

    fn episode_with_duration(duration_ms: Option<u64>) -> Episode {
        Episode {
            source_label: "UK".to_string(),
            title: "News".to_string(),
            link: String::new(),
            description: String::new(),
            published_at: None,
            enclosure: Enclosure {
                url: "http://x/n.mp3".to_string(),
                mime_type: "audio/mpeg".to_string(),
                length: None,
            },
            duration_ms,
        }
    }

    #[test]
    fn display_title_styles() {
        let episode = episode_with_duration(None);
        assert_eq!(episode.display_title(TitleStyle::Prefixed), "[UK] News");
        assert_eq!(episode.display_title(TitleStyle::Plain), "News");
    }

    #[test]
    fn formats_durations() {
        assert_eq!(
            episode_with_duration(Some(3_723_000)).formatted_duration(),
            Some("1:02:03".to_string())
        );
        assert_eq!(
            episode_with_duration(Some(330_000)).formatted_duration(),
            Some("5:30".to_string())
        );
        assert_eq!(episode_with_duration(Some(0)).formatted_duration(), None);
        assert_eq!(episode_with_duration(None).formatted_duration(), None);
    }
}
