// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rss::extension::Extension;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::episode::audio::{find_audio_url, format_to_mime, has_audio_extension};

use super::text::{parse_duration_ms, parse_seconds_ms};

/// Fields pulled out of one feed item before cleaning and validation.
///
/// Absent fields are empty strings or `None`; extraction itself never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date_text: String,
    pub enclosure_url: Option<String>,
    pub enclosure_type: Option<String>,
    pub enclosure_length: Option<u64>,
    pub duration_ms: Option<u64>,
}

/// One entry of a JSON feed's `items` list
///
/// A field holding a value of the wrong type reads as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsonItem {
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub link: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub presentation_url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub publish_time: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub duration_milliseconds: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub duration: Option<JsonDuration>,
    #[serde(deserialize_with = "lenient_list")]
    pub assets: Option<Vec<JsonAsset>>,
}

impl JsonItem {
    /// Whether any known field was present with a usable value
    pub fn has_content(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.link.is_some()
            || self.presentation_url.is_some()
            || self.publish_time.is_some()
            || self.duration_milliseconds.is_some()
            || self.duration.is_some()
            || self.assets.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsonDuration {
    #[serde(deserialize_with = "lenient")]
    pub total_milliseconds: Option<f64>,
}

/// A media file attached to a JSON item
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsonAsset {
    #[serde(deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub format: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub file_size: Option<f64>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// A list whose unreadable entries are skipped
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(entries) => Some(
            entries
                .into_iter()
                .filter_map(|entry| T::deserialize(entry).ok())
                .collect(),
        ),
        _ => None,
    })
}

/// Audio location found by one of the resolution strategies
struct AudioMatch {
    url: String,
    mime_type: Option<String>,
    length: Option<u64>,
}

/// Extract fields from an RSS item, using the enclosure the `rss` crate kept
pub fn extract_from_xml_item(item: &rss::Item) -> RawFields {
    let enclosures = item
        .enclosure()
        .map(std::slice::from_ref)
        .unwrap_or_default();
    extract_from_xml_item_with_enclosures(item, enclosures)
}

/// Extract fields from an RSS item whose enclosures were read separately
///
/// The audio URL is resolved in order: an enclosure declared as audio,
/// an audio `media:content`, any enclosure whose URL has an audio file
/// extension, and finally an audio link found in the item's text.
pub fn extract_from_xml_item_with_enclosures(
    item: &rss::Item,
    enclosures: &[rss::Enclosure],
) -> RawFields {
    let media = audio_media_content(item);

    let audio = audio_enclosure(enclosures)
        .or_else(|| media.map(media_audio))
        .or_else(|| enclosure_with_audio_extension(enclosures))
        .or_else(|| audio_link_in_text(item));

    let duration_ms = media
        .and_then(|ext| ext.attrs().get("duration"))
        .and_then(|secs| parse_seconds_ms(secs))
        .or_else(|| {
            item.itunes_ext()
                .and_then(|ext| ext.duration())
                .and_then(parse_duration_ms)
        });

    let pub_date_text = item
        .pub_date()
        .map(String::from)
        .or_else(|| {
            item.dublin_core_ext()
                .and_then(|dc| dc.dates().first().cloned())
        })
        .unwrap_or_default();

    let (enclosure_url, enclosure_type, enclosure_length) = match audio {
        Some(found) => (Some(found.url), found.mime_type, found.length),
        None => (None, None, None),
    };

    RawFields {
        title: item.title().unwrap_or_default().to_string(),
        link: item.link().unwrap_or_default().to_string(),
        description: item.description().unwrap_or_default().to_string(),
        pub_date_text,
        enclosure_url,
        enclosure_type,
        enclosure_length,
        duration_ms,
    }
}

/// Extract fields from a JSON feed item
///
/// The audio URL is the first asset of kind `Audio` with a non-empty url.
pub fn extract_from_json_item(item: &JsonItem) -> RawFields {
    let audio = item
        .assets
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|asset| asset.kind.as_deref() == Some("Audio"))
        .find_map(|asset| {
            let url = asset.url.as_deref().filter(|u| !u.trim().is_empty())?;
            Some(AudioMatch {
                url: url.trim().to_string(),
                mime_type: asset
                    .format
                    .as_deref()
                    .and_then(format_to_mime)
                    .map(String::from),
                length: asset.file_size.and_then(non_negative),
            })
        });

    let duration_ms = item
        .duration_milliseconds
        .or_else(|| item.duration.as_ref().and_then(|d| d.total_milliseconds))
        .and_then(non_negative);

    let (enclosure_url, enclosure_type, enclosure_length) = match audio {
        Some(found) => (Some(found.url), found.mime_type, found.length),
        None => (None, None, None),
    };

    RawFields {
        title: item.title.clone().unwrap_or_default(),
        link: item
            .link
            .clone()
            .or_else(|| item.presentation_url.clone())
            .unwrap_or_default(),
        description: item.description.clone().unwrap_or_default(),
        pub_date_text: item.publish_time.clone().unwrap_or_default(),
        enclosure_url,
        enclosure_type,
        enclosure_length,
        duration_ms,
    }
}

/// Check whether an RSS item carries anything we could extract at all
pub fn xml_item_has_content(item: &rss::Item) -> bool {
    item.title().is_some()
        || item.link().is_some()
        || item.description().is_some()
        || item.pub_date().is_some()
        || item.enclosure().is_some()
        || item.content().is_some()
        || item.itunes_ext().is_some()
        || item.dublin_core_ext().is_some()
        || !item.extensions().is_empty()
}

fn non_negative(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then_some(value as u64)
}

/// Every `<enclosure>` of the feed's first item, in document order
///
/// The `rss` crate keeps only the last enclosure of an item, so the raw
/// document is read again for the full list. Reading stops at the first
/// XML error.
pub fn first_item_enclosures(raw: &[u8]) -> Vec<rss::Enclosure> {
    let mut reader = Reader::from_reader(raw);
    let mut buf = Vec::new();
    let mut enclosures = Vec::new();
    let mut in_item = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"item" => in_item = true,
            Ok(Event::End(e)) if e.name().as_ref() == b"item" => break,
            Ok(Event::Empty(e)) if e.name().as_ref() == b"item" => break,
            Ok(Event::Start(e) | Event::Empty(e))
                if in_item && e.name().as_ref() == b"enclosure" =>
            {
                enclosures.push(enclosure_from_element(&e));
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    enclosures
}

fn enclosure_from_element(element: &BytesStart<'_>) -> rss::Enclosure {
    let mut enclosure = rss::Enclosure::default();
    for attr in element.attributes().flatten() {
        let Ok(value) = attr.unescape_value() else {
            continue;
        };
        match attr.key.as_ref() {
            b"url" => enclosure.url = value.into_owned(),
            b"type" => enclosure.mime_type = value.into_owned(),
            b"length" => enclosure.length = value.into_owned(),
            _ => {}
        }
    }
    enclosure
}

fn audio_enclosure(enclosures: &[rss::Enclosure]) -> Option<AudioMatch> {
    enclosures
        .iter()
        .find(|enclosure| {
            enclosure.mime_type().to_ascii_lowercase().contains("audio")
                && !enclosure.url().trim().is_empty()
        })
        .map(enclosure_match)
}

fn enclosure_with_audio_extension(enclosures: &[rss::Enclosure]) -> Option<AudioMatch> {
    enclosures
        .iter()
        .find(|enclosure| has_audio_extension(enclosure.url().trim()))
        .map(enclosure_match)
}

fn enclosure_match(enclosure: &rss::Enclosure) -> AudioMatch {
    AudioMatch {
        url: enclosure.url().trim().to_string(),
        mime_type: Some(enclosure.mime_type().to_string()).filter(|m| !m.is_empty()),
        length: enclosure.length().trim().parse().ok(),
    }
}

/// Find the first `media:content` that is audio, looking inside `media:group` too
fn audio_media_content(item: &rss::Item) -> Option<&Extension> {
    let media = item.extensions().get("media")?;

    let direct = media.get("content").into_iter().flatten();
    let grouped = media
        .get("group")
        .into_iter()
        .flatten()
        .flat_map(|group| group.children().get("content").into_iter().flatten());

    direct.chain(grouped).find(|ext| is_audio_media(ext))
}

fn is_audio_media(ext: &Extension) -> bool {
    let attrs = ext.attrs();
    let has_url = attrs.get("url").is_some_and(|u| !u.trim().is_empty());
    let typed_audio = attrs
        .get("type")
        .is_some_and(|t| t.to_ascii_lowercase().contains("audio"));
    let medium_audio = attrs
        .get("medium")
        .is_some_and(|m| m.eq_ignore_ascii_case("audio"));

    has_url && (typed_audio || medium_audio)
}

fn media_audio(ext: &Extension) -> AudioMatch {
    let attrs = ext.attrs();
    AudioMatch {
        url: attrs.get("url").map(|u| u.trim().to_string()).unwrap_or_default(),
        mime_type: attrs.get("type").cloned().filter(|t| !t.is_empty()),
        length: attrs.get("fileSize").and_then(|s| s.trim().parse().ok()),
    }
}

fn audio_link_in_text(item: &rss::Item) -> Option<AudioMatch> {
    let url = [item.content(), item.description()]
        .into_iter()
        .flatten()
        .find_map(find_audio_url)?;

    Some(AudioMatch {
        url,
        mime_type: None,
        length: None,
    })
}
