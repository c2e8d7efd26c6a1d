// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// MIME type used when neither the feed nor the URL says otherwise
pub const DEFAULT_AUDIO_MIME: &str = "audio/mpeg";

/// Matches an absolute http(s) URL to an audio file embedded in free text
static EMBEDDED_AUDIO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s"'<>]+\.(?:mp3|m4a|wav)\b(?:\?[^\s"'<>]*)?"#)
        .expect("audio URL pattern is valid")
});

/// Get the lowercased file extension of a URL's path, ignoring any query
fn url_extension(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or("").to_string(),
    };

    let filename = path.rsplit('/').next()?;
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_lowercase())
}

/// Check if a string is a recognised audio file extension
fn is_audio_extension(ext: &str) -> bool {
    matches!(ext, "mp3" | "m4a" | "wav")
}

/// Check whether a URL points at a file with a known audio extension
pub fn has_audio_extension(url: &str) -> bool {
    url_extension(url).is_some_and(|ext| is_audio_extension(&ext))
}

/// Map an audio file extension to its MIME type
fn extension_to_mime(ext: &str) -> Option<&'static str> {
    match ext {
        "mp3" => Some("audio/mpeg"),
        "m4a" => Some("audio/mp4"),
        "wav" => Some("audio/wav"),
        _ => None,
    }
}

/// Work out the MIME type for an enclosure
///
/// Prefers the declared type, then the URL extension, then `audio/mpeg`.
pub fn resolve_mime_type(declared: Option<&str>, url: &str) -> String {
    if let Some(mime) = declared.map(str::trim).filter(|m| !m.is_empty()) {
        return mime.to_string();
    }

    url_extension(url)
        .as_deref()
        .and_then(extension_to_mime)
        .unwrap_or(DEFAULT_AUDIO_MIME)
        .to_string()
}

/// Map a short format name (as used by JSON APIs) to a MIME type
pub fn format_to_mime(format: &str) -> Option<&'static str> {
    extension_to_mime(&format.trim().to_lowercase())
}

/// Find the first audio file URL mentioned in free text
pub fn find_audio_url(text: &str) -> Option<String> {
    EMBEDDED_AUDIO_URL
        .find(text)
        .map(|m| m.as_str().to_string())
}
