// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use sha2::{Digest, Sha256};

use crate::feed::Episode;

/// Marker put in front of titles of played episodes in listings
pub const PLAYED_MARKER: &str = "✓ ";

/// Stable identifier of an episode for the played history
///
/// Hex SHA-256 of `label::title::date::url`, where the title loses any
/// played marker and the date is `YYYY-MM-DD` or `--` when unknown.
pub fn episode_key(episode: &Episode) -> String {
    let title = episode
        .title
        .strip_prefix(PLAYED_MARKER)
        .unwrap_or(&episode.title);

    let date = episode
        .published_at
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "--".to_string());

    let identifier = format!(
        "{}::{}::{}::{}",
        episode.source_label, title, date, episode.enclosure.url
    );

    let hash = Sha256::digest(identifier.as_bytes());
    format!("{:x}", hash)
}
