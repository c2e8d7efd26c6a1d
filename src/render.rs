// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rss::extension::itunes::{self, ITunesItemExtensionBuilder};
use rss::{ChannelBuilder, EnclosureBuilder, GuidBuilder, Item, ItemBuilder};

use crate::error::RenderError;
use crate::feed::{Episode, TitleStyle};

/// Content type of the rendered document
pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// Channel-level fields of the combined feed
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub title: String,
    pub link: String,
    pub description: String,
}

/// Render episodes as one RSS 2.0 document
///
/// Items keep the order of `episodes`. The `itunes`, `content` and `media`
/// namespaces are always declared.
pub fn render_feed(
    episodes: &[Episode],
    info: &ChannelInfo,
    style: TitleStyle,
    built_at: DateTime<Utc>,
) -> Result<Vec<u8>, RenderError> {
    let namespaces = BTreeMap::from([
        ("itunes".to_string(), itunes::NAMESPACE.to_string()),
        (
            "content".to_string(),
            "http://purl.org/rss/1.0/modules/content/".to_string(),
        ),
        (
            "media".to_string(),
            "http://search.yahoo.com/mrss/".to_string(),
        ),
    ]);

    let items: Vec<Item> = episodes.iter().map(|e| render_item(e, style)).collect();

    let channel = ChannelBuilder::default()
        .title(format!("{} - Latest Episodes", info.title))
        .link(info.link.clone())
        .description(info.description.clone())
        .language(Some("en".to_string()))
        .last_build_date(Some(built_at.to_rfc2822()))
        .namespaces(namespaces)
        .items(items)
        .build();

    Ok(channel.write_to(Vec::new())?)
}

fn render_item(episode: &Episode, style: TitleStyle) -> Item {
    let enclosure = EnclosureBuilder::default()
        .url(episode.enclosure.url.clone())
        .mime_type(episode.enclosure.mime_type.clone())
        .length(episode.enclosure.length.unwrap_or(0).to_string())
        .build();

    let guid = GuidBuilder::default()
        .value(episode.enclosure.url.clone())
        .permalink(false)
        .build();

    let itunes_ext = episode.formatted_duration().map(|duration| {
        ITunesItemExtensionBuilder::default()
            .duration(Some(duration))
            .build()
    });

    ItemBuilder::default()
        .title(Some(episode.display_title(style)))
        .link(Some(episode.link.clone()))
        .description(Some(episode.description.clone()))
        .pub_date(episode.published_at.map(|dt| dt.to_rfc2822()))
        .enclosure(Some(enclosure))
        .guid(Some(guid))
        .itunes_ext(itunes_ext)
        .build()
}
