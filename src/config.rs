// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;
use crate::feed::{FeedSource, FetchOptions, FormatHint};
use crate::render::ChannelInfo;

/// Configuration compiled into the binary
const EMBEDDED_CONFIG: &str = include_str!("../config.json");

/// Application configuration, loaded once and passed by reference.
///
/// Keys this program does not use (e.g. live station lists) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Podcast feeds grouped by country, in file order; the country name is
    /// the source label
    pub podcasts: IndexMap<String, CountryFeeds>,
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CountryFeeds {
    pub flag: String,
    pub feeds: Vec<FeedEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub feed_url: String,
    #[serde(default, rename = "type")]
    pub format: FormatHint,
    #[serde(default)]
    pub requires_proxy: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub title: String,
    pub description: String,
    /// Seconds clients may cache the combined feed
    pub feed_cache_time: u64,
    /// Per-source fetch budget in milliseconds
    pub podcast_timeout: u64,
    pub enabled_countries: EnabledCountries,
    /// Hosts the proxy may fetch from, subdomains included
    pub allowed_domains: Vec<String>,
    /// Prefix for proxied fetches, e.g. `http://localhost:8080/proxy?url=`
    pub proxy_url: Option<String>,
    /// Channel link of the combined feed
    pub feed_link: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            title: "Global Radio News".to_string(),
            description:
                "Combined feed of the latest news episodes from public radio stations worldwide"
                    .to_string(),
            feed_cache_time: 3600,
            podcast_timeout: 5000,
            enabled_countries: EnabledCountries::default(),
            allowed_domains: Vec::new(),
            proxy_url: None,
            feed_link: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnabledCountries {
    /// Countries whose podcasts are used; empty means all
    pub podcasts: Vec<String>,
}

impl AppConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_json(&content, &path.display().to_string())
    }

    /// The configuration bundled with the program
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_json(EMBEDDED_CONFIG, "embedded config")
    }

    fn from_json(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseFailed {
                origin: origin.to_string(),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (country, data) in &self.podcasts {
            if country.trim().is_empty() {
                return Err(ConfigError::EmptyLabel);
            }

            for feed in &data.feeds {
                let valid = Url::parse(&feed.feed_url)
                    .is_ok_and(|url| matches!(url.scheme(), "http" | "https"));
                if !valid {
                    return Err(ConfigError::InvalidFeedUrl {
                        label: country.clone(),
                        url: feed.feed_url.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn is_enabled(&self, country: &str) -> bool {
        let enabled = &self.settings.enabled_countries.podcasts;
        enabled.is_empty() || enabled.iter().any(|c| c == country)
    }

    /// One source per enabled country, using the country's first feed
    ///
    /// Countries keep the order of the configuration file.
    pub fn sources(&self) -> Vec<FeedSource> {
        self.podcasts
            .iter()
            .filter(|(country, _)| self.is_enabled(country))
            .filter_map(|(country, data)| {
                let feed = data.feeds.first()?;
                Some(
                    FeedSource::new(country.clone(), feed.feed_url.clone())
                        .with_format(feed.format)
                        .with_requires_proxy(feed.requires_proxy),
                )
            })
            .collect()
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_millis(self.settings.podcast_timeout),
            proxy_base: self.settings.proxy_url.clone().filter(|p| !p.is_empty()),
        }
    }

    /// Channel fields of the combined feed; `fallback_link` is used when no
    /// feed link is configured
    pub fn channel_info(&self, fallback_link: &str) -> ChannelInfo {
        ChannelInfo {
            title: self.settings.title.clone(),
            link: self
                .settings
                .feed_link
                .clone()
                .unwrap_or_else(|| fallback_link.to_string()),
            description: self.settings.description.clone(),
        }
    }
}
