// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod aggregate;
pub mod combine;
pub mod config;
pub mod episode;
pub mod error;
pub mod feed;
pub mod history;
pub mod http;
pub mod progress;
pub mod proxy;
pub mod render;
pub mod server;

// Re-export main types for convenience
pub use aggregate::aggregate;
pub use combine::{CombinedFeed, SourceFailure, collect_latest};
pub use config::AppConfig;
pub use episode::{PLAYED_MARKER, episode_key};
pub use error::{
    ConfigError, FeedError, HistoryError, NormalizationFailure, ProxyError, RenderError,
};
pub use feed::{
    Enclosure, Episode, FeedSource, FetchOptions, Format, FormatHint, TitleStyle, detect,
    fetch_source, normalize, normalize_with_hint,
};
pub use history::{DEFAULT_HISTORY_FILENAME, PlayedHistory};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use render::{ChannelInfo, RSS_CONTENT_TYPE, render_feed};
pub use server::serve;
