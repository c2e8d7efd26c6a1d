// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::error::FeedError;
use crate::http::HttpClient;

use super::source::FeedSource;

/// Per-source time budget when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Options for fetching sources
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Time budget for one source, fallback attempt included
    pub timeout: Duration,
    /// URL prefix the percent-encoded feed URL is appended to, e.g.
    /// `http://localhost:8080/proxy?url=`
    pub proxy_base: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            proxy_base: None,
        }
    }
}

/// Body of a successfully fetched source
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub via_proxy: bool,
}

struct Attempt {
    url: String,
    via_proxy: bool,
}

/// Build the proxy URL for a feed
pub fn proxied_url(proxy_base: &str, feed_url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(feed_url.as_bytes()).collect();
    format!("{proxy_base}{encoded}")
}

/// Work out the first attempt and an optional fallback for a source
fn attempt_plan(source: &FeedSource, options: &FetchOptions) -> (Attempt, Option<Attempt>) {
    let direct = Attempt {
        url: source.url.clone(),
        via_proxy: false,
    };

    let Some(base) = options.proxy_base.as_deref() else {
        return (direct, None);
    };

    let proxied = Attempt {
        url: proxied_url(base, &source.url),
        via_proxy: true,
    };

    if source.requires_proxy {
        (proxied, None)
    } else {
        (direct, Some(proxied))
    }
}

/// Fetch the raw body of a source
///
/// Sources that require the proxy are fetched through it only; others are
/// tried directly first and through the proxy second, when a proxy is
/// configured. All attempts together are bounded by `options.timeout`.
/// When all attempts fail the last error is returned.
pub async fn fetch_source<C: HttpClient + ?Sized>(
    client: &C,
    source: &FeedSource,
    options: &FetchOptions,
) -> Result<FetchedFeed, FeedError> {
    tokio::time::timeout(options.timeout, run_attempts(client, source, options))
        .await
        .unwrap_or_else(|_| {
            Err(FeedError::Timeout {
                url: source.url.clone(),
                timeout_ms: u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX),
            })
        })
}

async fn run_attempts<C: HttpClient + ?Sized>(
    client: &C,
    source: &FeedSource,
    options: &FetchOptions,
) -> Result<FetchedFeed, FeedError> {
    let accept = source.declared_format.accept_header();
    let (first, fallback) = attempt_plan(source, options);

    let error = match run_attempt(client, source, &first, accept).await {
        Ok(feed) => return Ok(feed),
        Err(e) => e,
    };

    let Some(fallback) = fallback else {
        return Err(error);
    };

    debug!(label = %source.label, error = %error, "direct fetch failed, retrying through proxy");
    run_attempt(client, source, &fallback, accept).await
}

async fn run_attempt<C: HttpClient + ?Sized>(
    client: &C,
    source: &FeedSource,
    attempt: &Attempt,
    accept: &str,
) -> Result<FetchedFeed, FeedError> {
    debug!(
        label = %source.label,
        url = %attempt.url,
        via_proxy = attempt.via_proxy,
        "fetching source"
    );

    let response = client
        .get(&attempt.url, accept)
        .await
        .map_err(|e| FeedError::FetchFailed {
            url: attempt.url.clone(),
            source: e,
        })?;

    if !response.is_success() {
        return Err(FeedError::HttpStatus {
            url: attempt.url.clone(),
            status: response.status,
        });
    }

    Ok(FetchedFeed {
        body: response.body,
        content_type: response.content_type,
        via_proxy: attempt.via_proxy,
    })
}
