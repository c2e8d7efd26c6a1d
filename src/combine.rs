// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::aggregate::aggregate;
use crate::error::{FeedError, NormalizationFailure};
use crate::feed::{
    Episode, FeedSource, FetchOptions, FormatHint, fetch_source, normalize_with_hint,
};
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};

/// A source that produced no episode, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub label: String,
    pub reason: String,
}

/// The latest episode of every source that succeeded, newest first
#[derive(Debug, Clone, Default)]
pub struct CombinedFeed {
    pub episodes: Vec<Episode>,
    pub failures: Vec<SourceFailure>,
}

enum SourceError {
    Fetch(FeedError),
    Normalize(NormalizationFailure),
}

impl SourceError {
    fn reason(&self) -> String {
        match self {
            Self::Fetch(e) => e.to_string(),
            Self::Normalize(e) => e.to_string(),
        }
    }
}

/// Fetch every source concurrently and combine their latest episodes
///
/// A source that fails or times out is recorded in `failures` and never
/// affects the others. With every source failing the result is empty.
pub async fn collect_latest<C: HttpClient + ?Sized>(
    client: &C,
    sources: &[FeedSource],
    options: &FetchOptions,
    reporter: &SharedProgressReporter,
) -> CombinedFeed {
    let outcomes = join_all(
        sources
            .iter()
            .map(|source| latest_episode(client, source, options, reporter)),
    )
    .await;

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();

    for (source, outcome) in sources.iter().zip(outcomes) {
        match outcome {
            Ok(episode) => results.push(Ok(episode)),
            Err(error) => {
                let reason = error.reason();
                warn!(label = %source.label, error = %reason, "source skipped");
                reporter.report(ProgressEvent::SourceFailed {
                    label: source.label.clone(),
                    error: reason.clone(),
                });
                failures.push(SourceFailure {
                    label: source.label.clone(),
                    reason,
                });
                if let SourceError::Normalize(failure) = error {
                    results.push(Err(failure));
                }
            }
        }
    }

    let episodes = aggregate(results);

    reporter.report(ProgressEvent::AggregationCompleted {
        episode_count: episodes.len(),
        failed_count: failures.len(),
    });

    CombinedFeed { episodes, failures }
}

async fn latest_episode<C: HttpClient + ?Sized>(
    client: &C,
    source: &FeedSource,
    options: &FetchOptions,
    reporter: &SharedProgressReporter,
) -> Result<Episode, SourceError> {
    reporter.report(ProgressEvent::FetchingSource {
        label: source.label.clone(),
        url: source.url.clone(),
    });

    let fetched = fetch_source(client, source, options)
        .await
        .map_err(SourceError::Fetch)?;

    let hint = match source.declared_format {
        FormatHint::Auto => fetched
            .content_type
            .as_deref()
            .map(FormatHint::from_content_type)
            .unwrap_or_default(),
        declared => declared,
    };

    let episode =
        normalize_with_hint(&source.label, &fetched.body, hint).map_err(SourceError::Normalize)?;

    debug!(label = %source.label, title = %episode.title, via_proxy = fetched.via_proxy, "source ready");
    reporter.report(ProgressEvent::SourceReady {
        label: source.label.clone(),
        title: episode.title.clone(),
    });

    Ok(episode)
}
