// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

/// Events emitted while collecting the latest episodes
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A source is being fetched
    FetchingSource { label: String, url: String },

    /// A source yielded its latest episode
    SourceReady { label: String, title: String },

    /// A source could not be fetched or normalized
    SourceFailed { label: String, error: String },

    /// All sources have been processed
    AggregationCompleted {
        episode_count: usize,
        failed_count: usize,
    },
}

/// Trait for reporting progress events while collecting episodes.
///
/// Implementations can use this to display spinners, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}
