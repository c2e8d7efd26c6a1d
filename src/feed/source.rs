// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::detect::FormatHint;

/// A configured feed to take the latest episode from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    /// Provenance label shown with every episode, never empty
    pub label: String,
    pub url: String,
    pub declared_format: FormatHint,
    /// Only fetch through the proxy, never directly
    pub requires_proxy: bool,
}

impl FeedSource {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            declared_format: FormatHint::Auto,
            requires_proxy: false,
        }
    }

    pub fn with_format(mut self, format: FormatHint) -> Self {
        self.declared_format = format;
        self
    }

    pub fn with_requires_proxy(mut self, requires_proxy: bool) -> Self {
        self.requires_proxy = requires_proxy;
        self
    }
}
