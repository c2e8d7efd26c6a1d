// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Errors that can occur when fetching a feed from the network
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Fetching {url} timed out after {timeout_ms} ms")]
    Timeout { url: String, timeout_ms: u64 },
}

/// Why a single source did not yield an episode.
///
/// All variants are per-source and non-fatal: the combined feed is built
/// from whatever sources succeeded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationFailure {
    #[error("[{label}] feed is neither RSS nor a JSON item list")]
    UnrecognizedFormat { label: String },

    #[error("[{label}] latest item has no playable audio")]
    NoAudioFound { label: String },

    #[error("[{label}] latest item is malformed: {reason}")]
    MalformedItem { label: String, reason: String },

    #[error("source label is empty")]
    EmptyLabel,
}

impl NormalizationFailure {
    /// Label of the source that failed
    pub fn label(&self) -> &str {
        match self {
            Self::UnrecognizedFormat { label }
            | Self::NoAudioFound { label }
            | Self::MalformedItem { label, .. } => label,
            Self::EmptyLabel => "",
        }
    }
}

/// Errors that can occur while loading the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON in {origin}: {source}")]
    ParseFailed {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Podcast country with an empty name")]
    EmptyLabel,

    #[error("Feed URL '{url}' for {label} is not a valid http(s) URL")]
    InvalidFeedUrl { label: String, url: String },
}

/// Errors that can occur when reading or writing the played history
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to read history file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write history file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse history JSON in {path}: {source}")]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize history: {0}")]
    JsonSerializeFailed(#[from] serde_json::Error),
}

/// Errors that can occur when rendering the combined feed
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to write RSS document: {0}")]
    WriteFailed(#[from] rss::Error),
}

/// Reasons the proxy refuses or fails a request, each mapped to a status
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Access denied: Invalid origin")]
    InvalidOrigin,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("URL parameter is required")]
    MissingUrl,

    #[error("Invalid URL provided")]
    InvalidUrl,

    #[error("No allowed domains configured")]
    NoAllowedDomains,

    #[error("Domain not allowed: {domain}")]
    DomainNotAllowed { domain: String },

    #[error("Failed to fetch feed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("HTTP Error: {status}")]
    UpstreamStatus { status: u16 },

    #[error("Empty response from feed")]
    EmptyResponse,

    #[error("Invalid XML: {reason}")]
    InvalidXml { reason: String },

    #[error("Invalid JSON: {reason}")]
    InvalidJson { reason: String },
}

impl ResponseError for ProxyError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidOrigin | Self::NoAllowedDomains | Self::DomainNotAllowed { .. } => {
                StatusCode::FORBIDDEN
            }
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::MissingUrl | Self::InvalidUrl => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamStatus { status } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::EmptyResponse => StatusCode::NO_CONTENT,
            Self::InvalidXml { .. } | Self::InvalidJson { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        if matches!(self, Self::EmptyResponse) {
            return response.finish();
        }
        response
            .insert_header(ContentType::plaintext())
            .body(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_exposes_source_label() {
        let failures = [
            NormalizationFailure::UnrecognizedFormat {
                label: "Denmark".to_string(),
            },
            NormalizationFailure::NoAudioFound {
                label: "Denmark".to_string(),
            },
            NormalizationFailure::MalformedItem {
                label: "Denmark".to_string(),
                reason: "empty item".to_string(),
            },
        ];

        for failure in &failures {
            assert_eq!(failure.label(), "Denmark");
        }
    }

    #[test]
    fn failure_messages_name_the_source() {
        let failure = NormalizationFailure::NoAudioFound {
            label: "Sweden".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "[Sweden] latest item has no playable audio"
        );
    }

    #[test]
    fn proxy_errors_map_to_statuses() {
        let cases = [
            (ProxyError::InvalidOrigin, 403),
            (ProxyError::MethodNotAllowed, 405),
            (ProxyError::MissingUrl, 400),
            (ProxyError::InvalidUrl, 400),
            (ProxyError::NoAllowedDomains, 403),
            (
                ProxyError::DomainNotAllowed {
                    domain: "evil.example".to_string(),
                },
                403,
            ),
            (ProxyError::UpstreamStatus { status: 404 }, 404),
            (ProxyError::UpstreamStatus { status: 1000 }, 502),
            (ProxyError::EmptyResponse, 204),
            (
                ProxyError::InvalidXml {
                    reason: "unclosed".to_string(),
                },
                422,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.status_code().as_u16(), status, "{error}");
        }
    }

    #[test]
    fn proxy_error_messages() {
        assert_eq!(
            ProxyError::UpstreamStatus { status: 503 }.to_string(),
            "HTTP Error: 503"
        );
        assert_eq!(
            ProxyError::InvalidOrigin.to_string(),
            "Access denied: Invalid origin"
        );
    }
}
