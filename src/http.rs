// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

/// User agent sent on every outgoing request
pub const USER_AGENT: &str = concat!("radionews/", env!("CARGO_PKG_VERSION"));

/// Redirect limit for proxied upstream requests
pub const PROXY_MAX_REDIRECTS: usize = 3;

/// Overall time budget for a proxied upstream request
pub const PROXY_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect time budget for a proxied upstream request
pub const PROXY_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP response with status, content type, and the complete body
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value, if present
    pub content_type: Option<String>,
    /// Response body
    pub body: Bytes,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction for testability
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET a URL with the given `Accept` header and read the whole body
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    async fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, reqwest::Error>;
}

/// Default HTTP client implementation using reqwest
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default settings
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a new ReqwestClient with a custom reqwest::Client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Client for fetching upstream feeds on behalf of the proxy
    ///
    /// Follows at most three redirects and bounds both connecting and the
    /// whole request.
    pub fn for_proxy() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(PROXY_MAX_REDIRECTS))
            .timeout(PROXY_TIMEOUT)
            .connect_timeout(PROXY_CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Client for fetching sources directly
    pub fn for_sources() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client))
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, reqwest::Error> {
        let response = self.client.get(url).header(ACCEPT, accept).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Scripted [`HttpClient`] for tests
#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::{HttpClient, HttpResponse};

    enum Route {
        Respond(HttpResponse),
        Hang,
    }

    /// Answers registered URLs with canned responses; anything else is a 404
    #[derive(Default)]
    pub struct MockHttpClient {
        routes: HashMap<String, Route>,
        requests: Mutex<Vec<(String, String)>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(
            mut self,
            url: &str,
            status: u16,
            content_type: Option<&str>,
            body: impl Into<Bytes>,
        ) -> Self {
            let response = HttpResponse {
                status,
                content_type: content_type.map(String::from),
                body: body.into(),
            };
            self.routes.insert(url.to_string(), Route::Respond(response));
            self
        }

        /// Register a URL that never answers
        pub fn hang(mut self, url: &str) -> Self {
            self.routes.insert(url.to_string(), Route::Hang);
            self
        }

        /// URLs requested so far, in order
        pub fn requested_urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(url, _)| url.clone())
                .collect()
        }

        /// `Accept` headers sent so far, in order
        pub fn accept_headers(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(_, accept)| accept.clone())
                .collect()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, reqwest::Error> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), accept.to_string()));

            match self.routes.get(url) {
                Some(Route::Respond(response)) => Ok(response.clone()),
                Some(Route::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(not_found())
                }
                None => Ok(not_found()),
            }
        }
    }

    fn not_found() -> HttpResponse {
        HttpResponse {
            status: 404,
            content_type: None,
            body: Bytes::new(),
        }
    }
}
