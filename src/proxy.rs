// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use actix_web::http::header::{self, HeaderValue};
use actix_web::http::{Method, StatusCode};
use actix_web::{HttpRequest, HttpResponse, ResponseError, web};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ProxyError;
use crate::feed::FormatHint;
use crate::http::{HttpClient, HttpResponse as UpstreamResponse};

/// Seconds clients may cache a proxied feed
pub const PROXY_CACHE_SECONDS: u32 = 300;

/// Hosts that may always call the proxy, besides the serving host itself
const LOCAL_ORIGINS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Shared state of the proxy endpoint
pub struct ProxyState {
    pub client: Arc<dyn HttpClient>,
    /// Upstream hosts the proxy may fetch from, subdomains included
    pub allowed_domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

/// `/proxy?url=<feed>`: fetch a whitelisted feed on behalf of a browser
///
/// Answers any method so that disallowed ones get a 405 after the origin
/// check.
pub async fn proxy(
    req: HttpRequest,
    query: web::Query<ProxyQuery>,
    state: web::Data<ProxyState>,
) -> HttpResponse {
    let origin = request_origin(&req);
    let request_host = request_host(&req);

    if let Some(origin) = origin.as_deref()
        && !origin_allowed(origin, request_host.as_deref())
    {
        info!(origin, "proxy request rejected: invalid origin");
        return ProxyError::InvalidOrigin.error_response();
    }

    let allow_origin = origin.unwrap_or_else(|| "*".to_string());

    let mut response = match handle(&req, query.url.as_deref(), &state).await {
        Ok(response) => response,
        Err(error) => {
            match &error {
                ProxyError::Upstream(e) => warn!(error = %e, "proxy upstream fetch failed"),
                other => info!(error = %other, "proxy request refused"),
            }
            error.error_response()
        }
    };

    add_cors_headers(&mut response, &allow_origin);
    response
}

async fn handle(
    req: &HttpRequest,
    url: Option<&str>,
    state: &ProxyState,
) -> Result<HttpResponse, ProxyError> {
    if req.method() == Method::OPTIONS {
        return Ok(HttpResponse::Ok().finish());
    }
    if req.method() != Method::GET {
        return Err(ProxyError::MethodNotAllowed);
    }

    let feed_url = validate_feed_url(url)?;
    let domain = feed_url.host_str().unwrap_or_default().to_string();

    if state.allowed_domains.is_empty() {
        return Err(ProxyError::NoAllowedDomains);
    }
    if !domain_allowed(&domain, &state.allowed_domains) {
        return Err(ProxyError::DomainNotAllowed { domain });
    }

    debug!(url = %feed_url, "proxying feed");
    let upstream = state
        .client
        .get(feed_url.as_str(), FormatHint::Auto.accept_header())
        .await?;

    relay(upstream)
}

/// Check the upstream answer and turn it into the proxy's response
fn relay(upstream: UpstreamResponse) -> Result<HttpResponse, ProxyError> {
    if upstream.status != 200 {
        return Err(ProxyError::UpstreamStatus {
            status: upstream.status,
        });
    }
    if upstream.body.is_empty() {
        return Err(ProxyError::EmptyResponse);
    }

    let declared = upstream.content_type.as_deref().unwrap_or_default();
    let body = &upstream.body;

    let content_type = if declared.contains("xml") || body.starts_with(b"<?xml") {
        check_xml(body).map_err(|reason| ProxyError::InvalidXml { reason })?;
        "application/xml; charset=utf-8".to_string()
    } else if declared.contains("json") || body.starts_with(b"{") || body.starts_with(b"[") {
        serde_json::from_slice::<serde_json::Value>(body).map_err(|e| {
            ProxyError::InvalidJson {
                reason: e.to_string(),
            }
        })?;
        "application/json; charset=utf-8".to_string()
    } else if declared.is_empty() {
        "application/xml".to_string()
    } else {
        declared.to_string()
    };

    Ok(HttpResponse::build(StatusCode::OK)
        .insert_header((header::CONTENT_TYPE, content_type))
        .insert_header((
            header::CACHE_CONTROL,
            format!("public, max-age={PROXY_CACHE_SECONDS}"),
        ))
        .body(upstream.body))
}

fn validate_feed_url(url: Option<&str>) -> Result<Url, ProxyError> {
    let url = url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(ProxyError::MissingUrl)?;

    let parsed = Url::parse(url).map_err(|_| ProxyError::InvalidUrl)?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ProxyError::InvalidUrl);
    }
    Ok(parsed)
}

/// The `Origin` header, falling back to `Referer`
fn request_origin(req: &HttpRequest) -> Option<String> {
    [header::ORIGIN, header::REFERER]
        .iter()
        .filter_map(|name| req.headers().get(name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(String::from)
}

/// Host name the request was addressed to, without port
fn request_host(req: &HttpRequest) -> Option<String> {
    let host = req.connection_info().host().to_string();
    Url::parse(&format!("http://{host}"))
        .ok()
        .and_then(|url| url.host_str().map(String::from))
}

fn host_matches(host: &str, allowed: &str) -> bool {
    !allowed.is_empty()
        && (host == allowed
            || host
                .strip_suffix(allowed)
                .is_some_and(|rest| rest.ends_with('.')))
}

/// Whether a browser origin may use the proxy
pub fn origin_allowed(origin: &str, request_host: Option<&str>) -> bool {
    let Some(origin_host) = Url::parse(origin)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
    else {
        return false;
    };

    request_host
        .into_iter()
        .chain(LOCAL_ORIGINS)
        .any(|allowed| host_matches(&origin_host, &allowed.to_ascii_lowercase()))
}

/// Whether the proxy may fetch from `domain`
pub fn domain_allowed(domain: &str, allowed_domains: &[String]) -> bool {
    let domain = domain.to_ascii_lowercase();
    allowed_domains
        .iter()
        .any(|allowed| host_matches(&domain, &allowed.trim().to_ascii_lowercase()))
}

/// Check that a body is one well-formed XML document
fn check_xml(body: &[u8]) -> Result<(), String> {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => {
                if depth == 0 && seen_root {
                    return Err("content after the root element".to_string());
                }
                depth += 1;
                seen_root = true;
            }
            Ok(Event::Empty(_)) if depth == 0 => {
                if seen_root {
                    return Err("content after the root element".to_string());
                }
                seen_root = true;
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err("no root element".to_string());
    }
    if depth != 0 {
        return Err("unclosed element".to_string());
    }
    Ok(())
}

fn add_cors_headers(response: &mut HttpResponse, allow_origin: &str) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(allow_origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Accept"),
    );
}
