// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use actix_web::http::header;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use chrono::Utc;
use tracing::{error, info};

use crate::combine::collect_latest;
use crate::config::AppConfig;
use crate::feed::TitleStyle;
use crate::http::{HttpClient, ReqwestClient};
use crate::progress::NoopReporter;
use crate::proxy::{ProxyState, proxy};
use crate::render::{RSS_CONTENT_TYPE, render_feed};

/// Shared state of the combined feed endpoint
pub struct FeedState {
    pub config: AppConfig,
    pub client: Arc<dyn HttpClient>,
}

/// `/combined-feed.xml`: the latest episode of every source as one RSS feed
pub async fn combined_feed(req: HttpRequest, state: web::Data<FeedState>) -> HttpResponse {
    let config = &state.config;
    let combined = collect_latest(
        state.client.as_ref(),
        &config.sources(),
        &config.fetch_options(),
        &NoopReporter::shared(),
    )
    .await;

    let info = config.channel_info(req.full_url().as_str());
    match render_feed(&combined.episodes, &info, TitleStyle::Prefixed, Utc::now()) {
        Ok(body) => HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, RSS_CONTENT_TYPE))
            .insert_header((
                header::CACHE_CONTROL,
                format!("max-age={}", config.settings.feed_cache_time),
            ))
            .body(body),
        Err(e) => {
            error!(error = %e, "failed to render combined feed");
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

/// Register the service routes
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/proxy", web::route().to(proxy))
        .route("/combined-feed.xml", web::get().to(combined_feed));
}

/// Run the HTTP service until shut down
pub async fn serve(config: AppConfig, bind: &str) -> std::io::Result<()> {
    let proxy_state = web::Data::new(ProxyState {
        client: Arc::new(ReqwestClient::for_proxy().map_err(std::io::Error::other)?),
        allowed_domains: config.settings.allowed_domains.clone(),
    });
    let feed_state = web::Data::new(FeedState {
        client: Arc::new(ReqwestClient::for_sources().map_err(std::io::Error::other)?),
        config,
    });

    info!(bind, "serving /proxy and /combined-feed.xml");

    HttpServer::new(move || {
        App::new()
            .app_data(proxy_state.clone())
            .app_data(feed_state.clone())
            .configure(routes)
    })
    .bind(bind)?
    .run()
    .await
}
