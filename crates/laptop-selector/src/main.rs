mod admin;
mod cache;
mod config;
mod error;
mod extract;
mod http;
mod rate_limit;
mod server;
mod service;
mod source;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use tracing_subscriber::EnvFilter;

use selector_common::catalog::CatalogClient;
use selector_common::redis::RedisCache;

use cache::CatalogCache;
use config::{Config, ServeMode};
use http::AppState;
use server::SelectorServer;
use service::SelectorService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting laptop-selector");

    let config = Config::from_env()?;
    info!(
        base_url = %config.catalog.base_url,
        timeout_ms = config.catalog.default_timeout.as_millis(),
        max_retries = config.catalog.max_retries,
        "catalog client configured"
    );
    let catalog = CatalogClient::new(config.catalog.clone())?;

    let cache = CatalogCache::new(RedisCache::new(config.redis_url.as_deref()), config.cache_ttl);
    if cache.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without cache");
    }

    let limiter = rate_limit::RateLimiter::from_env();
    let service = SelectorService::new(
        Arc::new(catalog),
        cache,
        config.cache_ttl,
        limiter,
        config.fuzzy_threshold,
    );

    match config.mode {
        ServeMode::Mcp => {
            info!("MCP server ready, serving on stdio");
            let service = SelectorServer::new(service)
                .serve(stdio())
                .await
                .inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
            service.waiting().await?;
            info!("MCP server shut down");
        }
        ServeMode::Http => {
            if config.admin.is_none() {
                info!("ADMIN_USER/ADMIN_PASS not set, admin routes disabled");
            }
            let state = AppState {
                service,
                admin: config
                    .admin
                    .as_ref()
                    .map(|(user, pass)| admin::AdminCredentials::new(user, pass)),
            };
            let app = http::build_router(state);
            let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
            info!(addr = %config.bind_addr, "HTTP server listening");
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}
