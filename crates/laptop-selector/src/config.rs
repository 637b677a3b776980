use std::net::SocketAddr;
use std::time::Duration;

use selector_common::admin::DEFAULT_FUZZY_THRESHOLD;
use selector_common::catalog::CatalogClientConfig;

use crate::error::AppError;

/// How the service is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeMode {
    /// JSON API over HTTP.
    Http,
    /// MCP tools over stdio.
    Mcp,
}

/// Application configuration loaded explicitly from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub catalog: CatalogClientConfig,
    /// Redis connection URL. `None` disables caching.
    pub redis_url: Option<String>,
    pub mode: ServeMode,
    pub bind_addr: SocketAddr,
    /// Admin credentials. Admin routes reject everything when absent.
    pub admin: Option<(String, String)>,
    pub cache_ttl: Duration,
    pub fuzzy_threshold: f64,
}

impl Config {
    /// Required:
    /// - `CATALOG_URL`, `CATALOG_API_KEY` (see `CatalogClientConfig`)
    ///
    /// Optional:
    /// - `REDIS_URL`
    /// - `SELECTOR_MODE`: `http` (default) or `mcp`
    /// - `SELECTOR_BIND_ADDR` (default "0.0.0.0:8080")
    /// - `ADMIN_USER` and `ADMIN_PASS`, both or neither
    /// - `CATALOG_CACHE_TTL_SECS` (default 300)
    /// - `FUZZY_THRESHOLD` (default 0.3)
    pub fn from_env() -> Result<Self, AppError> {
        let catalog = CatalogClientConfig::from_env()?;

        let mode = match std::env::var("SELECTOR_MODE")
            .unwrap_or_else(|_| "http".to_string())
            .to_lowercase()
            .as_str()
        {
            "http" => ServeMode::Http,
            "mcp" => ServeMode::Mcp,
            other => {
                return Err(AppError::Config(format!(
                    "SELECTOR_MODE must be \"http\" or \"mcp\", got {other:?}"
                )))
            }
        };

        let bind_raw =
            std::env::var("SELECTOR_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("invalid SELECTOR_BIND_ADDR {bind_raw:?}: {e}")))?;

        let admin = match (std::env::var("ADMIN_USER"), std::env::var("ADMIN_PASS")) {
            (Ok(user), Ok(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            (Err(_), Err(_)) => None,
            _ => {
                return Err(AppError::Config(
                    "ADMIN_USER and ADMIN_PASS must be set together".to_string(),
                ))
            }
        };

        let cache_ttl = std::env::var("CATALOG_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(300));

        let fuzzy_threshold = std::env::var("FUZZY_THRESHOLD")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|t| *t > 0.0 && *t <= 1.0)
            .unwrap_or(DEFAULT_FUZZY_THRESHOLD);

        Ok(Self {
            catalog,
            redis_url: std::env::var("REDIS_URL").ok(),
            mode,
            bind_addr,
            admin,
            cache_ttl,
            fuzzy_threshold,
        })
    }
}
