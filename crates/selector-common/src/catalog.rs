/// REST client for the hosted catalog database (PostgREST dialect).
///
/// Reads (table selects and read-only procedures) are retried with bounded
/// exponential back-off; writes are sent exactly once.
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CatalogError;

#[derive(Clone, Debug)]
pub struct CatalogClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub default_timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl CatalogClientConfig {
    /// Required: `CATALOG_URL`, `CATALOG_API_KEY`.
    ///
    /// Optional: `CATALOG_TIMEOUT_SECS` (30), `CATALOG_MAX_RETRIES` (2),
    /// `CATALOG_RETRY_INITIAL_MS` (200), `CATALOG_RETRY_MAX_MS` (5000),
    /// `CATALOG_MAX_ERROR_BODY_BYTES` (8 KiB).
    pub fn from_env() -> Result<Self, CatalogError> {
        let base_url = std::env::var("CATALOG_URL").map_err(|_| {
            CatalogError::Config("CATALOG_URL environment variable is required".to_string())
        })?;
        let api_key = std::env::var("CATALOG_API_KEY").map_err(|_| {
            CatalogError::Config("CATALOG_API_KEY environment variable is required".to_string())
        })?;

        let default_timeout = std::env::var("CATALOG_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        let max_retries = std::env::var("CATALOG_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(2);

        let initial_backoff = std::env::var("CATALOG_RETRY_INITIAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(200));

        let max_backoff = std::env::var("CATALOG_RETRY_MAX_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(5_000));

        let max_error_body_bytes = std::env::var("CATALOG_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8 * 1024);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            default_timeout,
            max_retries,
            initial_backoff,
            max_backoff,
            max_error_body_bytes,
        })
    }

    /// Sleep before retry number `retry` (0-based): `initial * 2^retry`, capped
    /// at `max_backoff`, plus up to a quarter of that as jitter.
    fn retry_delay(&self, retry: u32) -> Duration {
        let factor = 1u128.checked_shl(retry).unwrap_or(u128::MAX);
        let capped_ms = self
            .initial_backoff
            .as_millis()
            .saturating_mul(factor)
            .min(self.max_backoff.as_millis()) as u64;
        let jitter_span = (capped_ms / 4).max(1) + 1;
        let clock_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::from(d.subsec_nanos()))
            .unwrap_or(0);
        Duration::from_millis(capped_ms.saturating_add(clock_nanos % jitter_span))
    }
}

/// Filters and modifiers for one table/view read or write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub fn in_ids(mut self, column: &str, ids: &[i64]) -> Self {
        let list: Vec<String> = ids.iter().map(i64::to_string).collect();
        self.params
            .push((column.to_string(), format!("in.({})", list.join(","))));
        self
    }

    /// Case-insensitive substring match.
    pub fn ilike_contains(mut self, column: &str, needle: &str) -> Self {
        // `*` is the URL-safe wildcard; strip it from user input
        let needle = needle.replace('*', "");
        self.params
            .push((column.to_string(), format!("ilike.*{needle}*")));
        self
    }

    pub fn not_null(mut self, column: &str) -> Self {
        self.params
            .push((column.to_string(), "not.is.null".to_string()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        self.params
            .push(("order".to_string(), format!("{column}.{dir}")));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.params.push(("limit".to_string(), n.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

#[derive(Clone)]
pub struct CatalogClient {
    config: CatalogClientConfig,
    http: reqwest::Client,
}

impl CatalogClient {
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .user_agent("laptop-selector")
            .build()?;
        Ok(Self { config, http })
    }

    /// GET rows from a table or view.
    pub async fn select<T: DeserializeOwned>(
        &self,
        relation: &str,
        query: &Query,
    ) -> Result<Vec<T>, CatalogError> {
        let url = format!("{}/{relation}", self.config.base_url);
        self.request_with_retry(|| async {
            let resp = self
                .request(Method::GET, &url)
                .query(query.params())
                .send()
                .await?;
            Self::parse_json_response(resp, self.config.max_error_body_bytes).await
        })
        .await
    }

    /// Call a read-only stored procedure.
    pub async fn rpc<A: Serialize + Sync, T: DeserializeOwned>(
        &self,
        function: &str,
        args: &A,
    ) -> Result<T, CatalogError> {
        let url = format!("{}/rpc/{function}", self.config.base_url);
        self.request_with_retry(|| async {
            let resp = self.request(Method::POST, &url).json(args).send().await?;
            Self::parse_json_response(resp, self.config.max_error_body_bytes).await
        })
        .await
    }

    /// Call a procedure that writes. Never retried.
    pub async fn rpc_mutating<A: Serialize, T: DeserializeOwned>(
        &self,
        function: &str,
        args: &A,
    ) -> Result<T, CatalogError> {
        let url = format!("{}/rpc/{function}", self.config.base_url);
        let resp = self.request(Method::POST, &url).json(args).send().await?;
        Self::parse_json_response(resp, self.config.max_error_body_bytes).await
    }

    /// Insert one row and return the inserted representation.
    pub async fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
        returning: &str,
    ) -> Result<Vec<T>, CatalogError> {
        let url = format!("{}/{table}", self.config.base_url);
        let resp = self
            .request(Method::POST, &url)
            .header("Prefer", "return=representation")
            .query(&[("select", returning)])
            .json(body)
            .send()
            .await?;
        Self::parse_json_response(resp, self.config.max_error_body_bytes).await
    }

    /// PATCH every row matching `filter`. Returns the number of rows touched.
    pub async fn update<B: Serialize>(
        &self,
        table: &str,
        filter: &Query,
        body: &B,
    ) -> Result<usize, CatalogError> {
        let url = format!("{}/{table}", self.config.base_url);
        let resp = self
            .request(Method::PATCH, &url)
            .header("Prefer", "return=representation")
            .query(filter.params())
            .json(body)
            .send()
            .await?;
        let rows: Vec<serde_json::Value> =
            Self::parse_json_response(resp, self.config.max_error_body_bytes).await?;
        Ok(rows.len())
    }

    /// DELETE every row matching `filter`. Returns the number of rows removed.
    pub async fn delete(&self, table: &str, filter: &Query) -> Result<usize, CatalogError> {
        let url = format!("{}/{table}", self.config.base_url);
        let resp = self
            .request(Method::DELETE, &url)
            .header("Prefer", "return=representation")
            .query(filter.params())
            .send()
            .await?;
        let rows: Vec<serde_json::Value> =
            Self::parse_json_response(resp, self.config.max_error_body_bytes).await?;
        Ok(rows.len())
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .timeout(self.config.default_timeout)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn parse_json_response<T: DeserializeOwned>(
        resp: reqwest::Response,
        max_error_body_bytes: usize,
    ) -> Result<T, CatalogError> {
        if resp.status().is_success() {
            let bytes = resp.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }
        Err(Self::to_upstream_error(resp, max_error_body_bytes).await)
    }

    /// Turn a non-2xx response into an error, keeping at most
    /// `max_error_body_bytes` of the body.
    async fn to_upstream_error(resp: reqwest::Response, max_error_body_bytes: usize) -> CatalogError {
        let status = resp.status();
        let body = match resp.bytes().await {
            Ok(mut bytes) => {
                bytes.truncate(max_error_body_bytes);
                String::from_utf8_lossy(&bytes).into_owned()
            }
            Err(e) => {
                warn!(error = %e, "failed to read catalog error body");
                return CatalogError::UpstreamBody {
                    status,
                    body: "<failed to read error body>".to_string(),
                };
            }
        };
        match serde_json::from_str::<PostgrestError>(&body) {
            Ok(PostgrestError { message: Some(message), code }) => {
                if let Some(code) = code {
                    warn!(%status, code = %code, "catalog rejected request");
                }
                CatalogError::Upstream { status, message }
            }
            _ => CatalogError::UpstreamBody { status, body },
        }
    }

    async fn request_with_retry<T, Fut, F>(&self, mut f: F) -> Result<T, CatalogError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CatalogError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt > self.config.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    let delay = self.config.retry_delay(attempt - 1);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "catalog request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn should_retry(err: &CatalogError) -> bool {
    match err {
        CatalogError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        CatalogError::Upstream { status, .. } | CatalogError::UpstreamBody { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        CatalogError::InvalidJson(_) | CatalogError::Config(_) => false,
    }
}

/// Error envelope returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builds_postgrest_params() {
        let q = Query::new()
            .select("id,name")
            .in_ids("id", &[3, 1, 2])
            .ilike_contains("name", "zen*book")
            .not_null("ssd_size_gb")
            .order("id", false)
            .limit(50);
        let params: Vec<(&str, &str)> = q
            .params()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            params,
            vec![
                ("select", "id,name"),
                ("id", "in.(3,1,2)"),
                ("name", "ilike.*zenbook*"),
                ("ssd_size_gb", "not.is.null"),
                ("order", "id.desc"),
                ("limit", "50"),
            ]
        );
        assert_eq!(Query::new().eq("id", 7).params()[0].1, "eq.7");
    }

    #[test]
    fn retry_delay_is_capped() {
        let config = CatalogClientConfig {
            base_url: "http://localhost".to_string(),
            api_key: "key".to_string(),
            default_timeout: Duration::from_secs(1),
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(1_000),
            max_error_body_bytes: 64,
        };
        for retry in 0..40 {
            let d = config.retry_delay(retry);
            assert!(d <= Duration::from_millis(1_250), "delay {d:?} exceeds cap plus jitter");
        }
        assert!(config.retry_delay(0) >= Duration::from_millis(200));
    }

    #[test]
    fn only_transient_statuses_are_retried() {
        let unavailable = CatalogError::UpstreamBody {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        };
        let throttled = CatalogError::Upstream {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "slow down".to_string(),
        };
        let bad_request = CatalogError::Upstream {
            status: StatusCode::BAD_REQUEST,
            message: "column does not exist".to_string(),
        };
        assert!(should_retry(&unavailable));
        assert!(should_retry(&throttled));
        assert!(!should_retry(&bad_request));
        assert_eq!(bad_request.public_message(), "column does not exist");
    }
}
