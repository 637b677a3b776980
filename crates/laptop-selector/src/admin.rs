/// Catalog maintenance routes, mounted under `/api/admin`.
///
/// Every route takes an [`AdminUser`], which checks HTTP Basic credentials
/// against the configured pair. Only SHA-256 digests of the credentials are
/// kept in memory and compared.
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use selector_common::admin::{AdminLookups, BulkUpdate, FuzzyLaptopInsert, LaptopPatch, LaptopRecord};
use selector_common::model::LookupItem;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::http::AppState;
use crate::source::LookupTable;

#[derive(Clone)]
pub struct AdminCredentials {
    user_digest: [u8; 32],
    pass_digest: [u8; 32],
}

impl AdminCredentials {
    pub fn new(user: &str, pass: &str) -> Self {
        Self {
            user_digest: digest(user),
            pass_digest: digest(pass),
        }
    }

    pub fn verify(&self, user: &str, pass: &str) -> bool {
        // both halves are always hashed and compared
        let user_ok = digest(user) == self.user_digest;
        let pass_ok = digest(pass) == self.pass_digest;
        user_ok & pass_ok
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// `Authorization: Basic base64(user:pass)` → `(user, pass)`.
fn parse_basic(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, pass) = text.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Proof that the request carried valid admin credentials.
pub struct AdminUser;

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(credentials) = &state.admin else {
            return Err(AppError::Unauthorized("admin access is not configured".to_string()));
        };
        let (user, pass) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_basic)
            .ok_or_else(|| AppError::Unauthorized("missing admin credentials".to_string()))?;

        if !credentials.verify(&user, &pass) {
            warn!(path = %parts.uri.path(), "rejected admin credentials");
            return Err(AppError::Unauthorized("invalid admin credentials".to_string()));
        }
        Ok(AdminUser)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/laptops", get(list_laptops).post(create_laptop))
        .route("/laptops/bulk", post(bulk_update))
        .route("/laptops/fuzzy", post(fuzzy_insert))
        .route("/laptops/{id}", patch(update_laptop).delete(delete_laptop))
        .route("/lookups", get(lookups))
        .route("/lookups/{table}", get(search_lookup))
}

#[derive(Debug, Default, Deserialize)]
struct NameFilter {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LookupSearch {
    #[serde(default)]
    q: String,
}

async fn list_laptops(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<NameFilter>,
) -> Result<Json<Vec<LaptopRecord>>, AppError> {
    Ok(Json(state.service.admin_laptops(filter.name.as_deref()).await?))
}

async fn create_laptop(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<LaptopPatch>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let id = state.service.admin_insert(patch).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn update_laptop(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<LaptopPatch>,
) -> Result<StatusCode, AppError> {
    state.service.admin_update(id, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_laptop(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    state.service.admin_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn bulk_update(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiJson(bulk): ApiJson<BulkUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = state.service.admin_bulk_update(bulk).await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

async fn fuzzy_insert(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiJson(insert): ApiJson<FuzzyLaptopInsert>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let created = state.service.admin_fuzzy_insert(insert).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "result": created }))))
}

async fn lookups(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<AdminLookups>, AppError> {
    Ok(Json(state.service.admin_lookups().await?))
}

async fn search_lookup(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(table): ApiPath<String>,
    ApiQuery(search): ApiQuery<LookupSearch>,
) -> Result<Json<Vec<LookupItem>>, AppError> {
    let table = table.parse::<LookupTable>().map_err(AppError::Validation)?;
    Ok(Json(state.service.admin_lookup_search(table, &search.q).await?))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;

    use super::*;
    use crate::http::tests::{app_with, send};
    use crate::service::tests::sample_catalog;
    use crate::source::memory::MemoryCatalog;

    fn basic(user: &str, pass: &str) -> String {
        let token = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
        format!("Basic {token}")
    }

    fn admin_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, basic("admin", "hunter2"));
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[test]
    fn basic_header_parsing() {
        assert_eq!(
            parse_basic(&basic("ann", "p:w")),
            Some(("ann".to_string(), "p:w".to_string()))
        );
        assert_eq!(parse_basic("Bearer abc"), None);
        assert_eq!(parse_basic("Basic !!!"), None);
    }

    #[test]
    fn credentials_compare_digests() {
        let creds = AdminCredentials::new("admin", "hunter2");
        assert!(creds.verify("admin", "hunter2"));
        assert!(!creds.verify("admin", "hunter3"));
        assert!(!creds.verify("root", "hunter2"));
    }

    #[tokio::test]
    async fn admin_routes_reject_bad_or_missing_credentials() {
        let app = app_with(sample_catalog());
        let anonymous = Request::builder()
            .uri("/api/admin/laptops")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app.clone(), anonymous).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "missing admin credentials");

        let wrong = Request::builder()
            .uri("/api/admin/laptops")
            .header(header::AUTHORIZATION, basic("admin", "guess"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app, wrong).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_update_list_and_delete() {
        let app = app_with(sample_catalog());
        let (status, body) = send(
            app.clone(),
            admin_request(
                "POST",
                "/api/admin/laptops",
                Some(serde_json::json!({ "name": "Zen 14", "price_eur": 999.0, "ssd_text": "512GB" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_i64().unwrap();

        let (status, _) = send(
            app.clone(),
            admin_request(
                "PATCH",
                &format!("/api/admin/laptops/{id}"),
                Some(serde_json::json!({ "price_eur": 899.0 })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(
            app.clone(),
            admin_request("GET", "/api/admin/laptops?name=zen", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["price_eur"], 899.0);
        assert_eq!(body[0]["ssd_size_gb"], 512.0);

        let (status, _) = send(
            app.clone(),
            admin_request("DELETE", &format!("/api/admin/laptops/{id}"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            app,
            admin_request("DELETE", &format!("/api/admin/laptops/{id}"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bulk_and_fuzzy_validation() {
        let app = app_with(sample_catalog());
        let (status, body) = send(
            app.clone(),
            admin_request(
                "POST",
                "/api/admin/laptops/bulk",
                Some(serde_json::json!({ "ids": [], "patch": { "price_eur": 1.0 } })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ids must not be empty");

        let (status, body) = send(
            app.clone(),
            admin_request(
                "POST",
                "/api/admin/laptops/fuzzy",
                Some(serde_json::json!({
                    "name": "Zen 14",
                    "cpu_name": "ryzen 7",
                    "gpu_name": "radeon",
                    "ram_name": "16gb",
                    "threshold": 2.0
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("threshold"));

        let (status, body) = send(
            app,
            admin_request(
                "POST",
                "/api/admin/laptops/fuzzy",
                Some(serde_json::json!({
                    "name": "Zen 14",
                    "cpu_name": "ryzen 7",
                    "gpu_name": "radeon",
                    "ram_name": "16gb"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["result"], 1);
    }

    #[tokio::test]
    async fn malformed_ids_and_bodies_are_json_errors() {
        let app = app_with(sample_catalog());
        let (status, body) = send(
            app.clone(),
            admin_request("PATCH", "/api/admin/laptops/abc", Some(serde_json::json!({}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("abc"));

        let (status, body) = send(
            app,
            admin_request("POST", "/api/admin/laptops/bulk", Some(serde_json::json!({ "ids": "1,2" }))),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn lookups_and_lookup_search() {
        let app = app_with(MemoryCatalog {
            lookups: vec![
                (LookupTable::Cpus, LookupItem { id: 1, name: "Ryzen 7 7840HS".to_string() }),
                (LookupTable::Rams, LookupItem { id: 2, name: "32GB".to_string() }),
                (LookupTable::Brands, LookupItem { id: 3, name: "Lenovo".to_string() }),
            ],
            ..sample_catalog()
        });
        let (status, body) = send(app.clone(), admin_request("GET", "/api/admin/lookups", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ram_options"], serde_json::json!([32]));
        assert_eq!(body["brands"][0]["name"], "Lenovo");

        let (_, body) = send(
            app.clone(),
            admin_request("GET", "/api/admin/lookups/cpus?q=ryz", None),
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = send(
            app,
            admin_request("GET", "/api/admin/lookups/laptops?q=abc", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
