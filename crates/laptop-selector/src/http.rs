use axum::extract::{RawQuery, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use selector_common::api::{
    CategoryListResponse, CompareParams, LaptopListResponse, ProgramSearchParams,
    ProgramSearchResponse, RecommendRequest, RecommendResponse, SoftwareBrowseRequest,
    SuggestParams, SuggestResponse, UserSpecs,
};
use selector_common::model::LaptopRow;
use selector_common::software::BrowsedSoftware;

use crate::admin::{self, AdminCredentials};
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::service::SelectorService;

#[derive(Clone)]
pub struct AppState {
    pub service: SelectorService,
    /// `None` rejects every admin request.
    pub admin: Option<AdminCredentials>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/categories", get(categories))
        .route("/api/hw-suggest", get(hw_suggest))
        .route("/api/programs/search", get(search_programs))
        .route("/api/recommend", get(recommend_from_query).post(recommend))
        .route("/api/laptops/{id}", get(laptop))
        .route("/api/compare", get(compare))
        .route("/api/software/browse", post(browse_software))
        .route("/api/software/by-specs", post(programs_by_specs))
        .nest("/api/admin", admin::router())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn categories(State(state): State<AppState>) -> Json<CategoryListResponse> {
    Json(state.service.categories())
}

async fn hw_suggest(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SuggestParams>,
) -> Result<Json<SuggestResponse>, AppError> {
    Ok(Json(state.service.suggest(&params).await?))
}

async fn search_programs(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ProgramSearchParams>,
) -> Result<Json<ProgramSearchResponse>, AppError> {
    Ok(Json(state.service.search_programs(&params).await?))
}

/// Accepts the same query string the wizard writes into share links.
async fn recommend_from_query(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<RecommendResponse>, AppError> {
    let query = query.unwrap_or_default();
    Ok(Json(state.service.recommend_query(&query).await?))
}

async fn recommend(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RecommendRequest>,
) -> Result<Json<RecommendResponse>, AppError> {
    Ok(Json(state.service.recommend(request).await?))
}

async fn laptop(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<LaptopRow>, AppError> {
    Ok(Json(state.service.laptop(id).await?))
}

async fn compare(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CompareParams>,
) -> Result<Json<LaptopListResponse>, AppError> {
    Ok(Json(state.service.compare(&params.parsed_ids()).await?))
}

async fn browse_software(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SoftwareBrowseRequest>,
) -> Json<Vec<BrowsedSoftware>> {
    Json(state.service.browse_software(&request))
}

async fn programs_by_specs(
    State(state): State<AppState>,
    ApiJson(specs): ApiJson<UserSpecs>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    Ok(Json(state.service.programs_by_specs(&specs).await?))
}

#[cfg(test)]
pub mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::rate_limit::RateLimiter;
    use crate::service::tests::{sample_catalog, service_with};
    use crate::source::memory::MemoryCatalog;

    pub fn app_with(catalog: MemoryCatalog) -> Router {
        build_router(AppState {
            service: service_with(Arc::new(catalog)),
            admin: Some(AdminCredentials::new("admin", "hunter2")),
        })
    }

    pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn hw_suggest_answers_empty_for_bad_input() {
        let app = app_with(sample_catalog());
        let (status, body) = send(app.clone(), get("/api/hw-suggest?type=ssd&q=samsung")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "items": [] }));

        let (status, body) = send(app.clone(), get("/api/hw-suggest?type=cpu&q=r")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 0);

        let (status, body) = send(app, get("/api/hw-suggest?type=GPU&q=rtx&limit=5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["kind"], "gpu");
    }

    #[tokio::test]
    async fn hw_suggest_reports_upstream_failure() {
        let app = app_with(MemoryCatalog {
            fail_reads: true,
            ..sample_catalog()
        });
        let (status, body) = send(app, get("/api/hw-suggest?type=cpu&q=ryzen")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({ "error": "catalog offline" }));
    }

    #[tokio::test]
    async fn malformed_parameters_answer_with_json_errors() {
        let app = app_with(sample_catalog());
        let (status, body) = send(app.clone(), get("/api/hw-suggest?type=cpu&q=ryzen&limit=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("limit"));

        let (status, body) = send(app.clone(), get("/api/laptops/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("abc"));

        let bad_body = Request::builder()
            .method("POST")
            .uri("/api/recommend")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app, bad_body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn rate_limited_suggestions_get_429() {
        let app = build_router(AppState {
            service: crate::service::SelectorService::new(
                Arc::new(sample_catalog()),
                crate::cache::CatalogCache::disabled(),
                std::time::Duration::from_secs(300),
                RateLimiter::new(1),
                0.3,
            ),
            admin: None,
        });
        let (status, _) = send(app.clone(), get("/api/hw-suggest?type=cpu&q=ryzen")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(app, get("/api/hw-suggest?type=cpu&q=ryzen")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["error"].as_str().unwrap().contains("rate limit"));
    }

    #[tokio::test]
    async fn laptop_detail_and_missing_laptop() {
        let app = app_with(sample_catalog());
        let (status, body) = send(app.clone(), get("/api/laptops/2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Air 13");

        let (status, body) = send(app, get("/api/laptops/42")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "laptop 42 not found");
    }

    #[tokio::test]
    async fn compare_uses_first_three_ids_in_order() {
        let app = app_with(sample_catalog());
        let (status, body) = send(app, get("/api/compare?ids=3,x,1,2,7")).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<i64> = body["laptops"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn program_search_matches_substrings() {
        let app = app_with(sample_catalog());
        let (_, body) = send(app.clone(), get("/api/programs/search?q=blend")).await;
        assert_eq!(body["programs"][0]["name"], "Blender");
        let (_, body) = send(app, get("/api/programs/search?q=b")).await;
        assert!(body["programs"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recommend_via_share_link_and_json() {
        let app = app_with(sample_catalog());
        let (status, body) = send(
            app.clone(),
            get("/api/recommend?c=office&sort=price_asc&max=1500"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["laptop"]["id"], 3);
        assert_eq!(body["share_query"], "c=office&w=office%3A100&max=1500&sort=price_asc");

        let (status, body) = send(
            app.clone(),
            post_json(
                "/api/recommend",
                serde_json::json!({
                    "categories": ["graphics", "office"],
                    "weights": { "graphics": 80 },
                    "program_ids": [10]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["laptop"]["id"], 1);
        assert_eq!(body["results"][0]["analysis"][0]["verdict"], "excellent");

        let (status, _) = send(
            app,
            post_json("/api/recommend", serde_json::json!({ "categories": ["astrology"] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn categories_and_software_browser() {
        let app = app_with(sample_catalog());
        let (_, body) = send(app.clone(), get("/api/categories")).await;
        assert_eq!(body["categories"].as_array().unwrap().len(), 11);

        let (status, body) = send(
            app,
            post_json(
                "/api/software/browse",
                serde_json::json!({
                    "filter": { "free_only": true },
                    "machine": { "ram_gb": 32, "cpu_cores": 8 }
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let hits = body.as_array().unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h["is_free"] == true));
        assert!(hits.iter().all(|h| h["compatible"].is_boolean()));
    }

    #[tokio::test]
    async fn programs_by_specs_forwards_to_catalog() {
        let app = app_with(sample_catalog());
        let (status, body) = send(
            app,
            post_json("/api/software/by-specs", serde_json::json!({ "ram_gb": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([{ "id": 11, "name": "LibreOffice" }]));
    }
}
