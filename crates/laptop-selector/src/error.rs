use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use selector_common::error::CatalogError;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    RateLimited(String),

    /// A query string, path segment or body that did not deserialize.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Rejected { status, .. } => *status,
            Self::Config(_) | Self::Internal(_) | Self::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message for response bodies and tool errors.
    pub fn public_message(&self) -> String {
        match self {
            Self::Catalog(e) => e.public_message(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }

        let mut response =
            (status, Json(serde_json::json!({ "error": self.public_message() }))).into_response();
        if matches!(self, Self::Unauthorized(_)) {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Basic realm=\"admin\""),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_variants() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::RateLimited("x".into()).status(), StatusCode::TOO_MANY_REQUESTS);
        let upstream = AppError::from(CatalogError::Upstream {
            status: StatusCode::BAD_GATEWAY,
            message: "relation does not exist".to_string(),
        });
        assert_eq!(upstream.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(upstream.public_message(), "relation does not exist");
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let response = AppError::Unauthorized("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response
            .headers()
            .contains_key(axum::http::header::WWW_AUTHENTICATE));
    }
}
