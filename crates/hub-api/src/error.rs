use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use hub_types::api::StatusMessage;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// A write that lost a race with a delete reports the missing row as 404.
    pub fn missing_on_fk(err: anyhow::Error, msg: &str) -> Self {
        if hub_db::is_foreign_key_violation(&err) {
            Self::NotFound(msg.to_string())
        } else {
            Self::Internal(err)
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Details stay in the server log
            Self::Internal(e) => {
                error!("{:#}", e);
                "Server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(StatusMessage::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(anyhow::anyhow!("disk on fire")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn foreign_key_failures_become_not_found() {
        let db = hub_db::Database::open_in_memory().unwrap();
        let err = db.toggle_like("gone", "nobody").unwrap_err();
        let mapped = ApiError::missing_on_fk(err, "Post not found.");
        assert_eq!(mapped.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(mapped.to_string(), "Post not found.");

        let other = ApiError::missing_on_fk(anyhow::anyhow!("disk on fire"), "Post not found.");
        assert_eq!(other.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn rejections_render_as_json_400() {
        use axum::extract::FromRequest;

        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .body(axum::body::Body::from("{}"))
            .unwrap();
        let rejection = axum::Json::<hub_types::api::CommentRequest>::from_request(req, &())
            .await
            .unwrap_err();

        let resp = ApiError::from(rejection).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let msg: StatusMessage = serde_json::from_slice(&body).unwrap();
        assert!(msg.message.contains("Content-Type"));
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let resp = ApiError::from(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let msg: StatusMessage = serde_json::from_slice(&body).unwrap();
        assert_eq!(msg.message, "Server error");
    }
}
