/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - RepoError / AuthError を統一的に変換
 *
 * Body: {"success": false, "error": <status>, "message": <text>, "code": <code>}
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repos::error::RepoError;
use crate::services::auth::AuthError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: u16,
    pub message: String,
    pub code: &'static str,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::Unprocessable(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            AppError::Unprocessable(message) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable", message)
            }
            AppError::Auth(err) => (err.status(), err.code(), err.description()),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_server_error",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            success: false,
            error: status.as_u16(),
            message,
            code,
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        tracing::error!(error = ?e, "repository failure");
        match e {
            RepoError::Db(_) => AppError::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn auth_errors_render_code_and_description_only() {
        let (status, body) = body_of(AuthError::PermissionDenied.into()).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], 403);
        assert_eq!(body["message"], "Permission not found.");
        assert_eq!(body["code"], "unauthorized");
    }

    #[tokio::test]
    async fn unprocessable_keeps_message() {
        let (status, body) = body_of(AppError::unprocessable("No Name")).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], 422);
        assert_eq!(body["message"], "No Name");
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let (status, body) = body_of(RepoError::Db(sqlx::Error::PoolTimedOut).into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "internal server error");
    }
}
