//! Error type shared by the engine and the HTTP layer.
//!
//! Engine operations return `AppError`; handlers return it directly and the
//! `IntoResponse` impl picks the status code. Storage and other unexpected
//! failures are logged here and reach the client only as a generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Referenced server, member or user does not exist.
    #[error("{0}")]
    NotFound(&'static str),

    /// Wrong join code, or the requester lacks the required role.
    #[error("{0}")]
    Forbidden(&'static str),

    /// Missing or invalid session.
    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("You are already a member of this server")]
    AlreadyMember,

    /// A conditional write lost against a concurrent writer.
    #[error("Server was modified concurrently, please retry")]
    StaleVersion,

    #[error(transparent)]
    Database(sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::AlreadyMember => StatusCode::BAD_REQUEST,
            Self::StaleVersion => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// SQLITE_BUSY (5) or SQLITE_LOCKED (6), in any of their extended forms.
fn is_lock_contention(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db) = err else {
        return false;
    };
    db.code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, 5 | 6))
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        // A writer that could not get the lock lost the race; the client retries.
        if is_lock_contention(&err) {
            Self::StaleVersion
        } else {
            Self::Database(err)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::NotFound("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::AlreadyMember.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::BadRequest("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::StaleVersion.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_lock_contention_maps_to_stale_version() {
        use sqlx::sqlite::SqliteConnectOptions;
        use sqlx::{Connection, SqliteConnection};

        let dir = tempfile::tempdir().unwrap();
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("lock.db"))
            .create_if_missing(true)
            .busy_timeout(std::time::Duration::ZERO);
        let mut holder = SqliteConnection::connect_with(&options).await.unwrap();
        let mut contender = SqliteConnection::connect_with(&options).await.unwrap();

        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut holder)
            .await
            .unwrap();
        let err = sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut contender)
            .await
            .unwrap_err();

        let app_err = AppError::from(err);
        assert!(matches!(app_err, AppError::StaleVersion));
        assert_eq!(app_err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_other_database_errors_stay_internal() {
        assert!(matches!(
            AppError::from(sqlx::Error::RowNotFound),
            AppError::Database(_)
        ));
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let resp = AppError::Internal("secret detail".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("secret detail"));
        assert!(text.contains("Internal server error"));
    }

    #[tokio::test]
    async fn test_client_errors_carry_message() {
        let resp = AppError::NotFound("Server not found").into_response();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Server not found");
    }
}
