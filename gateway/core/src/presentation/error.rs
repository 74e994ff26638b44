// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Uniform error envelope: {code, message, details?, correlation_id,
// timestamp}. Where a log row exists the correlation id equals the row id,
// so an error response can always be traced back to its record.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::application::logs::QueryError;
use crate::application::tenants::TenantError;
use crate::domain::repository::RepositoryError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub correlation_id: Uuid,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a serde_json::Value>,
    correlation_id: Uuid,
    timestamp: chrono::DateTime<Utc>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
            correlation_id: Uuid::new_v4(),
        }
    }

    /// The single outward 401. Deliberately does not distinguish unknown,
    /// rotated-out and disabled credentials.
    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "invalid or missing API key",
        )
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_error",
            message,
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            message,
        )
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Tie this response to an existing log row.
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: &self.message,
            details: self.details.as_ref(),
            correlation_id: self.correlation_id,
            timestamp: Utc::now(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<TenantError> for ApiError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::InvalidSlug(e) => ApiError::validation(e.to_string()),
            TenantError::SlugTaken(slug) => {
                ApiError::conflict(format!("slug '{slug}' is already taken"))
            }
            TenantError::NotFound(id) => ApiError::not_found(format!("tenant {id}")),
            TenantError::Auth(_) => ApiError::unauthorized(),
            TenantError::Repository(e) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::NotFound(what) => ApiError::not_found(what),
            QueryError::Repository(e) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => ApiError::not_found(what),
            RepositoryError::Conflict(what) => ApiError::conflict(what),
            other => ApiError::internal(other.to_string()),
        }
    }
}
