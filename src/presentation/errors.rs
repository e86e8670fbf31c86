// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::models::scraper_job::DomainError;
use crate::domain::repositories::scraper_job_repository::RepositoryError;
use crate::utils::errors::ScraperError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，提供统一的错误处理接口
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        if let Some(err) = self.0.downcast_ref::<ScraperError>() {
            return match err {
                ScraperError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                ScraperError::InvalidState { .. } => (StatusCode::CONFLICT, "invalid_state"),
                ScraperError::Overlap { .. } => (StatusCode::CONFLICT, "overlap"),
                ScraperError::ClaimLost { .. } => (StatusCode::CONFLICT, "claim_lost"),
                ScraperError::Domain(DomainError::ValidationError(_)) => {
                    (StatusCode::BAD_REQUEST, "invalid_request")
                }
                ScraperError::Domain(DomainError::InvalidStateTransition { .. }) => {
                    (StatusCode::CONFLICT, "invalid_state")
                }
                ScraperError::UnknownStrategy(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "unknown_strategy")
                }
                ScraperError::Availability(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
                ScraperError::Fetch(_) => (StatusCode::BAD_GATEWAY, "fetch_failed"),
                ScraperError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_data"),
                ScraperError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            };
        }
        if self.0.downcast_ref::<validator::ValidationErrors>().is_some() {
            return (StatusCode::BAD_REQUEST, "invalid_request");
        }
        match self.0.downcast_ref::<RepositoryError>() {
            Some(RepositoryError::NotFound) => (StatusCode::NOT_FOUND, "not_found"),
            Some(RepositoryError::Conflict(_)) => (StatusCode::CONFLICT, "conflict"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.0);
        }

        let body = Json(json!({ "error": self.0.to_string(), "code": code }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
