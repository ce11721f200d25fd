use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{discuss::DiscussError, render::RenderError, repos::RepoError},
    domain::error::DomainError,
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<DiscussError> for AppError {
    fn from(error: DiscussError) -> Self {
        match error {
            DiscussError::Domain(err) => Self::Domain(err),
            DiscussError::Repo(err) => Self::Repo(err),
            DiscussError::Render(err) => Self::Render(err),
        }
    }
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::Repo(RepoError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            AppError::Domain(DomainError::Conflict { .. })
            | AppError::Repo(RepoError::Duplicate { .. }) => StatusCode::CONFLICT,
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Repo(RepoError::InvalidInput { .. }) => StatusCode::BAD_REQUEST,
            AppError::Infra(InfraError::Database { .. })
            | AppError::Repo(RepoError::Persistence(_) | RepoError::Timeout) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Infra(_)
            | AppError::Repo(RepoError::Integrity { .. })
            | AppError::Render(_)
            | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self.status_code() {
            StatusCode::NOT_FOUND => "Resource not found",
            StatusCode::CONFLICT => "Request conflicts with current state",
            StatusCode::BAD_REQUEST => "Request could not be processed",
            StatusCode::SERVICE_UNAVAILABLE => "Service temporarily unavailable",
            _ => "Unexpected error occurred",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.presentation_message();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, message).into_response();
        report.attach(&mut response);
        response
    }
}
