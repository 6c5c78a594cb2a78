//! HTTP error mapping to RFC-9457 Problem Details

use crate::contract::HelpdeskError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// RFC-9457 Problem Details for HTTP API errors
#[derive(Debug, Serialize, ToSchema)]
pub struct Problem {
    /// A URI reference that identifies the problem type
    #[serde(rename = "type")]
    pub type_uri: String,

    /// A short, human-readable summary of the problem type
    pub title: String,

    /// The HTTP status code
    pub status: u16,

    /// A human-readable explanation specific to this occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Per-field messages for form validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            type_uri: format!("https://httpstatuses.io/{}", status.as_u16()),
            title: title.into(),
            status: status.as_u16(),
            detail: None,
            errors: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_errors(mut self, errors: BTreeMap<String, Vec<String>>) -> Self {
        self.errors = Some(errors);
        self
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<HelpdeskError> for Problem {
    fn from(error: HelpdeskError) -> Self {
        map_domain_error(error)
    }
}

/// Map domain errors to HTTP Problem Details
pub fn map_domain_error(error: HelpdeskError) -> Problem {
    match error {
        HelpdeskError::Validation(errors) => Problem::new(
            StatusCode::BAD_REQUEST,
            "Validation Error",
        )
        .with_detail(errors.to_string())
        .with_errors(errors.into_map()),

        HelpdeskError::Unauthenticated => Problem::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
        )
        .with_detail("Sign in to continue"),

        HelpdeskError::Forbidden { reason } => {
            Problem::new(StatusCode::FORBIDDEN, "Forbidden").with_detail(reason)
        }

        HelpdeskError::NotFound { resource, id } => Problem::new(
            StatusCode::NOT_FOUND,
            format!("{} Not Found", resource),
        )
        .with_detail(format!("{} with id '{}' was not found", resource, id)),

        HelpdeskError::Backend { message } => {
            tracing::error!(%message, "backend failure");
            Problem::new(StatusCode::INTERNAL_SERVER_ERROR, "Backend Error").with_detail(message)
        }

        HelpdeskError::Internal => Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
        )
        .with_detail("An unexpected error occurred"),
    }
}
