//! Error bodies returned by the HTTP surface: a stable `code` plus a message
//! safe to show users. Causes are logged here, never sent.
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use keyvalue_common::ValidationError;
use keyvalue_portal::{AuthError, ManagerError};
use log::{error, warn};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            body: ErrorResponse {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn forbidden(message: &str) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.status, self.body.code, self.body.message)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(&self.body)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let (status, code) = match &err {
            AuthError::Invalid(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AuthError::ProviderFailure => (StatusCode::UNAUTHORIZED, "provider_failure"),
            AuthError::AccessDenied => (StatusCode::FORBIDDEN, "access_denied"),
            AuthError::AdminEmailConflict => (StatusCode::CONFLICT, "admin_email"),
            AuthError::EmailInUse => (StatusCode::CONFLICT, "email_in_use"),
            AuthError::SignupFailed => (StatusCode::BAD_GATEWAY, "signup_failed"),
            AuthError::LookupFailed => (StatusCode::SERVICE_UNAVAILABLE, "lookup_failed"),
        };
        ApiError::new(status, code, err.user_message())
    }
}

impl From<ManagerError> for ApiError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Validation(ValidationError::DuplicateTenant(id)) => ApiError::new(
                StatusCode::CONFLICT,
                "already_exists",
                format!("A tenant with id {} already exists.", id),
            ),
            ManagerError::Validation(invalid) => {
                ApiError::new(StatusCode::BAD_REQUEST, "validation_error", invalid.to_string())
            }
            ManagerError::RemoteWrite {
                collection,
                key,
                source,
            } => {
                error!("write to {}/{} failed: {}", collection, key, source);
                ApiError::new(
                    StatusCode::BAD_GATEWAY,
                    "write_failed",
                    "Could not save changes. Please try again.",
                )
            }
            ManagerError::RemoteRead(source) => {
                error!("store read failed: {}", source);
                ApiError::new(
                    StatusCode::BAD_GATEWAY,
                    "read_failed",
                    "Could not load data. Please try again.",
                )
            }
            ManagerError::NotSignedIn => ApiError::unauthorized("Please sign in."),
            ManagerError::NotReady => {
                warn!("operation attempted before data finished loading");
                ApiError::new(StatusCode::CONFLICT, "not_ready", "Data is still loading.")
            }
            ManagerError::UnknownTenant(id) => ApiError::new(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("No tenant with id {}.", id),
            ),
        }
    }
}
