use crate::error::ApiError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Please sign in.")]
    AuthenticationError,
    #[error("This page is for organisers only.")]
    Forbidden,
}

impl Error {
    fn as_api_error(&self) -> ApiError {
        match self {
            Error::AuthenticationError => ApiError::unauthorized(&self.to_string()),
            Error::Forbidden => ApiError::forbidden(&self.to_string()),
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        self.as_api_error().status
    }

    fn error_response(&self) -> HttpResponse {
        self.as_api_error().error_response()
    }
}
