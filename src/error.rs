// src/error.rs
use log::error;
use serde_json::json;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::{Rejection, Reply};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),
    #[error("unknown account: {0}")]
    UnknownAccount(String),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("malformed row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn backend(e: impl std::fmt::Display) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid credentials")]
    AuthFailure,
    #[error("Email already exists")]
    DuplicateAccount,
    #[error("Unauthorized")]
    Unauthenticated,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl Reject for ApiError {}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => ApiError::DuplicateAccount,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthFailure | ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::DuplicateAccount | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::Unauthenticated => json!({ "error": self.to_string() }),
            ApiError::Internal(_) => json!({ "success": false, "message": "Internal server error" }),
            _ => json!({ "success": false, "message": self.to_string() }),
        }
    }
}

/// Turns every rejection into a JSON reply.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(e) = err.find::<ApiError>() {
        if let ApiError::Internal(message) = e {
            error!("Request failed: {}", message);
        }
        (e.status(), e.body())
    } else if err.is_not_found() {
        (
            StatusCode::NOT_FOUND,
            json!({ "success": false, "message": "Not found" }),
        )
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            json!({ "success": false, "message": e.to_string() }),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "success": false, "message": "Method not allowed" }),
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "success": false, "message": "Internal server error" }),
        )
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
