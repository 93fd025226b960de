use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hn_core::Error;
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    /// Map a query error. `context` is the generic message shown to clients
    /// when the store failed.
    pub fn query(context: &str, err: Error) -> Self {
        match err {
            Error::InvalidLimit(_) => {
                info!("Rejected request: {}", err);
                Self::new(StatusCode::BAD_REQUEST, "Invalid limit", Some(err.details()))
            }
            _ => {
                error!("{}: {}", context, err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, context, Some(err.details()))
            }
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, None)
    }

    fn new(status: StatusCode, error: &str, details: Option<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.to_string(),
                details,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
