//! HTTP mapping of billing errors
//!
//! NotFound is 404, Validation is 400, everything else is a 500 whose
//! detail never leaves the server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fleetbill_common::{BillingError, ErrorClass};
use serde::Serialize;

/// Error body returned by every route
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
    pub path: String,
}

/// A billing error bound to the request path that produced it
#[derive(Debug)]
pub struct ApiError {
    pub source: BillingError,
    pub path: String,
}

impl ApiError {
    pub fn new(source: impl Into<BillingError>, path: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.source.class() {
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
            ErrorClass::Validation => StatusCode::BAD_REQUEST,
            ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self.source.class() {
            ErrorClass::Internal => ErrorBody {
                error: "InternalServerError",
                detail: "An unexpected error occurred".to_string(),
                path: self.path.clone(),
            },
            _ => ErrorBody {
                error: self.source.kind(),
                detail: self.source.to_string(),
                path: self.path.clone(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(path = %self.path, error = %self.source, "Request failed");
        } else {
            tracing::debug!(path = %self.path, error = %self.source, "Request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

/// Bind errors of a result to a request path
pub trait WithPath<T> {
    fn at(self, path: &str) -> Result<T, ApiError>;
}

impl<T> WithPath<T> for fleetbill_common::Result<T> {
    fn at(self, path: &str) -> Result<T, ApiError> {
        self.map_err(|err| ApiError::new(err, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetbill_common::NotFoundError;

    #[test]
    fn test_status_mapping() {
        let not_found = ApiError::new(
            NotFoundError::Trip {
                trip_id: "t1".into(),
            },
            "/billing/t1",
        );
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.body().error, "TripNotFoundError");

        let invalid = ApiError::new(BillingError::Validation("bad".into()), "/trips");
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let timeout = ApiError::new(BillingError::Timeout("pool".into()), "/contracts");
        assert_eq!(timeout.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = ApiError::new(
            BillingError::Storage("disk I/O error at /var/db".into()),
            "/billing/stats",
        );
        let body = err.body();
        assert_eq!(body.error, "InternalServerError");
        assert!(!body.detail.contains("/var/db"));
        assert_eq!(body.path, "/billing/stats");
    }
}
