//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::InventoryError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// The request could not be extracted (bad path, query or body).
    Rejected { status: StatusCode, message: String },
    /// Inventory operation error.
    Inventory(InventoryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Rejected { status, message } => (status, message),
            ApiError::Inventory(err) => inventory_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn inventory_error_to_response(err: InventoryError) -> (StatusCode, String) {
    match &err {
        InventoryError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        InventoryError::InvalidArgument(_) | InventoryError::InvalidState(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        InventoryError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
        InventoryError::Consistency(_) | InventoryError::Storage(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}

macro_rules! from_rejection {
    ($($rejection:ty),*) => {
        $(impl From<$rejection> for ApiError {
            fn from(rejection: $rejection) -> Self {
                ApiError::Rejected {
                    status: rejection.status(),
                    message: rejection.body_text(),
                }
            }
        })*
    };
}

from_rejection!(PathRejection, QueryRejection, JsonRejection);

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: InventoryError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            status_of(InventoryError::not_found("order", "open")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(InventoryError::InvalidArgument("closed".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(InventoryError::InvalidState("confirm first".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(InventoryError::Conflict("race".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(InventoryError::Consistency("two open orders".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rejections_keep_their_status() {
        let response = ApiError::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "missing field `name`".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn bad_request_is_400() {
        let response = ApiError::BadRequest("bad value".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
