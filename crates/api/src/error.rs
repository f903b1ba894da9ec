//! API error type with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{ErrorKind, OrderError};

/// API-level error wrapping the domain taxonomy.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request detected at the transport layer (e.g. unparsable
    /// status string).
    BadRequest(String),
    /// Error surfaced by the order controller.
    Order(OrderError),
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Order(err) => order_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn order_error_to_response(err: OrderError) -> (StatusCode, String) {
    match err.kind() {
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
        ErrorKind::InvalidArgument => (StatusCode::BAD_REQUEST, err.to_string()),
        ErrorKind::FailedPrecondition | ErrorKind::Conflict => {
            (StatusCode::CONFLICT, err.to_string())
        }
        ErrorKind::Internal => {
            tracing::error!(error = %err, "unexpected error when handling request");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let (status, message) = order_error_to_response(OrderError::NotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message, "order not found");
    }

    #[test]
    fn preconditions_map_to_409() {
        let (status, _) = order_error_to_response(OrderError::AlreadyDelivered);
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn invalid_argument_maps_to_400() {
        let (status, _) = order_error_to_response(OrderError::MissingField("vendor_id"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = OrderError::Encode(serde_json::from_str::<()>("x").unwrap_err());
        let (status, message) = order_error_to_response(err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "internal server error");
    }
}
