//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use orchestrator::{ErrorBody, OrderError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Order creation failed.
    Order(OrderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, msg),
            ApiError::Order(err) => order_error_to_response(err),
        }
    }
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

fn order_error_to_response(err: OrderError) -> Response {
    match err {
        OrderError::InvalidRequest(_) => json_error(StatusCode::BAD_REQUEST, "invalid request"),
        OrderError::DownstreamUnreachable { service, reason } => {
            tracing::error!(%service, %reason, "downstream service unreachable");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to contact {service}"),
            )
        }
        OrderError::DownstreamRejected {
            service,
            status,
            body,
        } => {
            let status = forwarded_status(status);
            match body {
                ErrorBody::Text(text) => (
                    status,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    format!("{service} service error: {text}"),
                )
                    .into_response(),
                ErrorBody::Json(detail) => {
                    let body = serde_json::json!({
                        "error": format!("{service} service error"),
                        "detail": detail,
                    });
                    (status, Json(body)).into_response()
                }
            }
        }
        OrderError::SerializationFailure { service, reason } => {
            tracing::error!(%service, %reason, "unusable downstream response");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("invalid {service} response"),
            )
        }
    }
}

/// The downstream status when it is a valid error status, 502 otherwise.
fn forwarded_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

#[cfg(test)]
mod tests {
    use domain::ValidationError;

    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_request_is_400_with_fixed_body() {
        let response =
            ApiError::from(OrderError::InvalidRequest(ValidationError::MissingField("user")))
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, r#"{"error":"invalid request"}"#);
    }

    #[tokio::test]
    async fn test_unreachable_is_500() {
        let response = ApiError::from(OrderError::DownstreamUnreachable {
            service: "inventory".to_string(),
            reason: "connection refused".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_text(response).await,
            r#"{"error":"failed to contact inventory"}"#
        );
    }

    #[tokio::test]
    async fn test_rejected_text_is_forwarded_as_plain_text() {
        let response = ApiError::from(OrderError::DownstreamRejected {
            service: "payment".to_string(),
            status: 402,
            body: ErrorBody::Text("insufficient funds".to_string()),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            body_text(response).await,
            "payment service error: insufficient funds"
        );
    }

    #[tokio::test]
    async fn test_rejected_json_is_wrapped() {
        let response = ApiError::from(OrderError::DownstreamRejected {
            service: "inventory".to_string(),
            status: 409,
            body: ErrorBody::Json(serde_json::json!({"error": "out of stock"})),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["error"], "inventory service error");
        assert_eq!(json["detail"]["error"], "out of stock");
    }

    #[test]
    fn test_forwarded_status() {
        assert_eq!(forwarded_status(402), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(forwarded_status(503), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(forwarded_status(302), StatusCode::BAD_GATEWAY);
        assert_eq!(forwarded_status(1000), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_not_found() {
        let response = ApiError::NotFound("order not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, r#"{"error":"order not found"}"#);
    }
}
