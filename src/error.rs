use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Error response type
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<JsonValue>,
}

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Custom error type for API endpoints
///
/// Maps every failure the handlers can hit onto an HTTP status and a JSON
/// body of the form `{error, details?}`.
#[derive(Debug)]
pub enum ApiError {
    /// Request body could not be parsed
    InvalidBody(String),
    /// POST /bookings named none of the stored fields
    NoData,
    /// Notification request lacks recipient, subject or booking data
    MissingFields,
    /// HTTP method not served by the route
    MethodNotAllowed,
    /// Store write failed part way through a save
    StoreWrite(anyhow::Error),
    /// Store could not hand out an order number
    OrderNumber(anyhow::Error),
    /// Email provider refused the message; carries its response body
    EmailRejected(JsonValue),
    /// Anything else; `details` is shown to the caller when present
    Internal(Option<String>),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::InvalidBody(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {}", msg),
                None,
            ),
            ApiError::NoData => (StatusCode::BAD_REQUEST, "No data provided".to_string(), None),
            ApiError::MissingFields => (
                StatusCode::BAD_REQUEST,
                "Missing required fields".to_string(),
                None,
            ),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
                None,
            ),
            ApiError::StoreWrite(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save data".to_string(),
                Some(JsonValue::String(format!("{:#}", err))),
            ),
            ApiError::OrderNumber(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to allocate order number".to_string(),
                Some(JsonValue::String(format!("{:#}", err))),
            ),
            ApiError::EmailRejected(details) => (
                StatusCode::BAD_REQUEST,
                "Failed to send email".to_string(),
                Some(details),
            ),
            ApiError::Internal(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                details.map(JsonValue::String),
            ),
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn render(err: ApiError) -> (StatusCode, JsonValue) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_client_errors() {
        assert_eq!(
            render(ApiError::NoData).await,
            (StatusCode::BAD_REQUEST, json!({"error": "No data provided"}))
        );
        assert_eq!(
            render(ApiError::MissingFields).await,
            (StatusCode::BAD_REQUEST, json!({"error": "Missing required fields"}))
        );
        assert_eq!(
            render(ApiError::MethodNotAllowed).await,
            (StatusCode::METHOD_NOT_ALLOWED, json!({"error": "Method not allowed"}))
        );
    }

    #[tokio::test]
    async fn test_store_write_includes_cause_chain() {
        let err = anyhow::anyhow!("connection refused").context("Failed to write 'bookings'");
        let (status, body) = render(ApiError::StoreWrite(err)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to save data");
        assert_eq!(body["details"], "Failed to write 'bookings': connection refused");
    }

    #[tokio::test]
    async fn test_email_rejected_passes_details_verbatim() {
        let details = json!({"statusCode": 403, "message": "domain not verified"});
        let (status, body) = render(ApiError::EmailRejected(details.clone())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Failed to send email", "details": details}));
    }

    #[tokio::test]
    async fn test_internal_without_details() {
        let (status, body) = render(ApiError::Internal(None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal server error"}));
    }
}
