use crate::error::{ApiError, ErrorResponse};
use crate::mailer::{OutgoingEmail, SendOutcome};
use crate::models::{SendEmailRequest, SendEmailResponse};
use crate::routes;
use crate::state::AppState;
use crate::template;
use axum::{extract::rejection::JsonRejection, extract::State, Json};

/// POST /send-email handler - Render a booking notification and send it
///
/// Nothing is retried: a provider refusal is reported as 400 with the
/// provider's body, a transport failure as 500.
#[utoipa::path(
    post,
    path = routes::SEND_EMAIL,
    request_body = SendEmailRequest,
    responses(
        (status = 200, description = "Email accepted by the provider", body = SendEmailResponse),
        (status = 400, description = "Missing fields or provider refused the email", body = ErrorResponse),
        (status = 500, description = "Provider unreachable", body = ErrorResponse)
    ),
    tag = "email"
)]
pub async fn send_email_handler(
    State(state): State<AppState>,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let Json(request) = payload?;
    if request.html.is_some() {
        tracing::debug!("Ignoring client-supplied html; rendering server template");
    }
    let notification = request.into_notification().ok_or(ApiError::MissingFields)?;

    let email = OutgoingEmail {
        html: template::render(
            &notification.kind,
            &notification.booking,
            notification.is_modification,
        ),
        to: notification.to,
        subject: notification.subject,
    };

    match state.mailer.send(&email).await {
        Ok(SendOutcome::Accepted { id }) => {
            tracing::info!(
                "Sent booking email for order {} (message id: {:?})",
                notification.booking.order_number,
                id
            );
            Ok(Json(SendEmailResponse {
                success: true,
                message_id: id,
            }))
        }
        Ok(SendOutcome::Rejected { status, details }) => {
            tracing::error!("Email provider rejected message ({}): {}", status, details);
            Err(ApiError::EmailRejected(details))
        }
        Err(e) => {
            tracing::error!("Failed to send email: {:#}", e);
            Err(ApiError::Internal(None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_router;
    use crate::mailer::testing::RecordingMailer;
    use crate::models::sample_booking;
    use crate::store::MemoryStore;
    use axum::{body::Body, http::Request, http::StatusCode, Router};
    use serde_json::{json, Value as JsonValue};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn setup_test_app(mailer: RecordingMailer) -> (Router, Arc<RecordingMailer>) {
        let mailer = Arc::new(mailer);
        let state = AppState {
            store: Arc::new(MemoryStore::new()),
            mailer: mailer.clone(),
        };
        (build_router(state), mailer)
    }

    fn request_body(kind: &str, is_modification: bool) -> JsonValue {
        json!({
            "to": "alice@example.com",
            "subject": "Your inspection booking",
            "bookingData": {
                "type": kind,
                "isModification": is_modification,
                "booking": sample_booking(21)
            }
        })
    }

    async fn post(app: Router, body: JsonValue) -> (StatusCode, JsonValue) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/send-email")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_string(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_confirmation_is_rendered_and_sent() {
        let (app, mailer) = setup_test_app(RecordingMailer::accepting("msg_1"));

        let (status, body) = post(app, request_body("confirmation", false)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "messageId": "msg_1"}));

        let sent = mailer.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@example.com");
        assert_eq!(sent[0].subject, "Your inspection booking");
        assert!(sent[0].html.contains("Booking Confirmed"));
        assert!(sent[0].html.contains("#10b981"));
    }

    #[tokio::test]
    async fn test_modification_and_cancellation_templates() {
        let cases = [
            ("confirmation", true, "Booking Time Modified", "#f59e0b"),
            ("cancellation", false, "Booking Cancelled", "#ef4444"),
        ];

        for (kind, is_modification, title, color) in cases {
            let (app, mailer) = setup_test_app(RecordingMailer::accepting("msg"));
            let (status, _) = post(app, request_body(kind, is_modification)).await;
            assert_eq!(status, StatusCode::OK);

            let sent = mailer.sent.lock();
            assert!(sent[0].html.contains(title), "{kind} should render {title}");
            assert!(sent[0].html.contains(color), "{kind} should use {color}");
        }
    }

    #[tokio::test]
    async fn test_client_html_is_ignored() {
        let (app, mailer) = setup_test_app(RecordingMailer::accepting("msg"));
        let mut body = request_body("confirmation", false);
        body["html"] = json!("<p>client supplied</p>");

        let (status, _) = post(app, body).await;

        assert_eq!(status, StatusCode::OK);
        assert!(!mailer.sent.lock()[0].html.contains("client supplied"));
    }

    #[tokio::test]
    async fn test_missing_recipient_makes_no_provider_call() {
        let (app, mailer) = setup_test_app(RecordingMailer::accepting("msg"));
        let mut body = request_body("confirmation", false);
        body.as_object_mut().unwrap().remove("to");

        let (status, body) = post(app, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing required fields"}));
        assert!(mailer.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_booking_snapshot() {
        let (app, mailer) = setup_test_app(RecordingMailer::accepting("msg"));
        let mut body = request_body("confirmation", false);
        body["bookingData"].as_object_mut().unwrap().remove("booking");

        let (status, _) = post(app, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(mailer.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_booking_without_address_still_sends() {
        let (app, mailer) = setup_test_app(RecordingMailer::accepting("msg"));
        let mut body = request_body("confirmation", false);
        body["bookingData"]["booking"]
            .as_object_mut()
            .unwrap()
            .remove("address");

        let (status, _) = post(app, body).await;

        assert_eq!(status, StatusCode::OK);
        assert!(mailer.sent.lock()[0].html.contains("Address | 地址"));
    }

    #[tokio::test]
    async fn test_booking_without_order_number_is_missing_fields() {
        let (app, mailer) = setup_test_app(RecordingMailer::accepting("msg"));
        let mut body = request_body("confirmation", false);
        body["bookingData"]["booking"]
            .as_object_mut()
            .unwrap()
            .remove("orderNumber");

        let (status, body) = post(app, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing required fields"}));
        assert!(mailer.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_blank_subject_is_missing_fields() {
        let (app, mailer) = setup_test_app(RecordingMailer::accepting("msg"));
        let mut body = request_body("confirmation", false);
        body["subject"] = json!("   ");

        let (status, body) = post(app, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing required fields"}));
        assert!(mailer.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_provider_rejection_is_400_with_details() {
        let details = json!({"statusCode": 403, "message": "The domain is not verified"});
        let reply = details.clone();
        let (app, _) = setup_test_app(RecordingMailer::replying(move || {
            Ok(SendOutcome::Rejected {
                status: 403,
                details: reply.clone(),
            })
        }));

        let (status, body) = post(app, request_body("confirmation", false)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Failed to send email", "details": details}));
    }

    #[tokio::test]
    async fn test_provider_outage_is_500() {
        let (app, mailer) = setup_test_app(RecordingMailer::replying(|| {
            Err(anyhow::anyhow!("connection refused"))
        }));

        let (status, body) = post(app, request_body("cancellation", false)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal server error"}));
        assert_eq!(mailer.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_type_still_sends() {
        let (app, mailer) = setup_test_app(RecordingMailer::accepting("msg"));

        let (status, _) = post(app, request_body("reminder", false)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(mailer.sent.lock()[0].html.contains("<title>undefined</title>"));
    }

    #[tokio::test]
    async fn test_get_not_allowed() {
        let (app, _) = setup_test_app(RecordingMailer::accepting("msg"));

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/send-email")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
