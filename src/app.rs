use std::any::Any;

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::error::ApiError;
use crate::handlers;
use crate::routes;
use crate::state::AppState;

/// Assemble the full HTTP router
///
/// The booking routes answer any origin: every response on them carries the
/// permissive CORS headers, including errors and `OPTIONS`.
pub fn build_router(state: AppState) -> Router {
    let booking_routes = Router::new()
        .route(
            routes::BOOKINGS,
            get(handlers::get_bookings_handler)
                .post(handlers::save_bookings_handler)
                .options(handlers::preflight_handler)
                .fallback(handlers::method_not_allowed_handler),
        )
        .route(
            routes::ORDER_NUMBERS,
            post(handlers::allocate_order_number_handler)
                .options(handlers::preflight_handler)
                .fallback(handlers::method_not_allowed_handler),
        );

    Router::new()
        .merge(with_cors(booking_routes))
        .route(
            routes::SEND_EMAIL,
            post(handlers::send_email_handler).fallback(handlers::method_not_allowed_handler),
        )
        .route(routes::HEALTH, get(handlers::health_handler))
        .merge(SwaggerUi::new(routes::SWAGGER_UI).url(routes::OPENAPI_JSON, ApiDoc::openapi()))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Add the permissive CORS headers to every response of `routes`
///
/// Panics are caught inside the header layers so a 500 from a crashed
/// handler still carries them.
fn with_cors<S>(routes: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let layers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(CatchPanicLayer::custom(panic_response));

    routes.layer(layers)
}

/// Turn a handler panic into the generic 500 body
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!("Handler panicked: {}", details);
    ApiError::Internal(Some(details)).into_response()
}
