use crate::bookings::{self, SaveRejection, SaveSubset};
use crate::error::{ApiError, ErrorResponse};
use crate::models::{BookingsResponse, OrderNumberResponse, SaveRequest, SaveResponse};
use crate::routes;
use crate::state::AppState;
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};

/// GET /bookings handler - Fetch bookings, settings and the order counter
///
/// Always answers 200. When the store cannot be read the defaults are
/// returned with `degraded: true` and the failure in `debug`; the same flag
/// marks a read that had to leave out unreadable stored entries.
#[utoipa::path(
    get,
    path = routes::BOOKINGS,
    responses(
        (status = 200, description = "Current booking state", body = BookingsResponse)
    ),
    tag = "bookings"
)]
pub async fn get_bookings_handler(State(state): State<AppState>) -> Json<BookingsResponse> {
    let snapshot = bookings::load_all(state.store.as_ref()).await;

    if let Some(reason) = &snapshot.degraded {
        tracing::warn!("Serving degraded booking data: {}", reason);
    } else {
        tracing::info!("Loaded {} bookings", snapshot.bookings.len());
    }

    Json(BookingsResponse {
        success: true,
        bookings: snapshot.bookings,
        settings: snapshot.settings,
        next_order_number: snapshot.next_order_number,
        degraded: snapshot.degraded.is_some(),
        debug: snapshot.degraded,
    })
}

/// POST /bookings handler - Persist any subset of bookings, settings and counter
#[utoipa::path(
    post,
    path = routes::BOOKINGS,
    request_body = SaveRequest,
    responses(
        (status = 200, description = "Data saved", body = SaveResponse),
        (status = 400, description = "No recognised field, unreadable booking or invalid JSON", body = ErrorResponse),
        (status = 500, description = "Store write failed", body = ErrorResponse)
    ),
    tag = "bookings"
)]
pub async fn save_bookings_handler(
    State(state): State<AppState>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let Json(request) = payload?;

    let subset = SaveSubset::from_request(request).map_err(|rejection| match rejection {
        SaveRejection::NoData => {
            tracing::warn!("Save request carried no data");
            ApiError::NoData
        }
        SaveRejection::InvalidBooking { index, reason } => {
            tracing::warn!("Refusing save: bookings[{}] is unreadable: {}", index, reason);
            ApiError::InvalidBody(format!("bookings[{}]: {}", index, reason))
        }
    })?;

    if subset.is_empty() {
        tracing::warn!("No field in save request had a valid shape; nothing written");
    }

    bookings::save_subset(state.store.as_ref(), &subset)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save booking data: {:#}", e);
            ApiError::StoreWrite(e)
        })?;

    Ok(Json(SaveResponse {
        success: true,
        message: "Data saved successfully".to_string(),
    }))
}

/// POST /order-numbers handler - Atomically allocate the next order number
#[utoipa::path(
    post,
    path = routes::ORDER_NUMBERS,
    responses(
        (status = 200, description = "Order number allocated", body = OrderNumberResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    ),
    tag = "bookings"
)]
pub async fn allocate_order_number_handler(
    State(state): State<AppState>,
) -> Result<Json<OrderNumberResponse>, ApiError> {
    let order_number = bookings::allocate_order_number(state.store.as_ref())
        .await
        .map_err(|e| {
            tracing::error!("Failed to allocate order number: {:#}", e);
            ApiError::OrderNumber(e)
        })?;

    Ok(Json(OrderNumberResponse {
        success: true,
        order_number,
    }))
}

/// OPTIONS handler for the booking routes; the CORS headers come from the router
pub async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}
