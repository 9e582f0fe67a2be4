use utoipa::OpenApi;

use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{
    Booking, BookingData, BookingsResponse, OrderNumberResponse, SaveRequest, SaveResponse,
    SendEmailRequest, SendEmailResponse, Settings,
};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "inspection-booking API",
        version = "1.0.0",
        description = "Booking records, settings and email notifications for a property inspection service"
    ),
    paths(
        handlers::health::health_handler,
        handlers::bookings::get_bookings_handler,
        handlers::bookings::save_bookings_handler,
        handlers::bookings::allocate_order_number_handler,
        handlers::email::send_email_handler
    ),
    components(
        schemas(
            Booking,
            Settings,
            BookingsResponse,
            SaveRequest,
            SaveResponse,
            OrderNumberResponse,
            BookingData,
            SendEmailRequest,
            SendEmailResponse,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "bookings", description = "Booking and settings storage"),
        (name = "email", description = "Booking notification emails")
    )
)]
pub struct ApiDoc;
