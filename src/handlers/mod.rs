pub mod bookings;
pub mod email;
pub mod health;

pub use bookings::{
    allocate_order_number_handler, get_bookings_handler, preflight_handler, save_bookings_handler,
};
pub use email::send_email_handler;
pub use health::health_handler;

use crate::error::ApiError;

/// Fallback for methods a route does not serve
pub async fn method_not_allowed_handler() -> ApiError {
    ApiError::MethodNotAllowed
}
