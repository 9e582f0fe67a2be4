// Route path constants - single source of truth for all API paths

pub const HEALTH: &str = "/health";
pub const BOOKINGS: &str = "/bookings";
pub const ORDER_NUMBERS: &str = "/order-numbers";
pub const SEND_EMAIL: &str = "/send-email";
pub const SWAGGER_UI: &str = "/swagger-ui";
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
