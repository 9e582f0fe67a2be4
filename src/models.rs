use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use utoipa::ToSchema;

/// One customer's scheduled inspection appointment
///
/// Only the order number is required; a text field the client leaves out
/// reads as empty. Fields the client sends beyond the ones below (status
/// flags, contact details) are kept in `extra` so that a save never drops
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub order_number: u64,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub preferred_date: String,
    #[serde(default)]
    pub preferred_time_slot: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub key_arrangement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: Map<String, JsonValue>,
}

/// Bilingual texts shown to users of the booking form
///
/// A text missing from a stored or submitted record keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub welcome_message: String,
    pub notice_message: String,
    pub after_submit_notice: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            welcome_message: "Welcome to our property inspection booking system! \
                We provide professional and caring property inspection services."
                .to_string(),
            notice_message: "Please note:\n\
                • Please ensure the appointment time is accurate\n\
                • For cancellations or modifications, please contact us 24 hours in advance\n\
                • Please prepare relevant documents on the inspection day\n\
                • If you have special requirements, please specify in the remarks\n\
                \n\
                请注意：\n\
                • 请确保预约时间准确无误\n\
                • 如需取消或修改，请提前24小时联系\n\
                • 检查当天请准备好相关文件\n\
                • 如有特殊要求，请在备注中说明"
                .to_string(),
            after_submit_notice: "We will confirm your appointment details within 24 hours.\n\
                If you have any questions, please contact us anytime.\n\
                Thank you for your trust!\n\
                \n\
                我们会在24小时内与您确认预约详情。\n\
                如有任何疑问，请随时联系我们。\n\
                谢谢您的信任！"
                .to_string(),
        }
    }
}

/// Response type for GET /bookings
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingsResponse {
    pub success: bool,
    pub bookings: Vec<Booking>,
    pub settings: Settings,
    pub next_order_number: u64,
    /// True when the store could not be read and defaults were served
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

/// Request body for POST /bookings
///
/// Fields are kept untyped here so that one malformed field can be skipped
/// without rejecting the others.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    #[schema(value_type = Option<Vec<Booking>>)]
    pub bookings: Option<JsonValue>,
    #[schema(value_type = Option<Settings>)]
    pub settings: Option<JsonValue>,
    #[schema(value_type = Option<u64>)]
    pub next_order_number: Option<JsonValue>,
}

/// Response type for a successful POST /bookings
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
}

/// Response type for POST /order-numbers
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderNumberResponse {
    pub success: bool,
    pub order_number: u64,
}

/// Kind of booking email to send
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum NotificationKind {
    Confirmation,
    Cancellation,
    /// Unrecognised type, rendered with placeholder text
    Other(String),
}

impl From<String> for NotificationKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "confirmation" => NotificationKind::Confirmation,
            "cancellation" => NotificationKind::Cancellation,
            _ => NotificationKind::Other(value),
        }
    }
}

/// Booking payload embedded in a notification request
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingData {
    #[serde(rename = "type")]
    #[schema(value_type = Option<String>, example = "confirmation")]
    pub kind: Option<NotificationKind>,
    /// Decoded on use, so a malformed snapshot counts as missing
    #[schema(value_type = Option<Booking>)]
    pub booking: Option<JsonValue>,
    #[serde(default)]
    pub is_modification: bool,
}

/// Request body for POST /send-email
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub to: Option<String>,
    pub subject: Option<String>,
    /// Accepted for compatibility; the server always renders its own body
    pub html: Option<String>,
    pub booking_data: Option<BookingData>,
}

/// A notification request with every required field present
#[derive(Debug, Clone)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub kind: NotificationKind,
    pub booking: Booking,
    pub is_modification: bool,
}

impl SendEmailRequest {
    /// Returns `None` when the recipient, subject, type or booking is missing
    ///
    /// Blank strings count as missing, as does a booking without a usable
    /// order number.
    pub fn into_notification(self) -> Option<Notification> {
        let to = non_blank(self.to)?;
        let subject = non_blank(self.subject)?;
        let data = self.booking_data?;
        let kind = data.kind?;
        let booking = serde_json::from_value(data.booking?)
            .map_err(|e| tracing::warn!("Unusable booking in notification request: {}", e))
            .ok()?;
        Some(Notification {
            to,
            subject,
            kind,
            booking,
            is_modification: data.is_modification,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Response type for a successful POST /send-email
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[cfg(test)]
pub(crate) fn sample_booking(order_number: u64) -> Booking {
    Booking {
        order_number,
        customer_name: "Alice Chen".to_string(),
        service_type: "Pre-purchase inspection".to_string(),
        preferred_date: "2026-11-02".to_string(),
        preferred_time_slot: "09:00-11:00".to_string(),
        address: "12 Harbour St, Sydney".to_string(),
        key_arrangement: "Agent will meet on site".to_string(),
        notes: None,
        extra: Map::new(),
    }
}
