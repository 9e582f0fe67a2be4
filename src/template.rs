//! Bilingual HTML email body for booking notifications.

use maud::{html, Markup, PreEscaped, Render, DOCTYPE};

use crate::models::{Booking, NotificationKind};

/// Placeholder rendered for anything an unrecognised kind leaves unset
const UNDEFINED: &str = "undefined";

const MESSAGE_DELIMITER: &str = " | ";

/// Headline text and accent color for one kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Banner {
    pub title: &'static str,
    pub message: &'static str,
    pub color: &'static str,
}

impl Banner {
    const UNKNOWN: Banner = Banner {
        title: UNDEFINED,
        message: UNDEFINED,
        color: UNDEFINED,
    };

    pub fn for_kind(kind: &NotificationKind, is_modification: bool) -> Banner {
        match kind {
            NotificationKind::Confirmation if is_modification => Banner {
                title: "Booking Time Modified | 预约时间已修改",
                message: "Your booking time has been updated. | 您的预约时间已更新。",
                color: "#f59e0b",
            },
            NotificationKind::Confirmation => Banner {
                title: "Booking Confirmed | 预约已确认",
                message: "Your booking has been confirmed. | 您的预约已确认。",
                color: "#10b981",
            },
            NotificationKind::Cancellation => Banner {
                title: "Booking Cancelled | 预约已取消",
                message: "Your booking has been cancelled. | 您的预约已取消。",
                color: "#ef4444",
            },
            NotificationKind::Other(_) => Banner::UNKNOWN,
        }
    }

    /// Text after the first delimiter, `undefined` if the message has none
    pub fn chinese_message(&self) -> &'static str {
        self.message.split(MESSAGE_DELIMITER).nth(1).unwrap_or(UNDEFINED)
    }
}

fn styles(color: &str) -> String {
    format!(
        r#"
    body {{ font-family: 'Arial', sans-serif; margin: 0; padding: 0; background-color: #f8fafc; }}
    .container {{ max-width: 600px; margin: 0 auto; background-color: white; }}
    .header {{ background: linear-gradient(135deg, #1e3a8a 0%, #3b82f6 100%); padding: 30px; text-align: center; }}
    .header h1 {{ color: white; margin: 0; font-size: 24px; }}
    .content {{ padding: 30px; }}
    .booking-details {{ background-color: #f8fafc; border-radius: 8px; padding: 20px; margin: 20px 0; }}
    .detail-row {{ margin: 10px 0; }}
    .detail-label {{ font-weight: bold; color: #374151; }}
    .detail-value {{ color: #6b7280; margin-left: 10px; }}
    .button {{ display: inline-block; background-color: {color}; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; margin: 20px 0; }}
    .footer {{ background-color: #f8fafc; padding: 20px; text-align: center; font-size: 14px; color: #6b7280; }}
    .chinese {{ margin-top: 20px; padding-top: 20px; border-top: 1px solid #e5e7eb; }}
"#
    )
}

fn detail_row(label: &str, value: impl Render) -> Markup {
    html! {
        div class="detail-row" {
            span class="detail-label" { (label) ":" }
            span class="detail-value" { (value) }
        }
    }
}

/// Render the notification email for `booking`
///
/// Booking values are escaped by the markup macro; only the stylesheet is
/// emitted raw.
pub fn render(kind: &NotificationKind, booking: &Booking, is_modification: bool) -> String {
    let banner = Banner::for_kind(kind, is_modification);
    let notes = booking.notes.as_deref().filter(|notes| !notes.is_empty());
    let time = format!("{} {}", booking.preferred_date, booking.preferred_time_slot);

    let markup = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (banner.title) }
                style { (PreEscaped(styles(banner.color))) }
            }
            body {
                div class="container" {
                    div class="header" {
                        h1 { "🏠 Property Inspection Service" }
                        h1 { "房产检查服务" }
                    }
                    div class="content" {
                        h2 { (banner.title) }
                        p { "Dear " (booking.customer_name) "," }
                        p { (banner.message) }
                        div class="booking-details" {
                            h3 { "Booking Details | 预约详情" }
                            (detail_row("Order Number | 订单号", booking.order_number))
                            (detail_row("Service Type | 服务类型", &booking.service_type))
                            (detail_row("Date & Time | 日期时间", &time))
                            (detail_row("Address | 地址", &booking.address))
                            (detail_row("Key Arrangement | 钥匙安排", &booking.key_arrangement))
                            @if let Some(notes) = notes {
                                (detail_row("Notes | 备注", notes))
                            }
                        }
                        @if *kind != NotificationKind::Cancellation {
                            p { "If you have any questions, please don't hesitate to contact us." }
                        }
                        div class="chinese" {
                            p { "亲爱的 " (booking.customer_name) "，" }
                            p { (banner.chinese_message()) }
                            p { "如有任何疑问，请随时联系我们。" }
                        }
                    }
                    div class="footer" {
                        p {
                            "Best regards | 此致敬礼"
                            br;
                            "Property Inspection Team | 房产检查团队"
                        }
                        p { "This is an automated message | 这是一封自动发送的邮件" }
                    }
                }
            }
        }
    };

    markup.into_string()
}
