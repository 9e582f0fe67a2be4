//! Booking Store Accessor: typed access to the three stored keys.

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;

use crate::models::{Booking, SaveRequest, Settings};
use crate::store::{counter_value, KvStore};

pub const BOOKINGS_KEY: &str = "bookings";
pub const SETTINGS_KEY: &str = "settings";
pub const NEXT_ORDER_NUMBER_KEY: &str = "nextOrderNumber";

pub const FIRST_ORDER_NUMBER: u64 = 1;

/// Everything the booking UI needs, as read from the store
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub bookings: Vec<Booking>,
    pub settings: Settings,
    pub next_order_number: u64,
    /// Set when the store could not be read or a stored value had to be
    /// discarded; carries what went wrong
    pub degraded: Option<String>,
}

impl Snapshot {
    fn defaults(degraded: Option<String>) -> Self {
        Snapshot {
            bookings: Vec::new(),
            settings: Settings::default(),
            next_order_number: FIRST_ORDER_NUMBER,
            degraded,
        }
    }
}

/// Load bookings, settings and the order counter
///
/// Missing keys fall back to their defaults. If the store cannot be read at
/// all, the full default set is returned with `degraded` populated rather
/// than an error. Stored bookings are decoded one by one: an unreadable
/// entry is left out and reported in `degraded`, the rest are served.
pub async fn load_all(store: &dyn KvStore) -> Snapshot {
    let reads = tokio::try_join!(
        store.get(BOOKINGS_KEY),
        store.get(SETTINGS_KEY),
        store.get(NEXT_ORDER_NUMBER_KEY),
    );

    match reads {
        Ok((bookings, settings, next_order_number)) => {
            let mut problems = Vec::new();
            let snapshot = Snapshot {
                bookings: decode_bookings(bookings, &mut problems),
                settings: decode_settings(settings, &mut problems),
                next_order_number: counter_value(next_order_number.as_ref(), FIRST_ORDER_NUMBER),
                degraded: None,
            };
            if problems.is_empty() {
                snapshot
            } else {
                Snapshot {
                    degraded: Some(problems.join("; ")),
                    ..snapshot
                }
            }
        }
        Err(e) => {
            tracing::error!("Failed to load booking data, serving defaults: {:#}", e);
            Snapshot::defaults(Some(format!("{:#}", e)))
        }
    }
}

fn decode_bookings(value: Option<JsonValue>, problems: &mut Vec<String>) -> Vec<Booking> {
    let items = match value {
        None | Some(JsonValue::Null) => return Vec::new(),
        Some(JsonValue::Array(items)) => items,
        Some(other) => {
            tracing::warn!("Stored bookings is not a list, ignoring it: {}", other);
            problems.push("stored bookings is not a list".to_string());
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            serde_json::from_value(item)
                .map_err(|e| {
                    tracing::warn!("Stored bookings[{}] is malformed, leaving it out: {}", index, e);
                    problems.push(format!("stored bookings[{}] is malformed: {}", index, e));
                })
                .ok()
        })
        .collect()
}

fn decode_settings(value: Option<JsonValue>, problems: &mut Vec<String>) -> Settings {
    match value {
        None | Some(JsonValue::Null) => Settings::default(),
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!("Stored settings are malformed, using defaults: {}", e);
            problems.push(format!("stored settings are malformed: {}", e));
            Settings::default()
        }),
    }
}

/// Why a save request was refused outright
#[derive(Debug, Clone, PartialEq)]
pub enum SaveRejection {
    /// None of the three fields was present
    NoData,
    /// `bookings` was a list but one of its entries is not a booking
    InvalidBooking { index: usize, reason: String },
}

/// The fields of a save request that passed their shape checks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveSubset {
    pub bookings: Option<Vec<Booking>>,
    pub settings: Option<Settings>,
    pub next_order_number: Option<u64>,
}

impl SaveSubset {
    /// Sort the fields of a save request into those that will be written
    ///
    /// A field of the wrong shape (bookings not a list, settings not an
    /// object, counter not a positive integer) is dropped with a warning and
    /// the remaining fields are still saved. A bookings list with an entry
    /// that cannot be read refuses the whole request, so nothing is reported
    /// saved that was not.
    pub fn from_request(request: SaveRequest) -> Result<Self, SaveRejection> {
        let SaveRequest {
            bookings,
            settings,
            next_order_number,
        } = request;

        let present = |field: &Option<JsonValue>| matches!(field, Some(v) if !v.is_null());
        if !present(&bookings) && !present(&settings) && !present(&next_order_number) {
            return Err(SaveRejection::NoData);
        }

        Ok(SaveSubset {
            bookings: bookings.map(bookings_field).transpose()?.flatten(),
            settings: settings.and_then(settings_field),
            next_order_number: next_order_number.and_then(counter_field),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_none() && self.settings.is_none() && self.next_order_number.is_none()
    }
}

fn bookings_field(value: JsonValue) -> Result<Option<Vec<Booking>>, SaveRejection> {
    let items = match value {
        JsonValue::Array(items) => items,
        JsonValue::Null => return Ok(None),
        other => {
            tracing::warn!("Skipping bookings: expected a list, got {}", other);
            return Ok(None);
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| SaveRejection::InvalidBooking {
                index,
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<Booking>, _>>()
        .map(Some)
}

fn settings_field(value: JsonValue) -> Option<Settings> {
    if !value.is_object() {
        if !value.is_null() {
            tracing::warn!("Skipping settings: expected an object, got {}", value);
        }
        return None;
    }
    serde_json::from_value(value)
        .map_err(|e| tracing::warn!("Skipping settings: {}", e))
        .ok()
}

/// The counter must leave room for at least one allocation
fn counter_field(value: JsonValue) -> Option<u64> {
    match value.as_u64() {
        Some(n) if (FIRST_ORDER_NUMBER..u64::MAX).contains(&n) => Some(n),
        _ => {
            if !value.is_null() {
                tracing::warn!("Skipping nextOrderNumber: expected a positive integer, got {}", value);
            }
            None
        }
    }
}

/// Write the fields present in `subset`, in the order bookings, settings,
/// counter
///
/// Stops at the first failing write. Writes issued before it stay committed.
pub async fn save_subset(store: &dyn KvStore, subset: &SaveSubset) -> Result<()> {
    if let Some(bookings) = &subset.bookings {
        let value = serde_json::to_value(bookings).context("Failed to encode bookings")?;
        store.set(BOOKINGS_KEY, value).await?;
        tracing::info!("Saved {} bookings", bookings.len());
    }

    if let Some(settings) = &subset.settings {
        let value = serde_json::to_value(settings).context("Failed to encode settings")?;
        store.set(SETTINGS_KEY, value).await?;
        tracing::info!("Saved settings");
    }

    if let Some(next_order_number) = subset.next_order_number {
        store
            .set(NEXT_ORDER_NUMBER_KEY, JsonValue::from(next_order_number))
            .await?;
        tracing::info!("Updated next order number to {}", next_order_number);
    }

    Ok(())
}

/// Hand out the next order number and advance the stored counter atomically
pub async fn allocate_order_number(store: &dyn KvStore) -> Result<u64> {
    let order_number = store
        .fetch_and_increment(NEXT_ORDER_NUMBER_KEY, FIRST_ORDER_NUMBER)
        .await?;
    tracing::info!("Allocated order number {}", order_number);
    Ok(order_number)
}
