//! Key-value persistence behind the booking endpoints.
//!
//! The service keeps three flat keys (`bookings`, `settings`,
//! `nextOrderNumber`) as JSON documents. [`KvStore`] is the seam between the
//! accessor logic and the backend: [`SpannerStore`] in production,
//! [`MemoryStore`] for local runs and tests.

mod memory;
mod spanner;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

pub use memory::MemoryStore;
pub use spanner::SpannerStore;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the document stored under `key`, `None` if the key was never written
    async fn get(&self, key: &str) -> Result<Option<JsonValue>>;

    /// Overwrite the document stored under `key`
    async fn set(&self, key: &str, value: JsonValue) -> Result<()>;

    /// Atomically return the integer under `key` and store its successor
    ///
    /// A missing, non-integer or zero value counts as `initial`.
    async fn fetch_and_increment(&self, key: &str, initial: u64) -> Result<u64>;

    /// Verify that the backend is reachable
    async fn health_check(&self) -> Result<()>;
}

/// Interpret a stored counter document, falling back to `initial`
pub(crate) fn counter_value(value: Option<&JsonValue>, initial: u64) -> u64 {
    value
        .and_then(JsonValue::as_u64)
        .filter(|n| *n > 0)
        .unwrap_or(initial)
}
