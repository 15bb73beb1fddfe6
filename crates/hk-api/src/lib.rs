//! Hakuna REST API client for the time tracking bridge.
//!
//! Provides:
//! - Authenticated request dispatch with header-driven rate limiting
//! - Typed time entry and timer operations
//! - A read-through cache for the project and task catalogs
//! - Hour totals and per-project breakdowns over fetched entries
//!
//! All mutable state (rate-limit budget, catalog cache) lives inside a
//! [`Client`]; separate clients never share it.

mod analytics;
pub mod catalog;
pub mod client;
pub mod error;
pub mod rate_limit;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod transport;
pub mod types;

pub use catalog::{CacheEntry, CatalogCache};
pub use client::{ApiResponse, Client, ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, Query};
pub use error::ApiError;
pub use rate_limit::{RateInfo, RateLimiter};
pub use transport::{ApiRequest, HttpTransport, RawResponse, Transport};
pub use types::{NewTimeEntry, TimeEntryPatch, TimeEntryQuery, TimerStart, TimerStop};
