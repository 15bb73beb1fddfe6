//! Core domain logic for the Hakuna time tracking bridge.
//!
//! This crate contains the network-free parts:
//! - Entry views: lenient readers over raw time entries and catalog items
//! - Duration resolution: minutes per entry and decimal-hour rounding
//! - Reports: totals and per-project breakdowns

pub mod duration;
pub mod entry;
pub mod report;

pub use duration::{minutes_from_entry, parse_hhmm, to_hours_decimal};
pub use entry::{CatalogItem, ProjectRef, TimeEntry};
pub use report::{ProjectBreakdown, ProjectHours, total_hours, total_minutes};
