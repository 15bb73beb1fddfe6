//! Duration resolution for time entries.
//!
//! An entry's length in minutes is resolved by trying each strategy in
//! [`STRATEGIES`] in order; the first one that yields a value wins and an
//! entry no strategy understands counts as zero minutes.
//!
//! Minutes are `f64`: explicit minute counts may be fractional and are kept
//! as reported, so fractions add up across entries and only the final
//! decimal-hour value is rounded.

use std::sync::LazyLock;

use regex::Regex;

use crate::entry::TimeEntry;

/// Minutes in one day, added once when an entry ends "before" it starts.
pub const MINUTES_PER_DAY: i64 = 24 * 60;

static HHMM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,2}):([0-5][0-9])$").unwrap());

/// A single way of reading an entry's duration.
pub type MinutesStrategy = fn(&TimeEntry) -> Option<f64>;

/// Strategies in priority order.
pub const STRATEGIES: &[MinutesStrategy] = &[explicit_minutes, clock_span];

/// Parses a 24-hour `HH:mm` clock time into minutes after midnight.
///
/// Returns `None` for anything that does not look like `H:mm` or `HH:mm`.
pub fn parse_hhmm(value: &str) -> Option<i64> {
    let caps = HHMM_RE.captures(value)?;
    let hours: i64 = caps[1].parse().ok()?;
    let minutes: i64 = caps[2].parse().ok()?;
    Some(hours * 60 + minutes)
}

/// Uses the first explicit minute-count field holding a finite number, as is.
pub fn explicit_minutes(entry: &TimeEntry) -> Option<f64> {
    entry.minute_fields.iter().flatten().copied().next()
}

/// Derives minutes from `start_time`/`end_time`.
///
/// A negative span is taken to cross midnight exactly once. Entries longer
/// than a day cannot be represented this way and come out short.
#[allow(clippy::cast_precision_loss)]
pub fn clock_span(entry: &TimeEntry) -> Option<f64> {
    let start = parse_hhmm(entry.start_time.as_deref()?)?;
    let end = parse_hhmm(entry.end_time.as_deref()?)?;
    let diff = end - start;
    Some((if diff < 0 { diff + MINUTES_PER_DAY } else { diff }) as f64)
}

/// Resolves the duration of an entry in minutes; unknown shapes count as 0.
pub fn minutes_from_entry(entry: &TimeEntry) -> f64 {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(entry))
        .unwrap_or(0.0)
}

/// Converts minutes to decimal hours rounded to two places (half away from zero).
pub fn to_hours_decimal(minutes: f64) -> f64 {
    (minutes / 60.0 * 100.0).round() / 100.0
}
