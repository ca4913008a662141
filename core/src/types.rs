//! Shared primitive types used across the engine.

use chrono::{Datelike, NaiveDate};

/// A stable identifier for a customer, product or store.
pub type EntityId = String;

/// Identifier of a single classifier pass (UUID v4).
pub type PassId = String;

/// Recency reported for customers who never placed a qualifying order.
pub const NO_ACTIVITY_DAYS: i64 = 9999;

/// Whole days from `earlier` to `later`, never negative.
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days().max(0)
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day0(0).unwrap_or(date)
}

/// Calendar months from `from` to `to` (0 when in the same month).
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() * 12 + to.month0() as i32) - (from.year() * 12 + from.month0() as i32)
}
