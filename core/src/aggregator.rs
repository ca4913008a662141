//! Fact aggregator — rolls raw facts up to one row per entity.
//!
//! The aggregator is the only producer of `FactSnapshot`. It reads the
//! fact store through `FactSource` inside a single consistent read, so
//! every rollup in a snapshot was computed against the same facts and the
//! same reference date.
//!
//! RULES:
//!   - Every customer, product and store appears exactly once, even with
//!     zero activity. Missing sums are 0, missing dates are None.
//!   - Rollups are ordered by identifier ascending. Classifiers rely on
//!     this for stable tie-breaks.
//!   - The reference date is the clock for every recency computation in
//!     the pass. It comes from the facts, never from wall-clock time.

use crate::{
    error::{MetricsError, MetricsResult},
    types::EntityId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Rollups ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRollup {
    pub customer_id:      EntityId,
    pub name:             String,
    pub email:            String,
    pub city:             String,
    pub birth_date:       Option<NaiveDate>,
    pub join_date:        NaiveDate,
    pub order_count:      i64,
    pub item_count:       i64,
    pub review_count:     i64,
    pub total_revenue:    f64,
    pub total_discounts:  f64,
    pub loyalty_points:   i64,
    pub first_order_date: Option<NaiveDate>,
    pub last_order_date:  Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRollup {
    pub product_id:      EntityId,
    pub name:            String,
    pub category:        String,
    pub list_price:      f64,
    pub units_sold:      i64,
    pub order_count:     i64,
    pub gross_revenue:   f64,
    pub total_discounts: f64,
    pub net_revenue:     f64,
    pub review_count:    i64,
    pub avg_rating:      Option<f64>,
    pub first_sale_date: Option<NaiveDate>,
    pub last_sale_date:  Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRollup {
    pub store_id:          EntityId,
    pub name:              String,
    pub city:              String,
    pub order_count:       i64,
    pub customer_count:    i64,
    pub total_revenue:     f64,
    pub total_discounts:   f64,
    pub avg_delivery_days: Option<f64>,
    pub first_order_date:  Option<NaiveDate>,
    pub last_order_date:   Option<NaiveDate>,
}

/// Distinct months (first day of month) in which a customer placed at
/// least one qualifying order, ascending. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerActivity {
    pub customer_id:     EntityId,
    pub active_months:   Vec<NaiveDate>,
}

impl CustomerActivity {
    /// The acquisition month: month of the first qualifying order.
    pub fn cohort_month(&self) -> Option<NaiveDate> {
        self.active_months.first().copied()
    }
}

// ── Read interface ───────────────────────────────────────────────────

/// Read access to the fact store.
pub trait FactSource {
    /// Latest order date across all facts. The pass clock.
    fn reference_date(&self) -> MetricsResult<NaiveDate>;
    fn customer_rollups(&self) -> MetricsResult<Vec<CustomerRollup>>;
    fn product_rollups(&self) -> MetricsResult<Vec<ProductRollup>>;
    fn store_rollups(&self) -> MetricsResult<Vec<StoreRollup>>;
    fn customer_activity(&self) -> MetricsResult<Vec<CustomerActivity>>;

    /// Run `read` against one consistent view of the facts.
    fn consistent_read<R, F>(&self, read: F) -> MetricsResult<R>
    where
        F: FnOnce(&Self) -> MetricsResult<R>,
        Self: Sized;
}

// ── Snapshot ─────────────────────────────────────────────────────────

/// Immutable point-in-time view of all rollups. Built fresh each pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSnapshot {
    pub reference_date: NaiveDate,
    pub customers:      Vec<CustomerRollup>,
    pub products:       Vec<ProductRollup>,
    pub stores:         Vec<StoreRollup>,
    pub activity:       Vec<CustomerActivity>,
}

pub struct FactAggregator;

impl FactAggregator {
    /// Build a snapshot from `source`.
    ///
    /// The reference date is read before and after the rollups inside the
    /// same consistent read. If they disagree the source is not giving us
    /// a consistent view, which is a bug, not a data condition.
    pub fn snapshot<S: FactSource>(source: &S) -> MetricsResult<FactSnapshot> {
        source.consistent_read(|facts| {
            let reference_date = facts.reference_date()?;

            let mut customers = facts.customer_rollups()?;
            let mut products = facts.product_rollups()?;
            let mut stores = facts.store_rollups()?;
            let mut activity = facts.customer_activity()?;

            let closing_date = facts.reference_date()?;
            if closing_date != reference_date {
                return Err(MetricsError::InconsistentSnapshot {
                    expected: reference_date,
                    actual:   closing_date,
                });
            }

            customers.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));
            products.sort_by(|a, b| a.product_id.cmp(&b.product_id));
            stores.sort_by(|a, b| a.store_id.cmp(&b.store_id));
            activity.retain(|a| !a.active_months.is_empty());
            for entry in &mut activity {
                entry.active_months.sort();
                entry.active_months.dedup();
            }
            activity.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));

            log::debug!(
                "aggregator: ref={reference_date} customers={} products={} stores={} active={}",
                customers.len(),
                products.len(),
                stores.len(),
                activity.len(),
            );

            Ok(FactSnapshot { reference_date, customers, products, stores, activity })
        })
    }
}
