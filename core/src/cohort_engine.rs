//! Cohort retention engine — acquisition cohorts and monthly retention.
//!
//! A customer's cohort is the month of their first qualifying order.
//! Cohorts are only ever created from customers who ordered, so a cohort
//! of size zero cannot exist, and offset 0 always equals the cohort size.

use crate::{
    aggregator::{CustomerActivity, FactSnapshot},
    classifier::Classifier,
    config::Thresholds,
    error::MetricsResult,
    types::months_between,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Last month offset tracked after acquisition.
pub const RETENTION_HORIZON_MONTHS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cohort {
    /// First day of the acquisition month.
    pub cohort_month: NaiveDate,
    pub cohort_size:  u32,
}

impl Cohort {
    /// "YYYY-MM".
    pub fn key(&self) -> String {
        self.cohort_month.format("%Y-%m").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortActivity {
    pub cohort_month:     NaiveDate,
    pub month_offset:     u32,
    pub active_customers: u32,
}

/// Published row: one per (cohort, offset) with any activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRetention {
    pub cohort_month:     NaiveDate,
    pub cohort_size:      u32,
    pub month_offset:     u32,
    pub active_customers: u32,
    pub retention_rate:   f64,
}

/// Build cohorts and per-offset activity counts.
pub fn cohort_activity(activity: &[CustomerActivity]) -> (Vec<Cohort>, Vec<CohortActivity>) {
    let mut sizes: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    let mut counts: BTreeMap<(NaiveDate, u32), u32> = BTreeMap::new();

    for customer in activity {
        let Some(cohort_month) = customer.cohort_month() else {
            continue;
        };
        *sizes.entry(cohort_month).or_insert(0) += 1;

        // active_months is distinct per customer, so each customer adds at
        // most one to any (cohort, offset) cell.
        for &month in &customer.active_months {
            let offset = months_between(cohort_month, month);
            if (0..=RETENTION_HORIZON_MONTHS as i32).contains(&offset) {
                *counts.entry((cohort_month, offset as u32)).or_insert(0) += 1;
            }
        }
    }

    let cohorts = sizes
        .into_iter()
        .map(|(cohort_month, cohort_size)| Cohort { cohort_month, cohort_size })
        .collect();
    let cells = counts
        .into_iter()
        .map(|((cohort_month, month_offset), active_customers)| CohortActivity {
            cohort_month,
            month_offset,
            active_customers,
        })
        .collect();
    (cohorts, cells)
}

/// `count / size` rounded to two decimals. Zero size yields 0.
pub fn retention_rate(active: u32, size: u32) -> f64 {
    if size == 0 {
        return 0.0;
    }
    let rate = (f64::from(active) / f64::from(size)).clamp(0.0, 1.0);
    (rate * 100.0).round() / 100.0
}

/// Retention rows ordered by cohort month, then offset.
pub fn retention_rows(activity: &[CustomerActivity]) -> Vec<CohortRetention> {
    let (cohorts, cells) = cohort_activity(activity);
    let sizes: BTreeMap<NaiveDate, u32> =
        cohorts.iter().map(|c| (c.cohort_month, c.cohort_size)).collect();

    cells
        .into_iter()
        .filter_map(|cell| {
            let size = *sizes.get(&cell.cohort_month)?;
            Some(CohortRetention {
                cohort_month:     cell.cohort_month,
                cohort_size:      size,
                month_offset:     cell.month_offset,
                active_customers: cell.active_customers,
                retention_rate:   retention_rate(cell.active_customers, size),
            })
        })
        .collect()
}

pub struct CohortEngine;

impl Classifier for CohortEngine {
    type Record = CohortRetention;

    fn name(&self) -> &'static str { "cohort" }

    fn classify(
        &self,
        facts: &FactSnapshot,
        _thresholds: &Thresholds,
    ) -> MetricsResult<Vec<CohortRetention>> {
        Ok(retention_rows(&facts.activity))
    }
}

// ── Matrix view ──────────────────────────────────────────────────────

/// One cohort with a dense rate vector indexed by month offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRow {
    pub cohort:          Cohort,
    /// `rates[k]` is the retention at offset k; offsets with no activity are 0.
    pub rates:           Vec<f64>,
}

/// Pivot retention rows into one row per cohort.
pub fn retention_matrix(rows: &[CohortRetention]) -> Vec<CohortRow> {
    let width = RETENTION_HORIZON_MONTHS as usize + 1;
    let mut matrix: BTreeMap<NaiveDate, CohortRow> = BTreeMap::new();
    for row in rows {
        let entry = matrix.entry(row.cohort_month).or_insert_with(|| CohortRow {
            cohort: Cohort { cohort_month: row.cohort_month, cohort_size: row.cohort_size },
            rates:  vec![0.0; width],
        });
        if let Some(slot) = entry.rates.get_mut(row.month_offset as usize) {
            *slot = row.retention_rate;
        }
    }
    matrix.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_and_bounds() {
        assert_eq!(retention_rate(1, 3), 0.33);
        assert_eq!(retention_rate(2, 3), 0.67);
        assert_eq!(retention_rate(5, 5), 1.0);
        assert_eq!(retention_rate(0, 0), 0.0);
    }
}
