//! CLV & status classifier — lifetime value, tier, activity status.
//!
//! One `CustomerValueRecord` per customer rollup, including customers who
//! never purchased. Tier and status are pure functions of the record's
//! numbers plus the pass thresholds; nothing else feeds them.
//!
//! Recency convention (shared with the churn scorer): a window bound is
//! inclusive. A customer 30 days out with a 30-day active window is Active.

use crate::{
    aggregator::{CustomerRollup, FactSnapshot},
    classifier::Classifier,
    config::{StatusWindows, Thresholds, TierLadder},
    error::MetricsResult,
    types::{days_between, EntityId, NO_ACTIVITY_DAYS},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClvTier {
    Platinum,
    Gold,
    Silver,
    Bronze,
    Basic,
}

impl ClvTier {
    pub const ALL: [ClvTier; 5] = [
        ClvTier::Platinum,
        ClvTier::Gold,
        ClvTier::Silver,
        ClvTier::Bronze,
        ClvTier::Basic,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Platinum => "Platinum",
            Self::Gold     => "Gold",
            Self::Silver   => "Silver",
            Self::Bronze   => "Bronze",
            Self::Basic    => "Basic",
        }
    }

    /// Descend the ladder; the first cutoff the revenue meets wins.
    pub fn for_revenue(revenue: f64, ladder: &TierLadder) -> Self {
        if revenue >= ladder.platinum {
            Self::Platinum
        } else if revenue >= ladder.gold {
            Self::Gold
        } else if revenue >= ladder.silver {
            Self::Silver
        } else if revenue >= ladder.bronze {
            Self::Bronze
        } else {
            Self::Basic
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerStatus {
    Active,
    AtRisk,
    Churning,
    Churned,
    NeverPurchased,
}

impl CustomerStatus {
    pub const ALL: [CustomerStatus; 5] = [
        CustomerStatus::Active,
        CustomerStatus::AtRisk,
        CustomerStatus::Churning,
        CustomerStatus::Churned,
        CustomerStatus::NeverPurchased,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Active         => "Active",
            Self::AtRisk         => "At Risk",
            Self::Churning       => "Churning",
            Self::Churned        => "Churned",
            Self::NeverPurchased => "Never Purchased",
        }
    }

    pub fn classify(order_count: i64, recency_days: i64, windows: &StatusWindows) -> Self {
        if order_count == 0 {
            Self::NeverPurchased
        } else if recency_days <= windows.active_days {
            Self::Active
        } else if recency_days <= windows.at_risk_days {
            Self::AtRisk
        } else if recency_days <= windows.churning_days {
            Self::Churning
        } else {
            Self::Churned
        }
    }
}

/// Fixed age buckets. Not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    Under25,
    From25To34,
    From35To44,
    From45To54,
    Over55,
    Unknown,
}

impl AgeGroup {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Under25    => "Under 25",
            Self::From25To34 => "25-34",
            Self::From35To44 => "35-44",
            Self::From45To54 => "45-54",
            Self::Over55     => "55+",
            Self::Unknown    => "Unknown",
        }
    }

    pub fn for_age(age: Option<u32>) -> Self {
        match age {
            None => Self::Unknown,
            Some(a) if a < 25 => Self::Under25,
            Some(a) if a < 35 => Self::From25To34,
            Some(a) if a < 45 => Self::From35To44,
            Some(a) if a < 55 => Self::From45To54,
            Some(_) => Self::Over55,
        }
    }
}

/// Completed years between `birth` and `on`. None when born after `on`.
pub fn age_on(birth: NaiveDate, on: NaiveDate) -> Option<u32> {
    on.years_since(birth)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerValueRecord {
    pub customer_id:            EntityId,
    pub name:                   String,
    pub city:                   String,
    pub join_date:              NaiveDate,
    pub total_revenue:          f64,
    pub order_count:            i64,
    pub avg_order_value:        f64,
    pub recency_days:           i64,
    pub lifespan_days:          i64,
    pub projected_annual_value: f64,
    pub loyalty_points:         i64,
    pub age_group:              AgeGroup,
    pub clv_tier:               ClvTier,
    pub status:                 CustomerStatus,
}

/// Derive the value record for one rollup.
pub fn value_record(
    rollup: &CustomerRollup,
    reference_date: NaiveDate,
    thresholds: &Thresholds,
) -> CustomerValueRecord {
    let revenue = rollup.total_revenue;
    let avg_order_value = revenue / rollup.order_count.max(1) as f64;

    let lifespan_days = match (rollup.first_order_date, rollup.last_order_date) {
        (Some(first), Some(last)) => days_between(first, last),
        _ => 0,
    };
    let projected_annual_value = revenue / lifespan_days.max(1) as f64 * 365.0;

    let recency_days = rollup
        .last_order_date
        .map(|last| days_between(last, reference_date))
        .unwrap_or(NO_ACTIVITY_DAYS);

    let age_group = AgeGroup::for_age(rollup.birth_date.and_then(|b| age_on(b, reference_date)));

    CustomerValueRecord {
        customer_id: rollup.customer_id.clone(),
        name: rollup.name.clone(),
        city: rollup.city.clone(),
        join_date: rollup.join_date,
        total_revenue: revenue,
        order_count: rollup.order_count,
        avg_order_value,
        recency_days,
        lifespan_days,
        projected_annual_value,
        loyalty_points: rollup.loyalty_points,
        age_group,
        clv_tier: ClvTier::for_revenue(revenue, &thresholds.tiers),
        status: CustomerStatus::classify(rollup.order_count, recency_days, &thresholds.status),
    }
}

/// Value records for every customer, highest revenue first, ties by id.
pub fn value_records(facts: &FactSnapshot, thresholds: &Thresholds) -> Vec<CustomerValueRecord> {
    let mut records: Vec<CustomerValueRecord> = facts
        .customers
        .iter()
        .map(|c| value_record(c, facts.reference_date, thresholds))
        .collect();
    records.sort_by(|a, b| {
        b.total_revenue
            .total_cmp(&a.total_revenue)
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    records
}

pub struct ClvClassifier;

impl Classifier for ClvClassifier {
    type Record = CustomerValueRecord;

    fn name(&self) -> &'static str { "clv" }

    fn classify(
        &self,
        facts: &FactSnapshot,
        thresholds: &Thresholds,
    ) -> MetricsResult<Vec<CustomerValueRecord>> {
        Ok(value_records(facts, thresholds))
    }
}

// ── Summaries ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSummary {
    pub tier:            ClvTier,
    pub customers:       usize,
    pub total_revenue:   f64,
    pub avg_revenue:     f64,
    pub avg_order_value: f64,
}

/// One row per tier, Platinum first. Empty tiers report zeros.
pub fn tier_summary(records: &[CustomerValueRecord]) -> Vec<TierSummary> {
    ClvTier::ALL
        .iter()
        .map(|&tier| {
            let members: Vec<&CustomerValueRecord> =
                records.iter().filter(|r| r.clv_tier == tier).collect();
            let customers = members.len();
            let total_revenue: f64 = members.iter().map(|r| r.total_revenue).sum();
            let orders: i64 = members.iter().map(|r| r.order_count).sum();
            TierSummary {
                tier,
                customers,
                total_revenue,
                avg_revenue: total_revenue / customers.max(1) as f64,
                avg_order_value: total_revenue / orders.max(1) as f64,
            }
        })
        .collect()
}

/// Customer count per status, in `CustomerStatus::ALL` order.
pub fn status_summary(records: &[CustomerValueRecord]) -> Vec<(CustomerStatus, usize)> {
    CustomerStatus::ALL
        .iter()
        .map(|&status| (status, records.iter().filter(|r| r.status == status).count()))
        .collect()
}
