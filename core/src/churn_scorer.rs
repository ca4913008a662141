//! Churn priority scorer — who to call first.
//!
//! Combines the customer's CLV tier with how long they have been quiet
//! into one integer priority, and picks a recommended action from a fixed
//! decision table. Only purchasers past the at-risk floor are scored;
//! everyone else is left out of the view rather than scored zero.
//!
//! Recency uses the same convention as customer status: a bound belongs to
//! the healthier bucket, so "over 90 days" means `recency_days > 90`.

use crate::{
    aggregator::FactSnapshot,
    classifier::Classifier,
    clv_classifier::{value_records, ClvTier, CustomerStatus, CustomerValueRecord},
    config::Thresholds,
    error::{MetricsError, MetricsResult},
    types::EntityId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub fn tier_weight(tier: ClvTier) -> u32 {
    match tier {
        ClvTier::Platinum => 5,
        ClvTier::Gold     => 4,
        ClvTier::Silver   => 3,
        ClvTier::Bronze   => 2,
        ClvTier::Basic    => 1,
    }
}

pub fn recency_weight(recency_days: i64) -> u32 {
    if recency_days > 90 {
        5
    } else if recency_days > 60 {
        3
    } else if recency_days > 30 {
        1
    } else {
        0
    }
}

/// Most urgent, most specific rule first.
pub fn recommended_action(tier: ClvTier, recency_days: i64) -> &'static str {
    let high_value = matches!(tier, ClvTier::Platinum | ClvTier::Gold);
    match (high_value, tier, recency_days) {
        (true, _, d) if d > 90 => "Executive outreach with an exclusive win-back offer",
        (true, _, d) if d > 60 => "Priority retention call from an account manager",
        (true, _, _) => "VIP check-in with a loyalty bonus",
        (_, ClvTier::Silver, d) if d > 90 => "Win-back campaign with a 20% discount",
        (_, ClvTier::Silver, d) if d > 60 => "Personalised re-engagement email",
        (_, _, d) if d > 90 => "Automated win-back email sequence",
        _ => "Promotional reminder newsletter",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnPriorityRecord {
    pub customer_id:        EntityId,
    pub name:               String,
    pub clv_tier:           ClvTier,
    pub status:             CustomerStatus,
    pub total_revenue:      f64,
    pub recency_days:       i64,
    pub tier_weight:        u32,
    pub recency_weight:     u32,
    pub priority_score:     u32,
    pub recommended_action: String,
}

/// Value records of one pass, tagged with the clock they were computed on.
#[derive(Debug, Clone)]
pub struct ValuedPopulation<'a> {
    pub reference_date: NaiveDate,
    pub records:        &'a [CustomerValueRecord],
}

/// Score the eligible part of `population`.
///
/// `reference_date` is the pass clock. Value records computed against a
/// different clock would mix two snapshots in one view.
pub fn score_population(
    population: &ValuedPopulation<'_>,
    reference_date: NaiveDate,
    floor_days: i64,
) -> MetricsResult<Vec<ChurnPriorityRecord>> {
    if population.reference_date != reference_date {
        return Err(MetricsError::InconsistentSnapshot {
            expected: reference_date,
            actual:   population.reference_date,
        });
    }

    let mut records: Vec<ChurnPriorityRecord> = population
        .records
        .iter()
        .filter(|v| v.order_count > 0 && v.recency_days > floor_days)
        .map(|v| {
            let tier_w = tier_weight(v.clv_tier);
            let recency_w = recency_weight(v.recency_days);
            ChurnPriorityRecord {
                customer_id:        v.customer_id.clone(),
                name:               v.name.clone(),
                clv_tier:           v.clv_tier,
                status:             v.status,
                total_revenue:      v.total_revenue,
                recency_days:       v.recency_days,
                tier_weight:        tier_w,
                recency_weight:     recency_w,
                priority_score:     tier_w + recency_w,
                recommended_action: recommended_action(v.clv_tier, v.recency_days).to_string(),
            }
        })
        .collect();

    records.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| b.total_revenue.total_cmp(&a.total_revenue))
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    Ok(records)
}

pub struct ChurnScorer;

impl Classifier for ChurnScorer {
    type Record = ChurnPriorityRecord;

    fn name(&self) -> &'static str { "churn_priority" }

    fn classify(
        &self,
        facts: &FactSnapshot,
        thresholds: &Thresholds,
    ) -> MetricsResult<Vec<ChurnPriorityRecord>> {
        let values = value_records(facts, thresholds);
        let population = ValuedPopulation { reference_date: facts.reference_date, records: &values };
        score_population(&population, facts.reference_date, thresholds.churn_floor_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_follow_ladders() {
        assert_eq!(tier_weight(ClvTier::Platinum), 5);
        assert_eq!(tier_weight(ClvTier::Basic), 1);
        assert_eq!(recency_weight(91), 5);
        assert_eq!(recency_weight(90), 3);
        assert_eq!(recency_weight(61), 3);
        assert_eq!(recency_weight(31), 1);
        assert_eq!(recency_weight(30), 0);
    }

    #[test]
    fn actions_most_specific_first() {
        assert_eq!(
            recommended_action(ClvTier::Gold, 120),
            "Executive outreach with an exclusive win-back offer"
        );
        assert_eq!(recommended_action(ClvTier::Platinum, 45), "VIP check-in with a loyalty bonus");
        assert_eq!(recommended_action(ClvTier::Silver, 70), "Personalised re-engagement email");
        assert_eq!(recommended_action(ClvTier::Bronze, 70), "Promotional reminder newsletter");
        assert_eq!(recommended_action(ClvTier::Basic, 200), "Automated win-back email sequence");
    }

    #[test]
    fn records_from_another_clock_are_rejected() {
        let clv_date = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        let pass_date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let population = ValuedPopulation { reference_date: clv_date, records: &[] };

        match score_population(&population, pass_date, 30) {
            Err(MetricsError::InconsistentSnapshot { expected, actual }) => {
                assert_eq!(expected, pass_date);
                assert_eq!(actual, clv_date);
            }
            other => panic!("expected InconsistentSnapshot, got {other:?}"),
        }
        assert!(score_population(&population, clv_date, 30).unwrap().is_empty());
    }
}
