//! RFM scoring engine — Recency / Frequency / Monetary quintiles.
//!
//! Scores are relative ranks within the population of one pass: customers
//! with at least one qualifying order. Adding or removing anyone can move
//! everyone else's scores, so nothing here is cached between passes.
//!
//! Binning: stable sort per dimension over the population in customer-id
//! order, bins of ⌈N/5⌉ consecutive positions, score = bin index + 1.
//! Ties keep input order; they are never re-randomised.

use crate::{
    aggregator::{CustomerRollup, FactSnapshot},
    classifier::Classifier,
    config::Thresholds,
    error::MetricsResult,
    types::{days_between, EntityId, NO_ACTIVITY_DAYS},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const QUINTILES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RfmSegment {
    Champions,
    LoyalCustomers,
    BigSpenders,
    AtRiskHighValue,
    AtRisk,
    Hibernating,
    Lost,
    RecentCustomers,
    PotentialLoyalists,
}

impl RfmSegment {
    pub const ALL: [RfmSegment; 9] = [
        RfmSegment::Champions,
        RfmSegment::LoyalCustomers,
        RfmSegment::BigSpenders,
        RfmSegment::AtRiskHighValue,
        RfmSegment::AtRisk,
        RfmSegment::Hibernating,
        RfmSegment::Lost,
        RfmSegment::RecentCustomers,
        RfmSegment::PotentialLoyalists,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Champions          => "Champions",
            Self::LoyalCustomers     => "Loyal Customers",
            Self::BigSpenders        => "Big Spenders",
            Self::AtRiskHighValue    => "At Risk (High Value)",
            Self::AtRisk             => "At Risk",
            Self::Hibernating        => "Hibernating",
            Self::Lost               => "Lost",
            Self::RecentCustomers    => "Recent Customers",
            Self::PotentialLoyalists => "Potential Loyalists",
        }
    }
}

/// Score triple, each in 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RfmScores {
    pub r: u8,
    pub f: u8,
    pub m: u8,
}

impl RfmScores {
    /// Concatenated form, e.g. "545".
    pub fn code(&self) -> String {
        format!("{}{}{}", self.r, self.f, self.m)
    }
}

// ── Decision tables ──────────────────────────────────────────────────
//
// Evaluated top to bottom, first match wins. Order is precedence: do not
// reorder rows.

type Rule = fn(&RfmScores) -> bool;

const SEGMENT_RULES: [(Rule, RfmSegment); 8] = [
    (|s| s.r >= 4 && s.f >= 4 && s.m >= 4, RfmSegment::Champions),
    (|s| s.r >= 3 && s.f >= 4,             RfmSegment::LoyalCustomers),
    (|s| s.r >= 3 && s.m >= 5,             RfmSegment::BigSpenders),
    (|s| s.r <= 2 && s.f >= 4 && s.m >= 4, RfmSegment::AtRiskHighValue),
    (|s| s.r <= 2 && s.f >= 3,             RfmSegment::AtRisk),
    (|s| s.r == 2 && s.f <= 2,             RfmSegment::Hibernating),
    (|s| s.r == 1 && s.f <= 2,             RfmSegment::Lost),
    (|s| s.r >= 4 && s.f <= 2,             RfmSegment::RecentCustomers),
];

const ACTION_RULES: [(Rule, &str); 7] = [
    (|s| s.r >= 4 && s.f >= 4, "Reward with loyalty perks and early access"),
    (|s| s.r <= 2 && s.f >= 4, "Win back urgently with a personalised reactivation offer"),
    (|s| s.r <= 2 && s.m >= 5, "Retain with account-manager outreach"),
    (|s| s.r >= 4 && s.f <= 2, "Onboard with a welcome series and second-purchase incentive"),
    (|s| s.r >= 3 && s.f >= 3, "Upsell premium products and bundles"),
    (|s| s.r <= 2 && s.f >= 2, "Re-engage with a reminder campaign and discount"),
    (|s| s.r == 1,             "Low-cost reactivation or suppress from campaigns"),
];

const DEFAULT_ACTION: &str = "Nurture with targeted content";

pub fn segment_for(scores: &RfmScores) -> RfmSegment {
    SEGMENT_RULES
        .iter()
        .find(|(rule, _)| rule(scores))
        .map(|(_, segment)| *segment)
        .unwrap_or(RfmSegment::PotentialLoyalists)
}

pub fn action_for(scores: &RfmScores) -> &'static str {
    ACTION_RULES
        .iter()
        .find(|(rule, _)| rule(scores))
        .map(|(_, action)| *action)
        .unwrap_or(DEFAULT_ACTION)
}

// ── Quintile scoring ─────────────────────────────────────────────────

/// Equal-count quintile scores for `values`, returned in input order.
///
/// `order` sorts the population from worst to best; the first ⌈N/5⌉
/// positions score 1, the next ⌈N/5⌉ score 2, and so on. The sort is
/// stable, so equal values keep their input order.
pub fn quintile_scores<V, F>(values: &[V], order: F) -> Vec<u8>
where
    F: Fn(&V, &V) -> Ordering,
{
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let bin_size = n.div_ceil(QUINTILES);

    let mut ranked: Vec<usize> = (0..n).collect();
    ranked.sort_by(|&a, &b| order(&values[a], &values[b]));

    let mut scores = vec![0u8; n];
    for (position, &index) in ranked.iter().enumerate() {
        scores[index] = (position / bin_size + 1) as u8;
    }
    scores
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmRecord {
    pub customer_id:  EntityId,
    pub name:         String,
    pub recency_days: i64,
    pub frequency:    i64,
    pub monetary:     f64,
    pub scores:       RfmScores,
    pub rfm_code:     String,
    pub segment:      RfmSegment,
    pub action:       String,
}

/// Score every customer with at least one qualifying order.
/// Output is in customer-id order.
pub fn score_population(facts: &FactSnapshot) -> Vec<RfmRecord> {
    let population: Vec<&CustomerRollup> =
        facts.customers.iter().filter(|c| c.order_count > 0).collect();

    let recency: Vec<i64> = population
        .iter()
        .map(|c| {
            c.last_order_date
                .map(|last| days_between(last, facts.reference_date))
                .unwrap_or(NO_ACTIVITY_DAYS)
        })
        .collect();
    let frequency: Vec<i64> = population.iter().map(|c| c.order_count).collect();
    let monetary: Vec<f64> = population.iter().map(|c| c.total_revenue).collect();

    // Recency is inverted: the most days since last order ranks worst.
    let r_scores = quintile_scores(&recency, |a, b| b.cmp(a));
    let f_scores = quintile_scores(&frequency, |a, b| a.cmp(b));
    let m_scores = quintile_scores(&monetary, |a, b| a.total_cmp(b));

    population
        .iter()
        .enumerate()
        .map(|(i, customer)| {
            let scores = RfmScores { r: r_scores[i], f: f_scores[i], m: m_scores[i] };
            RfmRecord {
                customer_id:  customer.customer_id.clone(),
                name:         customer.name.clone(),
                recency_days: recency[i],
                frequency:    frequency[i],
                monetary:     monetary[i],
                scores,
                rfm_code:     scores.code(),
                segment:      segment_for(&scores),
                action:       action_for(&scores).to_string(),
            }
        })
        .collect()
}

pub struct RfmEngine;

impl Classifier for RfmEngine {
    type Record = RfmRecord;

    fn name(&self) -> &'static str { "rfm" }

    fn classify(&self, facts: &FactSnapshot, _thresholds: &Thresholds) -> MetricsResult<Vec<RfmRecord>> {
        let records = score_population(facts);
        log::debug!("rfm: scored {} of {} customers", records.len(), facts.customers.len());
        Ok(records)
    }
}

// ── Summary ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment:          RfmSegment,
    pub customers:        usize,
    pub avg_recency_days: f64,
    pub avg_frequency:    f64,
    pub avg_monetary:     f64,
    pub total_monetary:   f64,
}

/// One row per non-empty segment, in decision-table order.
pub fn segment_summary(records: &[RfmRecord]) -> Vec<SegmentSummary> {
    RfmSegment::ALL
        .iter()
        .filter_map(|&segment| {
            let members: Vec<&RfmRecord> = records.iter().filter(|r| r.segment == segment).collect();
            if members.is_empty() {
                return None;
            }
            let n = members.len() as f64;
            let total_monetary: f64 = members.iter().map(|r| r.monetary).sum();
            Some(SegmentSummary {
                segment,
                customers: members.len(),
                avg_recency_days: members.iter().map(|r| r.recency_days as f64).sum::<f64>() / n,
                avg_frequency: members.iter().map(|r| r.frequency as f64).sum::<f64>() / n,
                avg_monetary: total_monetary / n,
                total_monetary,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(r: u8, f: u8, m: u8) -> RfmScores {
        RfmScores { r, f, m }
    }

    #[test]
    fn first_matching_segment_wins() {
        assert_eq!(segment_for(&s(5, 5, 5)), RfmSegment::Champions);
        // Also satisfies Big Spenders; Loyal is listed first.
        assert_eq!(segment_for(&s(3, 4, 5)), RfmSegment::LoyalCustomers);
        assert_eq!(segment_for(&s(3, 1, 5)), RfmSegment::BigSpenders);
        assert_eq!(segment_for(&s(1, 5, 5)), RfmSegment::AtRiskHighValue);
        assert_eq!(segment_for(&s(2, 3, 1)), RfmSegment::AtRisk);
        assert_eq!(segment_for(&s(2, 1, 1)), RfmSegment::Hibernating);
        assert_eq!(segment_for(&s(1, 2, 3)), RfmSegment::Lost);
        assert_eq!(segment_for(&s(5, 1, 1)), RfmSegment::RecentCustomers);
        assert_eq!(segment_for(&s(3, 3, 3)), RfmSegment::PotentialLoyalists);
    }

    #[test]
    fn action_table() {
        assert_eq!(action_for(&s(5, 5, 1)), "Reward with loyalty perks and early access");
        assert_eq!(action_for(&s(1, 1, 5)), "Retain with account-manager outreach");
        assert_eq!(action_for(&s(3, 2, 2)), DEFAULT_ACTION);
    }

    #[test]
    fn nine_values_bin_two_two_two_two_one() {
        let freqs = [1, 1, 2, 3, 3, 4, 5, 6, 8];
        let scores = quintile_scores(&freqs, |a, b| a.cmp(b));
        let mut sizes = [0usize; 5];
        for score in &scores {
            sizes[(*score - 1) as usize] += 1;
        }
        assert_eq!(sizes, [2, 2, 2, 2, 1]);
        assert_eq!(scores, vec![1, 1, 2, 2, 3, 3, 4, 4, 5]);
    }

    #[test]
    fn ties_keep_input_order() {
        let values = [7, 7, 7, 7, 7];
        assert_eq!(quintile_scores(&values, |a, b| a.cmp(b)), vec![1, 2, 3, 4, 5]);
    }
}
