//! ABC / Pareto classifier — rank by revenue, bucket by cumulative share.
//!
//! Entities are sorted by value descending, ties by id ascending, so the
//! ranking is identical on every run. An entity's class is decided by the
//! cumulative share accumulated *before* it: below the A cut → A, below
//! the B cut → B, otherwise C. The entity that crosses a cut therefore
//! belongs to the class it crosses out of, and its own cumulative share
//! can land past `b_cut` too: revenues [79, 20, 1] at 80/95 classify as
//! [A, A, C], leaving B empty.
//!
//! Negative values (discounts larger than gross) count as zero in every
//! share, so cumulative share never decreases and ends at 1. Entities with
//! nothing to contribute are C. A zero total is degenerate: every entity
//! is C with zero shares. Nothing divides by zero.

use crate::{
    aggregator::FactSnapshot,
    classifier::Classifier,
    config::{ParetoCuts, Thresholds},
    error::MetricsResult,
    types::EntityId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl AbcClass {
    pub const ALL: [AbcClass; 3] = [AbcClass::A, AbcClass::B, AbcClass::C];

    pub fn label(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }

    /// Class for an entity whose predecessors hold `prior_share` of total.
    pub fn for_prior_share(prior_share: f64, cuts: &ParetoCuts) -> Self {
        if prior_share < cuts.a_cut {
            Self::A
        } else if prior_share < cuts.b_cut {
            Self::B
        } else {
            Self::C
        }
    }
}

/// Which rollup an ABC pass ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbcEntityKind {
    /// Products by net revenue (gross − discounts).
    Product,
    /// Stores by total order revenue.
    Store,
}

/// Input to the ranking: one valued entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuedEntity {
    pub entity_id: EntityId,
    pub name:      String,
    pub value:     f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbcRecord {
    pub entity_id:        EntityId,
    pub name:             String,
    pub rank:             usize,
    pub revenue:          f64,
    pub revenue_share:    f64,
    pub cumulative_share: f64,
    pub class:            AbcClass,
}

/// Rank and classify. Output is in rank order (1-based).
pub fn classify_entities(mut entities: Vec<ValuedEntity>, cuts: &ParetoCuts) -> Vec<AbcRecord> {
    entities.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });

    // Summed in rank order, same as the running total, so the last
    // cumulative share is exactly 1.
    let total: f64 = entities.iter().map(|e| e.value.max(0.0)).sum();
    let degenerate = total <= 0.0;

    let mut running = 0.0;
    entities
        .into_iter()
        .enumerate()
        .map(|(i, entity)| {
            let contribution = entity.value.max(0.0);
            let (revenue_share, cumulative_share, class) = if degenerate {
                (0.0, 0.0, AbcClass::C)
            } else {
                let prior = running / total;
                running += contribution;
                let class = if contribution > 0.0 {
                    AbcClass::for_prior_share(prior, cuts)
                } else {
                    AbcClass::C
                };
                (contribution / total, running / total, class)
            };
            AbcRecord {
                entity_id: entity.entity_id,
                name: entity.name,
                rank: i + 1,
                revenue: entity.value,
                revenue_share,
                cumulative_share,
                class,
            }
        })
        .collect()
}

pub struct AbcClassifier {
    kind: AbcEntityKind,
}

impl AbcClassifier {
    pub fn new(kind: AbcEntityKind) -> Self {
        Self { kind }
    }

    fn valued_entities(&self, facts: &FactSnapshot) -> Vec<ValuedEntity> {
        match self.kind {
            AbcEntityKind::Product => facts
                .products
                .iter()
                .map(|p| ValuedEntity {
                    entity_id: p.product_id.clone(),
                    name:      p.name.clone(),
                    value:     p.net_revenue,
                })
                .collect(),
            AbcEntityKind::Store => facts
                .stores
                .iter()
                .map(|s| ValuedEntity {
                    entity_id: s.store_id.clone(),
                    name:      s.name.clone(),
                    value:     s.total_revenue,
                })
                .collect(),
        }
    }
}

impl Classifier for AbcClassifier {
    type Record = AbcRecord;

    fn name(&self) -> &'static str {
        match self.kind {
            AbcEntityKind::Product => "product_abc",
            AbcEntityKind::Store   => "store_abc",
        }
    }

    fn classify(&self, facts: &FactSnapshot, thresholds: &Thresholds) -> MetricsResult<Vec<AbcRecord>> {
        Ok(classify_entities(self.valued_entities(facts), &thresholds.pareto))
    }
}

// ── Summary ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub class:         AbcClass,
    pub entities:      usize,
    pub revenue:       f64,
    pub revenue_share: f64,
}

/// One row per class, A first. Counts sum to the number of records.
pub fn class_summary(records: &[AbcRecord]) -> Vec<ClassSummary> {
    AbcClass::ALL
        .iter()
        .map(|&class| {
            let members = records.iter().filter(|r| r.class == class);
            let (entities, revenue, revenue_share) = members.fold((0, 0.0, 0.0), |acc, r| {
                (acc.0 + 1, acc.1 + r.revenue, acc.2 + r.revenue_share)
            });
            ClassSummary { class, entities, revenue, revenue_share }
        })
        .collect()
}
