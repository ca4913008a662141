//! Classifier trait and registry.
//!
//! RULE: Every classifier implements `Classifier`.
//! A classifier is a pure function of one `FactSnapshot` and one
//! `Thresholds` value. It holds no state between passes, never reads the
//! store, and never reads configuration by name.

use crate::{
    aggregator::FactSnapshot,
    config::Thresholds,
    error::MetricsResult,
    snapshot::{Snapshot, SnapshotSlot},
};
use serde::Serialize;
use std::sync::Arc;

/// The contract every classifier must fulfill.
pub trait Classifier: Send + Sync {
    type Record: Clone + Send + Sync + Serialize + 'static;

    /// Unique stable name, used in the pass log.
    fn name(&self) -> &'static str;

    /// Derive the full ordered output for one pass.
    fn classify(
        &self,
        facts: &FactSnapshot,
        thresholds: &Thresholds,
    ) -> MetricsResult<Vec<Self::Record>>;
}

/// Stable classifier identities.
/// NEVER rename a variant's `name()` — the pass log is keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifierKind {
    Clv,
    Rfm,
    Cohort,
    ProductAbc,
    StoreAbc,
    ChurnPriority,
}

impl ClassifierKind {
    pub const ALL: [ClassifierKind; 6] = [
        ClassifierKind::Clv,
        ClassifierKind::Rfm,
        ClassifierKind::Cohort,
        ClassifierKind::ProductAbc,
        ClassifierKind::StoreAbc,
        ClassifierKind::ChurnPriority,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Clv           => "clv",
            Self::Rfm           => "rfm",
            Self::Cohort        => "cohort",
            Self::ProductAbc    => "product_abc",
            Self::StoreAbc      => "store_abc",
            Self::ChurnPriority => "churn_priority",
        }
    }
}

/// A classifier paired with the slot its output is published into.
pub struct ClassifierSlot<C: Classifier> {
    pub classifier: C,
    snapshots:      SnapshotSlot<C::Record>,
}

impl<C: Classifier> ClassifierSlot<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier, snapshots: SnapshotSlot::new() }
    }

    pub fn current(&self) -> Arc<Snapshot<C::Record>> {
        self.snapshots.current()
    }

    pub fn snapshots(&self) -> &SnapshotSlot<C::Record> {
        &self.snapshots
    }
}
