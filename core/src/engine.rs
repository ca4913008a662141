//! The metrics engine — wires the fact store, the threshold config and one
//! published snapshot per classifier.
//!
//! PASS ORDER (per classifier, never reordered):
//!   1. Record `PassStarted` in the pass log.
//!   2. Take the slot's in-flight lock (coalesce if already covered).
//!   3. Read thresholds once from the current config.
//!   4. Aggregate facts in one consistent read.
//!   5. Classify.
//!   6. Publish with a single swap, then record the outcome.
//!
//! RULES:
//!   - Classifiers never see the store or the config map, only a
//!     `FactSnapshot` and a `Thresholds` value.
//!   - A failed pass publishes nothing. The last good snapshot keeps
//!     serving and the failure is recorded as `PassFailed`.
//!   - Passes for different classifiers are independent; `refresh_all`
//!     runs them on scoped threads.

use crate::{
    abc_classifier::{AbcClassifier, AbcEntityKind, AbcRecord},
    aggregator::{FactAggregator, FactSnapshot},
    churn_scorer::{ChurnPriorityRecord, ChurnScorer},
    classifier::{Classifier, ClassifierKind, ClassifierSlot},
    clv_classifier::{ClvClassifier, CustomerValueRecord},
    cohort_engine::{CohortEngine, CohortRetention},
    config::{ClassificationConfig, Thresholds},
    error::{MetricsError, MetricsResult},
    event::PassEvent,
    rfm_engine::{RfmEngine, RfmRecord},
    snapshot::{CancelToken, PassOutput, RefreshOutcome, Snapshot},
    store::{FactStore, PassLogEntry},
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use uuid::Uuid;

pub struct MetricsEngine {
    store:       Mutex<FactStore>,
    config:      RwLock<ClassificationConfig>,
    clv:         ClassifierSlot<ClvClassifier>,
    rfm:         ClassifierSlot<RfmEngine>,
    cohorts:     ClassifierSlot<CohortEngine>,
    product_abc: ClassifierSlot<AbcClassifier>,
    store_abc:   ClassifierSlot<AbcClassifier>,
    churn:       ClassifierSlot<ChurnScorer>,
}

impl MetricsEngine {
    /// `store` must already be migrated.
    pub fn new(store: FactStore, config: ClassificationConfig) -> Self {
        Self {
            store:       Mutex::new(store),
            config:      RwLock::new(config),
            clv:         ClassifierSlot::new(ClvClassifier),
            rfm:         ClassifierSlot::new(RfmEngine),
            cohorts:     ClassifierSlot::new(CohortEngine),
            product_abc: ClassifierSlot::new(AbcClassifier::new(AbcEntityKind::Product)),
            store_abc:   ClassifierSlot::new(AbcClassifier::new(AbcEntityKind::Store)),
            churn:       ClassifierSlot::new(ChurnScorer),
        }
    }

    /// Swap the threshold config. Passes already past step 3 keep the
    /// thresholds they read; the next pass sees the new map.
    pub fn replace_config(&self, config: ClassificationConfig) {
        *self.config.write() = config;
        log::info!("engine: classification config replaced");
    }

    /// Run `f` with exclusive access to the fact store.
    pub fn with_store<R, F>(&self, f: F) -> MetricsResult<R>
    where
        F: FnOnce(&FactStore) -> MetricsResult<R>,
    {
        f(&self.store.lock())
    }

    /// Thresholds from the current config, validated.
    pub fn thresholds(&self) -> MetricsResult<Thresholds> {
        Thresholds::load(&*self.config.read())
    }

    /// Aggregate the current facts without running any classifier.
    pub fn fact_snapshot(&self) -> MetricsResult<FactSnapshot> {
        self.with_store(|store| FactAggregator::snapshot(store))
    }

    // ── Refresh ──────────────────────────────────────────────────────

    pub fn refresh(&self, kind: ClassifierKind) -> MetricsResult<RefreshOutcome> {
        self.refresh_with(kind, &CancelToken::new())
    }

    pub fn refresh_with(
        &self,
        kind: ClassifierKind,
        cancel: &CancelToken,
    ) -> MetricsResult<RefreshOutcome> {
        match kind {
            ClassifierKind::Clv           => self.run_pass(&self.clv, cancel),
            ClassifierKind::Rfm           => self.run_pass(&self.rfm, cancel),
            ClassifierKind::Cohort        => self.run_pass(&self.cohorts, cancel),
            ClassifierKind::ProductAbc    => self.run_pass(&self.product_abc, cancel),
            ClassifierKind::StoreAbc      => self.run_pass(&self.store_abc, cancel),
            ClassifierKind::ChurnPriority => self.run_pass(&self.churn, cancel),
        }
    }

    /// Refresh every classifier concurrently. Results come back in
    /// `ClassifierKind::ALL` order; one failure does not stop the others.
    pub fn refresh_all(&self) -> Vec<(ClassifierKind, MetricsResult<RefreshOutcome>)> {
        let cancel = CancelToken::new();
        std::thread::scope(|scope| {
            let handles: Vec<_> = ClassifierKind::ALL
                .iter()
                .map(|&kind| {
                    let cancel = &cancel;
                    (kind, scope.spawn(move || self.refresh_with(kind, cancel)))
                })
                .collect();
            handles
                .into_iter()
                .map(|(kind, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(MetricsError::Other(anyhow::anyhow!(
                            "{} pass thread panicked",
                            kind.name()
                        )))
                    });
                    (kind, result)
                })
                .collect()
        })
    }

    fn run_pass<C: Classifier>(
        &self,
        slot: &ClassifierSlot<C>,
        cancel: &CancelToken,
    ) -> MetricsResult<RefreshOutcome> {
        let pass_id = Uuid::new_v4().to_string();
        let classifier = slot.classifier.name().to_string();
        self.record(&PassEvent::PassStarted {
            pass_id:    pass_id.clone(),
            classifier: classifier.clone(),
        })?;

        let result = slot.snapshots().refresh(cancel, || {
            let thresholds = self.thresholds()?;
            let facts = self.fact_snapshot()?;
            log::debug!("{classifier}: pass {pass_id} classifying at ref={}", facts.reference_date);
            let records = slot.classifier.classify(&facts, &thresholds)?;
            Ok(PassOutput {
                pass_id:        pass_id.clone(),
                reference_date: facts.reference_date,
                records,
            })
        });

        let outcome_event = match &result {
            Ok(RefreshOutcome::Published { reference_date, records, .. }) => {
                log::info!("{classifier}: published pass {pass_id} ({records} records, ref={reference_date})");
                PassEvent::PassPublished {
                    pass_id:        pass_id.clone(),
                    classifier:     classifier.clone(),
                    reference_date: *reference_date,
                    records:        *records,
                }
            }
            Ok(RefreshOutcome::Coalesced) => {
                log::debug!("{classifier}: pass {pass_id} coalesced into a newer publish");
                PassEvent::PassCoalesced { pass_id: pass_id.clone(), classifier: classifier.clone() }
            }
            Ok(RefreshOutcome::Cancelled) => {
                log::warn!("{classifier}: pass {pass_id} cancelled; prior snapshot kept");
                PassEvent::PassCancelled { pass_id: pass_id.clone(), classifier: classifier.clone() }
            }
            Err(e) => {
                log::warn!("{classifier}: pass {pass_id} failed: {e}; prior snapshot kept");
                PassEvent::PassFailed {
                    pass_id:    pass_id.clone(),
                    classifier: classifier.clone(),
                    error:      e.to_string(),
                }
            }
        };

        // The pass error outranks a failure to log it.
        match (result, self.record(&outcome_event)) {
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
            (Ok(outcome), Ok(())) => Ok(outcome),
        }
    }

    fn record(&self, event: &PassEvent) -> MetricsResult<()> {
        self.with_store(|store| store.append_pass_event(event))
    }

    // ── Published views ──────────────────────────────────────────────

    pub fn clv(&self) -> Arc<Snapshot<CustomerValueRecord>> {
        self.clv.current()
    }

    pub fn rfm(&self) -> Arc<Snapshot<RfmRecord>> {
        self.rfm.current()
    }

    pub fn cohorts(&self) -> Arc<Snapshot<CohortRetention>> {
        self.cohorts.current()
    }

    pub fn product_abc(&self) -> Arc<Snapshot<AbcRecord>> {
        self.product_abc.current()
    }

    pub fn store_abc(&self) -> Arc<Snapshot<AbcRecord>> {
        self.store_abc.current()
    }

    pub fn churn_priority(&self) -> Arc<Snapshot<ChurnPriorityRecord>> {
        self.churn.current()
    }

    /// Pass log rows for one classifier, oldest first.
    pub fn pass_events(&self, kind: ClassifierKind) -> MetricsResult<Vec<PassLogEntry>> {
        self.with_store(|store| store.pass_events(kind.name()))
    }
}
