//! Published snapshots and the refresh protocol.
//!
//! A snapshot is the complete, ordered output of one classifier pass.
//! It is immutable once published and is replaced wholesale by the next
//! pass; there is no incremental patching.
//!
//! RULES:
//!   - Publish is a single `Arc` swap under the write lock. Readers clone
//!     the current `Arc` and keep a complete snapshot for as long as they
//!     hold it, whatever refreshes happen meanwhile.
//!   - At most one pass per slot is in flight. A request that arrives
//!     while a pass runs waits for it; if a pass that started after the
//!     request has already published by then, the request is coalesced.
//!   - A failed or cancelled pass publishes nothing.

use crate::{error::MetricsResult, types::PassId};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot<T> {
    /// None until the first pass publishes.
    pub pass_id:        Option<PassId>,
    pub reference_date: Option<NaiveDate>,
    pub published_at:   Option<DateTime<Utc>>,
    pub records:        Vec<T>,
}

impl<T> Snapshot<T> {
    pub fn empty() -> Self {
        Self { pass_id: None, reference_date: None, published_at: None, records: Vec::new() }
    }

    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Time since publish, measured against `now`.
    pub fn staleness(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.published_at.map(|at| now - at)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }
}

/// What a pass hands back for publishing.
#[derive(Debug, Clone)]
pub struct PassOutput<T> {
    pub pass_id:        PassId,
    pub reference_date: NaiveDate,
    pub records:        Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published {
        pass_id:        PassId,
        reference_date: NaiveDate,
        records:        usize,
    },
    Coalesced,
    Cancelled,
}

impl RefreshOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Cooperative cancellation flag shared between a caller and a pass.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct SnapshotSlot<T> {
    current:   RwLock<Arc<Snapshot<T>>>,
    in_flight: Mutex<()>,
    /// Monotonic request counter; each refresh call takes the next ticket.
    requested: AtomicU64,
    /// Highest ticket whose request is satisfied by the current snapshot.
    covered:   AtomicU64,
}

impl<T> Default for SnapshotSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SnapshotSlot<T> {
    pub fn new() -> Self {
        Self {
            current:   RwLock::new(Arc::new(Snapshot::empty())),
            in_flight: Mutex::new(()),
            requested: AtomicU64::new(0),
            covered:   AtomicU64::new(0),
        }
    }

    /// The last published snapshot (or the empty one before any publish).
    pub fn current(&self) -> Arc<Snapshot<T>> {
        Arc::clone(&*self.current.read())
    }

    /// Requests not yet covered by a publish, including any in flight.
    pub fn pending(&self) -> u64 {
        self.requested
            .load(Ordering::SeqCst)
            .saturating_sub(self.covered.load(Ordering::SeqCst))
    }

    /// Run `pass` and publish its output, unless coalesced or cancelled.
    ///
    /// `pass` is only invoked while this slot's in-flight lock is held,
    /// and only after the covering ticket has been recorded, so any facts
    /// it reads are at least as new as every request it will satisfy.
    pub fn refresh<F>(&self, cancel: &CancelToken, pass: F) -> MetricsResult<RefreshOutcome>
    where
        F: FnOnce() -> MetricsResult<PassOutput<T>>,
    {
        let ticket = self.requested.fetch_add(1, Ordering::SeqCst) + 1;

        let _in_flight = self.in_flight.lock();

        if self.covered.load(Ordering::SeqCst) >= ticket {
            return Ok(RefreshOutcome::Coalesced);
        }
        let covering = self.requested.load(Ordering::SeqCst);

        if cancel.is_cancelled() {
            return Ok(RefreshOutcome::Cancelled);
        }
        let output = pass()?;
        if cancel.is_cancelled() {
            return Ok(RefreshOutcome::Cancelled);
        }

        let records = output.records.len();
        let snapshot = Arc::new(Snapshot {
            pass_id:        Some(output.pass_id.clone()),
            reference_date: Some(output.reference_date),
            published_at:   Some(Utc::now()),
            records:        output.records,
        });
        *self.current.write() = snapshot;
        self.covered.store(covering, Ordering::SeqCst);

        Ok(RefreshOutcome::Published {
            pass_id: output.pass_id,
            reference_date: output.reference_date,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;

    fn output(pass_id: &str, records: Vec<u32>) -> MetricsResult<PassOutput<u32>> {
        Ok(PassOutput {
            pass_id: pass_id.into(),
            reference_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            records,
        })
    }

    #[test]
    fn empty_until_first_publish() {
        let slot: SnapshotSlot<u32> = SnapshotSlot::new();
        assert!(!slot.current().is_published());
        assert!(slot.current().is_empty());
    }

    #[test]
    fn failed_pass_keeps_prior_snapshot() {
        let slot = SnapshotSlot::new();
        let cancel = CancelToken::new();
        slot.refresh(&cancel, || output("p1", vec![1, 2, 3])).unwrap();

        let err = slot.refresh(&cancel, || {
            Err(MetricsError::ConfigMissing { key: "clv.gold_min".into() })
        });
        assert!(err.is_err());

        let current = slot.current();
        assert_eq!(current.pass_id.as_deref(), Some("p1"));
        assert_eq!(current.records, vec![1, 2, 3]);
    }

    #[test]
    fn cancelled_pass_publishes_nothing() {
        let slot = SnapshotSlot::new();
        let cancel = CancelToken::new();
        let outcome = slot
            .refresh(&cancel, || {
                cancel.cancel();
                output("p1", vec![9])
            })
            .unwrap();
        assert_eq!(outcome, RefreshOutcome::Cancelled);
        assert!(!slot.current().is_published());
    }

    #[test]
    fn reader_keeps_old_snapshot_across_publish() {
        let slot = SnapshotSlot::new();
        let cancel = CancelToken::new();
        slot.refresh(&cancel, || output("p1", vec![1])).unwrap();
        let held = slot.current();
        slot.refresh(&cancel, || output("p2", vec![2, 2])).unwrap();

        assert_eq!(held.records, vec![1]);
        assert_eq!(slot.current().records, vec![2, 2]);
    }

    #[test]
    fn requests_behind_an_in_flight_pass_share_one_rerun() {
        use std::sync::atomic::AtomicUsize;
        use std::time::{Duration as StdDuration, Instant};

        let slot: SnapshotSlot<u32> = SnapshotSlot::new();
        let runs = AtomicUsize::new(0);
        let cancel = CancelToken::new();

        let outcomes: Vec<RefreshOutcome> = std::thread::scope(|scope| {
            let first = scope.spawn(|| {
                slot.refresh(&cancel, || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    // Hold the pass open until both followers have asked.
                    let deadline = Instant::now() + StdDuration::from_secs(10);
                    while slot.pending() < 3 && Instant::now() < deadline {
                        std::thread::yield_now();
                    }
                    output("first", vec![1])
                })
            });
            // Followers ask only once the first pass is running.
            while runs.load(Ordering::SeqCst) < 1 {
                std::thread::yield_now();
            }
            let mut followers = Vec::new();
            for _ in 0..2 {
                followers.push(scope.spawn(|| {
                    slot.refresh(&cancel, || {
                        runs.fetch_add(1, Ordering::SeqCst);
                        output("follower", vec![2])
                    })
                }));
            }

            let mut all = vec![first.join().unwrap().unwrap()];
            for f in followers {
                all.push(f.join().unwrap().unwrap());
            }
            all
        });

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        let coalesced = outcomes.iter().filter(|o| **o == RefreshOutcome::Coalesced).count();
        assert_eq!(coalesced, 1);
        assert_eq!(slot.current().pass_id.as_deref(), Some("follower"));
        assert_eq!(slot.pending(), 0);
    }
}
