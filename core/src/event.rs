//! Pass lifecycle events.
//!
//! Every classifier pass emits a `PassStarted` followed by exactly one of
//! `PassPublished`, `PassFailed`, `PassCancelled` or `PassCoalesced`. The
//! engine persists them to the pass log so operators can see when each
//! published snapshot was produced and why a refresh did not publish.

use crate::types::PassId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PassEvent {
    PassStarted {
        pass_id:    PassId,
        classifier: String,
    },
    PassPublished {
        pass_id:        PassId,
        classifier:     String,
        reference_date: NaiveDate,
        records:        usize,
    },
    PassFailed {
        pass_id:    PassId,
        classifier: String,
        error:      String,
    },
    /// Output discarded before publish; the prior snapshot keeps serving.
    PassCancelled {
        pass_id:    PassId,
        classifier: String,
    },
    /// A pass that started after this request already published.
    PassCoalesced {
        pass_id:    PassId,
        classifier: String,
    },
}

impl PassEvent {
    pub fn pass_id(&self) -> &str {
        match self {
            Self::PassStarted { pass_id, .. }
            | Self::PassPublished { pass_id, .. }
            | Self::PassFailed { pass_id, .. }
            | Self::PassCancelled { pass_id, .. }
            | Self::PassCoalesced { pass_id, .. } => pass_id,
        }
    }

    pub fn classifier(&self) -> &str {
        match self {
            Self::PassStarted { classifier, .. }
            | Self::PassPublished { classifier, .. }
            | Self::PassFailed { classifier, .. }
            | Self::PassCancelled { classifier, .. }
            | Self::PassCoalesced { classifier, .. } => classifier,
        }
    }

    /// Stable name for the event_type column in pass_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::PassStarted { .. }   => "pass_started",
            Self::PassPublished { .. } => "pass_published",
            Self::PassFailed { .. }    => "pass_failed",
            Self::PassCancelled { .. } => "pass_cancelled",
            Self::PassCoalesced { .. } => "pass_coalesced",
        }
    }
}
