//! Layer 1: the violation taxonomy.
//!
//! Every violation is reported, never fatal: the engine keeps running after
//! each one. A run is considered failed overall if any violation was ever
//! emitted; the sinks in `engine::sink` make that observable.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{SequenceNo, Status, Tag, Timestamp};

/// What went wrong, with the evidence needed to debug it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A request arrived for a tag whose queue is already full. The request
    /// was rejected at the door; no record exists.
    CapacityExceeded { queue_depth: usize },
    /// A response arrived with nothing outstanding for its tag.
    UnmatchedResponse {
        status: Status,
        value: Option<u64>,
    },
    /// Response status differed from the predicted status.
    StatusMismatch { expected: Status, got: Status },
    /// Response data differed from the value predicted at acceptance.
    DataMismatch { expected: u64, got: Option<u64> },
    /// The oldest record for a tag has waited past the configured threshold.
    /// Advisory: the record stays queued and a late response still matches.
    Timeout { age_ms: u64, queue_depth: usize },
    /// An event named a tag outside the configured tag space.
    UnknownTag { num_tags: u16 },
}

impl ViolationKind {
    pub fn label(&self) -> &'static str {
        match self {
            ViolationKind::CapacityExceeded { .. } => "capacity_exceeded",
            ViolationKind::UnmatchedResponse { .. } => "unmatched_response",
            ViolationKind::StatusMismatch { .. } => "status_mismatch",
            ViolationKind::DataMismatch { .. } => "data_mismatch",
            ViolationKind::Timeout { .. } => "timeout",
            ViolationKind::UnknownTag { .. } => "unknown_tag",
        }
    }
}

/// A reportable protocol violation, traceable to a specific acceptance event
/// through its sequence number when one exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub tag: Tag,
    /// Absent for violations that never created a record (capacity
    /// rejections, unmatched responses).
    pub sequence_no: Option<SequenceNo>,
    pub at: Timestamp,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(
        kind: ViolationKind,
        tag: Tag,
        sequence_no: Option<SequenceNo>,
        at: Timestamp,
    ) -> Self {
        Self {
            tag,
            sequence_no,
            at,
            kind,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tag={}", self.kind.label(), self.tag)?;
        if let Some(seq) = self.sequence_no {
            write!(f, " seq={seq}")?;
        }
        write!(f, " at={}ms", self.at.millis())
    }
}
