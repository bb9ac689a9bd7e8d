//! Layer 3: diagnostic views.
//!
//! Snapshots are read-only, point-in-time listings of pending state, taken
//! for failure reporting. The drain report is the shutdown flush: every
//! still-pending record enumerated as incomplete rather than dropped.

use serde::{Deserialize, Serialize};

use super::record::ExpectedCompletion;
use super::types::{AccessKind, Addr, SequenceNo, Tag, Timestamp};

/// One pending record as seen at snapshot time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub sequence_no: SequenceNo,
    pub kind: AccessKind,
    pub addr: Addr,
    pub age_ms: u64,
}

impl PendingEntry {
    pub fn from_record(record: &ExpectedCompletion, now: Timestamp) -> Self {
        Self {
            sequence_no: record.sequence_no,
            kind: record.request.kind,
            addr: record.request.addr,
            age_ms: record.age_ms(now),
        }
    }
}

/// One tag's queue at snapshot time, oldest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSnapshot {
    pub tag: Tag,
    pub depth: usize,
    pub max_depth_seen: usize,
    pub entries: Vec<PendingEntry>,
}

/// Point-in-time view of all outstanding state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub taken_at: Timestamp,
    pub total_inflight: usize,
    pub max_total_inflight_seen: usize,
    pub next_sequence_no: SequenceNo,
    pub violations_emitted: u64,
    pub tags: Vec<TagSnapshot>,
}

impl Snapshot {
    /// True when nothing is outstanding.
    pub fn is_quiescent(&self) -> bool {
        self.total_inflight == 0
    }
}

/// A transaction that never completed, reported at drain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompleteTxn {
    pub tag: Tag,
    pub sequence_no: SequenceNo,
    pub kind: AccessKind,
    pub addr: Addr,
    pub age_ms: u64,
}

/// Final report flushed at shutdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub drained_at: Timestamp,
    /// Total requests ever admitted.
    pub total_accepted: u64,
    pub max_total_inflight_seen: usize,
    pub violations_emitted: u64,
    /// Still-pending records in acceptance order.
    pub incomplete: Vec<IncompleteTxn>,
}

impl DrainReport {
    /// True when the run completed every transaction without violations.
    pub fn is_clean(&self) -> bool {
        self.violations_emitted == 0 && self.incomplete.is_empty()
    }
}
