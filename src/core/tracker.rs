//! Layer 4: the in-flight tracker.
//!
//! One bounded queue of expected completions per tag, matched head-first.
//! Matching the head is correct by construction in FIFO mode: the per-tag
//! queue makes "responses reorder across tags but stay ordered within a tag"
//! a structural property rather than a runtime check. Out-of-order mode
//! relaxes this to matching by the admitted sequence number.

use std::collections::VecDeque;

use crate::config::{ConfigError, EngineConfig, TagOrdering};

use super::record::ExpectedCompletion;
use super::refmodel::RefModel;
use super::snapshot::{DrainReport, IncompleteTxn, PendingEntry, Snapshot, TagSnapshot};
use super::types::{AccessKind, SequenceNo, Status, Tag, Timestamp, TxnRequest, TxnResponse};
use super::violation::{Violation, ViolationKind};

/// Result of offering an accepted request to the tracker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Enqueued under the returned sequence number.
    Admitted { sequence_no: SequenceNo },
    /// Rejected at the door; no record was created.
    Rejected(Violation),
}

impl RequestOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RequestOutcome::Admitted { .. })
    }

    pub fn sequence_no(&self) -> Option<SequenceNo> {
        match self {
            RequestOutcome::Admitted { sequence_no } => Some(*sequence_no),
            RequestOutcome::Rejected(_) => None,
        }
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            RequestOutcome::Admitted { .. } => None,
            RequestOutcome::Rejected(violation) => Some(violation),
        }
    }
}

/// Result of offering an accepted response to the tracker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// The record retired. Mismatch violations, if any, ride along; a data
    /// mismatch still retires the record.
    Matched {
        sequence_no: SequenceNo,
        violations: Vec<Violation>,
    },
    /// Nothing outstanding matched this response.
    Unmatched(Violation),
}

impl ResponseOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, ResponseOutcome::Matched { .. })
    }

    pub fn matched_sequence_no(&self) -> Option<SequenceNo> {
        match self {
            ResponseOutcome::Matched { sequence_no, .. } => Some(*sequence_no),
            ResponseOutcome::Unmatched(_) => None,
        }
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            ResponseOutcome::Matched { violations, .. } => violations,
            ResponseOutcome::Unmatched(violation) => std::slice::from_ref(violation),
        }
    }
}

/// The matching engine.
///
/// An explicit, owned object: callers pass it by reference into the event
/// loop and the watchdog. No process-wide instance exists, so resetting
/// between runs is just constructing a new tracker.
#[derive(Debug)]
pub struct Tracker {
    config: EngineConfig,
    queues: Vec<VecDeque<ExpectedCompletion>>,
    refmodel: RefModel,
    next_sequence_no: SequenceNo,
    total_inflight: usize,
    max_total_inflight_seen: usize,
    max_depth_seen: Vec<usize>,
    violations_emitted: u64,
}

impl Tracker {
    /// Construct a tracker, rejecting misconfiguration up front.
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let num_tags = usize::from(config.num_tags);
        Ok(Self {
            config: config.clone(),
            queues: (0..num_tags).map(|_| VecDeque::new()).collect(),
            refmodel: RefModel::new(),
            next_sequence_no: SequenceNo::ZERO,
            total_inflight: 0,
            max_total_inflight_seen: 0,
            max_depth_seen: vec![0; num_tags],
            violations_emitted: 0,
        })
    }

    /// Admit an accepted request, or reject it with a violation.
    ///
    /// Admission consults the reference model at acceptance time, assigns
    /// the next global sequence number, and appends to the tag's queue tail.
    /// No partial states: a rejection leaves the tracker untouched.
    pub fn record_request_accept(&mut self, req: TxnRequest, now: Timestamp) -> RequestOutcome {
        let tag = req.tag;
        let Some(queue) = self.queues.get_mut(tag.index()) else {
            self.violations_emitted += 1;
            return RequestOutcome::Rejected(Violation::new(
                ViolationKind::UnknownTag {
                    num_tags: self.config.num_tags,
                },
                tag,
                None,
                now,
            ));
        };

        if queue.len() >= self.config.max_per_tag {
            let queue_depth = queue.len();
            self.violations_emitted += 1;
            return RequestOutcome::Rejected(Violation::new(
                ViolationKind::CapacityExceeded { queue_depth },
                tag,
                None,
                now,
            ));
        }

        let (predicted_status, predicted_value) = match req.kind {
            AccessKind::Write => {
                self.refmodel
                    .on_write(req.addr, req.write_value.unwrap_or_default());
                (Status::Okay, None)
            }
            AccessKind::Read => (Status::Okay, Some(self.refmodel.on_read(req.addr))),
        };

        let sequence_no = self.next_sequence_no;
        self.next_sequence_no = sequence_no.next();

        queue.push_back(ExpectedCompletion::new(
            req,
            sequence_no,
            now,
            predicted_status,
            predicted_value,
        ));
        let depth = queue.len();
        if depth > self.max_depth_seen[tag.index()] {
            self.max_depth_seen[tag.index()] = depth;
        }

        self.total_inflight += 1;
        if self.total_inflight > self.max_total_inflight_seen {
            self.max_total_inflight_seen = self.total_inflight;
        }

        RequestOutcome::Admitted { sequence_no }
    }

    /// Match an accepted response against the outstanding record for its tag.
    ///
    /// FIFO mode always pops the head; out-of-order mode removes the record
    /// named by `completion_id`, falling back to the head when the response
    /// carries none.
    pub fn record_response_accept(&mut self, rsp: TxnResponse, now: Timestamp) -> ResponseOutcome {
        let tag = rsp.tag;
        let Some(queue) = self.queues.get_mut(tag.index()) else {
            self.violations_emitted += 1;
            return ResponseOutcome::Unmatched(Violation::new(
                ViolationKind::UnknownTag {
                    num_tags: self.config.num_tags,
                },
                tag,
                None,
                now,
            ));
        };

        let idx = match self.config.per_tag_ordering {
            TagOrdering::Fifo => 0,
            TagOrdering::OutOfOrder => match rsp.completion_id {
                Some(id) => match queue.iter().position(|r| r.sequence_no == id) {
                    Some(idx) => idx,
                    None => {
                        self.violations_emitted += 1;
                        return ResponseOutcome::Unmatched(Violation::new(
                            ViolationKind::UnmatchedResponse {
                                status: rsp.status,
                                value: rsp.value,
                            },
                            tag,
                            Some(id),
                            now,
                        ));
                    }
                },
                None => 0,
            },
        };

        let Some(record) = queue.remove(idx) else {
            self.violations_emitted += 1;
            return ResponseOutcome::Unmatched(Violation::new(
                ViolationKind::UnmatchedResponse {
                    status: rsp.status,
                    value: rsp.value,
                },
                tag,
                None,
                now,
            ));
        };

        self.total_inflight -= 1;

        let violations: Vec<Violation> = record
            .mismatches(&rsp)
            .into_iter()
            .map(|kind| Violation::new(kind, tag, Some(record.sequence_no), now))
            .collect();
        self.violations_emitted += violations.len() as u64;

        ResponseOutcome::Matched {
            sequence_no: record.sequence_no,
            violations,
        }
    }

    /// The watchdog body: flag heads older than the configured threshold.
    ///
    /// Only the head of each non-empty queue is inspected; insertion happens
    /// in acceptance order, so the head is the oldest record in both ordering
    /// modes. Flagged records stay queued.
    pub fn scan_stale(&mut self, now: Timestamp) -> Vec<Violation> {
        let timeout_ms = self.config.timeout_ms;
        let repeat = self.config.repeat_timeout_reports;
        let mut out = Vec::new();

        for queue in &mut self.queues {
            let queue_depth = queue.len();
            let Some(head) = queue.front_mut() else {
                continue;
            };
            let age_ms = head.age_ms(now);
            if age_ms <= timeout_ms {
                continue;
            }
            if head.timeout_reported() && !repeat {
                continue;
            }
            head.mark_timeout_reported();
            out.push(Violation::new(
                ViolationKind::Timeout {
                    age_ms,
                    queue_depth,
                },
                head.request.tag,
                Some(head.sequence_no),
                now,
            ));
        }

        self.violations_emitted += out.len() as u64;
        out
    }

    /// Read-only point-in-time view of every pending record.
    pub fn snapshot(&self, now: Timestamp) -> Snapshot {
        let tags = self
            .queues
            .iter()
            .enumerate()
            .map(|(idx, queue)| TagSnapshot {
                tag: Tag::new(idx as u16),
                depth: queue.len(),
                max_depth_seen: self.max_depth_seen[idx],
                entries: queue
                    .iter()
                    .map(|record| PendingEntry::from_record(record, now))
                    .collect(),
            })
            .collect();

        Snapshot {
            taken_at: now,
            total_inflight: self.total_inflight,
            max_total_inflight_seen: self.max_total_inflight_seen,
            next_sequence_no: self.next_sequence_no,
            violations_emitted: self.violations_emitted,
            tags,
        }
    }

    /// Flush everything still pending and report it as incomplete.
    pub fn drain(&mut self, now: Timestamp) -> DrainReport {
        let mut incomplete = Vec::with_capacity(self.total_inflight);
        for queue in &mut self.queues {
            for record in queue.drain(..) {
                incomplete.push(IncompleteTxn {
                    tag: record.request.tag,
                    sequence_no: record.sequence_no,
                    kind: record.request.kind,
                    addr: record.request.addr,
                    age_ms: record.age_ms(now),
                });
            }
        }
        incomplete.sort_by_key(|txn| txn.sequence_no);
        self.total_inflight = 0;

        DrainReport {
            drained_at: now,
            total_accepted: self.next_sequence_no.get(),
            max_total_inflight_seen: self.max_total_inflight_seen,
            violations_emitted: self.violations_emitted,
            incomplete,
        }
    }

    pub fn total_inflight(&self) -> usize {
        self.total_inflight
    }

    /// Queue depth for a tag; zero for tags outside the configured space.
    pub fn queue_len(&self, tag: Tag) -> usize {
        self.queues.get(tag.index()).map_or(0, VecDeque::len)
    }

    pub fn is_idle(&self) -> bool {
        self.total_inflight == 0
    }

    pub fn max_total_inflight_seen(&self) -> usize {
        self.max_total_inflight_seen
    }

    pub fn violations_emitted(&self) -> u64 {
        self.violations_emitted
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Test support: panic if any structural invariant is broken.
    ///
    /// Checks that `total_inflight` equals the sum of queue depths, that no
    /// queue exceeds capacity, and that every queue is strictly ordered by
    /// sequence number.
    pub fn assert_invariants(&self) {
        let sum: usize = self.queues.iter().map(VecDeque::len).sum();
        assert_eq!(
            self.total_inflight, sum,
            "total_inflight must equal the sum of queue depths"
        );
        for (tag, queue) in self.queues.iter().enumerate() {
            assert!(
                queue.len() <= self.config.max_per_tag,
                "queue {tag} exceeds max_per_tag"
            );
            for pair in queue.iter().zip(queue.iter().skip(1)) {
                assert!(
                    pair.0.sequence_no < pair.1.sequence_no,
                    "queue {tag} not strictly ordered by sequence_no"
                );
            }
        }
    }
}
