//! Layer 2: expected-completion records.

use serde::{Deserialize, Serialize};

use super::types::{SequenceNo, Status, Timestamp, TxnRequest, TxnResponse};
use super::violation::ViolationKind;

/// One outstanding transaction: the accepted request plus the outcome
/// predicted for it at acceptance time.
///
/// Owned exclusively by its per-tag queue from creation until it retires on
/// a matching response or is flushed at drain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedCompletion {
    pub request: TxnRequest,
    pub sequence_no: SequenceNo,
    pub accepted_at: Timestamp,
    pub predicted_status: Status,
    /// Present only for reads; frozen at acceptance, never recomputed.
    pub predicted_value: Option<u64>,
    timeout_reported: bool,
}

impl ExpectedCompletion {
    pub fn new(
        request: TxnRequest,
        sequence_no: SequenceNo,
        accepted_at: Timestamp,
        predicted_status: Status,
        predicted_value: Option<u64>,
    ) -> Self {
        Self {
            request,
            sequence_no,
            accepted_at,
            predicted_status,
            predicted_value,
            timeout_reported: false,
        }
    }

    /// Milliseconds this record has been outstanding.
    pub fn age_ms(&self, now: Timestamp) -> u64 {
        now.since(self.accepted_at)
    }

    pub fn timeout_reported(&self) -> bool {
        self.timeout_reported
    }

    pub fn mark_timeout_reported(&mut self) {
        self.timeout_reported = true;
    }

    /// Compare a response against the prediction.
    ///
    /// Status is always compared; data only when a value was predicted
    /// (read-shaped requests). The record retires regardless of the result.
    pub fn mismatches(&self, rsp: &TxnResponse) -> Vec<ViolationKind> {
        let mut out = Vec::new();
        if rsp.status != self.predicted_status {
            out.push(ViolationKind::StatusMismatch {
                expected: self.predicted_status,
                got: rsp.status,
            });
        }
        if let Some(expected) = self.predicted_value {
            if rsp.value != Some(expected) {
                out.push(ViolationKind::DataMismatch {
                    expected,
                    got: rsp.value,
                });
            }
        }
        out
    }
}
