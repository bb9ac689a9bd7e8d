//! Layer 0: transaction vocabulary.
//!
//! Tags correlate responses to requests; sequence numbers order acceptances
//! globally; timestamps measure ages on the engine's monotonic clock.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Completion channel identifier.
///
/// A small bounded integer in `[0, num_tags)`. Many requests may share a tag
/// over time; reuse in flight is bounded by the per-tag capacity limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(u16);

impl Tag {
    pub fn new(value: u16) -> Self {
        Self(value)
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Index into tag-indexed arrays.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Global acceptance-order sequence number.
///
/// Assigned from a single monotone counter across all tags, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceNo(u64);

impl SequenceNo {
    pub const ZERO: SequenceNo = SequenceNo(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> SequenceNo {
        SequenceNo(
            self.0
                .checked_add(1)
                .expect("sequence number overflow"),
        )
    }
}

impl fmt::Display for SequenceNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Addr(pub u64);

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Milliseconds on the engine's monotonic clock.
///
/// Copy is fine here - it's just a measurement, not causality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn new(ms: u64) -> Self {
        Self(ms)
    }

    pub fn millis(self) -> u64 {
        self.0
    }

    /// Elapsed milliseconds since `earlier`, saturating at zero.
    pub fn since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Whether an access reads or writes its address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Read,
    Write,
}

impl AccessKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessKind::Read => "read",
            AccessKind::Write => "write",
        }
    }
}

/// Completion status carried by a response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Okay,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Okay => "okay",
            Status::Error => "error",
        }
    }
}

/// An accepted request. Immutable once accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnRequest {
    pub tag: Tag,
    pub kind: AccessKind,
    pub addr: Addr,
    /// Present only for writes.
    pub write_value: Option<u64>,
}

impl TxnRequest {
    pub fn read(tag: Tag, addr: Addr) -> Self {
        Self {
            tag,
            kind: AccessKind::Read,
            addr,
            write_value: None,
        }
    }

    pub fn write(tag: Tag, addr: Addr, value: u64) -> Self {
        Self {
            tag,
            kind: AccessKind::Write,
            addr,
            write_value: Some(value),
        }
    }
}

/// An accepted response. Transient - consumed by the match, never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnResponse {
    pub tag: Tag,
    pub status: Status,
    pub value: Option<u64>,
    /// Names the admitted record this response completes. Only consulted in
    /// out-of-order per-tag mode; FIFO mode always matches the oldest.
    pub completion_id: Option<SequenceNo>,
}

impl TxnResponse {
    pub fn new(tag: Tag, status: Status, value: Option<u64>) -> Self {
        Self {
            tag,
            status,
            value,
            completion_id: None,
        }
    }

    pub fn okay(tag: Tag, value: Option<u64>) -> Self {
        Self::new(tag, Status::Okay, value)
    }

    pub fn with_completion_id(mut self, id: SequenceNo) -> Self {
        self.completion_id = Some(id);
        self
    }
}
