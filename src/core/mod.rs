//! Core matching logic (pure, single-threaded).
//!
//! Module hierarchy follows type dependency order:
//! - types: Tag, SequenceNo, Addr, Timestamp, requests/responses (Layer 0)
//! - refmodel: predictive address-to-value store (Layer 1)
//! - violation: reportable protocol violations (Layer 1)
//! - record: expected-completion records (Layer 2)
//! - snapshot: diagnostic views and the drain report (Layer 3)
//! - tracker: per-tag queues and the matching engine (Layer 4)

pub mod record;
pub mod refmodel;
pub mod snapshot;
pub mod tracker;
pub mod types;
pub mod violation;

pub use record::ExpectedCompletion;
pub use refmodel::RefModel;
pub use snapshot::{DrainReport, IncompleteTxn, PendingEntry, Snapshot, TagSnapshot};
pub use tracker::{RequestOutcome, ResponseOutcome, Tracker};
pub use types::{AccessKind, Addr, SequenceNo, Status, Tag, Timestamp, TxnRequest, TxnResponse};
pub use violation::{Violation, ViolationKind};
