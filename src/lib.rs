#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod telemetry;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

// Re-export core types at crate root for convenience
pub use crate::config::{ConfigError, EngineConfig, TagOrdering};
pub use crate::core::{
    AccessKind, Addr, DrainReport, IncompleteTxn, PendingEntry, RefModel, RequestOutcome,
    ResponseOutcome, SequenceNo, Snapshot, Status, Tag, TagSnapshot, Timestamp, Tracker,
    TxnRequest, TxnResponse, Violation, ViolationKind,
};
pub use crate::engine::{
    ChannelSink, Clock, CollectingSink, EngineError, EngineHandle, TracingSink, ViolationSink,
};
